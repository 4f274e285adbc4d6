//! Point extraction library.
//!
//! Turns a directory of downloaded segment files into a time series of
//! brightness values at one geographic point.
//!
//! # Architecture
//!
//! Processing is strictly sequential, one observation at a time:
//!
//! - [`group`]: bucket local artifacts by observation time
//! - [`workspace`]: decompress one group into a directory that is always
//!   removed afterwards
//! - [`decode`]: the external decode capability producing calibrated grids
//! - [`extract`]: resolve the point to a pixel and read each band
//! - [`aggregate`]: ordered result table and CSV output
//! - [`pipeline`]: drives the above over every group

pub mod aggregate;
pub mod decode;
pub mod error;
pub mod extract;
pub mod group;
pub mod pipeline;
pub mod workspace;

pub use aggregate::{ObservationRecord, ResultTable};
pub use decode::{
    CalibratedGrid, CommandDecoder, DecodeError, Scene, SceneDecoder, DEFAULT_DECODE_TIMEOUT,
};
pub use error::{ExtractionError, ExtractionResult};
pub use extract::{extract_point, geolocate, kelvin_to_celsius, Geolocation};
pub use group::{group_filenames, scan_groups, DateRange, GroupMember, ObservationGroup};
pub use pipeline::{ExtractionOptions, Extractor, GroupOutcome, RunSummary};
pub use workspace::{Compression, Workspace};
