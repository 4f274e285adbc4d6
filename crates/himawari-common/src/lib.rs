//! Common types shared by the acquisition and extraction crates.
//!
//! Everything that must agree bit-for-bit between the downloader and the
//! extractor lives here: band and segment identifiers, the HSD filename
//! convention, observation timestamps and the run configuration.

pub mod band;
pub mod config;
pub mod error;
pub mod key;
pub mod time;

pub use band::{Band, Segment};
pub use config::{
    DecodeFailurePolicy, DecoderConfig, OutputConfig, PeriodConfig, RemoteConfig, RunConfig,
    StorageConfig, TargetConfig, TimeWindow,
};
pub use error::{CommonError, CommonResult};
pub use key::{parse_artifact_name, ArtifactName, ObjectKey, ProductSpec};
pub use time::ObservationTime;
