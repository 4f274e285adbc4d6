//! Acquisition side of the pipeline.
//!
//! [`KeySpace`] enumerates every segment file a run could need, and
//! [`Fetcher`] makes each one present locally unless it already is or the
//! archive does not have it.

pub mod enumerate;
pub mod error;
pub mod fetch;

pub use enumerate::KeySpace;
pub use error::{AcquisitionError, AcquisitionResult};
pub use fetch::{FetchConfig, FetchOutcome, FetchSummary, Fetcher};
