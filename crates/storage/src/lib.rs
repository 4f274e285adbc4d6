//! Storage abstractions for the Himawari pipeline.
//!
//! Provides:
//! - Remote object storage (S3 / any `object_store` backend), read-only
//! - Local append-only artifact storage for downloaded segment files

pub mod error;
pub mod local;
pub mod remote;

pub use error::{StorageError, StorageResult};
pub use local::{LocalArtifactStore, PARTIAL_SUFFIX};
pub use remote::{ObjectSource, RemoteStore};
