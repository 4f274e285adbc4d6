//! Geostationary projection and area definitions.
//!
//! Implements the satellite view geometry from scratch, without PROJ.

pub mod area;
pub mod error;
pub mod geostationary;

pub use area::{AreaExtent, GeosArea, PixelIndex, AHI_FULL_DISK_HALF_EXTENT};
pub use error::{ProjectionError, ProjectionResult};
pub use geostationary::{Geostationary, SweepAxis};
