//! Geolocation and per-band point extraction.

use tracing::debug;

use himawari_common::Band;
use projection::PixelIndex;

use crate::decode::{DecodeError, Scene};

/// Offset between Kelvin and degrees Celsius.
pub const KELVIN_OFFSET: f64 = 273.15;

pub fn kelvin_to_celsius(kelvin: f64) -> f64 {
    kelvin - KELVIN_OFFSET
}

/// Pixel resolved for one observation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geolocation {
    /// Band whose area definition was used
    pub source_band: Band,
    /// None if the point is not visible from the satellite
    pub index: Option<PixelIndex>,
}

/// Resolve `(lat, lon)` against the area of the first band in `bands` that
/// was loaded. All bands of an observation are assumed to share that area.
pub fn geolocate(
    scene: &Scene,
    bands: &[Band],
    latitude: f64,
    longitude: f64,
) -> Result<Geolocation, DecodeError> {
    let grid = scene.first_loaded(bands).ok_or(DecodeError::NoBands)?;
    let index = grid.area.nearest_index(latitude, longitude);
    debug!(band = %grid.band, ?index, "Resolved point");
    Ok(Geolocation {
        source_band: grid.band,
        index,
    })
}

/// Read each band at `index`, aligned with `bands`.
///
/// A band is missing when it has no grid, the index falls outside its grid,
/// or the stored value is not finite.
pub fn extract_point(
    scene: &Scene,
    bands: &[Band],
    index: Option<PixelIndex>,
    celsius: bool,
) -> Vec<Option<f64>> {
    bands
        .iter()
        .map(|band| {
            let grid = scene.get(*band)?;
            let value = grid.value_at(index?)? as f64;
            if !value.is_finite() {
                return None;
            }
            Some(if celsius {
                kelvin_to_celsius(value)
            } else {
                value
            })
        })
        .collect()
}
