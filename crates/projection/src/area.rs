//! Area definitions: a projection plus the extent and shape of a pixel grid.
//!
//! An extent is given in projection meters as the outer edges of the corner
//! pixels, `(x_ll, y_ll, x_ur, y_ur)`. Row 0 is the northern edge, column 0
//! the western edge. Resolving a coordinate to a pixel follows the usual
//! nearest-pixel convention of satellite area definitions:
//!
//! ```text
//! col = floor((x - x_ll) / pixel_size_x)
//! row = floor((y_ur - y) / pixel_size_y)
//! ```
//!
//! The resulting [`PixelIndex`] is not clamped. Callers range-check it
//! against each grid they read from.

use serde::{Deserialize, Serialize};

use crate::error::{ProjectionError, ProjectionResult};
use crate::geostationary::Geostationary;

/// Half width of the AHI full-disk extent in projection meters.
pub const AHI_FULL_DISK_HALF_EXTENT: f64 = 5_500_000.0;

/// Outer edges of a grid in projection meters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AreaExtent {
    pub x_ll: f64,
    pub y_ll: f64,
    pub x_ur: f64,
    pub y_ur: f64,
}

/// Integer pixel position; may lie outside any particular grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelIndex {
    pub row: i64,
    pub col: i64,
}

impl PixelIndex {
    /// True if this index addresses a cell of a `rows x cols` grid.
    pub fn within(&self, rows: usize, cols: usize) -> bool {
        self.row >= 0 && self.col >= 0 && (self.row as u64) < rows as u64 && (self.col as u64) < cols as u64
    }
}

/// Geostationary area definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeosArea {
    pub projection: Geostationary,
    pub extent: AreaExtent,
    /// Number of columns
    pub width: usize,
    /// Number of rows
    pub height: usize,
}

impl GeosArea {
    pub fn new(
        projection: Geostationary,
        extent: AreaExtent,
        width: usize,
        height: usize,
    ) -> ProjectionResult<Self> {
        if width == 0 || height == 0 {
            return Err(ProjectionError::InvalidArea(format!(
                "empty shape {}x{}",
                width, height
            )));
        }
        if !(extent.x_ur > extent.x_ll && extent.y_ur > extent.y_ll) {
            return Err(ProjectionError::InvalidArea(format!(
                "degenerate extent {:?}",
                extent
            )));
        }
        Ok(Self {
            projection,
            extent,
            width,
            height,
        })
    }

    /// AHI full disk with `pixels` rows and columns (5500 for 2 km bands).
    pub fn himawari_full_disk(longitude_origin: f64, pixels: usize) -> ProjectionResult<Self> {
        let half = AHI_FULL_DISK_HALF_EXTENT;
        Self::new(
            Geostationary::himawari(longitude_origin),
            AreaExtent {
                x_ll: -half,
                y_ll: -half,
                x_ur: half,
                y_ur: half,
            },
            pixels,
            pixels,
        )
    }

    /// The sub-area covered by the contiguous segments `first..=last` of a
    /// disk split into `total` horizontal stripes numbered from the north.
    pub fn segment_rows(&self, first: u8, last: u8, total: u8) -> ProjectionResult<Self> {
        if total == 0 || first == 0 || first > last || last > total {
            return Err(ProjectionError::InvalidArea(format!(
                "segments {}..={} of {}",
                first, last, total
            )));
        }
        if self.height % total as usize != 0 {
            return Err(ProjectionError::InvalidArea(format!(
                "{} rows do not split into {} segments",
                self.height, total
            )));
        }
        let rows_per_segment = self.height / total as usize;
        let pixel_y = self.pixel_size_y();
        let skipped = (first as usize - 1) * rows_per_segment;
        let height = (last - first + 1) as usize * rows_per_segment;

        let y_ur = self.extent.y_ur - skipped as f64 * pixel_y;
        let y_ll = y_ur - height as f64 * pixel_y;
        Self::new(
            self.projection,
            AreaExtent {
                y_ll,
                y_ur,
                ..self.extent
            },
            self.width,
            height,
        )
    }

    pub fn pixel_size_x(&self) -> f64 {
        (self.extent.x_ur - self.extent.x_ll) / self.width as f64
    }

    pub fn pixel_size_y(&self) -> f64 {
        (self.extent.y_ur - self.extent.y_ll) / self.height as f64
    }

    /// Nearest pixel containing the given coordinate.
    ///
    /// Returns None if the coordinate is not visible from the satellite; a
    /// visible coordinate outside the extent still yields an index, which
    /// then fails [`GeosArea::contains`].
    pub fn nearest_index(&self, lat_deg: f64, lon_deg: f64) -> Option<PixelIndex> {
        let (x, y) = self.projection.geo_to_xy(lon_deg, lat_deg)?;
        let col = ((x - self.extent.x_ll) / self.pixel_size_x()).floor();
        let row = ((self.extent.y_ur - y) / self.pixel_size_y()).floor();
        if !col.is_finite() || !row.is_finite() {
            return None;
        }
        Some(PixelIndex {
            row: row as i64,
            col: col as i64,
        })
    }

    pub fn contains(&self, index: PixelIndex) -> bool {
        index.within(self.height, self.width)
    }

    /// Geographic (lat, lon) of a pixel center; None for off-Earth pixels.
    pub fn pixel_center(&self, index: PixelIndex) -> Option<(f64, f64)> {
        let x = self.extent.x_ll + (index.col as f64 + 0.5) * self.pixel_size_x();
        let y = self.extent.y_ur - (index.row as f64 + 0.5) * self.pixel_size_y();
        self.projection.xy_to_geo(x, y).map(|(lon, lat)| (lat, lon))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BATAAN: (f64, f64) = (14.77083, 120.45537);

    #[test]
    fn test_bataan_full_disk_index() {
        let area = GeosArea::himawari_full_disk(140.7, 5500).unwrap();
        let idx = area.nearest_index(BATAAN.0, BATAAN.1).unwrap();
        assert_eq!(idx, PixelIndex { row: 1957, col: 1701 });
        assert!(area.contains(idx));
    }

    #[test]
    fn test_segment_sub_area() {
        let disk = GeosArea::himawari_full_disk(140.7, 5500).unwrap();
        let seg4 = disk.segment_rows(4, 4, 10).unwrap();
        assert_eq!(seg4.height, 550);
        assert_eq!(seg4.width, 5500);
        assert!((seg4.pixel_size_y() - 2000.0).abs() < 1e-6);

        let idx = seg4.nearest_index(BATAAN.0, BATAAN.1).unwrap();
        assert_eq!(idx, PixelIndex { row: 1957 - 1650, col: 1701 });
        assert!(seg4.contains(idx));
    }

    #[test]
    fn test_point_outside_loaded_segments() {
        let disk = GeosArea::himawari_full_disk(140.7, 5500).unwrap();
        let north = disk.segment_rows(1, 2, 10).unwrap();
        let idx = north.nearest_index(BATAAN.0, BATAAN.1).unwrap();
        assert!(idx.row >= north.height as i64);
        assert!(!north.contains(idx));
    }

    #[test]
    fn test_invisible_point_has_no_index() {
        let disk = GeosArea::himawari_full_disk(140.7, 5500).unwrap();
        // Atlantic Ocean, far side of the Earth
        assert!(disk.nearest_index(0.0, -30.0).is_none());
    }

    #[test]
    fn test_pixel_center_roundtrip() {
        let disk = GeosArea::himawari_full_disk(140.7, 5500).unwrap();
        let idx = disk.nearest_index(BATAAN.0, BATAAN.1).unwrap();
        let (lat, lon) = disk.pixel_center(idx).unwrap();
        // 2 km pixels near 15°N are well under 0.05°
        assert!((lat - BATAAN.0).abs() < 0.05);
        assert!((lon - BATAAN.1).abs() < 0.05);
        assert_eq!(disk.nearest_index(lat, lon), Some(idx));
    }

    #[test]
    fn test_invalid_areas() {
        let disk = GeosArea::himawari_full_disk(140.7, 5500).unwrap();
        assert!(disk.segment_rows(0, 1, 10).is_err());
        assert!(disk.segment_rows(3, 2, 10).is_err());
        assert!(disk.segment_rows(1, 11, 10).is_err());
        assert!(disk.segment_rows(1, 1, 7).is_err());
        assert!(GeosArea::himawari_full_disk(140.7, 0).is_err());
    }

    #[test]
    fn test_area_from_json() {
        let json = r#"{
            "projection": {
                "perspective_point_height": 35785863.0,
                "semi_major_axis": 6378137.0,
                "semi_minor_axis": 6356752.3,
                "longitude_origin": 140.7,
                "sweep": "y"
            },
            "extent": {"x_ll": -5500000.0, "y_ll": 3300000.0, "x_ur": 5500000.0, "y_ur": 4400000.0},
            "width": 5500,
            "height": 550
        }"#;
        let area: GeosArea = serde_json::from_str(json).unwrap();
        let disk = GeosArea::himawari_full_disk(140.7, 5500).unwrap();
        assert_eq!(area, disk.segment_rows(2, 2, 10).unwrap());
    }

    #[test]
    fn test_pixel_index_within() {
        let idx = PixelIndex { row: 2, col: 3 };
        assert!(idx.within(3, 4));
        assert!(!idx.within(2, 4));
        assert!(!PixelIndex { row: -1, col: 0 }.within(3, 4));
    }
}
