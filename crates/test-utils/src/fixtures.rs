//! Common test fixtures for the extraction pipeline.
//!
//! The test geometry is a 100 x 100 pixel AHI full disk split into 10
//! segments of 10 rows each. At that resolution the Bataan point of interest
//! falls in row 35, column 30, which is row 5 of segment 4.

use himawari_common::{Band, ObjectKey, ObservationTime, ProductSpec, Segment};
use projection::GeosArea;

/// Points of interest as (latitude, longitude).
pub mod points {
    /// Bataan, Philippines
    pub const BATAAN: (f64, f64) = (14.77083, 120.45537);

    /// Mid-Atlantic, not visible from 140.7°E
    pub const ATLANTIC: (f64, f64) = (0.0, -30.0);

    /// Sapporo, Japan
    pub const SAPPORO: (f64, f64) = (43.06, 141.35);
}

/// Coarse full-disk geometry used by synthetic scenes.
pub mod disk {
    /// Sub-satellite longitude of Himawari-9
    pub const LONGITUDE_ORIGIN: f64 = 140.7;

    /// Rows and columns of the test full disk
    pub const PIXELS: usize = 100;

    pub const SEGMENT_TOTAL: u8 = 10;

    pub const ROWS_PER_SEGMENT: usize = PIXELS / SEGMENT_TOTAL as usize;

    /// Full-disk (row, col) of [`super::points::BATAAN`]
    pub const BATAAN_INDEX: (i64, i64) = (35, 30);

    /// Segment holding [`super::points::BATAAN`]
    pub const BATAAN_SEGMENT: u8 = 4;

    /// Segment holding [`super::points::SAPPORO`]
    pub const SAPPORO_SEGMENT: u8 = 2;
}

/// Observation instants used across tests.
pub mod time {
    pub const MORNING: &str = "20250301_1000";
    pub const MORNING_NEXT: &str = "20250301_1010";
    pub const EVENING: &str = "20250301_2350";
}

/// The 100 pixel test full disk.
pub fn test_disk() -> GeosArea {
    GeosArea::himawari_full_disk(disk::LONGITUDE_ORIGIN, disk::PIXELS)
        .expect("test disk geometry is valid")
}

/// Product naming matching the public full-disk archive.
pub fn test_product() -> ProductSpec {
    ProductSpec::default()
}

/// Build a key from a `YYYYMMDD_hhmm` group key, band and segment numbers.
pub fn object_key(group_key: &str, band: u8, segment: u8) -> ObjectKey {
    ObjectKey::new(
        ObservationTime::parse_group_key(group_key).expect("valid group key"),
        Band::new(band).expect("valid band"),
        Segment::new(segment).expect("valid segment"),
    )
}
