//! HSD object keys and the filename convention.
//!
//! Schema:
//!
//! ```text
//! «prefix» _ «YYYYMMDD» _ «hhmm» _ «band» _ «product» _ «resolution» _ S«segment»«total» . «ext»
//! ```
//!
//! example: `HS_H09_20250301_1000_B14_FLDK_R20_S0410.DAT.bz2`
//!
//! The remote object lives under `«remote_root»/YYYY/MM/DD/hhmm/«filename»`.
//! Local artifacts use the bare filename, which carries every key field, so
//! two different keys can never map to the same local file.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::band::{Band, Segment};
use crate::time::ObservationTime;

/// Fixed naming parameters of the product being collected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProductSpec {
    /// Satellite/system prefix, e.g. "HS_H09" (Himawari-9) or "HS_H08"
    pub prefix: String,
    /// Observation area, e.g. "FLDK" (full disk)
    pub product: String,
    /// Spatial resolution code, e.g. "R20" (2 km, IR bands)
    pub resolution: String,
    /// File extension without leading dot
    pub extension: String,
    /// Number of segments the area is split into
    pub segment_total: u8,
    /// Top-level prefix in the bucket
    pub remote_root: String,
}

impl Default for ProductSpec {
    fn default() -> Self {
        Self {
            prefix: "HS_H09".to_string(),
            product: "FLDK".to_string(),
            resolution: "R20".to_string(),
            extension: "DAT.bz2".to_string(),
            segment_total: 10,
            remote_root: "AHI-L1b-FLDK".to_string(),
        }
    }
}

/// One remote object: a single segment of a single band at one instant.
///
/// Field order gives the derived ordering: (time, band, segment).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectKey {
    pub time: ObservationTime,
    pub band: Band,
    pub segment: Segment,
}

impl ObjectKey {
    pub fn new(time: ObservationTime, band: Band, segment: Segment) -> Self {
        Self { time, band, segment }
    }

    /// Local artifact filename.
    pub fn filename(&self, spec: &ProductSpec) -> String {
        format!(
            "{}_{}_{}_{}_{}_{}_S{:02}{:02}.{}",
            spec.prefix,
            self.time.date_compact(),
            self.time.hhmm(),
            self.band,
            spec.product,
            spec.resolution,
            self.segment.number(),
            spec.segment_total,
            spec.extension
        )
    }

    /// Object path in the remote bucket.
    pub fn remote_path(&self, spec: &ProductSpec) -> String {
        format!(
            "{}/{}/{}",
            spec.remote_root,
            self.time.remote_dir(),
            self.filename(spec)
        )
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}_{}", self.time, self.band, self.segment)
    }
}

/// Fields recovered from an artifact filename.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactName {
    pub prefix: String,
    pub time: ObservationTime,
    pub band: Band,
    pub product: String,
    pub resolution: String,
    pub segment: Segment,
    pub segment_total: u8,
    pub extension: String,
}

impl ArtifactName {
    pub fn key(&self) -> ObjectKey {
        ObjectKey::new(self.time, self.band, self.segment)
    }

    /// `YYYYMMDD_hhmm`
    pub fn group_key(&self) -> String {
        self.time.group_key()
    }

    /// True if this file belongs to the given product (prefix, area,
    /// resolution, segmentation and extension all agree).
    pub fn matches(&self, spec: &ProductSpec) -> bool {
        self.prefix == spec.prefix
            && self.product == spec.product
            && self.resolution == spec.resolution
            && self.segment_total == spec.segment_total
            && self.extension == spec.extension
    }
}

/// Parse an artifact filename. Returns `None` for anything that does not
/// follow the convention, including in-flight `.partial` files.
pub fn parse_artifact_name(filename: &str) -> Option<ArtifactName> {
    let (stem, extension) = filename.split_once('.')?;
    if extension.ends_with(".partial") || extension == "partial" {
        return None;
    }

    // The prefix may itself contain underscores ("HS_H09"), so split from the right.
    let mut fields = stem.rsplitn(7, '_');
    let segment_field = fields.next()?;
    let resolution = fields.next()?;
    let product = fields.next()?;
    let band = fields.next()?;
    let hhmm = fields.next()?;
    let date = fields.next()?;
    let prefix = fields.next()?;

    if segment_field.len() != 5 || !segment_field.is_ascii() || !segment_field.starts_with('S') {
        return None;
    }
    let segment = segment_field[1..3].parse::<u8>().ok()?;
    let segment_total = segment_field[3..5].parse::<u8>().ok()?;

    Some(ArtifactName {
        prefix: prefix.to_string(),
        time: ObservationTime::from_fields(date, hhmm)?,
        band: band.parse().ok()?,
        product: product.to_string(),
        resolution: resolution.to_string(),
        segment: Segment::new(segment).ok()?,
        segment_total,
        extension: extension.to_string(),
    })
}
