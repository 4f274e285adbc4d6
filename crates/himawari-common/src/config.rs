//! Run configuration.
//!
//! One YAML file describes a whole run: the key space to collect, the point
//! to extract, and where everything lives. Both services load the same file
//! so the downloader and the extractor always agree on names and bands.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{FixedOffset, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::band::{Band, Segment};
use crate::error::{CommonError, CommonResult};
use crate::key::ProductSpec;

const MINUTES_PER_DAY: u32 = 24 * 60;

/// Root configuration loaded from a run YAML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub period: PeriodConfig,
    #[serde(default)]
    pub product: ProductSpec,
    pub bands: Vec<Band>,
    /// Segments to collect; defaults to every segment of the product
    #[serde(default)]
    pub segments: Vec<Segment>,
    pub target: TargetConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub remote: RemoteConfig,
    #[serde(default)]
    pub decoder: DecoderConfig,
}

/// Date range and sampling cadence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PeriodConfig {
    /// First day (inclusive)
    pub start: NaiveDate,
    /// Last day (inclusive)
    pub end: NaiveDate,
    /// Minutes between observations
    #[serde(default = "default_cadence")]
    pub cadence_minutes: u32,
    /// Optional UTC time-of-day window applied to every day
    #[serde(default)]
    pub window: Option<TimeWindow>,
}

fn default_cadence() -> u32 {
    10
}

/// Inclusive time-of-day window, written as `hh:mm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(with = "hhmm")]
    pub from: NaiveTime,
    #[serde(with = "hhmm")]
    pub to: NaiveTime,
}

impl TimeWindow {
    pub fn contains(&self, time: NaiveTime) -> bool {
        self.from <= time && time <= self.to
    }
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&time.format("%H:%M").to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let s = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&s, "%H:%M").map_err(serde::de::Error::custom)
    }
}

/// The single point of interest.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    pub latitude: f64,
    pub longitude: f64,
}

/// What to do with a group the decoder could not load at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecodeFailurePolicy {
    /// Emit no record for the group
    #[default]
    Skip,
    /// Emit a record with every band missing
    EmitMissing,
}

/// Output table settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    /// Convert brightness temperatures from Kelvin to Celsius
    pub celsius: bool,
    /// Offset of the local reference time from UTC (Philippine time is +8)
    pub local_offset_hours: i32,
    /// Text written for a missing band value
    pub null_marker: String,
    pub decode_failure: DecodeFailurePolicy,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("himawari_point.csv"),
            celsius: false,
            local_offset_hours: 8,
            null_marker: String::new(),
            decode_failure: DecodeFailurePolicy::default(),
        }
    }
}

/// Local directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding downloaded artifacts
    pub local_root: PathBuf,
    /// Parent of the per-group decompression directories
    pub work_root: Option<PathBuf>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            local_root: PathBuf::from("data/himawari"),
            work_root: None,
        }
    }
}

impl StorageConfig {
    /// Work root, defaulting to `temp_processing` under the artifact directory.
    pub fn work_root(&self) -> PathBuf {
        self.work_root
            .clone()
            .unwrap_or_else(|| self.local_root.join("temp_processing"))
    }
}

/// Remote bucket and fetch behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint (e.g. a local MinIO mirror); None uses AWS
    pub endpoint: Option<String>,
    /// Maximum concurrent fetches
    pub max_concurrent: usize,
    /// Retries for transport failures (not-found is never retried)
    pub max_retries: u32,
    /// First retry delay, doubles each attempt
    pub initial_retry_delay_ms: u64,
    pub max_retry_delay_ms: u64,
    pub request_timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            bucket: "noaa-himawari9".to_string(),
            region: "us-east-1".to_string(),
            endpoint: None,
            max_concurrent: 8,
            max_retries: 3,
            initial_retry_delay_ms: 500,
            max_retry_delay_ms: 30_000,
            request_timeout_secs: 120,
        }
    }
}

/// External decoder program.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DecoderConfig {
    pub program: Option<PathBuf>,
    pub args: Vec<String>,
    /// Seconds one decode may take before the program is killed
    pub timeout_secs: u64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            program: None,
            args: Vec::new(),
            timeout_secs: 600,
        }
    }
}

impl RunConfig {
    /// Load a run configuration from a YAML file.
    pub fn load(path: &Path) -> CommonResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_yaml(&content)?;
        debug!(path = %path.display(), "Loaded run config");
        Ok(config)
    }

    /// Parse a run configuration; empty segment lists expand to all segments.
    pub fn from_yaml(content: &str) -> CommonResult<Self> {
        let mut config: RunConfig = serde_yaml::from_str(content)?;
        if config.segments.is_empty() {
            config.segments = Segment::all(config.product.segment_total);
        }
        Ok(config)
    }

    /// Reject configurations that cannot describe a run. Called before any
    /// work starts; these are the only fatal errors of a run.
    pub fn validate(&self) -> CommonResult<()> {
        let invalid = |msg: String| Err(CommonError::InvalidConfig(msg));

        if self.period.start > self.period.end {
            return invalid(format!(
                "start date {} is after end date {}",
                self.period.start, self.period.end
            ));
        }
        let cadence = self.period.cadence_minutes;
        if cadence == 0 || MINUTES_PER_DAY % cadence != 0 {
            return invalid(format!("cadence of {} minutes does not divide a day", cadence));
        }
        if let Some(window) = &self.period.window {
            if window.from > window.to {
                return invalid(format!(
                    "time window starts at {} after it ends at {}",
                    window.from, window.to
                ));
            }
        }

        if self.bands.is_empty() {
            return invalid("band set is empty".to_string());
        }
        let mut seen = HashSet::new();
        for band in &self.bands {
            if !seen.insert(band) {
                return invalid(format!("band {} listed twice", band));
            }
        }

        if self.segments.is_empty() {
            return invalid("segment set is empty".to_string());
        }
        let total = self.product.segment_total;
        if let Some(seg) = self.segments.iter().find(|s| s.number() > total) {
            return invalid(format!("segment {} exceeds segment total {}", seg, total));
        }

        let TargetConfig { latitude, longitude } = self.target;
        if !(-90.0..=90.0).contains(&latitude) {
            return invalid(format!("latitude {} out of range", latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return invalid(format!("longitude {} out of range", longitude));
        }

        if self.decoder.timeout_secs == 0 {
            return invalid("decoder timeout must be at least 1 second".to_string());
        }
        if self.remote.max_concurrent == 0 {
            return invalid("max_concurrent must be at least 1".to_string());
        }
        if self.local_offset().is_none() {
            return invalid(format!(
                "local offset of {} hours is not a valid UTC offset",
                self.output.local_offset_hours
            ));
        }

        Ok(())
    }

    /// Local reference offset; None if out of range.
    pub fn local_offset(&self) -> Option<FixedOffset> {
        self.output
            .local_offset_hours
            .checked_mul(3600)
            .and_then(FixedOffset::east_opt)
    }
}
