//! Result table.
//!
//! One row per processed observation, kept in ascending time order, with
//! columns `timestamp_ph, timestamp_utc, latitude, longitude` followed by one
//! column per configured band.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use tracing::info;

use himawari_common::{time::TABLE_TIME_FORMAT, Band, ObservationTime};

use crate::error::{ExtractionError, ExtractionResult};

/// Fixed leading columns of the output table.
pub const LEADING_COLUMNS: [&str; 4] = ["timestamp_ph", "timestamp_utc", "latitude", "longitude"];

/// Values extracted for one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    pub time: ObservationTime,
    pub local: DateTime<FixedOffset>,
    pub latitude: f64,
    pub longitude: f64,
    /// Aligned with the table's band order; None is missing
    pub values: Vec<Option<f64>>,
}

impl ObservationRecord {
    pub fn new(
        time: ObservationTime,
        offset: FixedOffset,
        latitude: f64,
        longitude: f64,
        values: Vec<Option<f64>>,
    ) -> Self {
        Self {
            time,
            local: time.local(offset),
            latitude,
            longitude,
            values,
        }
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }
}

/// Ordered collection of records.
#[derive(Debug, Clone)]
pub struct ResultTable {
    bands: Vec<Band>,
    records: BTreeMap<ObservationTime, ObservationRecord>,
}

impl ResultTable {
    pub fn new(bands: Vec<Band>) -> Self {
        Self {
            bands,
            records: BTreeMap::new(),
        }
    }

    pub fn bands(&self) -> &[Band] {
        &self.bands
    }

    /// Add a record. A record for an instant already in the table is
    /// rejected and the existing one is kept.
    pub fn append(&mut self, record: ObservationRecord) -> ExtractionResult<()> {
        if record.values.len() != self.bands.len() {
            return Err(ExtractionError::RecordShape {
                time: record.time,
                expected: self.bands.len(),
                actual: record.values.len(),
            });
        }
        if self.records.contains_key(&record.time) {
            return Err(ExtractionError::DuplicateRecord(record.time));
        }
        self.records.insert(record.time, record);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, time: ObservationTime) -> Option<&ObservationRecord> {
        self.records.get(&time)
    }

    /// Records in ascending time order.
    pub fn records(&self) -> impl Iterator<Item = &ObservationRecord> {
        self.records.values()
    }

    pub fn header(&self) -> Vec<String> {
        LEADING_COLUMNS
            .iter()
            .map(|c| c.to_string())
            .chain(self.bands.iter().map(|b| b.to_string()))
            .collect()
    }

    /// Write the table as CSV, missing values as `null_marker`.
    pub fn write_csv<W: Write>(&self, writer: W, null_marker: &str) -> ExtractionResult<()> {
        let mut csv = csv::Writer::from_writer(writer);
        csv.write_record(self.header())?;

        for record in self.records() {
            let mut row = vec![
                record.local.format(TABLE_TIME_FORMAT).to_string(),
                record.time.utc().format(TABLE_TIME_FORMAT).to_string(),
                record.latitude.to_string(),
                record.longitude.to_string(),
            ];
            row.extend(record.values.iter().map(|v| match v {
                Some(value) => value.to_string(),
                None => null_marker.to_string(),
            }));
            csv.write_record(&row)?;
        }

        csv.flush()?;
        Ok(())
    }

    /// Write the table to `path` through a partial file, so a crash never
    /// leaves a truncated table under the final name.
    pub fn write_to_path(&self, path: &Path, null_marker: &str) -> ExtractionResult<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut partial = path.as_os_str().to_owned();
        partial.push(".partial");

        let file = File::create(&partial)?;
        if let Err(e) = self.write_csv(&file, null_marker).and_then(|_| Ok(file.sync_all()?)) {
            fs::remove_file(&partial).ok();
            return Err(e);
        }
        fs::rename(&partial, path)?;

        info!(path = %path.display(), rows = self.len(), "Wrote result table");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn band(n: u8) -> Band {
        Band::new(n).unwrap()
    }

    fn at(key: &str) -> ObservationTime {
        ObservationTime::parse_group_key(key).unwrap()
    }

    fn ph() -> FixedOffset {
        FixedOffset::east_opt(8 * 3600).unwrap()
    }

    fn record(key: &str, values: Vec<Option<f64>>) -> ObservationRecord {
        ObservationRecord::new(at(key), ph(), 14.77083, 120.45537, values)
    }

    #[test]
    fn test_records_are_ordered() {
        let mut table = ResultTable::new(vec![band(14)]);
        table.append(record("20250301_1010", vec![Some(1.0)])).unwrap();
        table.append(record("20250301_1000", vec![Some(2.0)])).unwrap();

        let keys: Vec<String> = table.records().map(|r| r.time.group_key()).collect();
        assert_eq!(keys, vec!["20250301_1000", "20250301_1010"]);
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut table = ResultTable::new(vec![band(14)]);
        table.append(record("20250301_1000", vec![Some(1.0)])).unwrap();
        let err = table.append(record("20250301_1000", vec![Some(9.0)])).unwrap_err();
        assert!(matches!(err, ExtractionError::DuplicateRecord(_)));
        assert_eq!(table.get(at("20250301_1000")).unwrap().values, vec![Some(1.0)]);
    }

    #[test]
    fn test_shape_rejected() {
        let mut table = ResultTable::new(vec![band(14), band(15)]);
        let err = table.append(record("20250301_1000", vec![Some(1.0)])).unwrap_err();
        assert!(matches!(err, ExtractionError::RecordShape { expected: 2, actual: 1, .. }));
    }

    #[test]
    fn test_csv_layout() {
        let mut table = ResultTable::new(vec![band(14), band(15)]);
        table
            .append(record("20250301_2350", vec![Some(26.85), None]))
            .unwrap();

        let mut out = Vec::new();
        table.write_csv(&mut out, "").unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines[0],
            "timestamp_ph,timestamp_utc,latitude,longitude,B14,B15"
        );
        // Local time crosses midnight
        assert_eq!(
            lines[1],
            "2025-03-02 07:50:00,2025-03-01 23:50:00,14.77083,120.45537,26.85,"
        );
    }

    #[test]
    fn test_null_marker() {
        let mut table = ResultTable::new(vec![band(14)]);
        table.append(record("20250301_1000", vec![None])).unwrap();
        let mut out = Vec::new();
        table.write_csv(&mut out, "NaN").unwrap();
        assert!(String::from_utf8(out).unwrap().trim_end().ends_with(",NaN"));
    }

    #[test]
    fn test_write_to_path_is_atomic() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("series.csv");
        let mut table = ResultTable::new(vec![band(14)]);
        table.append(record("20250301_1000", vec![Some(1.5)])).unwrap();

        table.write_to_path(&path, "").unwrap();
        assert!(path.is_file());
        assert!(!dir.path().join("out").join("series.csv.partial").exists());
        assert_eq!(std::fs::read_to_string(&path).unwrap().lines().count(), 2);
    }
}
