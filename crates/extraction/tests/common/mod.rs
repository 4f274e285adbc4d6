//! Decoders used by the integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use extraction::{CalibratedGrid, DecodeError, ExtractionOptions, Scene, SceneDecoder};
use himawari_common::{parse_artifact_name, Band, DecodeFailurePolicy};
use test_utils::{disk, points, test_disk};

/// Decodes synthetic segments written by `test_utils::write_segment_artifact`.
///
/// Each decompressed segment holds one value as text; the decoder fills the
/// segment's rows with it. A band spanning non-adjacent segments gets NaN
/// rows in the gap, like padding in a real scene. Calls are recorded so
/// tests can inspect what the decoder saw.
#[derive(Default)]
pub struct SyntheticDecoder {
    pub calls: Mutex<Vec<DecodeCall>>,
}

#[derive(Debug, Clone)]
pub struct DecodeCall {
    pub files: Vec<PathBuf>,
    pub workdir: PathBuf,
    /// Whether every file existed while the decoder ran
    pub files_present: bool,
}

impl SyntheticDecoder {
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn last_call(&self) -> Option<DecodeCall> {
        self.calls.lock().unwrap().last().cloned()
    }
}

impl SceneDecoder for SyntheticDecoder {
    fn decode(
        &self,
        files: &[PathBuf],
        bands: &[Band],
        workdir: &Path,
        _cancel: &AtomicBool,
    ) -> Result<Scene, DecodeError> {
        self.calls.lock().unwrap().push(DecodeCall {
            files: files.to_vec(),
            workdir: workdir.to_path_buf(),
            files_present: files.iter().all(|f| f.is_file()),
        });

        // band -> segment -> value
        let mut segments: BTreeMap<Band, BTreeMap<u8, f32>> = BTreeMap::new();
        for file in files {
            let name = match file.file_name().and_then(|n| n.to_str()).and_then(parse_artifact_name) {
                Some(name) => name,
                None => continue,
            };
            if !bands.contains(&name.band) {
                continue;
            }
            let text = fs::read_to_string(file).map_err(|e| DecodeError::Data {
                path: file.clone(),
                message: e.to_string(),
            })?;
            let value: f32 = text.trim().parse().map_err(|_| DecodeError::Data {
                path: file.clone(),
                message: format!("not a value: {:?}", text),
            })?;
            segments
                .entry(name.band)
                .or_default()
                .insert(name.segment.number(), value);
        }

        let disk_area = test_disk();
        let mut scene = Scene::new();
        for (band, values) in segments {
            let first = *values.keys().next().unwrap();
            let last = *values.keys().next_back().unwrap();
            let area = disk_area
                .segment_rows(first, last, disk::SEGMENT_TOTAL)
                .unwrap();

            let mut data = Vec::with_capacity(area.width * area.height);
            for segment in first..=last {
                let v = values.get(&segment).copied().unwrap_or(f32::NAN);
                data.extend(std::iter::repeat(v).take(area.width * disk::ROWS_PER_SEGMENT));
            }
            scene.insert(CalibratedGrid::new(band, area.height, area.width, data, area)?);
        }

        if scene.is_empty() {
            return Err(DecodeError::NoBands);
        }
        Ok(scene)
    }
}

/// Always fails, after checking it was handed a live workspace.
#[derive(Default)]
pub struct FailingDecoder {
    pub workdirs: Mutex<Vec<PathBuf>>,
}

impl SceneDecoder for FailingDecoder {
    fn decode(
        &self,
        _: &[PathBuf],
        _: &[Band],
        workdir: &Path,
        _: &AtomicBool,
    ) -> Result<Scene, DecodeError> {
        assert!(workdir.is_dir());
        self.workdirs.lock().unwrap().push(workdir.to_path_buf());
        Err(DecodeError::Exit {
            status: "exit status: 1".to_string(),
            stderr: "corrupt header".to_string(),
        })
    }
}

/// Behaves like a decoder program killed by the same Ctrl-C that cancels
/// the run: the run is flagged and the program exits with an error.
#[derive(Default)]
pub struct InterruptedDecoder;

impl SceneDecoder for InterruptedDecoder {
    fn decode(
        &self,
        _: &[PathBuf],
        _: &[Band],
        _: &Path,
        cancel: &AtomicBool,
    ) -> Result<Scene, DecodeError> {
        cancel.store(true, Ordering::Relaxed);
        Err(DecodeError::Exit {
            status: "signal: 2 (SIGINT)".to_string(),
            stderr: String::new(),
        })
    }
}

pub fn band(n: u8) -> Band {
    Band::new(n).unwrap()
}

/// Bataan, B14 then B15, Kelvin, PH time.
pub fn options(work_root: &Path) -> ExtractionOptions {
    ExtractionOptions {
        bands: vec![band(14), band(15)],
        latitude: points::BATAAN.0,
        longitude: points::BATAAN.1,
        celsius: false,
        local_offset: chrono::FixedOffset::east_opt(8 * 3600).unwrap(),
        decode_failure: DecodeFailurePolicy::Skip,
        work_root: work_root.to_path_buf(),
        range: None,
    }
}
