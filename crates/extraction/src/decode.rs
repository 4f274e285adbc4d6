//! Decode capability.
//!
//! Reading raw HSD segments and calibrating counts to brightness
//! temperature is delegated to an implementation of [`SceneDecoder`]. The
//! shipped [`CommandDecoder`] runs an external program and reads back what
//! it wrote into the group's workspace.
//!
//! # Decoder program protocol
//!
//! ```text
//! <program> [args..] --bands B14,B15 --output-dir <workspace> <file>...
//! ```
//!
//! The program writes one raw little-endian `f32` file per loaded band into
//! the output directory and prints a JSON manifest on stdout:
//!
//! ```json
//! {"bands": [{"band": "B14", "rows": 550, "cols": 5500,
//!             "data": "B14.f32", "area": { ... }}]}
//! ```
//!
//! Relative `data` paths are resolved against the output directory. A
//! requested band left out of the manifest, or whose data file is unusable,
//! was not loadable. The program is killed if it outlives its timeout or the
//! run is cancelled.

use std::collections::BTreeMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use himawari_common::{Band, DecoderConfig};
use projection::{GeosArea, PixelIndex};

/// Errors reported by a decoder.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("No requested band could be loaded")]
    NoBands,

    #[error("Failed to run decoder {program}: {message}")]
    Command { program: String, message: String },

    #[error("Decoder exited with {status}: {stderr}")]
    Exit { status: String, stderr: String },

    #[error("Malformed decoder manifest: {0}")]
    Manifest(String),

    #[error("Grid for {band} has {actual} values, expected {expected}")]
    Shape {
        band: Band,
        expected: usize,
        actual: usize,
    },

    #[error("Failed to read grid data {path}: {message}")]
    Data { path: PathBuf, message: String },

    #[error("Decoder killed after {0:?}")]
    Timeout(Duration),

    #[error("Decode cancelled")]
    Cancelled,
}

/// A 2-D array of calibrated values with its spatial reference.
#[derive(Debug, Clone, PartialEq)]
pub struct CalibratedGrid {
    pub band: Band,
    pub rows: usize,
    pub cols: usize,
    /// Row-major, row 0 northernmost
    pub values: Vec<f32>,
    pub area: GeosArea,
}

impl CalibratedGrid {
    pub fn new(
        band: Band,
        rows: usize,
        cols: usize,
        values: Vec<f32>,
        area: GeosArea,
    ) -> Result<Self, DecodeError> {
        let expected = rows.checked_mul(cols).ok_or_else(|| {
            DecodeError::Manifest(format!("{} grid of {} x {} is too large", band, rows, cols))
        })?;
        if values.len() != expected {
            return Err(DecodeError::Shape {
                band,
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            band,
            rows,
            cols,
            values,
            area,
        })
    }

    /// Value at `index`, or None outside the grid.
    pub fn value_at(&self, index: PixelIndex) -> Option<f32> {
        if !index.within(self.rows, self.cols) {
            return None;
        }
        self.values
            .get(index.row as usize * self.cols + index.col as usize)
            .copied()
    }
}

/// Grids decoded for one observation, keyed by band.
#[derive(Debug, Clone, Default)]
pub struct Scene {
    grids: BTreeMap<Band, CalibratedGrid>,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, grid: CalibratedGrid) {
        self.grids.insert(grid.band, grid);
    }

    pub fn get(&self, band: Band) -> Option<&CalibratedGrid> {
        self.grids.get(&band)
    }

    pub fn len(&self) -> usize {
        self.grids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grids.is_empty()
    }

    /// First of `bands`, in the given order, that has a grid.
    pub fn first_loaded(&self, bands: &[Band]) -> Option<&CalibratedGrid> {
        bands.iter().find_map(|b| self.grids.get(b))
    }
}

impl FromIterator<CalibratedGrid> for Scene {
    fn from_iter<I: IntoIterator<Item = CalibratedGrid>>(iter: I) -> Self {
        let mut scene = Scene::new();
        for grid in iter {
            scene.insert(grid);
        }
        scene
    }
}

/// Turns decompressed segment files into calibrated grids.
pub trait SceneDecoder: Send + Sync {
    /// Decode `files` for the requested `bands`. `workdir` is a scratch
    /// directory removed after the observation is processed. Bands that
    /// cannot be loaded are simply absent from the returned scene. A
    /// long-running decode should give up with [`DecodeError::Cancelled`]
    /// once `cancel` is set.
    fn decode(
        &self,
        files: &[PathBuf],
        bands: &[Band],
        workdir: &Path,
        cancel: &AtomicBool,
    ) -> Result<Scene, DecodeError>;
}

/// Default limit on one decoder run.
pub const DEFAULT_DECODE_TIMEOUT: Duration = Duration::from_secs(600);

/// How often a running decoder is checked for timeout and cancellation.
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Decoder backed by an external program.
#[derive(Debug, Clone)]
pub struct CommandDecoder {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
}

struct ProgramOutput {
    status: ExitStatus,
    stdout: Vec<u8>,
    stderr: Vec<u8>,
}

#[derive(Debug, Deserialize)]
struct Manifest {
    bands: Vec<ManifestBand>,
}

#[derive(Debug, Deserialize)]
struct ManifestBand {
    band: Band,
    rows: usize,
    cols: usize,
    data: PathBuf,
    area: GeosArea,
}

impl CommandDecoder {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            timeout: DEFAULT_DECODE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// None if no program is configured.
    pub fn from_config(config: &DecoderConfig) -> Option<Self> {
        config.program.as_ref().map(|program| {
            Self::new(program.clone(), config.args.clone())
                .with_timeout(Duration::from_secs(config.timeout_secs))
        })
    }

    fn command_error(&self, e: std::io::Error) -> DecodeError {
        DecodeError::Command {
            program: self.program.display().to_string(),
            message: e.to_string(),
        }
    }

    /// Run the program to completion, killing it on timeout or cancellation.
    fn run(&self, mut cmd: Command, cancel: &AtomicBool) -> Result<ProgramOutput, DecodeError> {
        if cancel.load(Ordering::Relaxed) {
            return Err(DecodeError::Cancelled);
        }
        let mut child = cmd
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| self.command_error(e))?;

        // Pipes are drained concurrently so a chatty program never blocks
        let stdout = child.stdout.take().map(drain);
        let stderr = child.stderr.take().map(drain);

        let deadline = Instant::now() + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {}
                Err(e) => {
                    kill(&mut child);
                    return Err(self.command_error(e));
                }
            }
            if cancel.load(Ordering::Relaxed) {
                kill(&mut child);
                return Err(DecodeError::Cancelled);
            }
            if Instant::now() >= deadline {
                kill(&mut child);
                warn!(timeout_secs = self.timeout.as_secs_f64(), "Decoder timed out, killed");
                return Err(DecodeError::Timeout(self.timeout));
            }
            thread::sleep(POLL_INTERVAL);
        };

        Ok(ProgramOutput {
            status,
            stdout: collect(stdout),
            stderr: collect(stderr),
        })
    }

    fn command(&self, files: &[PathBuf], bands: &[Band], workdir: &Path) -> Command {
        let band_list = bands
            .iter()
            .map(|b| b.to_string())
            .collect::<Vec<_>>()
            .join(",");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg("--bands")
            .arg(band_list)
            .arg("--output-dir")
            .arg(workdir)
            .args(files);
        cmd
    }

    fn read_band(&self, entry: ManifestBand, workdir: &Path) -> Result<CalibratedGrid, DecodeError> {
        let path = if entry.data.is_absolute() {
            entry.data
        } else {
            workdir.join(entry.data)
        };
        let bytes = fs::read(&path).map_err(|e| DecodeError::Data {
            path: path.clone(),
            message: e.to_string(),
        })?;
        if bytes.len() % 4 != 0 {
            return Err(DecodeError::Data {
                path,
                message: format!("{} bytes is not a whole number of f32 values", bytes.len()),
            });
        }
        let values = bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        CalibratedGrid::new(entry.band, entry.rows, entry.cols, values, entry.area)
    }
}

impl SceneDecoder for CommandDecoder {
    #[instrument(skip(self, files, workdir, cancel), fields(program = %self.program.display(), files = files.len()))]
    fn decode(
        &self,
        files: &[PathBuf],
        bands: &[Band],
        workdir: &Path,
        cancel: &AtomicBool,
    ) -> Result<Scene, DecodeError> {
        let output = self.run(self.command(files, bands, workdir), cancel)?;

        if !output.status.success() {
            return Err(DecodeError::Exit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let manifest: Manifest = serde_json::from_slice(&output.stdout)
            .map_err(|e| DecodeError::Manifest(e.to_string()))?;

        let mut scene = Scene::new();
        for entry in manifest.bands {
            if !bands.contains(&entry.band) {
                debug!(band = %entry.band, "Ignoring unrequested band");
                continue;
            }
            let band = entry.band;
            match self.read_band(entry, workdir) {
                Ok(grid) => scene.insert(grid),
                Err(e) => warn!(band = %band, error = %e, "Band not loaded"),
            }
        }
        debug!(loaded = scene.len(), "Decoded scene");
        Ok(scene)
    }
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        pipe.read_to_end(&mut buf).ok();
        buf
    })
}

fn collect(reader: Option<JoinHandle<Vec<u8>>>) -> Vec<u8> {
    reader.and_then(|r| r.join().ok()).unwrap_or_default()
}

/// Readers of a killed child's pipes are left detached; a grandchild may
/// still hold the pipes open.
fn kill(child: &mut Child) {
    child.kill().ok();
    child.wait().ok();
}
