//! Scoped decompression workspace.
//!
//! A [`Workspace`] owns one directory under the work root, named after the
//! observation it serves. Dropping the workspace removes the directory and
//! everything in it, whichever way processing of the group ended. A failed
//! removal is logged; the next group uses a different directory.

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use bzip2::read::BzDecoder;
use flate2::read::GzDecoder;
use tracing::{debug, warn};

use crate::error::{ExtractionError, ExtractionResult};

const PARTIAL_SUFFIX: &str = ".partial";

/// Compression of an artifact, detected from its filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    Bzip2,
    Gzip,
    None,
}

impl Compression {
    pub fn detect(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("bz2") => Compression::Bzip2,
            Some("gz") => Compression::Gzip,
            _ => Compression::None,
        }
    }

    /// Filename of the decompressed member.
    pub fn output_name<'a>(&self, filename: &'a str) -> &'a str {
        let suffix = match self {
            Compression::Bzip2 => ".bz2",
            Compression::Gzip => ".gz",
            Compression::None => return filename,
        };
        filename.strip_suffix(suffix).unwrap_or(filename)
    }

    fn reader(&self, input: File) -> Box<dyn Read> {
        let input = BufReader::new(input);
        match self {
            Compression::Bzip2 => Box::new(BzDecoder::new(input)),
            Compression::Gzip => Box::new(GzDecoder::new(input)),
            Compression::None => Box::new(input),
        }
    }
}

/// Ephemeral directory of decompressed files for one observation.
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl Workspace {
    /// Create (or reuse a stale) `work_root/<name>` directory.
    pub fn create(work_root: &Path, name: &str) -> ExtractionResult<Self> {
        let dir = work_root.join(name);
        if dir.exists() {
            debug!(dir = %dir.display(), "Reusing stale workspace");
        }
        fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            files: Vec::new(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Decompressed files, in the order they were added.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    /// Decompress one artifact into the workspace. An identically named
    /// decompressed file already present is reused as is.
    pub fn add(&mut self, source: &Path) -> ExtractionResult<PathBuf> {
        let compression = Compression::detect(source);
        let filename = source
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| ExtractionError::Decompression {
                path: source.to_path_buf(),
                message: "invalid filename".to_string(),
            })?;
        let target = self.dir.join(compression.output_name(filename));

        if target.is_file() {
            debug!(file = %target.display(), "Already decompressed, skipping");
        } else {
            decompress_to(source, &target, compression)?;
            debug!(file = %target.display(), ?compression, "Decompressed");
        }

        self.files.push(target.clone());
        Ok(target)
    }

    /// Decompress every source, checking `cancel` before each one.
    ///
    /// A source that fails to decompress is logged and left out; the
    /// decoder then sees the observation as having less coverage.
    pub fn populate<'a, I>(&mut self, sources: I, cancel: &AtomicBool) -> ExtractionResult<usize>
    where
        I: IntoIterator<Item = &'a Path>,
    {
        let mut skipped = 0;
        for source in sources {
            if cancel.load(Ordering::Relaxed) {
                return Err(ExtractionError::Cancelled);
            }
            match self.add(source) {
                Ok(_) => {}
                Err(e @ ExtractionError::Decompression { .. }) => {
                    warn!(error = %e, "Skipping unreadable artifact");
                    skipped += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(skipped)
    }

    /// Remove the directory now, reporting failure to the caller.
    pub fn close(mut self) -> io::Result<()> {
        let dir = std::mem::take(&mut self.dir);
        remove_dir(&dir)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        if self.dir.as_os_str().is_empty() {
            return;
        }
        if let Err(e) = remove_dir(&self.dir) {
            warn!(dir = %self.dir.display(), error = %e, "Failed to remove workspace");
        }
    }
}

fn remove_dir(dir: &Path) -> io::Result<()> {
    match fs::remove_dir_all(dir) {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

/// Stream-decompress `source` into `target` through a partial file.
fn decompress_to(source: &Path, target: &Path, compression: Compression) -> ExtractionResult<()> {
    let fail = |e: io::Error| ExtractionError::Decompression {
        path: source.to_path_buf(),
        message: e.to_string(),
    };

    let mut partial = target.as_os_str().to_owned();
    partial.push(PARTIAL_SUFFIX);
    let partial = PathBuf::from(partial);

    let input = File::open(source).map_err(fail)?;
    let mut reader = compression.reader(input);
    let copied = File::create(&partial).and_then(|out| {
        let mut writer = BufWriter::new(out);
        io::copy(&mut reader, &mut writer)?;
        writer.flush()
    });

    if let Err(e) = copied {
        fs::remove_file(&partial).ok();
        return Err(fail(e));
    }
    fs::rename(&partial, target)?;
    Ok(())
}
