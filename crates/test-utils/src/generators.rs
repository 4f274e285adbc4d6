//! Generators for synthetic segment artifacts and grids.
//!
//! A synthetic segment artifact decompresses to the ASCII text of a single
//! brightness temperature, e.g. `300.15`. Synthetic decoders read that value
//! back and fill a whole segment with it, so tests can tell exactly which
//! files reached the decoder.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;

use himawari_common::{ObjectKey, ProductSpec};

/// bzip2-compress a buffer.
pub fn compress_bz2(data: &[u8]) -> Vec<u8> {
    let mut encoder = BzEncoder::new(Vec::new(), bzip2::Compression::fast());
    encoder.write_all(data).expect("in-memory write");
    encoder.finish().expect("in-memory bzip2")
}

/// gzip-compress a buffer.
pub fn compress_gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), flate2::Compression::fast());
    encoder.write_all(data).expect("in-memory write");
    encoder.finish().expect("in-memory gzip")
}

/// Decompressed content of a synthetic segment holding `value`.
pub fn segment_payload(value: f32) -> Vec<u8> {
    format!("{}", value).into_bytes()
}

/// Compressed synthetic segment holding `value`.
pub fn segment_artifact(value: f32) -> Vec<u8> {
    compress_bz2(&segment_payload(value))
}

/// Write a synthetic artifact for `key` into `dir`, named as the archive
/// names it. Returns the written path.
pub fn write_segment_artifact(
    dir: &Path,
    product: &ProductSpec,
    key: ObjectKey,
    value: f32,
) -> PathBuf {
    let path = dir.join(key.filename(product));
    fs::write(&path, segment_artifact(value)).expect("write synthetic artifact");
    path
}

/// Row-major grid where the cell at (row, col) holds `col * 1000 + row`,
/// so a value read back identifies the pixel it came from.
pub fn create_test_grid(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for row in 0..height {
        for col in 0..width {
            data.push((col * 1000 + row) as f32);
        }
    }
    data
}

/// Little-endian f32 bytes, the raw grid format of decoder output files.
pub fn f32_le_bytes(values: &[f32]) -> Vec<u8> {
    values.iter().flat_map(|v| v.to_le_bytes()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn test_grid_values_encode_position() {
        let grid = create_test_grid(100, 10);
        assert_eq!(grid.len(), 1000);
        // row 5, col 30
        assert_eq!(grid[5 * 100 + 30], 30_005.0);
        assert_eq!(grid[99], 99_000.0);
    }

    #[test]
    fn test_segment_artifact_decompresses_to_value() {
        let mut text = String::new();
        bzip2::read::BzDecoder::new(&segment_artifact(300.15)[..])
            .read_to_string(&mut text)
            .unwrap();
        assert_eq!(text.parse::<f32>().unwrap(), 300.15);
    }

    #[test]
    fn test_gzip_roundtrip() {
        let mut out = Vec::new();
        flate2::read::GzDecoder::new(&compress_gzip(b"abc")[..])
            .read_to_end(&mut out)
            .unwrap();
        assert_eq!(out, b"abc");
    }

    #[test]
    fn test_f32_le_bytes() {
        let bytes = f32_le_bytes(&[1.0, -2.5]);
        assert_eq!(bytes.len(), 8);
        assert_eq!(f32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]), -2.5);
    }
}
