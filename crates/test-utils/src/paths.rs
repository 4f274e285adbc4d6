//! Scratch directories for tests.

use std::path::Path;

/// A temporary directory, removed when the returned `TempDir` is dropped.
pub fn temp_test_dir() -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix("himawari_test_")
        .tempdir()
        .expect("Failed to create temporary test directory")
}

/// Count the entries of a directory; 0 if it does not exist.
pub fn count_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temp_test_dir_starts_empty() {
        let dir = temp_test_dir();
        assert!(dir.path().is_dir());
        assert_eq!(count_entries(dir.path()), 0);
    }

    #[test]
    fn test_count_entries() {
        let dir = temp_test_dir();
        std::fs::write(dir.path().join("a"), b"1").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        assert_eq!(count_entries(dir.path()), 2);
        assert_eq!(count_entries(&dir.path().join("missing")), 0);
    }
}
