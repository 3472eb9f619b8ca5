//! Input image discovery and content hashing.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Extensions accepted when scanning a directory.
pub const SUPPORTED_FORMATS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "tif", "tiff", "webp"];

/// Finds image files under a path.
#[derive(Debug, Clone)]
pub struct ImageDiscovery {
    formats: Vec<String>,
}

impl Default for ImageDiscovery {
    fn default() -> Self {
        Self::new(SUPPORTED_FORMATS.iter().map(|f| f.to_string()).collect())
    }
}

impl ImageDiscovery {
    pub fn new(formats: Vec<String>) -> Self {
        Self {
            formats: formats.into_iter().map(|f| f.to_lowercase()).collect(),
        }
    }

    /// A single supported file, or every supported file below a directory,
    /// sorted by path.
    pub fn discover(&self, path: &Path) -> Vec<PathBuf> {
        if path.is_file() {
            return if self.is_supported(path) {
                vec![path.to_path_buf()]
            } else {
                Vec::new()
            };
        }

        let mut files: Vec<PathBuf> = WalkDir::new(path)
            .follow_links(true)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file() && self.is_supported(entry.path()))
            .map(|entry| entry.into_path())
            .collect();
        files.sort();
        files
    }

    fn is_supported(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| self.formats.iter().any(|f| f.eq_ignore_ascii_case(ext)))
    }
}

/// BLAKE3 hash of a file's contents, hex encoded.
pub fn content_hash(path: &Path) -> std::io::Result<String> {
    let mut hasher = blake3::Hasher::new();
    hasher.update_reader(BufReader::new(File::open(path)?))?;
    Ok(hasher.finalize().to_hex().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_supported_extensions() {
        let discovery = ImageDiscovery::default();
        assert!(discovery.is_supported(Path::new("digit.png")));
        assert!(discovery.is_supported(Path::new("digit.JPG")));
        assert!(!discovery.is_supported(Path::new("digit.csv")));
        assert!(!discovery.is_supported(Path::new("README")));
    }

    #[test]
    fn test_discover_sorted_and_recursive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("nested")).unwrap();
        for name in ["b.png", "a.jpg", "nested/c.png", "labels.csv"] {
            std::fs::write(dir.path().join(name), b"x").unwrap();
        }

        let found = ImageDiscovery::default().discover(dir.path());
        let names: Vec<_> = found
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(
            names,
            vec![
                PathBuf::from("a.jpg"),
                PathBuf::from("b.png"),
                PathBuf::from("nested/c.png")
            ]
        );
    }

    #[test]
    fn test_discover_single_file() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("one.png");
        std::fs::write(&file, b"x").unwrap();
        assert_eq!(ImageDiscovery::default().discover(&file), vec![file]);
        let other = dir.path().join("notes.txt");
        std::fs::write(&other, b"x").unwrap();
        assert!(ImageDiscovery::default().discover(&other).is_empty());
    }

    #[test]
    fn test_content_hash_is_stable() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();
        let hash = content_hash(&a).unwrap();
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, content_hash(&b).unwrap());
        assert_eq!(hash, blake3::hash(b"same bytes").to_hex().to_string());
    }
}
