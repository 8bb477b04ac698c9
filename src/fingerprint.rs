//! Content fingerprinting for registered files.

use std::fs;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Computes the SHA-256 fingerprint of a regular file's contents,
/// rendered as lowercase hex.
pub fn fingerprint(path: &Path) -> Result<String> {
    let mut file = fs::File::open(path)
        .with_context(|| format!("could not open '{}' for fingerprinting", path.display()))?;

    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("could not read '{}'", path.display()))?;

    let hash = hasher.finalize();
    Ok(format!("{hash:x}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn known_content_has_known_digest() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"hello world").unwrap();

        let digest = fingerprint(file.path()).unwrap();
        assert_eq!(
            digest,
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn identical_content_identical_fingerprint() {
        let mut a = NamedTempFile::new().unwrap();
        let mut b = NamedTempFile::new().unwrap();
        a.write_all(b"same bytes").unwrap();
        b.write_all(b"same bytes").unwrap();

        assert_eq!(
            fingerprint(a.path()).unwrap(),
            fingerprint(b.path()).unwrap()
        );
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(fingerprint(Path::new("/no/such/file")).is_err());
    }
}
