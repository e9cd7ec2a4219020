//! Integrity fingerprints for research runs
//!
//! A run's evidence is hashed so two runs over identical upstream data can be
//! recognized as such.

use crate::models::ResearchBundle;
use sha2::{Digest, Sha256};
use std::io::Write;

/// Compute SHA256 hash of a research bundle
/// Uses zero-copy streaming serialization into hasher
pub fn compute_bundle_hash(bundle: &ResearchBundle) -> String {
    let mut hasher = Sha256::new();

    if serde_json::to_writer(&mut HashWriter(&mut hasher), bundle).is_err() {
        return String::new();
    }

    hex::encode(hasher.finalize())
}

/// Check a bundle against a previously recorded fingerprint
pub fn verify_bundle_hash(bundle: &ResearchBundle, expected: &str) -> bool {
    !expected.is_empty() && compute_bundle_hash(bundle) == expected
}

/// Adapter to allow writing into Sha256 via std::io::Write
struct HashWriter<'a, H: Digest>(&'a mut H);

impl<'a, H: Digest> Write for HashWriter<'a, H> {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.update(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}
