//! Content-addressed dedup markers
//!
//! One empty-ish marker file per distinct payload digest, named by a
//! second hash of the digest itself. Presence of a non-empty marker
//! means the payload has already been fully ingested. Markers are
//! append-only: created once, read on every fetch, never removed.

use sha2::{Digest, Sha256};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Hex-encoded SHA-256 fingerprint of a raw byte payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDigest(String);

impl ContentDigest {
    /// Compute the digest of a payload
    pub fn of(payload: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(payload);
        ContentDigest(hex::encode(hasher.finalize()))
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Durable dedup cache backed by marker files
#[derive(Debug, Clone)]
pub struct ContentStore {
    dir: PathBuf,
}

impl ContentStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Marker path for a digest: the file name is a hash of the digest
    /// hex, so marker names never encode payload content directly.
    fn marker_path(&self, digest: &ContentDigest) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(digest.as_hex().as_bytes());
        self.dir.join(hex::encode(hasher.finalize()))
    }

    /// Has this exact payload been ingested before?
    ///
    /// A zero-byte marker counts as absent: an interrupted previous run
    /// may have left one behind, and misreading it as "already
    /// ingested" would drop data forever.
    pub fn has(&self, digest: &ContentDigest) -> bool {
        let path = self.marker_path(digest);
        match fs::metadata(&path) {
            Ok(meta) => meta.is_file() && meta.len() > 0,
            Err(_) => false,
        }
    }

    /// Record a digest as ingested. Idempotent.
    ///
    /// The marker is staged under a temporary name and renamed into
    /// place, so a crash mid-write never leaves a partially written
    /// marker at the final path.
    pub fn record(&self, digest: &ContentDigest) -> io::Result<()> {
        if self.has(digest) {
            return Ok(());
        }

        fs::create_dir_all(&self.dir)?;

        let path = self.marker_path(digest);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, digest.as_hex())?;
        fs::rename(&tmp, &path)?;

        log::debug!("Recorded dedup marker {}", path.display());
        Ok(())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_digest_is_stable_and_byte_sensitive() {
        let a = ContentDigest::of(b"date,cases\n2021-01-01,5\n");
        let b = ContentDigest::of(b"date,cases\n2021-01-01,5\n");
        let c = ContentDigest::of(b"date,cases\n2021-01-01,6\n");

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.as_hex().len(), 64);
    }

    #[test]
    fn test_has_false_then_true_after_record() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let digest = ContentDigest::of(b"payload");

        assert!(!store.has(&digest));
        store.record(&digest).unwrap();
        assert!(store.has(&digest));

        // Idempotent: recording again is a no-op, not an error
        store.record(&digest).unwrap();
        store.record(&digest).unwrap();
        assert!(store.has(&digest));
    }

    #[test]
    fn test_zero_byte_marker_counts_as_absent() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        let digest = ContentDigest::of(b"payload");

        // Simulate a corrupt marker left by an interrupted run
        fs::create_dir_all(dir.path()).unwrap();
        let path = store.marker_path(&digest);
        fs::write(&path, b"").unwrap();

        assert!(!store.has(&digest));

        // record() must repair it
        store.record(&digest).unwrap();
        assert!(store.has(&digest));
    }

    #[test]
    fn test_distinct_digests_get_distinct_markers() {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());

        let a = ContentDigest::of(b"first payload");
        let b = ContentDigest::of(b"second payload");

        store.record(&a).unwrap();
        assert!(store.has(&a));
        assert!(!store.has(&b));
    }
}
