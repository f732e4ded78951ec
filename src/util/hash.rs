//! sha256 fingerprints for cache keys and generated build graphs.

use std::fs::File;
use std::io;
use std::path::Path;

use anyhow::{Context, Result};
use sha2::{Digest, Sha256};

/// Length of the short form used in file names.
const SHORT_LEN: usize = 16;

/// Hex sha256 of a file's content.
pub fn sha256_file(path: &Path) -> Result<String> {
    let mut file = File::open(path)
        .with_context(|| format!("failed to open {} for hashing", path.display()))?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)
        .with_context(|| format!("failed to hash {}", path.display()))?;
    Ok(hex::encode(hasher.finalize()))
}

/// Incremental fingerprint over string components.
///
/// Each component is length-prefixed and each list carries its item
/// count, so `["a", "b"], ["c"]` and `["a"], ["b", "c"]` never collide.
#[derive(Default)]
pub struct Fingerprint {
    hasher: Sha256,
}

impl Fingerprint {
    pub fn new() -> Self {
        Fingerprint::default()
    }

    pub fn update_str(&mut self, s: &str) -> &mut Self {
        self.hasher.update((s.len() as u64).to_le_bytes());
        self.hasher.update(s.as_bytes());
        self
    }

    pub fn update_strs<I, S>(&mut self, items: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut count = 0u64;
        for item in items {
            self.update_str(item.as_ref());
            count += 1;
        }
        self.hasher.update(count.to_le_bytes());
        self
    }

    /// Full hex digest.
    pub fn finish(self) -> String {
        hex::encode(self.hasher.finalize())
    }

    /// Truncated hex digest for file names.
    pub fn finish_short(self) -> String {
        let mut digest = self.finish();
        digest.truncate(SHORT_LEN);
        digest
    }
}
