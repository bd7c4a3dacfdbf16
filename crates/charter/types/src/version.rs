use std::fmt;

use serde::{Deserialize, Serialize};

/// A `(release, build)` pair identifying one published version of an
/// extension. Releases and builds both start at 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct VersionTag {
    pub release: u8,
    pub build: u16,
}

impl VersionTag {
    pub fn new(release: u8, build: u16) -> Self {
        Self { release, build }
    }

    /// Hash used to key versions in a repository.
    pub fn hash(&self) -> [u8; 32] {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&[self.release]);
        hasher.update(&self.build.to_be_bytes());
        *hasher.finalize().as_bytes()
    }
}

impl fmt::Display for VersionTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "v{}.{}", self.release, self.build)
    }
}
