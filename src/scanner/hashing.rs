//! Content addresses for gallery nodes and derivative files.
//!
//! Addresses are 64-bit digests rendered as 16 lowercase hex characters.
//! They are stable across runs and platforms, which is what makes them
//! usable both as cache keys and as public file names.

use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

use crate::error::{Error, Result};
use crate::model::Tier;

/// Hash arbitrary bytes down to 64 bits.
///
/// Uses the leading 8 bytes of SHA-256 so that the value never depends on
/// the toolchain or process (unlike `std`'s `DefaultHasher`).
pub fn hash(bytes: &[u8]) -> u64 {
    let digest = Sha256::digest(bytes);
    let mut head = [0u8; 8];
    head.copy_from_slice(&digest[..8]);
    u64::from_be_bytes(head)
}

/// Fixed-width, zero-padded lowercase hex.
pub fn hex_encode(hash: u64) -> String {
    format!("{:016x}", hash)
}

pub fn content_address(path: &str) -> String {
    hex_encode(hash(path.as_bytes()))
}

pub fn derivative_address(path: &str, salt: &str) -> String {
    let mut keyed = String::with_capacity(path.len() + salt.len());
    keyed.push_str(path);
    keyed.push_str(salt);
    hex_encode(hash(keyed.as_bytes()))
}

/// Return the salt stored at `path`, creating it on first use.
///
/// Only the first line counts and surrounding whitespace is ignored. An
/// empty or missing file gets a fresh random salt written to it.
pub fn load_or_create_salt(path: &Path) -> Result<String> {
    if path.is_file() {
        let content = fs::read_to_string(path).map_err(|source| Error::Salt {
            path: path.to_path_buf(),
            source,
        })?;
        let salt = content.lines().next().unwrap_or("").trim();
        if !salt.is_empty() {
            return Ok(salt.to_string());
        }
    }

    let salt = uuid::Uuid::new_v4().simple().to_string().to_uppercase();
    fs::write(path, &salt).map_err(|source| Error::Salt {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!("Generated new salt at {}", path.display());
    Ok(salt)
}

/// One salt per derivative tier, loaded once before any worker starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Salts {
    pub small: String,
    pub medium: String,
    pub large: String,
}

impl Salts {
    pub fn load_or_create(dir: &Path) -> Result<Self> {
        Ok(Self {
            small: load_or_create_salt(&dir.join(Self::file_name(Tier::Small)))?,
            medium: load_or_create_salt(&dir.join(Self::file_name(Tier::Medium)))?,
            large: load_or_create_salt(&dir.join(Self::file_name(Tier::Large)))?,
        })
    }

    pub fn file_name(tier: Tier) -> String {
        format!("salt_{}.txt", tier.name())
    }

    pub fn get(&self, tier: Tier) -> &str {
        match tier {
            Tier::Small => &self.small,
            Tier::Medium => &self.medium,
            Tier::Large => &self.large,
        }
    }
}
