use serde::Serialize;
use sha2::{Digest, Sha256};
use sweep_core::SweepError;

use crate::serde::to_canonical_json_bytes;

/// Computes a stable SHA256 hash for the provided serializable value.
pub fn stable_hash_string<T: Serialize>(value: &T) -> Result<String, SweepError> {
    let bytes = to_canonical_json_bytes(value)?;
    Ok(format!("{:x}", Sha256::digest(&bytes)))
}
