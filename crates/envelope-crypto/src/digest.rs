//! MD5 digests and random seeds.
//!
//! MD5 here is a fingerprint for key derivation and payload signing only.
//! Nothing relies on its collision resistance.

use md5::{Digest, Md5};

use crate::error::CryptoError;
use crate::types::EPHEMERAL_SEED_LENGTH;

/// Lowercase hex MD5 of `message`.
pub fn md5_hex(message: &[u8]) -> String {
    hex::encode(Md5::digest(message))
}

/// Fill a fixed-size buffer from the OS RNG.
pub fn random_block<const N: usize>() -> Result<[u8; N], CryptoError> {
    let mut block = [0u8; N];
    getrandom::getrandom(&mut block).map_err(|e| CryptoError::RngFailed(e.to_string()))?;
    Ok(block)
}

/// Generate a fresh ephemeral symmetric key: MD5 hex of one random block.
///
/// The result is 32 ASCII hex characters, i.e. a 256-bit AES key whose first
/// 16 characters double as the CBC IV.
pub fn generate_ephemeral_key() -> Result<String, CryptoError> {
    let seed = random_block::<EPHEMERAL_SEED_LENGTH>()?;
    Ok(md5_hex(&seed))
}
