//! RSA PKCS#1 v1.5 key wrapping and PEM key handling.
//!
//! Public keys arrive as PKCS#1 (`RSA PUBLIC KEY`) or PKCS#8 (`PUBLIC KEY`)
//! PEM and are normalized once into an [`RsaPublicKey`]. Private keys are
//! PKCS#1 (`RSA PRIVATE KEY`) PEM.

use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey, EncodeRsaPrivateKey};
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey, LineEnding};
use rsa::rand_core::OsRng;
use rsa::{Pkcs1v15Encrypt, RsaPrivateKey, RsaPublicKey};
use zeroize::Zeroizing;

use crate::base64::{base64_decode, base64_encode};
use crate::error::CryptoError;
use crate::types::PKCS1_PUBLIC_KEY_PREFIX;

/// Freshly generated key pair in the formats peers exchange.
pub struct KeyPair {
    /// PKCS#8 `PUBLIC KEY` PEM.
    pub public_pem: String,
    /// PKCS#1 `RSA PRIVATE KEY` PEM.
    pub private_pem: Zeroizing<String>,
}

/// Parse a PKCS#1 or PKCS#8 PEM public key.
///
/// The `RSA PUBLIC KEY` boundary selects PKCS#1; anything else is tried as
/// PKCS#8.
pub fn parse_public_key(pem: &str) -> Result<RsaPublicKey, CryptoError> {
    let pem = pem.trim();
    if pem.starts_with(PKCS1_PUBLIC_KEY_PREFIX) {
        RsaPublicKey::from_pkcs1_pem(pem)
            .map_err(|e| CryptoError::KeyFormat(format!("PKCS#1 public key: {}", e)))
    } else {
        RsaPublicKey::from_public_key_pem(pem)
            .map_err(|e| CryptoError::KeyFormat(format!("PKCS#8 public key: {}", e)))
    }
}

/// Parse a PKCS#1 PEM private key.
pub fn parse_private_key(pem: &str) -> Result<RsaPrivateKey, CryptoError> {
    RsaPrivateKey::from_pkcs1_pem(pem.trim())
        .map_err(|e| CryptoError::KeyFormat(format!("PKCS#1 private key: {}", e)))
}

/// Encrypt `plaintext` with PKCS#1 v1.5 padding, returning base64 ciphertext.
///
/// The plaintext must fit in the modulus minus 11 bytes of padding.
pub fn rsa_encrypt(public_key: &RsaPublicKey, plaintext: &str) -> Result<String, CryptoError> {
    let ciphertext = public_key
        .encrypt(&mut OsRng, Pkcs1v15Encrypt, plaintext.as_bytes())
        .map_err(|e| CryptoError::EncryptionFailed(format!("RSA: {}", e)))?;
    Ok(base64_encode(&ciphertext))
}

/// Decrypt base64 PKCS#1 v1.5 `ciphertext` and decode it as UTF-8.
pub fn rsa_decrypt(private_key: &RsaPrivateKey, ciphertext: &str) -> Result<String, CryptoError> {
    let data = base64_decode(ciphertext)?;
    let plaintext = private_key
        .decrypt(Pkcs1v15Encrypt, &data)
        .map_err(|e| CryptoError::DecryptionFailed(format!("RSA: {}", e)))?;
    String::from_utf8(plaintext)
        .map_err(|_| CryptoError::DecryptionFailed("RSA plaintext is not UTF-8".to_string()))
}

/// Generate an RSA key pair with a `bits`-long modulus.
pub fn generate_key_pair(bits: usize) -> Result<KeyPair, CryptoError> {
    let private_key = RsaPrivateKey::new(&mut OsRng, bits)
        .map_err(|e| CryptoError::KeyGeneration(e.to_string()))?;
    let public_pem = RsaPublicKey::from(&private_key)
        .to_public_key_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGeneration(format!("public key PEM: {}", e)))?;
    let private_pem = private_key
        .to_pkcs1_pem(LineEnding::LF)
        .map_err(|e| CryptoError::KeyGeneration(format!("private key PEM: {}", e)))?;
    Ok(KeyPair {
        public_pem,
        private_pem,
    })
}
