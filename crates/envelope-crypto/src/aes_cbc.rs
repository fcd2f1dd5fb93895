//! AES-CBC payload encryption.
//!
//! Wire format: base64(AES-CBC(key, iv = key[..16], PKCS#7(plaintext))).
//!
//! The key is text and its UTF-8 bytes are the raw AES key, so a 32-char hex
//! key selects AES-256 and a 16-char key selects AES-128. Decryption does not
//! unpad; it strips every control character from the decoded text instead,
//! which removes the pad bytes (all `0x01..=0x10`) along with anything else
//! below U+0020.

use aes::{Aes128, Aes256};
use cbc::cipher::block_padding::{NoPadding, Pkcs7};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};

use crate::base64::{base64_decode, base64_encode};
use crate::error::CryptoError;
use crate::types::{AES_BLOCK_SIZE, KEY_LENGTH_MULTIPLE};

/// Reject keys that are empty or not a multiple of 16 bytes.
pub fn validate_key_length(key: &str) -> Result<(), CryptoError> {
    let len = key.len();
    if len == 0 || len % KEY_LENGTH_MULTIPLE != 0 {
        return Err(CryptoError::InvalidKeyLength { got: len });
    }
    Ok(())
}

/// Encrypt `plaintext` under `key`, returning base64 ciphertext.
pub fn aes_cbc_encrypt(key: &str, plaintext: &str) -> Result<String, CryptoError> {
    validate_key_length(key)?;
    if plaintext.is_empty() {
        return Err(CryptoError::InvalidParameter("plaintext is empty".to_string()));
    }

    let key = key.as_bytes();
    let iv = &key[..AES_BLOCK_SIZE];
    let data = plaintext.as_bytes();

    let ciphertext = match key.len() {
        16 => cbc::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        32 => cbc::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|e| CryptoError::EncryptionFailed(e.to_string()))?
            .encrypt_padded_vec_mut::<Pkcs7>(data),
        got => return Err(CryptoError::InvalidKeyLength { got }),
    };

    Ok(base64_encode(&ciphertext))
}

/// Decrypt base64 `ciphertext` under `key`.
///
/// Returns `Ok(None)` when the decrypted bytes are not valid UTF-8, which is
/// what a wrong key almost always produces. Callers must branch on it.
/// Malformed parameters and ciphertext that is not whole blocks are `Err`.
pub fn aes_cbc_decrypt(key: &str, ciphertext: &str) -> Result<Option<String>, CryptoError> {
    validate_key_length(key)?;
    if ciphertext.is_empty() {
        return Err(CryptoError::InvalidParameter("ciphertext is empty".to_string()));
    }

    let key = key.as_bytes();
    let iv = &key[..AES_BLOCK_SIZE];
    let data = base64_decode(ciphertext)?;

    let decrypted = match key.len() {
        16 => cbc::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?
            .decrypt_padded_vec_mut::<NoPadding>(&data),
        32 => cbc::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(|e| CryptoError::DecryptionFailed(e.to_string()))?
            .decrypt_padded_vec_mut::<NoPadding>(&data),
        got => return Err(CryptoError::InvalidKeyLength { got }),
    }
    .map_err(|_| {
        CryptoError::DecryptionFailed(format!(
            "ciphertext length {} is not a multiple of {}",
            data.len(),
            AES_BLOCK_SIZE
        ))
    })?;

    let Ok(text) = String::from_utf8(decrypted) else {
        return Ok(None);
    };
    Ok(Some(strip_control_chars(&text)))
}

fn strip_control_chars(text: &str) -> String {
    text.chars().filter(|c| u32::from(*c) >= 0x20).collect()
}
