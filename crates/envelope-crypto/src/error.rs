use thiserror::Error;

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("Invalid key format: {0}")]
    KeyFormat(String),

    #[error("Invalid key length: expected a positive multiple of 16 bytes usable by AES, got {got}")]
    InvalidKeyLength { got: usize },

    #[error("Parameter error: {0}")]
    InvalidParameter(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("Base64 decode error: {0}")]
    Base64Decode(String),

    #[error("Random number generation failed: {0}")]
    RngFailed(String),

    #[error("Key generation failed: {0}")]
    KeyGeneration(String),
}
