use thiserror::Error;

#[derive(Debug, Error)]
pub enum EnvelopeError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Signature verification failed")]
    SignatureMismatch,

    #[error("Signature index names a field missing from the payload: {0}")]
    UnknownSignatureField(String),

    #[error("Unsupported signature scheme: version={version}, method={method}")]
    UnsupportedSignature { version: String, method: String },

    #[error("Decrypted payload is not valid text")]
    UndecryptablePayload,

    #[error("Crypto error: {0}")]
    Crypto(#[from] envelope_crypto::CryptoError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
