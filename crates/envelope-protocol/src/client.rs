//! Client side: wrap the session key for the server and seal requests.

use envelope_crypto::{parse_public_key, rsa_encrypt, RsaPublicKey};
use serde_json::Value;
use tracing::debug;

use crate::error::EnvelopeError;
use crate::session::SessionKey;
use crate::types::{Payload, RequestEnvelope, ResponseEnvelope, SignatureIndex};

/// Builds request envelopes and opens the matching responses.
///
/// One session key is generated per client and reused for every call, so
/// responses can only be opened by the client that sent the request.
#[derive(Debug)]
pub struct EnvelopeClient {
    public_key: RsaPublicKey,
    session: SessionKey,
}

impl EnvelopeClient {
    /// Create a client for the server's PKCS#1 or PKCS#8 PEM public key.
    pub fn new(public_key_pem: &str) -> Result<Self, EnvelopeError> {
        Ok(Self::with_session(
            parse_public_key(public_key_pem)?,
            SessionKey::generate()?,
        ))
    }

    pub fn with_session(public_key: RsaPublicKey, session: SessionKey) -> Self {
        Self {
            public_key,
            session,
        }
    }

    pub fn session_key(&self) -> &SessionKey {
        &self.session
    }

    /// Encrypt `payload` into a `{key, value}` request envelope.
    pub fn build_request(
        &self,
        payload: &Value,
        index: SignatureIndex,
    ) -> Result<RequestEnvelope, EnvelopeError> {
        let payload = require_payload(payload)?;
        let key = rsa_encrypt(&self.public_key, self.session.expose_secret())?;
        let value = self.session.seal(payload, index)?;
        debug!(bytes = value.len(), "built request envelope");
        Ok(RequestEnvelope { key, value })
    }

    /// Decrypt and verify a `{data}` response envelope.
    pub fn parse_response(&self, envelope: &ResponseEnvelope) -> Result<Payload, EnvelopeError> {
        self.session.open(&envelope.data)
    }

    /// [`Self::parse_response`] for an untyped JSON envelope.
    pub fn parse_response_json(&self, envelope: &Value) -> Result<Payload, EnvelopeError> {
        self.parse_response(&ResponseEnvelope::from_json(envelope)?)
    }
}

/// A sealable payload is a non-empty JSON object.
pub(crate) fn require_payload(payload: &Value) -> Result<&Payload, EnvelopeError> {
    match payload.as_object() {
        Some(obj) if !obj.is_empty() => Ok(obj),
        Some(_) => Err(EnvelopeError::Validation("payload is empty".to_string())),
        None => Err(EnvelopeError::Validation(
            "payload must be a JSON object".to_string(),
        )),
    }
}
