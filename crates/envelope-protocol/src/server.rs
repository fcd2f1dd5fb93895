//! Server side: unwrap the client's session key and answer under it.
//!
//! The recovered [`SessionKey`] is handed back to the caller instead of being
//! kept on the server, so one [`EnvelopeServer`] can serve overlapping
//! requests from many threads.

use envelope_crypto::{parse_private_key, rsa_decrypt, RsaPrivateKey};
use serde_json::Value;
use tracing::debug;

use crate::client::require_payload;
use crate::error::EnvelopeError;
use crate::session::SessionKey;
use crate::types::{Payload, RequestEnvelope, ResponseEnvelope, SignatureIndex};

/// A verified request and the session key to answer it with.
#[derive(Debug)]
pub struct InboundRequest {
    pub payload: Payload,
    pub session: SessionKey,
}

/// Opens request envelopes with the server's private key.
pub struct EnvelopeServer {
    private_key: RsaPrivateKey,
}

impl EnvelopeServer {
    /// Create a server from a PKCS#1 PEM private key.
    pub fn new(private_key_pem: &str) -> Result<Self, EnvelopeError> {
        Ok(Self::with_key(parse_private_key(private_key_pem)?))
    }

    pub fn with_key(private_key: RsaPrivateKey) -> Self {
        Self { private_key }
    }

    /// Unwrap the session key, decrypt and verify a `{key, value}` envelope.
    pub fn process_request(
        &self,
        envelope: &RequestEnvelope,
    ) -> Result<InboundRequest, EnvelopeError> {
        let secret = rsa_decrypt(&self.private_key, &envelope.key)?;
        let session = SessionKey::from_secret(secret)?;
        let payload = session.open(&envelope.value)?;
        debug!(fields = payload.len(), "processed request envelope");
        Ok(InboundRequest { payload, session })
    }

    /// [`Self::process_request`] for an untyped JSON envelope.
    pub fn process_request_json(&self, envelope: &Value) -> Result<InboundRequest, EnvelopeError> {
        self.process_request(&RequestEnvelope::from_json(envelope)?)
    }

    /// Encrypt `payload` into a `{data}` response under the request's key.
    pub fn build_response(
        &self,
        session: &SessionKey,
        payload: &Value,
        index: SignatureIndex,
    ) -> Result<ResponseEnvelope, EnvelopeError> {
        let payload = require_payload(payload)?;
        let data = session.seal(payload, index)?;
        debug!(bytes = data.len(), "built response envelope");
        Ok(ResponseEnvelope { data })
    }
}

impl std::fmt::Debug for EnvelopeServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvelopeServer").finish_non_exhaustive()
    }
}
