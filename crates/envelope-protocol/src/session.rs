//! Ephemeral session key and the sign-then-encrypt body pipeline.
//!
//! Seal: payload + metadata → sign → attach `__meta__` → compact JSON → AES-CBC
//! Open: AES-CBC → JSON → detach `__meta__` → verify → payload

use std::fmt;

use envelope_crypto::{aes_cbc_decrypt, aes_cbc_encrypt, generate_ephemeral_key, validate_key_length};
use serde_json::Value;
use tracing::{debug, warn};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::canonical::compact_json;
use crate::error::EnvelopeError;
use crate::signing::{sign, verify};
use crate::types::{Metadata, Payload, SignatureIndex, META_FIELD, SIGNATURE_FIELD};

/// The per-session symmetric secret shared by client and server.
///
/// Text of 16 or 32 ASCII characters whose UTF-8 bytes are the AES key and
/// whose first 16 bytes are the IV. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SessionKey {
    secret: String,
}

impl SessionKey {
    /// Generate a fresh 32-hex-char key.
    pub fn generate() -> Result<Self, EnvelopeError> {
        Ok(Self {
            secret: generate_ephemeral_key()?,
        })
    }

    /// Adopt an existing secret, e.g. one unwrapped from a request.
    pub fn from_secret(secret: String) -> Result<Self, EnvelopeError> {
        validate_key_length(&secret)?;
        Ok(Self { secret })
    }

    pub fn expose_secret(&self) -> &str {
        &self.secret
    }

    /// Sign `payload`, embed the metadata and encrypt the result.
    pub fn seal(&self, payload: &Payload, index: SignatureIndex) -> Result<String, EnvelopeError> {
        if payload.contains_key(META_FIELD) {
            return Err(EnvelopeError::Validation(format!(
                "payload must not contain the reserved field `{}`",
                META_FIELD
            )));
        }

        let metadata = Metadata::new(index);
        let signature = sign(payload, &metadata)?;

        let mut meta_fields = metadata.to_fields()?;
        meta_fields.insert(
            SIGNATURE_FIELD.to_string(),
            signature.map_or(Value::Null, Value::String),
        );

        let mut body = payload.clone();
        body.insert(META_FIELD.to_string(), Value::Object(meta_fields));

        debug!(
            fields = payload.len(),
            index = metadata.index().kind(),
            "sealing payload"
        );
        Ok(aes_cbc_encrypt(&self.secret, &compact_json(&Value::Object(body)))?)
    }

    /// Decrypt `ciphertext`, detach the metadata and verify the signature.
    pub fn open(&self, ciphertext: &str) -> Result<Payload, EnvelopeError> {
        let Some(plaintext) = aes_cbc_decrypt(&self.secret, ciphertext)? else {
            warn!("decrypted body is not valid text");
            return Err(EnvelopeError::UndecryptablePayload);
        };

        let Value::Object(mut payload) = serde_json::from_str::<Value>(&plaintext)? else {
            return Err(EnvelopeError::Validation(
                "decrypted body is not a JSON object".to_string(),
            ));
        };

        let mut meta_fields = match payload.remove(META_FIELD) {
            Some(Value::Object(fields)) => fields,
            Some(_) => {
                return Err(EnvelopeError::Validation(format!(
                    "`{}` is not a JSON object",
                    META_FIELD
                )))
            }
            None => {
                return Err(EnvelopeError::Validation(format!(
                    "missing `{}` in decrypted body",
                    META_FIELD
                )))
            }
        };

        let signature = match meta_fields.remove(SIGNATURE_FIELD) {
            Some(Value::String(s)) => Some(s),
            Some(Value::Null) => None,
            Some(other) => {
                return Err(EnvelopeError::Validation(format!(
                    "`{}` must be a string or null, got {}",
                    SIGNATURE_FIELD, other
                )))
            }
            None => {
                return Err(EnvelopeError::Validation(format!(
                    "missing `{}` in metadata",
                    SIGNATURE_FIELD
                )))
            }
        };

        let metadata = Metadata::from_fields(meta_fields)?;
        if let Err(e) = verify(&payload, &metadata, signature.as_deref()) {
            warn!(timestamp = %metadata.timestamp, "signature verification failed");
            return Err(e);
        }

        debug!(fields = payload.len(), index = metadata.index().kind(), "opened payload");
        Ok(payload)
    }
}

impl fmt::Debug for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionKey").field("secret", &"<redacted>").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(value: Value) -> Payload {
        value.as_object().unwrap().clone()
    }

    fn key() -> SessionKey {
        SessionKey::from_secret("0123456789abcdef0123456789abcdef".to_string()).unwrap()
    }

    #[test]
    fn generated_key_shape() {
        let key = SessionKey::generate().unwrap();
        assert_eq!(key.expose_secret().len(), 32);
        assert_ne!(key.expose_secret(), SessionKey::generate().unwrap().expose_secret());
    }

    #[test]
    fn from_secret_checks_length() {
        assert!(SessionKey::from_secret("0123456789abcdef".to_string()).is_ok());
        assert!(matches!(
            SessionKey::from_secret("short".to_string()),
            Err(EnvelopeError::Crypto(_))
        ));
        assert!(SessionKey::from_secret(String::new()).is_err());
    }

    #[test]
    fn debug_is_redacted() {
        let printed = format!("{:?}", key());
        assert!(!printed.contains("0123456789abcdef"));
        assert!(printed.contains("redacted"));
    }

    #[test]
    fn seal_open_round_trip() {
        let body = payload(json!({"action": "login", "user": "alice", "n": 1.5, "ok": true}));
        for index in [
            SignatureIndex::All,
            SignatureIndex::Unsigned,
            SignatureIndex::fields(["action", "n"]),
        ] {
            let sealed = key().seal(&body, index).unwrap();
            assert_eq!(key().open(&sealed).unwrap(), body);
        }
    }

    #[test]
    fn sealed_body_carries_signed_metadata() {
        let body = payload(json!({"status": "ok"}));
        let sealed = key().seal(&body, SignatureIndex::All).unwrap();
        let plaintext = aes_cbc_decrypt(key().expose_secret(), &sealed).unwrap().unwrap();
        let decoded: Value = serde_json::from_str(&plaintext).unwrap();
        let meta = &decoded[META_FIELD];
        assert_eq!(meta["SignatureVersion"], "v1");
        assert_eq!(meta["SignatureMethod"], "MD5");
        assert_eq!(meta["SignatureIndex"], Value::Null);
        assert_eq!(meta["Signature"].as_str().unwrap().len(), 32);
        assert!(plaintext.is_ascii());
    }

    #[test]
    fn unsigned_body_has_null_signature() {
        let body = payload(json!({"status": "ok"}));
        let sealed = key().seal(&body, SignatureIndex::Unsigned).unwrap();
        let plaintext = aes_cbc_decrypt(key().expose_secret(), &sealed).unwrap().unwrap();
        let decoded: Value = serde_json::from_str(&plaintext).unwrap();
        assert_eq!(decoded[META_FIELD]["Signature"], Value::Null);
        assert_eq!(decoded[META_FIELD]["SignatureIndex"], json!(false));
    }

    #[test]
    fn rejects_reserved_field() {
        let body = payload(json!({"__meta__": {}, "a": 1}));
        assert!(matches!(
            key().seal(&body, SignatureIndex::All),
            Err(EnvelopeError::Validation(_))
        ));
    }

    #[test]
    fn wrong_key_is_undecryptable() {
        let body = payload(json!({"action": "login", "user": "alice", "note": "long enough body"}));
        let sealed = key().seal(&body, SignatureIndex::All).unwrap();
        let other = SessionKey::from_secret("fedcba9876543210fedcba9876543210".to_string()).unwrap();
        assert!(matches!(other.open(&sealed), Err(EnvelopeError::UndecryptablePayload)));
    }

    fn seal_raw(body: &Value) -> String {
        aes_cbc_encrypt(key().expose_secret(), &body.to_string()).unwrap()
    }

    #[test]
    fn open_rejects_malformed_bodies() {
        let meta = json!({
            "Timestamp": "2019-01-01T00:00:00Z",
            "SignatureVersion": "v1",
            "SignatureMethod": "MD5",
            "SignatureIndex": false,
        });
        let cases = [
            json!([1, 2]),
            json!({"a": 1}),
            json!({"a": 1, "__meta__": "oops"}),
            json!({"a": 1, "__meta__": meta}),
            json!({"a": 1, "__meta__": {
                "Timestamp": "2019-01-01T00:00:00Z",
                "SignatureVersion": "v1",
                "SignatureMethod": "MD5",
                "SignatureIndex": false,
                "Signature": 5,
            }}),
        ];
        for body in cases {
            let result = key().open(&seal_raw(&body));
            assert!(matches!(result, Err(EnvelopeError::Validation(_))), "{body}");
        }
    }

    #[test]
    fn open_rejects_non_json() {
        let sealed = aes_cbc_encrypt(key().expose_secret(), "not json").unwrap();
        assert!(matches!(key().open(&sealed), Err(EnvelopeError::Json(_))));
    }

    #[test]
    fn open_detects_modified_payload() {
        let body = json!({"amount": 10, "__meta__": {
            "Timestamp": "2019-01-01T00:00:00Z",
            "SignatureVersion": "v1",
            "SignatureMethod": "MD5",
            "SignatureIndex": null,
            "Signature": "00000000000000000000000000000000",
        }});
        assert!(matches!(
            key().open(&seal_raw(&body)),
            Err(EnvelopeError::SignatureMismatch)
        ));
    }
}
