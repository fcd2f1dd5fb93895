//! Payload signing over a canonical query string.
//!
//! 1. Select payload fields per the signature index.
//! 2. Merge in the metadata fields (metadata wins on collision).
//! 3. Sort by key (code point order).
//! 4. Emit `enc(key)=enc(value)&` per pair, where `enc` is canonical JSON
//!    followed by percent-encoding. The trailing `&` is kept.
//! 5. MD5 hex of the resulting string is the signature.

use envelope_crypto::md5_hex;
use serde_json::{Map, Value};

use crate::canonical::encode_component;
use crate::error::EnvelopeError;
use crate::types::{Metadata, Payload, SignatureIndex};

/// Build the canonical query string for `payload` and `metadata`.
///
/// Returns `None` when the index is [`SignatureIndex::Unsigned`].
pub fn canonical_query_string(
    payload: &Payload,
    metadata: &Metadata,
) -> Result<Option<String>, EnvelopeError> {
    let mut fields: Map<String, Value> = match metadata.index() {
        SignatureIndex::Unsigned => return Ok(None),
        SignatureIndex::Fields(raw) if !raw.is_empty() => select_fields(payload, &raw)?,
        _ => payload.clone(),
    };
    for (key, value) in metadata.to_fields()? {
        fields.insert(key, value);
    }

    let mut pairs: Vec<(&String, &Value)> = fields.iter().collect();
    pairs.sort_by(|a, b| a.0.cmp(b.0));

    let mut query = String::new();
    for (key, value) in pairs {
        query.push_str(&encode_component(&Value::String(key.clone())));
        query.push('=');
        query.push_str(&encode_component(value));
        query.push('&');
    }
    Ok(Some(query))
}

fn select_fields(payload: &Payload, raw: &str) -> Result<Map<String, Value>, EnvelopeError> {
    let index = SignatureIndex::Fields(raw.to_string());
    let mut selected = Map::new();
    for name in index.field_names() {
        let value = payload
            .get(name)
            .ok_or_else(|| EnvelopeError::UnknownSignatureField(name.to_string()))?;
        selected.insert(name.to_string(), value.clone());
    }
    Ok(selected)
}

/// Sign `payload` with `metadata`. `None` means the payload is unsigned.
pub fn sign(payload: &Payload, metadata: &Metadata) -> Result<Option<String>, EnvelopeError> {
    Ok(canonical_query_string(payload, metadata)?.map(|query| md5_hex(query.as_bytes())))
}

/// Recompute the signature and compare it with the transmitted one.
pub fn verify(
    payload: &Payload,
    metadata: &Metadata,
    signature: Option<&str>,
) -> Result<(), EnvelopeError> {
    let expected = sign(payload, metadata)?;
    if expected.as_deref() != signature {
        return Err(EnvelopeError::SignatureMismatch);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    const TS: &str = "2019-01-01T00:00:00Z";

    fn payload(value: Value) -> Payload {
        value.as_object().unwrap().clone()
    }

    fn login() -> Payload {
        payload(json!({"action": "login", "user": "alice"}))
    }

    #[test]
    fn canonical_string_for_full_payload() {
        let metadata = Metadata::with_timestamp(TS, SignatureIndex::All);
        let query = canonical_query_string(&login(), &metadata).unwrap().unwrap();
        assert_eq!(
            query,
            "%22SignatureIndex%22=null&%22SignatureMethod%22=%22MD5%22&\
             %22SignatureVersion%22=%22v1%22&%22Timestamp%22=%222019-01-01T00%3A00%3A00Z%22&\
             %22action%22=%22login%22&%22user%22=%22alice%22&"
        );
    }

    #[test]
    fn matches_reference_signatures() {
        let metadata = Metadata::with_timestamp(TS, SignatureIndex::All);
        assert_eq!(
            sign(&login(), &metadata).unwrap().as_deref(),
            Some("29310cfbbfa3fe8d53e312a34ceffa6d")
        );

        let mut with_extra = login();
        with_extra.insert("extra".to_string(), json!(1));
        let metadata =
            Metadata::with_timestamp(TS, SignatureIndex::Fields("action, user".to_string()));
        assert_eq!(
            sign(&with_extra, &metadata).unwrap().as_deref(),
            Some("042d978220903a1c403cba3852271219")
        );
    }

    #[test]
    fn matches_reference_signature_for_mixed_values() {
        let mixed = payload(json!({
            "note": "a+b*c~ d/é",
            "n": 1.5,
            "big": 1e16,
            "tiny": 0.00001,
            "list": [1, "x", true, null],
            "obj": {"b": 1, "a": [2]},
            "neg": -3,
        }));
        let metadata = Metadata::with_timestamp(TS, SignatureIndex::All);
        let query = canonical_query_string(&mixed, &metadata).unwrap().unwrap();
        assert!(query.contains("&%22big%22=1e%2B16&"));
        assert!(query.contains("&%22note%22=%22a%2Bb%2Ac~%20d%2F%5Cu00e9%22&"));
        assert!(query.ends_with("&%22tiny%22=1e-05&"));
        assert_eq!(
            sign(&mixed, &metadata).unwrap().as_deref(),
            Some("63248f2a0da5ffb1624951c1970d8f98")
        );
    }

    #[test]
    fn unsigned_produces_no_signature() {
        let metadata = Metadata::with_timestamp(TS, SignatureIndex::Unsigned);
        assert_eq!(sign(&login(), &metadata).unwrap(), None);
        assert!(verify(&login(), &metadata, None).is_ok());
        assert!(matches!(
            verify(&login(), &metadata, Some("29310cfbbfa3fe8d53e312a34ceffa6d")),
            Err(EnvelopeError::SignatureMismatch)
        ));
    }

    #[test]
    fn subset_ignores_other_fields() {
        let metadata = Metadata::with_timestamp(TS, SignatureIndex::fields(["action"]));
        let a = sign(&login(), &metadata).unwrap();
        let mut changed = login();
        changed.insert("user".to_string(), json!("mallory"));
        changed.insert("extra".to_string(), json!([1, 2]));
        assert_eq!(sign(&changed, &metadata).unwrap(), a);

        changed.insert("action".to_string(), json!("logout"));
        assert_ne!(sign(&changed, &metadata).unwrap(), a);
    }

    #[test]
    fn subset_with_unknown_field_fails() {
        let metadata = Metadata::with_timestamp(TS, SignatureIndex::fields(["missing"]));
        let err = sign(&login(), &metadata).unwrap_err();
        assert!(matches!(err, EnvelopeError::UnknownSignatureField(name) if name == "missing"));
    }

    #[test]
    fn empty_subset_string_signs_everything() {
        let all = Metadata::with_timestamp(TS, SignatureIndex::All);
        let empty = Metadata::with_timestamp(TS, SignatureIndex::Fields(String::new()));
        let all_query = canonical_query_string(&login(), &all).unwrap().unwrap();
        let empty_query = canonical_query_string(&login(), &empty).unwrap().unwrap();
        assert_eq!(
            all_query.replace("%22SignatureIndex%22=null", "%22SignatureIndex%22=%22%22"),
            empty_query
        );
    }

    #[test]
    fn blank_subset_signs_metadata_only() {
        let metadata = Metadata::with_timestamp(TS, SignatureIndex::Fields(" , ".to_string()));
        let query = canonical_query_string(&login(), &metadata).unwrap().unwrap();
        assert!(!query.contains("action"));
        assert!(!query.contains("user"));
        assert!(query.contains("%22Timestamp%22="));
    }

    #[test]
    fn metadata_wins_on_collision() {
        let mut colliding = login();
        colliding.insert("Timestamp".to_string(), json!("forged"));
        let metadata = Metadata::with_timestamp(TS, SignatureIndex::All);
        assert_eq!(sign(&colliding, &metadata).unwrap(), sign(&login(), &metadata).unwrap());
    }

    #[test]
    fn insertion_order_does_not_matter() {
        let mut forward = Payload::new();
        let mut backward = Payload::new();
        let entries = [("z", json!(1)), ("m", json!("x")), ("a", json!(null)), ("B", json!(true))];
        for (k, v) in entries.iter() {
            forward.insert(k.to_string(), v.clone());
        }
        for (k, v) in entries.iter().rev() {
            backward.insert(k.to_string(), v.clone());
        }
        let metadata = Metadata::with_timestamp(TS, SignatureIndex::All);
        assert_eq!(sign(&forward, &metadata).unwrap(), sign(&backward, &metadata).unwrap());
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let metadata = Metadata::with_timestamp(TS, SignatureIndex::All);
        let signature = sign(&login(), &metadata).unwrap().unwrap();
        assert!(verify(&login(), &metadata, Some(&signature)).is_ok());

        for i in 0..signature.len() {
            let mut bytes = signature.clone().into_bytes();
            bytes[i] = if bytes[i] == b'0' { b'1' } else { b'0' };
            let forged = String::from_utf8(bytes).unwrap();
            assert!(matches!(
                verify(&login(), &metadata, Some(&forged)),
                Err(EnvelopeError::SignatureMismatch)
            ));
        }
        assert!(matches!(
            verify(&login(), &metadata, None),
            Err(EnvelopeError::SignatureMismatch)
        ));
    }

    #[test]
    fn timestamp_is_signed() {
        let a = Metadata::with_timestamp(TS, SignatureIndex::All);
        let b = Metadata::with_timestamp("2019-01-01T00:00:01Z", SignatureIndex::All);
        assert_ne!(sign(&login(), &a).unwrap(), sign(&login(), &b).unwrap());
    }
}
