use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::EnvelopeError;

/// Reserved payload field that carries the signing metadata.
pub const META_FIELD: &str = "__meta__";

/// Metadata field that carries the signature itself.
pub const SIGNATURE_FIELD: &str = "Signature";

pub const SIGNATURE_VERSION: &str = "v1";
pub const SIGNATURE_METHOD: &str = "MD5";

/// UTC, second precision, `Z` suffix.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Application payload: a JSON object with flat values.
///
/// Signing only sorts the top level, so nested objects are canonicalized
/// but their use is discouraged for peers that do not sort recursively.
pub type Payload = Map<String, Value>;

/// Client → server wire envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    /// Base64 RSA ciphertext of the ephemeral key.
    pub key: String,
    /// Base64 AES-CBC ciphertext of the signed payload.
    pub value: String,
}

/// Server → client wire envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    /// Base64 AES-CBC ciphertext of the signed payload.
    pub data: String,
}

impl RequestEnvelope {
    /// Validate an untyped JSON value as a request envelope.
    pub fn from_json(json: &Value) -> Result<Self, EnvelopeError> {
        let obj = json.as_object().ok_or_else(|| {
            EnvelopeError::Validation("request envelope is not a JSON object".to_string())
        })?;
        Ok(Self {
            key: get_non_empty_string(obj, "key")?,
            value: get_non_empty_string(obj, "value")?,
        })
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({ "key": self.key, "value": self.value })
    }
}

impl ResponseEnvelope {
    /// Validate an untyped JSON value as a response envelope.
    pub fn from_json(json: &Value) -> Result<Self, EnvelopeError> {
        let obj = json.as_object().ok_or_else(|| {
            EnvelopeError::Validation("response envelope is not a JSON object".to_string())
        })?;
        Ok(Self {
            data: get_non_empty_string(obj, "data")?,
        })
    }

    pub fn to_json(&self) -> Value {
        serde_json::json!({ "data": self.data })
    }
}

fn get_non_empty_string(obj: &Map<String, Value>, field: &str) -> Result<String, EnvelopeError> {
    obj.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or_else(|| EnvelopeError::Validation(format!("missing or empty field `{}`", field)))
}

/// Which payload fields participate in the signature.
///
/// On the wire this is `null` (all), `false` (none) or a comma-separated
/// string of field names. The raw string is kept because it is itself signed.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SignatureIndex {
    /// Sign every payload field.
    #[default]
    All,
    /// Produce no signature.
    Unsigned,
    /// Sign only the named fields.
    Fields(String),
}

impl SignatureIndex {
    /// Build a subset index from field names.
    pub fn fields<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names: Vec<String> = names.into_iter().map(|s| s.as_ref().to_string()).collect();
        Self::Fields(names.join(","))
    }

    /// Field names selected by a subset index; empty for the other variants.
    ///
    /// Whitespace around commas is dropped, as are empty names.
    pub fn field_names(&self) -> Vec<&str> {
        let Self::Fields(raw) = self else {
            return Vec::new();
        };
        let pieces: Vec<&str> = raw.split(',').collect();
        let last = pieces.len().saturating_sub(1);
        pieces
            .into_iter()
            .enumerate()
            .map(|(i, piece)| {
                let piece = if i > 0 { piece.trim_start() } else { piece };
                if i < last {
                    piece.trim_end()
                } else {
                    piece
                }
            })
            .filter(|name| !name.is_empty())
            .collect()
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::All => Value::Null,
            Self::Unsigned => Value::Bool(false),
            Self::Fields(raw) => Value::String(raw.clone()),
        }
    }

    pub fn from_value(value: &Value) -> Result<Self, EnvelopeError> {
        match value {
            Value::Null => Ok(Self::All),
            Value::Bool(false) => Ok(Self::Unsigned),
            Value::String(raw) => Ok(Self::Fields(raw.clone())),
            other => Err(EnvelopeError::Validation(format!(
                "SignatureIndex must be null, false or a string, got {}",
                other
            ))),
        }
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Unsigned => "unsigned",
            Self::Fields(_) => "fields",
        }
    }
}

impl Serialize for SignatureIndex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for SignatureIndex {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Self::from_value(&value).map_err(serde::de::Error::custom)
    }
}

/// Signing metadata embedded under [`META_FIELD`] inside the encrypted body.
///
/// `Signature` is not part of this struct: it is computed over the other
/// fields and attached or stripped separately.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Metadata {
    pub timestamp: String,
    pub signature_version: String,
    pub signature_method: String,
    /// `None` only when a peer omitted the field; it then signs as `All`
    /// and stays absent from the signed fields.
    #[serde(
        default,
        deserialize_with = "present_index",
        skip_serializing_if = "Option::is_none"
    )]
    pub signature_index: Option<SignatureIndex>,
    /// Fields a peer added beyond the standard set. They are signed too.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn present_index<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<SignatureIndex>, D::Error> {
    SignatureIndex::deserialize(deserializer).map(Some)
}

impl Metadata {
    /// Fresh metadata stamped with the current UTC time.
    pub fn new(index: SignatureIndex) -> Self {
        Self::with_timestamp(Utc::now().format(TIMESTAMP_FORMAT).to_string(), index)
    }

    pub fn with_timestamp(timestamp: impl Into<String>, index: SignatureIndex) -> Self {
        Self {
            timestamp: timestamp.into(),
            signature_version: SIGNATURE_VERSION.to_string(),
            signature_method: SIGNATURE_METHOD.to_string(),
            signature_index: Some(index),
            extra: Map::new(),
        }
    }

    /// The effective signature index.
    pub fn index(&self) -> SignatureIndex {
        self.signature_index.clone().unwrap_or_default()
    }

    /// Metadata as the JSON object that is merged into the signed fields.
    pub fn to_fields(&self) -> Result<Map<String, Value>, EnvelopeError> {
        match serde_json::to_value(self)? {
            Value::Object(fields) => Ok(fields),
            other => Err(EnvelopeError::Validation(format!(
                "metadata serialized to a non-object: {}",
                other
            ))),
        }
    }

    /// Parse received metadata (with `Signature` already removed).
    pub fn from_fields(fields: Map<String, Value>) -> Result<Self, EnvelopeError> {
        let metadata: Self = serde_json::from_value(Value::Object(fields))
            .map_err(|e| EnvelopeError::Validation(format!("invalid metadata: {}", e)))?;
        if metadata.signature_version != SIGNATURE_VERSION
            || metadata.signature_method != SIGNATURE_METHOD
        {
            return Err(EnvelopeError::UnsupportedSignature {
                version: metadata.signature_version,
                method: metadata.signature_method,
            });
        }
        Ok(metadata)
    }
}
