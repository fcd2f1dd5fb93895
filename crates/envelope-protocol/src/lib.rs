//! Hybrid-encryption envelopes for JSON request/response exchange.
//!
//! The client generates a session key, wraps it with the server's RSA public
//! key, and encrypts a signed payload under it. The server unwraps the key,
//! verifies the payload, and answers under the same key.
//!
//! ```text
//! request:  {"key": base64(RSA(session)), "value": base64(AES(body))}
//! response: {"data": base64(AES(body))}
//! body:     {...payload, "__meta__": {Timestamp, SignatureVersion,
//!            SignatureMethod, SignatureIndex, Signature}}
//! ```

pub mod canonical;
mod client;
mod error;
mod server;
mod session;
pub mod signing;
mod types;

pub use client::EnvelopeClient;
pub use error::EnvelopeError;
pub use server::{EnvelopeServer, InboundRequest};
pub use session::SessionKey;
pub use signing::{canonical_query_string, sign, verify};
pub use types::{
    Metadata, Payload, RequestEnvelope, ResponseEnvelope, SignatureIndex, META_FIELD,
    SIGNATURE_FIELD, SIGNATURE_METHOD, SIGNATURE_VERSION, TIMESTAMP_FORMAT,
};

pub use envelope_crypto::CryptoError;
