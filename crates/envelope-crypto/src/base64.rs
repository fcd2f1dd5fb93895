use base64ct::{Base64, Base64Unpadded, Encoding};

use crate::error::CryptoError;

/// Standard base64 with `=` padding, as carried in envelope fields.
pub fn base64_encode(data: &[u8]) -> String {
    Base64::encode_string(data)
}

/// Standard base64 decode. Trailing `=` padding is optional.
pub fn base64_decode(s: &str) -> Result<Vec<u8>, CryptoError> {
    Base64Unpadded::decode_vec(s.trim_end_matches('='))
        .map_err(|e| CryptoError::Base64Decode(e.to_string()))
}
