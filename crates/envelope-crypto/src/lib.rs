//! Cryptographic primitives behind the hybrid envelope protocol.
//!
//! - RSA PKCS#1 v1.5 wrapping of the ephemeral key (PKCS#1 / PKCS#8 PEM keys)
//! - AES-CBC payload encryption with the key doubling as IV
//! - MD5 hex digests for key derivation and signing
//! - RSA key-pair generation

pub mod aes_cbc;
pub mod asymmetric;
pub mod base64;
pub mod digest;
pub mod error;
pub mod types;

pub use aes_cbc::{aes_cbc_decrypt, aes_cbc_encrypt, validate_key_length};
pub use asymmetric::{
    generate_key_pair, parse_private_key, parse_public_key, rsa_decrypt, rsa_encrypt, KeyPair,
};
pub use base64::{base64_decode, base64_encode};
pub use digest::{generate_ephemeral_key, md5_hex, random_block};
pub use error::CryptoError;
pub use rsa::{RsaPrivateKey, RsaPublicKey};
pub use types::{
    AES_BLOCK_SIZE, DEFAULT_KEY_BITS, EPHEMERAL_SEED_LENGTH, KEY_LENGTH_MULTIPLE,
    PKCS1_PUBLIC_KEY_PREFIX, RECOMMENDED_KEY_BITS,
};
