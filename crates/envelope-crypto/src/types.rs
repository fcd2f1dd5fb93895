/// AES block size in bytes. The first block of the key doubles as the CBC IV.
pub const AES_BLOCK_SIZE: usize = 16;

/// Symmetric keys must be a positive multiple of this many bytes.
pub const KEY_LENGTH_MULTIPLE: usize = 16;

/// Random bytes hashed into a fresh ephemeral key.
pub const EPHEMERAL_SEED_LENGTH: usize = AES_BLOCK_SIZE;

/// Modulus length used by the key generator when none is given.
pub const DEFAULT_KEY_BITS: usize = 1024;

/// Smallest modulus length worth deploying.
pub const RECOMMENDED_KEY_BITS: usize = 2048;

/// PEM boundary that marks a PKCS#1 public key. Anything else is read as PKCS#8.
pub const PKCS1_PUBLIC_KEY_PREFIX: &str = "-----BEGIN RSA PUBLIC KEY-----";
