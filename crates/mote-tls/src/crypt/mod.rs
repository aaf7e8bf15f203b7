//! Key derivation and handshake hashing for TLS_RSA_WITH_AES_128_CBC_SHA.

pub mod iv;
pub mod key_schedule;
pub mod prf;
pub mod transcript;

/// HMAC-SHA1 record MAC length.
pub const MAC_LEN: usize = 20;

/// AES-128 write key length.
pub const ENC_KEY_LEN: usize = 16;

/// Per-record IV seed length (key-block tail).
pub const IV_SEED_LEN: usize = 16;

/// Master secret length.
pub const MASTER_SECRET_LEN: usize = 48;

/// Finished verify_data length.
pub const VERIFY_DATA_LEN: usize = 12;

/// Full key block: two MAC keys, two write keys, one IV seed.
pub const KEY_BLOCK_LEN: usize = 2 * (MAC_LEN + ENC_KEY_LEN) + IV_SEED_LEN;
