//! TLS 1.2 PRF with SHA-256 (RFC 5246 §5).
//!
//! ```text
//! PRF(secret, label, seed) = P_SHA256(secret, label + seed)
//! P_hash(secret, seed) = HMAC(secret, A(1) + seed) || HMAC(secret, A(2) + seed) || ...
//! A(0) = seed;  A(i) = HMAC(secret, A(i-1))
//! ```

use mote_crypto::digest::Digest;
use mote_crypto::hmac::Hmac;
use mote_crypto::sha256::Sha256;
use mote_types::CryptoError;

fn hmac_sha256(secret: &[u8], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
    Hmac::mac(|| Box::new(Sha256::new()) as Box<dyn Digest>, secret, data)
}

/// Derive `output_len` bytes from `secret`, `label`, and `seed`.
pub fn prf(
    secret: &[u8],
    label: &str,
    seed: &[u8],
    output_len: usize,
) -> Result<Vec<u8>, CryptoError> {
    let mut label_seed = Vec::with_capacity(label.len() + seed.len());
    label_seed.extend_from_slice(label.as_bytes());
    label_seed.extend_from_slice(seed);

    let mut result = Vec::with_capacity(output_len);
    let mut a = label_seed.clone();
    while result.len() < output_len {
        a = hmac_sha256(secret, &a)?;
        let mut a_seed = Vec::with_capacity(a.len() + label_seed.len());
        a_seed.extend_from_slice(&a);
        a_seed.extend_from_slice(&label_seed);
        result.extend_from_slice(&hmac_sha256(secret, &a_seed)?);
    }
    result.truncate(output_len);
    Ok(result)
}
