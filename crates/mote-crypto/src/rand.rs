//! OS randomness.

use mote_types::CryptoError;

/// Fill `buf` with cryptographically strong random bytes.
pub fn fill(buf: &mut [u8]) -> Result<(), CryptoError> {
    getrandom::getrandom(buf).map_err(|_| CryptoError::RandFail)
}

/// Fill `buf` with random non-zero bytes (PKCS#1 type-2 padding).
pub fn fill_nonzero(buf: &mut [u8]) -> Result<(), CryptoError> {
    fill(buf)?;
    for slot in buf.iter_mut() {
        while *slot == 0 {
            let mut byte = [0u8; 1];
            fill(&mut byte)?;
            *slot = byte[0];
        }
    }
    Ok(())
}
