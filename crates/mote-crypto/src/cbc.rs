//! Raw AES-CBC mode, no padding.
//!
//! TLS 1.2 applies its own padding scheme, so both directions operate on
//! block-aligned buffers and padding is handled by the record layer.

use crate::aes::{AesKey, AES_BLOCK_SIZE};
use mote_types::CryptoError;

/// CBC-encrypt `data` in place. `data` must be block-aligned.
pub fn encrypt(key: &AesKey, iv: &[u8; AES_BLOCK_SIZE], data: &mut [u8]) -> Result<(), CryptoError> {
    if data.len() % AES_BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidArg);
    }
    let mut prev = *iv;
    for chunk in data.chunks_mut(AES_BLOCK_SIZE) {
        for (b, p) in chunk.iter_mut().zip(&prev) {
            *b ^= p;
        }
        key.encrypt_block(chunk)?;
        prev.copy_from_slice(chunk);
    }
    Ok(())
}

/// CBC-decrypt `data` in place. `data` must be block-aligned. No padding
/// is removed.
pub fn decrypt(key: &AesKey, iv: &[u8; AES_BLOCK_SIZE], data: &mut [u8]) -> Result<(), CryptoError> {
    if data.len() % AES_BLOCK_SIZE != 0 {
        return Err(CryptoError::InvalidArg);
    }
    let mut prev = *iv;
    for chunk in data.chunks_mut(AES_BLOCK_SIZE) {
        let ct: [u8; AES_BLOCK_SIZE] = chunk.try_into().map_err(|_| CryptoError::InvalidArg)?;
        key.decrypt_block(chunk)?;
        for (b, p) in chunk.iter_mut().zip(&prev) {
            *b ^= p;
        }
        prev = ct;
    }
    Ok(())
}
