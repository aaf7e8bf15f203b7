//! Outbound per-record IV sequence.
//!
//! Each protected record's explicit IV is the first 16 bytes of the
//! SHA-256 digest of the decimal ASCII rendering of a 128-bit counter.
//! The counter starts at the little-endian value of the key-block tail
//! and advances by one per record.

use mote_crypto::sha256::Sha256;
use mote_types::CryptoError;

/// The IV counter for the write direction.
pub struct IvSequence {
    seed: u128,
}

impl IvSequence {
    pub fn new(seed: u128) -> Self {
        Self { seed }
    }

    /// Produce the next record IV and advance the counter.
    pub fn next_iv(&mut self) -> Result<[u8; 16], CryptoError> {
        let digest = Sha256::digest(self.seed.to_string().as_bytes())?;
        self.seed = self.seed.wrapping_add(1);
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&digest[..16]);
        Ok(iv)
    }
}
