//! Object-safe digest abstraction.
//!
//! HMAC and the TLS PRF are generic over the hash through boxed `Digest`
//! instances produced by factory closures.

use mote_types::CryptoError;

/// A streaming hash function.
pub trait Digest {
    /// Digest output size in bytes.
    fn output_size(&self) -> usize;
    /// Compression block size in bytes.
    fn block_size(&self) -> usize;
    /// Feed data into the hash computation.
    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError>;
    /// Finalize and write the digest to `out` (must hold `output_size()`).
    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError>;
    /// Reset for a fresh computation.
    fn reset(&mut self);
}
