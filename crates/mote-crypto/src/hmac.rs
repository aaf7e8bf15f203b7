//! HMAC (RFC 2104) over a boxed digest.
//!
//! HMAC(K, m) = H((K' ^ opad) || H((K' ^ ipad) || m))

use crate::digest::Digest;
use mote_types::CryptoError;
use zeroize::Zeroize;

/// HMAC context.
pub struct Hmac {
    inner: Box<dyn Digest>,
    outer: Box<dyn Digest>,
    factory: Box<dyn Fn() -> Box<dyn Digest>>,
    key_block: Vec<u8>,
}

impl Hmac {
    /// Create an HMAC instance keyed with `key`. `hash_factory` produces
    /// fresh digest instances of the underlying hash.
    pub fn new(
        hash_factory: impl Fn() -> Box<dyn Digest> + 'static,
        key: &[u8],
    ) -> Result<Self, CryptoError> {
        let sample = hash_factory();
        let block_size = sample.block_size();
        let output_size = sample.output_size();
        drop(sample);

        // Keys longer than a block are hashed down; shorter keys are
        // zero-padded.
        let mut key_block = vec![0u8; block_size];
        if key.len() > block_size {
            let mut hasher = hash_factory();
            hasher.update(key)?;
            let mut hashed = vec![0u8; output_size];
            hasher.finish(&mut hashed)?;
            key_block[..output_size].copy_from_slice(&hashed);
            hashed.zeroize();
        } else {
            key_block[..key.len()].copy_from_slice(key);
        }

        let mut ctx = Self {
            inner: hash_factory(),
            outer: hash_factory(),
            factory: Box::new(hash_factory),
            key_block,
        };
        ctx.feed_pads()?;
        Ok(ctx)
    }

    fn feed_pads(&mut self) -> Result<(), CryptoError> {
        let mut pad = vec![0u8; self.key_block.len()];
        for (p, k) in pad.iter_mut().zip(&self.key_block) {
            *p = k ^ 0x36;
        }
        self.inner.update(&pad)?;
        for (p, k) in pad.iter_mut().zip(&self.key_block) {
            *p = k ^ 0x5c;
        }
        self.outer.update(&pad)?;
        pad.zeroize();
        Ok(())
    }

    /// Feed data into the MAC computation.
    pub fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        self.inner.update(data)
    }

    /// Finalize and write the MAC to `out` (must hold the digest size).
    pub fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        let output_size = self.inner.output_size();
        let mut inner_hash = vec![0u8; output_size];
        self.inner.finish(&mut inner_hash)?;
        self.outer.update(&inner_hash)?;
        inner_hash.zeroize();
        self.outer.finish(out)
    }

    /// Reset for reuse with the same key.
    pub fn reset(&mut self) -> Result<(), CryptoError> {
        self.inner = (self.factory)();
        self.outer = (self.factory)();
        self.feed_pads()
    }

    /// One-shot HMAC computation.
    pub fn mac(
        hash_factory: impl Fn() -> Box<dyn Digest> + 'static,
        key: &[u8],
        data: &[u8],
    ) -> Result<Vec<u8>, CryptoError> {
        let mut ctx = Self::new(hash_factory, key)?;
        ctx.update(data)?;
        let size = ctx.inner.output_size();
        let mut out = vec![0u8; size];
        ctx.finish(&mut out)?;
        Ok(out)
    }
}

impl Drop for Hmac {
    fn drop(&mut self) {
        self.key_block.zeroize();
    }
}
