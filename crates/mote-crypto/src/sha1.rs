//! SHA-1 message digest (FIPS 180-4).
//!
//! **Security warning**: SHA-1 is collision-broken. It is carried only
//! because TLS_RSA_WITH_AES_128_CBC_SHA mandates HMAC-SHA1 record MACs.

use mote_types::CryptoError;

/// SHA-1 output size in bytes.
pub const SHA1_OUTPUT_SIZE: usize = 20;

/// SHA-1 block size in bytes.
pub const SHA1_BLOCK_SIZE: usize = 64;

const H_INIT: [u32; 5] = [0x67452301, 0xefcdab89, 0x98badcfe, 0x10325476, 0xc3d2e1f0];

const K: [u32; 4] = [0x5a827999, 0x6ed9eba1, 0x8f1bbcdc, 0xca62c1d6];

fn compress(state: &mut [u32; 5], block: &[u8]) {
    let mut w = [0u32; 80];
    for i in 0..16 {
        w[i] = u32::from_be_bytes([
            block[4 * i],
            block[4 * i + 1],
            block[4 * i + 2],
            block[4 * i + 3],
        ]);
    }
    for i in 16..80 {
        w[i] = (w[i - 3] ^ w[i - 8] ^ w[i - 14] ^ w[i - 16]).rotate_left(1);
    }

    let [mut a, mut b, mut c, mut d, mut e] = *state;

    for (j, &wj) in w.iter().enumerate() {
        let (f, k) = match j {
            0..=19 => ((b & c) | (!b & d), K[0]),
            20..=39 => (b ^ c ^ d, K[1]),
            40..=59 => ((b & c) | (b & d) | (c & d), K[2]),
            _ => (b ^ c ^ d, K[3]),
        };
        let temp = a
            .rotate_left(5)
            .wrapping_add(f)
            .wrapping_add(e)
            .wrapping_add(k)
            .wrapping_add(wj);
        e = d;
        d = c;
        c = b.rotate_left(30);
        b = a;
        a = temp;
    }

    state[0] = state[0].wrapping_add(a);
    state[1] = state[1].wrapping_add(b);
    state[2] = state[2].wrapping_add(c);
    state[3] = state[3].wrapping_add(d);
    state[4] = state[4].wrapping_add(e);
}

/// SHA-1 hash context.
#[derive(Clone)]
pub struct Sha1 {
    state: [u32; 5],
    count: u64,
    buffer: [u8; SHA1_BLOCK_SIZE],
    buffer_len: usize,
}

impl Sha1 {
    pub fn new() -> Self {
        Self {
            state: H_INIT,
            count: 0,
            buffer: [0u8; SHA1_BLOCK_SIZE],
            buffer_len: 0,
        }
    }

    pub fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        let mut offset = 0;
        if self.buffer_len > 0 {
            let need = SHA1_BLOCK_SIZE - self.buffer_len;
            if data.len() < need {
                self.buffer[self.buffer_len..self.buffer_len + data.len()].copy_from_slice(data);
                self.buffer_len += data.len();
                self.count += data.len() as u64;
                return Ok(());
            }
            self.buffer[self.buffer_len..].copy_from_slice(&data[..need]);
            let buf = self.buffer;
            compress(&mut self.state, &buf);
            offset = need;
            self.buffer_len = 0;
        }

        while offset + SHA1_BLOCK_SIZE <= data.len() {
            compress(&mut self.state, &data[offset..offset + SHA1_BLOCK_SIZE]);
            offset += SHA1_BLOCK_SIZE;
        }

        let remaining = data.len() - offset;
        if remaining > 0 {
            self.buffer[..remaining].copy_from_slice(&data[offset..]);
            self.buffer_len = remaining;
        }
        self.count += data.len() as u64;
        Ok(())
    }

    pub fn finish(&mut self) -> Result<[u8; SHA1_OUTPUT_SIZE], CryptoError> {
        let bit_len = self.count * 8;
        let mut pad = [0u8; SHA1_BLOCK_SIZE];
        let mut len = self.buffer_len;
        pad[..len].copy_from_slice(&self.buffer[..len]);
        pad[len] = 0x80;
        len += 1;

        if len > 56 {
            compress(&mut self.state, &pad);
            pad = [0u8; SHA1_BLOCK_SIZE];
        }
        pad[56..64].copy_from_slice(&bit_len.to_be_bytes());
        compress(&mut self.state, &pad);

        let mut out = [0u8; SHA1_OUTPUT_SIZE];
        for (i, &word) in self.state.iter().enumerate() {
            out[4 * i..4 * i + 4].copy_from_slice(&word.to_be_bytes());
        }
        Ok(out)
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    /// One-shot digest of `data`.
    pub fn digest(data: &[u8]) -> Result<[u8; SHA1_OUTPUT_SIZE], CryptoError> {
        let mut ctx = Self::new();
        ctx.update(data)?;
        ctx.finish()
    }
}

impl Default for Sha1 {
    fn default() -> Self {
        Self::new()
    }
}

impl crate::digest::Digest for Sha1 {
    fn output_size(&self) -> usize {
        SHA1_OUTPUT_SIZE
    }
    fn block_size(&self) -> usize {
        SHA1_BLOCK_SIZE
    }
    fn update(&mut self, data: &[u8]) -> Result<(), CryptoError> {
        self.update(data)
    }
    fn finish(&mut self, out: &mut [u8]) -> Result<(), CryptoError> {
        let digest = Sha1::finish(self)?;
        out[..SHA1_OUTPUT_SIZE].copy_from_slice(&digest);
        Ok(())
    }
    fn reset(&mut self) {
        self.reset()
    }
}
