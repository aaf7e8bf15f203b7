//! RSA with PKCS#1 v1.5 padding (RFC 8017).
//!
//! Covers what a TLS_RSA client touches: public-key encryption of the
//! pre-master secret, private-key signing of the handshake transcript
//! (RSASSA with SHA-256), plus the peer-side operations, private-key
//! decryption and public-key signature verification.

use crate::bignum::BigNum;
use crate::rand;
use mote_types::CryptoError;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// Smallest modulus accepted: 512 bits, the floor at which an
/// EMSA-PKCS1-v1_5 SHA-256 encoding still fits.
const MIN_MODULUS_BYTES: usize = 64;

/// DigestInfo DER prefix for SHA-256 (OID 2.16.840.1.101.3.4.2.1).
const DIGEST_INFO_SHA256: &[u8] = &[
    0x30, 0x31, 0x30, 0x0d, 0x06, 0x09, 0x60, 0x86, 0x48, 0x01, 0x65, 0x03, 0x04, 0x02, 0x01, 0x05,
    0x00, 0x04, 0x20,
];

/// An RSA public key (n, e).
#[derive(Clone)]
pub struct RsaPublicKey {
    n: BigNum,
    e: BigNum,
    /// Modulus length in bytes.
    k: usize,
}

impl RsaPublicKey {
    /// Build from big-endian modulus and exponent bytes.
    pub fn new(n: &[u8], e: &[u8]) -> Result<Self, CryptoError> {
        let n = BigNum::from_bytes_be(n);
        let e = BigNum::from_bytes_be(e);
        let k = n.bit_len().div_ceil(8);
        if k < MIN_MODULUS_BYTES || e.is_zero() {
            return Err(CryptoError::InvalidKey);
        }
        Ok(Self { n, e, k })
    }

    /// Modulus length in bytes.
    pub fn modulus_len(&self) -> usize {
        self.k
    }

    /// RSAES-PKCS1-v1_5 encryption of `msg`.
    pub fn encrypt(&self, msg: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let em = encrypt_pad(msg, self.k)?;
        let m = BigNum::from_bytes_be(&em);
        let c = m.mod_exp(&self.e, &self.n)?;
        c.to_bytes_be_padded(self.k)
    }

    /// RSASSA-PKCS1-v1_5 verification of a SHA-256 `digest` signature.
    pub fn verify(&self, digest: &[u8], signature: &[u8]) -> Result<bool, CryptoError> {
        if signature.len() != self.k {
            return Ok(false);
        }
        let s = BigNum::from_bytes_be(signature);
        if s >= self.n {
            return Ok(false);
        }
        let em = s.mod_exp(&self.e, &self.n)?.to_bytes_be_padded(self.k)?;
        let expected = sign_pad(digest, self.k)?;
        Ok(em.ct_eq(&expected).into())
    }
}

/// An RSA private key (n, e, d). Components are zeroized on drop.
pub struct RsaPrivateKey {
    public: RsaPublicKey,
    d: BigNum,
}

impl RsaPrivateKey {
    /// Build from big-endian component bytes.
    pub fn new(n: &[u8], e: &[u8], d: &[u8]) -> Result<Self, CryptoError> {
        let public = RsaPublicKey::new(n, e)?;
        let d = BigNum::from_bytes_be(d);
        if d.is_zero() {
            return Err(CryptoError::InvalidKey);
        }
        Ok(Self { public, d })
    }

    pub fn public_key(&self) -> &RsaPublicKey {
        &self.public
    }

    /// RSASSA-PKCS1-v1_5 signature over a SHA-256 `digest`.
    pub fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let k = self.public.k;
        let mut em = sign_pad(digest, k)?;
        let m = BigNum::from_bytes_be(&em);
        em.zeroize();
        let s = m.mod_exp(&self.d, &self.public.n)?;
        s.to_bytes_be_padded(k)
    }

    /// RSAES-PKCS1-v1_5 decryption.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let k = self.public.k;
        if ciphertext.len() != k {
            return Err(CryptoError::RsaInvalidPadding);
        }
        let c = BigNum::from_bytes_be(ciphertext);
        if c >= self.public.n {
            return Err(CryptoError::RsaInvalidPadding);
        }
        let em = c.mod_exp(&self.d, &self.public.n)?.to_bytes_be_padded(k)?;
        decrypt_unpad(&em)
    }
}

/// EMSA-PKCS1-v1_5 encoding: 0x00 || 0x01 || PS(0xFF) || 0x00 || DigestInfo.
fn sign_pad(digest: &[u8], k: usize) -> Result<Vec<u8>, CryptoError> {
    if digest.len() != 32 {
        return Err(CryptoError::InvalidArg);
    }
    let t_len = DIGEST_INFO_SHA256.len() + digest.len();
    if k < t_len + 11 {
        return Err(CryptoError::RsaInvalidPadding);
    }
    let ps_len = k - t_len - 3;
    let mut em = Vec::with_capacity(k);
    em.push(0x00);
    em.push(0x01);
    em.extend(std::iter::repeat(0xFF).take(ps_len));
    em.push(0x00);
    em.extend_from_slice(DIGEST_INFO_SHA256);
    em.extend_from_slice(digest);
    Ok(em)
}

/// RSAES-PKCS1-v1_5 encoding: 0x00 || 0x02 || PS(random nonzero) || 0x00 || M.
fn encrypt_pad(msg: &[u8], k: usize) -> Result<Vec<u8>, CryptoError> {
    if msg.len() > k.saturating_sub(11) {
        return Err(CryptoError::InputOverflow);
    }
    let ps_len = k - msg.len() - 3;
    let mut em = Vec::with_capacity(k);
    em.push(0x00);
    em.push(0x02);
    let mut ps = vec![0u8; ps_len];
    rand::fill_nonzero(&mut ps)?;
    em.extend_from_slice(&ps);
    em.push(0x00);
    em.extend_from_slice(msg);
    Ok(em)
}

/// Strip RSAES-PKCS1-v1_5 padding.
fn decrypt_unpad(em: &[u8]) -> Result<Vec<u8>, CryptoError> {
    if em.len() < 11 || em[0] != 0x00 || em[1] != 0x02 {
        return Err(CryptoError::RsaInvalidPadding);
    }
    let sep = em
        .iter()
        .enumerate()
        .skip(2)
        .find(|&(_, &b)| b == 0x00)
        .map(|(i, _)| i)
        .ok_or(CryptoError::RsaInvalidPadding)?;
    // PS must be at least 8 bytes
    if sep < 10 {
        return Err(CryptoError::RsaInvalidPadding);
    }
    Ok(em[sep + 1..].to_vec())
}
