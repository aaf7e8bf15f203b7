//! TLS 1.2 CBC record protection (RFC 5246 §6.2.3.2).
//!
//! MAC-then-encrypt on the way out, decrypt-then-verify on the way in:
//!
//! ```text
//! fragment = explicit_IV(16) || AES-128-CBC(plaintext || MAC(20) || padding)
//! MAC = HMAC-SHA1(mac_key, seq(8) || type(1) || 0x0303 || len(2) || plaintext)
//! ```
//!
//! Every inbound failure (framing, padding, or MAC) collapses into a
//! single `bad_record_mac` so the CBC padding oracle stays closed.

use crate::crypt::iv::IvSequence;
use crate::crypt::MAC_LEN;
use crate::record::{ContentType, MAX_PLAINTEXT_LEN};
use mote_crypto::aes::{AesKey, AES_BLOCK_SIZE};
use mote_crypto::cbc;
use mote_crypto::digest::Digest;
use mote_crypto::hmac::Hmac;
use mote_crypto::sha1::Sha1;
use mote_types::{AlertDescription, TlsError};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// TLS 1.2 record version bytes on the wire.
pub const RECORD_VERSION: [u8; 2] = [0x03, 0x03];

fn record_mac(
    mac_key: &[u8],
    seq: u64,
    content_type: ContentType,
    payload: &[u8],
) -> Result<Vec<u8>, TlsError> {
    let mut hmac = Hmac::new(|| Box::new(Sha1::new()) as Box<dyn Digest>, mac_key)
        .map_err(TlsError::Crypto)?;
    hmac.update(&seq.to_be_bytes()).map_err(TlsError::Crypto)?;
    hmac.update(&[content_type as u8]).map_err(TlsError::Crypto)?;
    hmac.update(&RECORD_VERSION).map_err(TlsError::Crypto)?;
    hmac.update(&(payload.len() as u16).to_be_bytes())
        .map_err(TlsError::Crypto)?;
    hmac.update(payload).map_err(TlsError::Crypto)?;
    let mut mac = vec![0u8; MAC_LEN];
    hmac.finish(&mut mac).map_err(TlsError::Crypto)?;
    Ok(mac)
}

fn next_seq(seq: &mut u64) -> Result<u64, TlsError> {
    let current = *seq;
    *seq = seq.checked_add(1).ok_or_else(|| {
        TlsError::protocol(
            AlertDescription::InternalError,
            "record sequence number overflow",
        )
    })?;
    Ok(current)
}

/// Outbound record protection.
pub struct CbcCipher {
    key: AesKey,
    mac_key: Vec<u8>,
    iv_seq: IvSequence,
    seq: u64,
}

impl Drop for CbcCipher {
    fn drop(&mut self) {
        self.mac_key.zeroize();
    }
}

impl CbcCipher {
    pub fn new(write_key: &[u8], mac_key: &[u8], iv_seed: u128) -> Result<Self, TlsError> {
        Ok(Self {
            key: AesKey::new(write_key).map_err(TlsError::Crypto)?,
            mac_key: mac_key.to_vec(),
            iv_seq: IvSequence::new(iv_seed),
            seq: 0,
        })
    }

    /// The sequence number the next record will be protected with.
    pub fn sequence(&self) -> u64 {
        self.seq
    }

    /// Protect `payload`, returning the record fragment `IV || ciphertext`.
    pub fn encrypt(
        &mut self,
        content_type: ContentType,
        payload: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        if payload.len() > MAX_PLAINTEXT_LEN {
            return Err(TlsError::protocol(
                AlertDescription::InternalError,
                "oversized outbound record",
            ));
        }
        let seq = next_seq(&mut self.seq)?;
        let mac = record_mac(&self.mac_key, seq, content_type, payload)?;

        // plaintext || MAC || padding, padded to the block size
        let data_len = payload.len() + MAC_LEN;
        let pad_count = AES_BLOCK_SIZE - data_len % AES_BLOCK_SIZE;
        let pad_byte = (pad_count - 1) as u8;
        let mut data = Vec::with_capacity(data_len + pad_count);
        data.extend_from_slice(payload);
        data.extend_from_slice(&mac);
        data.extend(std::iter::repeat(pad_byte).take(pad_count));

        let iv = self.iv_seq.next_iv().map_err(TlsError::Crypto)?;
        cbc::encrypt(&self.key, &iv, &mut data).map_err(TlsError::Crypto)?;

        let mut fragment = Vec::with_capacity(AES_BLOCK_SIZE + data.len());
        fragment.extend_from_slice(&iv);
        fragment.extend_from_slice(&data);
        Ok(fragment)
    }
}

/// Inbound record protection.
pub struct CbcDecipher {
    key: AesKey,
    mac_key: Vec<u8>,
    seq: u64,
}

impl Drop for CbcDecipher {
    fn drop(&mut self) {
        self.mac_key.zeroize();
    }
}

impl CbcDecipher {
    pub fn new(write_key: &[u8], mac_key: &[u8]) -> Result<Self, TlsError> {
        Ok(Self {
            key: AesKey::new(write_key).map_err(TlsError::Crypto)?,
            mac_key: mac_key.to_vec(),
            seq: 0,
        })
    }

    pub fn sequence(&self) -> u64 {
        self.seq
    }

    /// Open a record fragment `IV || ciphertext`, returning the plaintext.
    pub fn decrypt(
        &mut self,
        content_type: ContentType,
        fragment: &[u8],
    ) -> Result<Vec<u8>, TlsError> {
        let bad_mac =
            || TlsError::protocol(AlertDescription::BadRecordMac, "record authentication failed");

        // Minimum: IV plus two blocks (MAC alone spans more than one).
        if fragment.len() < 3 * AES_BLOCK_SIZE
            || (fragment.len() - AES_BLOCK_SIZE) % AES_BLOCK_SIZE != 0
        {
            return Err(bad_mac());
        }

        let iv: [u8; AES_BLOCK_SIZE] = fragment[..AES_BLOCK_SIZE]
            .try_into()
            .map_err(|_| bad_mac())?;
        let mut decrypted = fragment[AES_BLOCK_SIZE..].to_vec();
        cbc::decrypt(&self.key, &iv, &mut decrypted).map_err(|_| bad_mac())?;

        // Padding: last byte b means b+1 trailing bytes all equal to b.
        let pad_byte = decrypted[decrypted.len() - 1];
        let pad_count = pad_byte as usize + 1;
        let overhead = pad_count + MAC_LEN;
        let length_ok = overhead <= decrypted.len();

        let mut pad_ok = u8::from(length_ok);
        let pad_start = decrypted.len().saturating_sub(pad_count);
        for &b in &decrypted[pad_start..] {
            pad_ok &= b.ct_eq(&pad_byte).unwrap_u8();
        }

        let content_len = if length_ok {
            decrypted.len() - overhead
        } else {
            0
        };

        // Always compute the MAC to keep timing independent of padding.
        let seq = next_seq(&mut self.seq)?;
        let expected_mac = record_mac(&self.mac_key, seq, content_type, &decrypted[..content_len])?;
        let mac_slice = if length_ok {
            &decrypted[content_len..content_len + MAC_LEN]
        } else {
            &decrypted[..MAC_LEN]
        };
        let mac_ok = mac_slice.ct_eq(&expected_mac).unwrap_u8();

        if pad_ok & mac_ok != 1 {
            return Err(bad_mac());
        }

        decrypted.truncate(content_len);
        Ok(decrypted)
    }
}
