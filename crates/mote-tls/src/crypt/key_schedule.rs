//! TLS 1.2 key derivation (RFC 5246 §6.3, §8.1).
//!
//! The key block for TLS_RSA_WITH_AES_128_CBC_SHA is 88 bytes:
//! client MAC key (20) || server MAC key (20) || client write key (16) ||
//! server write key (16) || IV seed (16, little-endian u128).

use super::prf::prf;
use super::{ENC_KEY_LEN, IV_SEED_LEN, KEY_BLOCK_LEN, MAC_LEN, MASTER_SECRET_LEN, VERIFY_DATA_LEN};
use mote_types::CryptoError;
use zeroize::Zeroize;

/// The per-session symmetric keys, both directions.
pub struct SessionKeys {
    pub client_mac_key: Vec<u8>,
    pub server_mac_key: Vec<u8>,
    pub client_write_key: Vec<u8>,
    pub server_write_key: Vec<u8>,
    /// Seed for the outbound per-record IV sequence.
    pub iv_seed: u128,
}

impl Drop for SessionKeys {
    fn drop(&mut self) {
        self.client_mac_key.zeroize();
        self.server_mac_key.zeroize();
        self.client_write_key.zeroize();
        self.server_write_key.zeroize();
        self.iv_seed = 0;
    }
}

/// master_secret = PRF(pre_master, "master secret", client_random || server_random, 48)
pub fn derive_master_secret(
    pre_master: &[u8],
    client_random: &[u8; 32],
    server_random: &[u8; 32],
) -> Result<Vec<u8>, CryptoError> {
    let mut seed = Vec::with_capacity(64);
    seed.extend_from_slice(client_random);
    seed.extend_from_slice(server_random);
    prf(pre_master, "master secret", &seed, MASTER_SECRET_LEN)
}

/// key_block = PRF(master, "key expansion", server_random || client_random, 88)
///
/// Note the randoms are reversed relative to the master-secret seed.
pub fn derive_session_keys(
    master_secret: &[u8],
    server_random: &[u8; 32],
    client_random: &[u8; 32],
) -> Result<SessionKeys, CryptoError> {
    let mut seed = Vec::with_capacity(64);
    seed.extend_from_slice(server_random);
    seed.extend_from_slice(client_random);

    let mut key_block = prf(master_secret, "key expansion", &seed, KEY_BLOCK_LEN)?;

    let mut offset = 0;
    let client_mac_key = key_block[offset..offset + MAC_LEN].to_vec();
    offset += MAC_LEN;
    let server_mac_key = key_block[offset..offset + MAC_LEN].to_vec();
    offset += MAC_LEN;
    let client_write_key = key_block[offset..offset + ENC_KEY_LEN].to_vec();
    offset += ENC_KEY_LEN;
    let server_write_key = key_block[offset..offset + ENC_KEY_LEN].to_vec();
    offset += ENC_KEY_LEN;
    let iv_bytes: [u8; IV_SEED_LEN] = key_block[offset..offset + IV_SEED_LEN]
        .try_into()
        .map_err(|_| CryptoError::InvalidArg)?;
    let iv_seed = u128::from_le_bytes(iv_bytes);

    key_block.zeroize();

    Ok(SessionKeys {
        client_mac_key,
        server_mac_key,
        client_write_key,
        server_write_key,
        iv_seed,
    })
}

/// verify_data = PRF(master, label, transcript_hash, 12)
///
/// `label` is `"client finished"` or `"server finished"`.
pub fn compute_verify_data(
    master_secret: &[u8],
    label: &str,
    transcript_hash: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    prf(master_secret, label, transcript_hash, VERIFY_DATA_LEN)
}
