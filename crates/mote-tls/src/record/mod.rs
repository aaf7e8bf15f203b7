//! TLS record layer: framing, limits, and optional protection.

pub mod defrag;
pub mod encryption;

use self::encryption::{CbcCipher, CbcDecipher, RECORD_VERSION};
use mote_types::{AlertDescription, TlsError};

/// Maximum plaintext record payload (2^14).
pub const MAX_PLAINTEXT_LEN: usize = 1 << 14;

/// Maximum ciphertext expansion allowed over the plaintext limit.
pub const MAX_CIPHERTEXT_EXPANSION: usize = 2048;

/// Record header length: type(1) + version(2) + length(2).
pub const HEADER_LEN: usize = 5;

/// TLS record content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ContentType {
    ChangeCipherSpec = 20,
    Alert = 21,
    Handshake = 22,
    ApplicationData = 23,
}

impl ContentType {
    pub fn from_u8(v: u8) -> Result<Self, u8> {
        match v {
            20 => Ok(ContentType::ChangeCipherSpec),
            21 => Ok(ContentType::Alert),
            22 => Ok(ContentType::Handshake),
            23 => Ok(ContentType::ApplicationData),
            _ => Err(v),
        }
    }
}

/// Record framer: buffers inbound transport bytes and emits decrypted
/// records; frames (and protects) outbound payloads.
///
/// After every parse pass the inbound buffer holds less than a full
/// header or less than a full record body.
#[derive(Default)]
pub struct RecordFramer {
    inbuf: Vec<u8>,
    cipher: Option<CbcCipher>,
    decipher: Option<CbcDecipher>,
}

impl RecordFramer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install outbound protection. Subsequent `seal` calls encrypt.
    pub fn activate_cipher(&mut self, cipher: CbcCipher) {
        self.cipher = Some(cipher);
    }

    /// Install inbound protection. Subsequent records are deciphered.
    pub fn activate_decipher(&mut self, decipher: CbcDecipher) {
        self.decipher = Some(decipher);
    }

    /// The next outbound protected-record sequence number, once a cipher
    /// is active.
    pub fn write_sequence(&self) -> Option<u64> {
        self.cipher.as_ref().map(|c| c.sequence())
    }

    /// Accept raw transport bytes.
    pub fn feed(&mut self, bytes: &[u8]) {
        self.inbuf.extend_from_slice(bytes);
    }

    /// Emit the next complete record, if buffered.
    pub fn next_record(&mut self) -> Result<Option<(ContentType, Vec<u8>)>, TlsError> {
        if self.inbuf.len() < HEADER_LEN {
            return Ok(None);
        }

        let content_type = ContentType::from_u8(self.inbuf[0]).map_err(|v| {
            TlsError::protocol(
                AlertDescription::DecodeError,
                format!("unknown record content type {v}"),
            )
        })?;
        if self.inbuf[1..3] != RECORD_VERSION {
            return Err(TlsError::protocol(
                AlertDescription::DecodeError,
                "record version is not TLS 1.2",
            ));
        }
        let length = u16::from_be_bytes([self.inbuf[3], self.inbuf[4]]) as usize;
        if length == 0 {
            return Err(TlsError::protocol(
                AlertDescription::DecodeError,
                "zero-length record",
            ));
        }
        let limit = if self.decipher.is_some() {
            MAX_PLAINTEXT_LEN + MAX_CIPHERTEXT_EXPANSION
        } else {
            MAX_PLAINTEXT_LEN
        };
        if length > limit {
            return Err(TlsError::protocol(
                AlertDescription::RecordOverflow,
                format!("record length {length} exceeds limit {limit}"),
            ));
        }

        if self.inbuf.len() < HEADER_LEN + length {
            return Ok(None);
        }

        let fragment: Vec<u8> = self.inbuf[HEADER_LEN..HEADER_LEN + length].to_vec();
        self.inbuf.drain(..HEADER_LEN + length);

        let payload = match &mut self.decipher {
            Some(decipher) => decipher.decrypt(content_type, &fragment)?,
            None => fragment,
        };
        Ok(Some((content_type, payload)))
    }

    /// Frame (and, with an active cipher, protect) an outbound payload.
    /// `payload` must not exceed the plaintext limit.
    pub fn seal(&mut self, content_type: ContentType, payload: &[u8]) -> Result<Vec<u8>, TlsError> {
        if payload.len() > MAX_PLAINTEXT_LEN {
            return Err(TlsError::protocol(
                AlertDescription::InternalError,
                "outbound payload exceeds record limit",
            ));
        }
        let fragment = match &mut self.cipher {
            Some(cipher) => cipher.encrypt(content_type, payload)?,
            None => payload.to_vec(),
        };
        let mut record = Vec::with_capacity(HEADER_LEN + fragment.len());
        record.push(content_type as u8);
        record.extend_from_slice(&RECORD_VERSION);
        record.extend_from_slice(&(fragment.len() as u16).to_be_bytes());
        record.extend_from_slice(&fragment);
        Ok(record)
    }
}
