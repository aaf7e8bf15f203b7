//! Handshake transcript.
//!
//! Ordered raw handshake messages from both directions (HelloRequest is
//! never recorded). The concatenation feeds the CertificateVerify signer;
//! its SHA-256 digest feeds the Finished verify_data PRF.

use crate::handshake::HandshakeType;
use mote_crypto::sha256::Sha256;
use mote_types::CryptoError;
use zeroize::Zeroize;

/// Which peer produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Client,
    Server,
}

struct Entry {
    from: Direction,
    msg_type: HandshakeType,
    bytes: Vec<u8>,
}

/// The ordered handshake transcript.
#[derive(Default)]
pub struct Transcript {
    entries: Vec<Entry>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a full handshake message (header included).
    pub fn push(&mut self, from: Direction, msg_type: HandshakeType, bytes: &[u8]) {
        log::debug!("transcript += {msg_type:?} from {from:?} ({} bytes)", bytes.len());
        self.entries.push(Entry {
            from,
            msg_type,
            bytes: bytes.to_vec(),
        });
    }

    /// The last entry, as (direction, message type).
    pub fn last(&self) -> Option<(Direction, HandshakeType)> {
        self.entries.last().map(|e| (e.from, e.msg_type))
    }

    /// Byte concatenation of all entries, in order.
    pub fn concat(&self) -> Vec<u8> {
        let total: usize = self.entries.iter().map(|e| e.bytes.len()).sum();
        let mut out = Vec::with_capacity(total);
        for entry in &self.entries {
            out.extend_from_slice(&entry.bytes);
        }
        out
    }

    /// SHA-256 over the concatenation.
    pub fn hash(&self) -> Result<[u8; 32], CryptoError> {
        let mut hasher = Sha256::new();
        for entry in &self.entries {
            hasher.update(&entry.bytes)?;
        }
        hasher.finish()
    }

    /// Drop and zeroize all recorded messages.
    pub fn clear(&mut self) {
        for entry in &mut self.entries {
            entry.bytes.zeroize();
        }
        self.entries.clear();
    }
}
