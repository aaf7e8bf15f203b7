//! Defragmenter and message reader.
//!
//! Consecutive records of one content type accumulate in a single current
//! fragment; protocol messages are sliced out of it per type. A record of
//! a different type arriving while a fragment is still incomplete is a
//! `decode_error`.

use crate::record::{ContentType, RecordFramer};
use mote_types::{AlertDescription, TlsError};

/// A protocol message sliced out of the record stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Message {
    /// The single ChangeCipherSpec body byte.
    ChangeCipherSpec(u8),
    /// Alert level and description bytes, unvalidated.
    Alert(u8, u8),
    /// A complete handshake message including its 4-byte header.
    Handshake { msg_type: u8, raw: Vec<u8> },
    /// Opaque application bytes.
    ApplicationData(Vec<u8>),
}

/// Reassembles protocol messages from the record stream.
#[derive(Default)]
pub struct Defragmenter {
    current: Option<(ContentType, Vec<u8>)>,
}

impl Defragmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Produce the next complete message, pulling records from `framer`
    /// as needed. `None` means more transport bytes are required.
    pub fn next_message(
        &mut self,
        framer: &mut RecordFramer,
    ) -> Result<Option<Message>, TlsError> {
        loop {
            if let Some((content_type, buf)) = &mut self.current {
                if let Some(message) = Self::slice_message(*content_type, buf)? {
                    if buf.is_empty() {
                        self.current = None;
                    }
                    return Ok(Some(message));
                }
            }

            let Some((content_type, payload)) = framer.next_record()? else {
                return Ok(None);
            };
            match &mut self.current {
                None => {
                    // Decryption can legally yield an empty payload; it
                    // contributes nothing.
                    if !payload.is_empty() {
                        self.current = Some((content_type, payload));
                    }
                }
                Some((current_type, buf)) => {
                    if *current_type != content_type {
                        return Err(TlsError::protocol(
                            AlertDescription::DecodeError,
                            "incomplete fragment",
                        ));
                    }
                    buf.extend_from_slice(&payload);
                }
            }
        }
    }

    fn slice_message(
        content_type: ContentType,
        buf: &mut Vec<u8>,
    ) -> Result<Option<Message>, TlsError> {
        match content_type {
            ContentType::Alert => {
                if buf.len() < 2 {
                    return Ok(None);
                }
                let (level, description) = (buf[0], buf[1]);
                buf.drain(..2);
                Ok(Some(Message::Alert(level, description)))
            }
            ContentType::ChangeCipherSpec => {
                let body = buf[0];
                buf.drain(..1);
                Ok(Some(Message::ChangeCipherSpec(body)))
            }
            ContentType::Handshake => {
                if buf.len() < 4 {
                    return Ok(None);
                }
                let length = u32::from_be_bytes([0, buf[1], buf[2], buf[3]]) as usize;
                let total = 4 + length;
                if buf.len() < total {
                    return Ok(None);
                }
                let msg_type = buf[0];
                let raw: Vec<u8> = buf.drain(..total).collect();
                Ok(Some(Message::Handshake { msg_type, raw }))
            }
            ContentType::ApplicationData => {
                let data = std::mem::take(buf);
                Ok(Some(Message::ApplicationData(data)))
            }
        }
    }
}
