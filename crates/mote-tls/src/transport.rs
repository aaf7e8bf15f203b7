//! The downward transport seam.
//!
//! The stream is the sole owner of its transport and the only caller of
//! these methods. Transport-side events (data, drain, close, error,
//! connect) are delivered *to* the stream via its `transport_*` methods.

use std::collections::VecDeque;
use std::io;

/// A reliable ordered byte-stream transport, as seen from the TLS layer.
pub trait Transport {
    /// Queue bytes for sending. Returns the accept signal: `false` means
    /// the transport is above its buffering limit and a drain event will
    /// follow once it empties.
    fn write(&mut self, bytes: &[u8]) -> io::Result<bool>;
    /// Graceful shutdown after pending bytes flush.
    fn end(&mut self);
    /// Immediate teardown.
    fn destroy(&mut self);
    /// Stop delivering inbound data.
    fn pause(&mut self);
    /// Resume delivering inbound data.
    fn resume(&mut self);
}

/// An in-memory transport: a byte queue with a high-water mark.
///
/// Drivers (the tokio connector, tests) move bytes between this queue and
/// the real socket and feed the resulting events back into the stream.
pub struct BufferedTransport {
    out: VecDeque<u8>,
    high_water: usize,
    drain_pending: bool,
    ended: bool,
    destroyed: bool,
    paused: bool,
}

/// Default socket buffering limit.
const DEFAULT_HIGH_WATER: usize = 64 * 1024;

impl BufferedTransport {
    pub fn new() -> Self {
        Self::with_high_water(DEFAULT_HIGH_WATER)
    }

    pub fn with_high_water(high_water: usize) -> Self {
        Self {
            out: VecDeque::new(),
            high_water,
            drain_pending: false,
            ended: false,
            destroyed: false,
            paused: false,
        }
    }

    /// Drain all queued outbound bytes.
    pub fn take_output(&mut self) -> Vec<u8> {
        self.out.drain(..).collect()
    }

    /// True once the queue has emptied after a rejected write; the caller
    /// should then deliver a drain event to the stream. Clears the flag.
    pub fn poll_drain(&mut self) -> bool {
        if self.drain_pending && self.out.is_empty() {
            self.drain_pending = false;
            true
        } else {
            false
        }
    }

    pub fn is_ended(&self) -> bool {
        self.ended
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

impl Default for BufferedTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for BufferedTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<bool> {
        if self.destroyed || self.ended {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "transport closed"));
        }
        self.out.extend(bytes);
        if self.out.len() > self.high_water {
            self.drain_pending = true;
            Ok(false)
        } else {
            Ok(true)
        }
    }

    fn end(&mut self) {
        self.ended = true;
    }

    fn destroy(&mut self) {
        self.destroyed = true;
        self.out.clear();
    }

    fn pause(&mut self) {
        self.paused = true;
    }

    fn resume(&mut self) {
        self.paused = false;
    }
}
