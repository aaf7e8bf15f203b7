//! The duplex stream façade.
//!
//! `TlsStream` owns the transport handle, the record framer, the
//! defragmenter, and the handshake engine, and presents the upper layer
//! with a byte-stream contract: `write`/`end`/`destroy`/`read` calls in,
//! queued events out. It is driven from a single logical task; transport
//! events are delivered through the `transport_*` methods.

use crate::alert::Alert;
use crate::config::TlsOptions;
use crate::handshake::client::{ClientHandshake, FlightStart, HandshakeAction};
use crate::record::defrag::{Defragmenter, Message};
use crate::record::encryption::{CbcCipher, CbcDecipher};
use crate::record::{ContentType, RecordFramer, MAX_PLAINTEXT_LEN};
use crate::signer::{self, ClientKey};
use crate::transport::Transport;
use crate::verify::ChainVerifier;
use mote_types::{AlertDescription, AlertLevel, SignerError, TlsError};
use std::collections::VecDeque;
use std::sync::Arc;

/// Connection lifecycle. `Terminated` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connecting,
    Handshaking,
    Established,
    Terminated,
}

/// Upward events. Decrypted application bytes are not an event: they are
/// pulled with [`TlsStream::read`].
#[derive(Debug)]
pub enum StreamEvent {
    /// Read side ended (peer close or local shutdown).
    End,
    /// The stream is fully torn down. Always follows `End` when emitted.
    Close,
    /// A session error with no pending write to attach it to.
    Error(TlsError),
    /// A previously suspended write settled.
    WriteDone(Result<(), TlsError>),
    /// The external signer must sign these bytes and answer via
    /// [`TlsStream::provide_signature`].
    SignatureRequest(Vec<u8>),
}

/// Why the termination controller is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TerminateReason {
    /// Upper layer called `end()`.
    Final,
    /// Upper layer called `destroy()`.
    Destroy,
    /// Transport closed without a close_notify.
    Socket,
    /// A local error (protocol, crypto, transport, signer).
    Error,
    /// A fatal alert arrived from the peer.
    Alert,
    /// The peer sent close_notify.
    CloseNotify,
}

/// The single pending upper-layer write.
enum PendingWrite {
    /// Issued before ESTABLISHED; held until the handshake completes.
    AwaitingSession { chunk: Vec<u8> },
    /// Accepted but waiting for the transport to drain.
    AwaitingDrain,
}

/// Pause inbound flow once this many unread plaintext bytes are queued.
const READ_HIGH_WATER: usize = 16 * 1024;

/// A TLS 1.2 client session over `T`.
pub struct TlsStream<T: Transport> {
    transport: T,
    state: ConnectionState,
    framer: RecordFramer,
    defrag: Defragmenter,
    engine: ClientHandshake,
    key: ClientKey,
    pending_write: Option<PendingWrite>,
    events: VecDeque<StreamEvent>,
    readable: VecDeque<Vec<u8>>,
    readable_bytes: usize,
    paused: bool,
    /// Set while the engine waits for an external signature.
    sign_pending: bool,
    /// Transport listeners are logically detached once terminated.
    detached: bool,
}

impl<T: Transport> TlsStream<T> {
    pub fn new(options: TlsOptions, verifier: Arc<dyn ChainVerifier>, transport: T) -> Self {
        let TlsOptions {
            host,
            roots_der,
            cert_der,
            key,
            validity,
            ..
        } = options;
        Self {
            transport,
            state: ConnectionState::Connecting,
            framer: RecordFramer::new(),
            defrag: Defragmenter::new(),
            engine: ClientHandshake::new(host, cert_der, roots_der, validity, verifier),
            key,
            pending_write: None,
            events: VecDeque::new(),
            readable: VecDeque::new(),
            readable_bytes: 0,
            paused: false,
            sign_pending: false,
            detached: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Borrow the transport (drivers flush its queued bytes).
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The next outbound protected-record sequence number, once write
    /// protection is active.
    pub fn write_sequence(&self) -> Option<u64> {
        self.framer.write_sequence()
    }

    /// Pop the next queued upward event.
    pub fn poll_event(&mut self) -> Option<StreamEvent> {
        self.events.pop_front()
    }

    // -----------------------------------------------------------------
    // Transport events
    // -----------------------------------------------------------------

    /// The transport finished connecting: start the handshake.
    pub fn transport_connected(&mut self) {
        if self.state != ConnectionState::Connecting {
            return;
        }
        self.state = ConnectionState::Handshaking;
        log::debug!("transport connected, sending ClientHello");
        match self.engine.start() {
            Ok(client_hello) => {
                if let Err(e) = self.send_record(ContentType::Handshake, &client_hello) {
                    self.terminate(TerminateReason::Error, Some(e));
                }
            }
            Err(e) => self.terminate(TerminateReason::Error, Some(e)),
        }
    }

    /// Inbound transport bytes.
    pub fn transport_data(&mut self, bytes: &[u8]) {
        if self.detached {
            return;
        }
        self.framer.feed(bytes);
        self.process_inbound();
    }

    /// The transport's outbound buffer drained.
    pub fn transport_drain(&mut self) {
        if self.detached {
            return;
        }
        if matches!(self.pending_write, Some(PendingWrite::AwaitingDrain)) {
            self.pending_write = None;
            self.events.push_back(StreamEvent::WriteDone(Ok(())));
        }
    }

    /// The transport closed.
    pub fn transport_closed(&mut self) {
        if self.detached {
            return;
        }
        self.terminate(TerminateReason::Socket, None);
    }

    /// The transport failed.
    pub fn transport_error(&mut self, error: std::io::Error) {
        if self.detached {
            return;
        }
        self.terminate(TerminateReason::Error, Some(TlsError::Io(error)));
    }

    // -----------------------------------------------------------------
    // Upper-layer operations
    // -----------------------------------------------------------------

    /// Write plaintext. Returns the accept signal: `false` means the
    /// write is suspended and will settle with a `WriteDone` event.
    pub fn write(&mut self, chunk: &[u8]) -> Result<bool, TlsError> {
        match self.state {
            ConnectionState::Terminated => Err(TlsError::BrokenPipe("write after close")),
            ConnectionState::Connecting | ConnectionState::Handshaking => {
                if self.pending_write.is_some() {
                    return Err(TlsError::WritePending);
                }
                self.pending_write = Some(PendingWrite::AwaitingSession {
                    chunk: chunk.to_vec(),
                });
                Ok(false)
            }
            ConnectionState::Established => {
                if self.pending_write.is_some() {
                    return Err(TlsError::WritePending);
                }
                let accepted = self.write_application_data(chunk);
                if self.state == ConnectionState::Terminated {
                    // The failed write settles through a WriteDone event.
                    return Ok(false);
                }
                if !accepted {
                    self.pending_write = Some(PendingWrite::AwaitingDrain);
                }
                Ok(accepted)
            }
        }
    }

    /// Graceful close: alerts, transport end, `Close` event. No error.
    pub fn end(&mut self) {
        if self.state == ConnectionState::Terminated {
            return;
        }
        self.terminate(TerminateReason::Final, None);
    }

    /// Immediate teardown without waiting.
    pub fn destroy(&mut self, error: Option<TlsError>) {
        if self.state == ConnectionState::Terminated {
            return;
        }
        self.terminate(TerminateReason::Destroy, error);
    }

    /// Pull decrypted application bytes. Resumes a paused transport.
    pub fn read(&mut self) -> Option<Vec<u8>> {
        let chunk = self.readable.pop_front();
        if let Some(chunk) = &chunk {
            self.readable_bytes -= chunk.len();
        }
        if self.paused && self.state != ConnectionState::Terminated {
            self.paused = false;
            self.transport.resume();
        }
        chunk
    }

    /// Deliver the external signer's result. A completion arriving after
    /// termination (or without a request) is discarded.
    pub fn provide_signature(&mut self, result: Result<Vec<u8>, SignerError>) {
        if self.state != ConnectionState::Handshaking || !self.sign_pending {
            log::warn!("discarding late signer completion");
            return;
        }
        self.sign_pending = false;
        match result {
            Ok(signature) => self.continue_flight(&signature),
            Err(e) => self.terminate(TerminateReason::Error, Some(TlsError::Signer(e))),
        }
    }

    // -----------------------------------------------------------------
    // Inbound dispatch
    // -----------------------------------------------------------------

    fn process_inbound(&mut self) {
        while self.state != ConnectionState::Terminated {
            match self.defrag.next_message(&mut self.framer) {
                Ok(Some(message)) => {
                    if let Err(e) = self.dispatch(message) {
                        self.terminate(TerminateReason::Error, Some(e));
                        return;
                    }
                }
                Ok(None) => return,
                Err(e) => {
                    self.terminate(TerminateReason::Error, Some(e));
                    return;
                }
            }
        }
    }

    fn dispatch(&mut self, message: Message) -> Result<(), TlsError> {
        match message {
            Message::Alert(level, description) => {
                let alert = Alert::parse(level, description)?;
                if alert.description == AlertDescription::CloseNotify {
                    self.terminate(TerminateReason::CloseNotify, None);
                } else if alert.level == AlertLevel::Fatal {
                    self.terminate(
                        TerminateReason::Alert,
                        Some(TlsError::PeerAlert(alert.description)),
                    );
                } else {
                    log::warn!("ignoring warning alert: {:?}", alert.description);
                }
                Ok(())
            }
            Message::ChangeCipherSpec(body) => {
                if body != 0x01 {
                    return Err(TlsError::protocol(
                        AlertDescription::DecodeError,
                        "malformed ChangeCipherSpec",
                    ));
                }
                if self.state != ConnectionState::Handshaking {
                    return Err(TlsError::protocol(
                        AlertDescription::UnexpectedMessage,
                        "ChangeCipherSpec outside the handshake",
                    ));
                }
                self.engine.change_cipher_spec()?;
                let keys = self.engine.session_keys().ok_or_else(|| {
                    TlsError::protocol(AlertDescription::InternalError, "keys not derived")
                })?;
                let decipher = CbcDecipher::new(&keys.server_write_key, &keys.server_mac_key)?;
                self.framer.activate_decipher(decipher);
                log::debug!("server ChangeCipherSpec: read protection active");
                Ok(())
            }
            Message::Handshake { raw, .. } => match self.state {
                ConnectionState::Handshaking => self.handshake_message(&raw),
                _ => {
                    // Only renegotiation attempts arrive here; they are
                    // refused by inaction.
                    if raw.first() == Some(&0) {
                        log::debug!("ignoring HelloRequest");
                        Ok(())
                    } else {
                        Err(TlsError::protocol(
                            AlertDescription::UnexpectedMessage,
                            "handshake message outside the handshake",
                        ))
                    }
                }
            },
            Message::ApplicationData(data) => {
                if self.state != ConnectionState::Established {
                    return Err(TlsError::protocol(
                        AlertDescription::UnexpectedMessage,
                        "application data before the handshake completed",
                    ));
                }
                self.readable_bytes += data.len();
                self.readable.push_back(data);
                if !self.paused && self.readable_bytes > READ_HIGH_WATER {
                    self.paused = true;
                    self.transport.pause();
                }
                Ok(())
            }
        }
    }

    fn handshake_message(&mut self, raw: &[u8]) -> Result<(), TlsError> {
        match self.engine.handle(raw)? {
            HandshakeAction::Continue => Ok(()),
            HandshakeAction::StartFlight(flight) => self.start_flight(flight),
            HandshakeAction::Established => {
                self.on_established();
                Ok(())
            }
        }
    }

    fn start_flight(&mut self, flight: FlightStart) -> Result<(), TlsError> {
        self.send_record(ContentType::Handshake, &flight.certificate)?;
        self.send_record(ContentType::Handshake, &flight.client_key_exchange)?;
        let signature = match &self.key {
            ClientKey::Local(key) => Some(signer::sign_transcript(key, &flight.sign_input)?),
            ClientKey::External => None,
        };
        match signature {
            Some(signature) => self.continue_flight(&signature),
            None => {
                self.sign_pending = true;
                self.events
                    .push_back(StreamEvent::SignatureRequest(flight.sign_input));
            }
        }
        Ok(())
    }

    /// Send CertificateVerify, ChangeCipherSpec, and Finished, switching
    /// on write protection in between.
    fn continue_flight(&mut self, signature: &[u8]) {
        let result = (|| -> Result<(), TlsError> {
            let finish = self.engine.finish_flight(signature)?;
            self.send_record(ContentType::Handshake, &finish.certificate_verify)?;
            self.send_record(ContentType::ChangeCipherSpec, &[0x01])?;

            let keys = self.engine.session_keys().ok_or_else(|| {
                TlsError::protocol(AlertDescription::InternalError, "keys not derived")
            })?;
            let cipher =
                CbcCipher::new(&keys.client_write_key, &keys.client_mac_key, keys.iv_seed)?;
            self.framer.activate_cipher(cipher);
            log::debug!("client ChangeCipherSpec: write protection active");

            self.send_record(ContentType::Handshake, &finish.finished)?;
            Ok(())
        })();
        if let Err(e) = result {
            self.terminate(TerminateReason::Error, Some(e));
        }
    }

    fn on_established(&mut self) {
        self.state = ConnectionState::Established;
        self.engine.release();
        log::debug!("session established");

        // Resubmit the write that was parked during the handshake.
        if let Some(PendingWrite::AwaitingSession { chunk }) = self.pending_write.take() {
            if self.state != ConnectionState::Terminated {
                let accepted = self.write_application_data(&chunk);
                if self.state == ConnectionState::Terminated {
                    return;
                }
                if accepted {
                    self.events.push_back(StreamEvent::WriteDone(Ok(())));
                } else {
                    self.pending_write = Some(PendingWrite::AwaitingDrain);
                }
            }
        }
    }

    // -----------------------------------------------------------------
    // Outbound
    // -----------------------------------------------------------------

    /// Seal and send application data in record-sized chunks. Returns the
    /// transport accept signal of the final record. On transport failure
    /// the session terminates and the error settles the pending write.
    fn write_application_data(&mut self, chunk: &[u8]) -> bool {
        let mut accepted = true;
        let mut offset = 0;
        while offset < chunk.len() {
            let end = usize::min(offset + MAX_PLAINTEXT_LEN, chunk.len());
            match self.send_record(ContentType::ApplicationData, &chunk[offset..end]) {
                Ok(ok) => accepted = ok,
                Err(e) => {
                    self.pending_write = Some(PendingWrite::AwaitingDrain);
                    self.terminate(TerminateReason::Error, Some(e));
                    return false;
                }
            }
            offset = end;
        }
        accepted
    }

    fn send_record(&mut self, content_type: ContentType, payload: &[u8]) -> Result<bool, TlsError> {
        let record = self.framer.seal(content_type, payload)?;
        Ok(self.transport.write(&record)?)
    }

    /// Best-effort alert emission; transport failures are swallowed.
    fn send_alert(&mut self, alert: Alert) {
        if let Ok(record) = self.framer.seal(ContentType::Alert, &alert.encode()) {
            let _ = self.transport.write(&record);
        }
    }

    // -----------------------------------------------------------------
    // Termination controller
    // -----------------------------------------------------------------

    fn terminate(&mut self, reason: TerminateReason, error: Option<TlsError>) {
        if self.state == ConnectionState::Terminated {
            return;
        }
        let was_handshaking = matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Handshaking
        );
        log::debug!("terminating: {reason:?} (error: {error:?})");

        // Alerts, best effort.
        match reason {
            TerminateReason::Final | TerminateReason::Destroy => {
                if was_handshaking {
                    self.send_alert(Alert::warning(AlertDescription::UserCanceled));
                }
                self.send_alert(Alert::warning(AlertDescription::CloseNotify));
            }
            TerminateReason::CloseNotify => {
                self.send_alert(Alert::warning(AlertDescription::CloseNotify));
            }
            TerminateReason::Error => {
                let description = error
                    .as_ref()
                    .and_then(TlsError::alert_description)
                    .unwrap_or(AlertDescription::InternalError);
                self.send_alert(Alert::fatal(description));
            }
            TerminateReason::Alert | TerminateReason::Socket => {}
        }

        // Detach and release the transport exactly once.
        self.detached = true;
        if reason == TerminateReason::Destroy {
            self.transport.destroy();
        } else {
            self.transport.end();
        }

        self.state = ConnectionState::Terminated;

        // Read-side end signal.
        if reason != TerminateReason::Destroy {
            self.events.push_back(StreamEvent::End);
        }

        // Settle the pending write and surface the error.
        let mut effective = error;
        if effective.is_none() {
            effective = match reason {
                TerminateReason::Socket => Some(TlsError::PrematureClose),
                TerminateReason::CloseNotify if was_handshaking => {
                    Some(TlsError::HandshakeInterrupted)
                }
                TerminateReason::CloseNotify if self.pending_write.is_some() => {
                    Some(TlsError::BrokenPipe("socket ended by peer"))
                }
                _ => None,
            };
        }
        if self.pending_write.take().is_some() {
            let outcome = match effective.take() {
                Some(e) => Err(e),
                None => Ok(()),
            };
            self.events.push_back(StreamEvent::WriteDone(outcome));
        }
        if let Some(e) = effective {
            self.events.push_back(StreamEvent::Error(e));
        }

        // The close event follows the end signal, never precedes it.
        if reason != TerminateReason::Destroy {
            self.events.push_back(StreamEvent::Close);
        }
    }
}
