//! TLS 1.2 client handshake engine.
//!
//! A flat expected-next-message discriminator plus the transcript drive
//! the fixed exchange:
//!
//! ```text
//! -> ClientHello
//! <- ServerHello, Certificate, CertificateRequest, ServerHelloDone
//! -> Certificate, ClientKeyExchange, [signature], CertificateVerify,
//!    ChangeCipherSpec, Finished
//! <- ChangeCipherSpec, Finished
//! ```
//!
//! The client flight pauses between ClientKeyExchange and
//! CertificateVerify while the transcript signature is produced; with an
//! external signer that suspension can outlive the connection, in which
//! case the result is discarded by the stream layer.

use crate::crypt::key_schedule::{
    compute_verify_data, derive_master_secret, derive_session_keys, SessionKeys,
};
use crate::crypt::transcript::{Direction, Transcript};
use crate::handshake::codec::{
    decode_certificate_list, decode_certificate_request, decode_finished, decode_server_hello,
    encode_certificate, encode_certificate_verify, encode_client_hello,
    encode_client_key_exchange, encode_finished, parse_handshake,
};
use crate::handshake::HandshakeType;
use crate::verify::{host_matches_cn, ChainVerifier, ValidityCheck, VerifyOptions};
use mote_crypto::rand;
use mote_crypto::rsa::RsaPublicKey;
use mote_types::{AlertDescription, TlsError};
use std::sync::Arc;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// The next server message (or local step) the engine will accept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    Idle,
    ServerHello,
    Certificate,
    CertificateRequest,
    ServerHelloDone,
    AwaitingSignature,
    ChangeCipherSpec,
    Finished,
    Established,
}

/// First half of the client flight, produced on ServerHelloDone.
pub struct FlightStart {
    pub certificate: Vec<u8>,
    pub client_key_exchange: Vec<u8>,
    /// Raw transcript concatenation to be signed (RSA-PKCS1-SHA256).
    pub sign_input: Vec<u8>,
}

/// Second half of the client flight, produced once the signature exists.
pub struct FlightFinish {
    pub certificate_verify: Vec<u8>,
    pub finished: Vec<u8>,
}

/// Outcome of feeding one server handshake message to the engine.
pub enum HandshakeAction {
    /// Message absorbed; nothing to send yet.
    Continue,
    /// Send the first half of the client flight and obtain a signature
    /// over `sign_input`.
    StartFlight(FlightStart),
    /// Server Finished verified; the session is established.
    Established,
}

/// TLS 1.2 client handshake state.
pub struct ClientHandshake {
    expect: Expect,
    transcript: Transcript,
    host: String,
    client_cert_der: Vec<u8>,
    roots_der: Vec<Vec<u8>>,
    validity: ValidityCheck,
    verifier: Arc<dyn ChainVerifier>,
    client_random: [u8; 32],
    server_random: [u8; 32],
    /// Echoed by the server; retained but unused (no resumption).
    session_id: Vec<u8>,
    pre_master: Vec<u8>,
    master_secret: Vec<u8>,
    keys: Option<SessionKeys>,
    server_public_key: Option<RsaPublicKey>,
}

fn unexpected(reason: impl Into<String>) -> TlsError {
    TlsError::protocol(AlertDescription::UnexpectedMessage, reason)
}

impl ClientHandshake {
    pub fn new(
        host: String,
        client_cert_der: Vec<u8>,
        roots_der: Vec<Vec<u8>>,
        validity: ValidityCheck,
        verifier: Arc<dyn ChainVerifier>,
    ) -> Self {
        Self {
            expect: Expect::Idle,
            transcript: Transcript::new(),
            host,
            client_cert_der,
            roots_der,
            validity,
            verifier,
            client_random: [0u8; 32],
            server_random: [0u8; 32],
            session_id: Vec::new(),
            pre_master: Vec::new(),
            master_secret: Vec::new(),
            keys: None,
            server_public_key: None,
        }
    }

    /// Build the ClientHello, entering the wait for ServerHello.
    pub fn start(&mut self) -> Result<Vec<u8>, TlsError> {
        if self.expect != Expect::Idle {
            return Err(unexpected("handshake already started"));
        }
        rand::fill(&mut self.client_random).map_err(TlsError::Crypto)?;
        let msg = encode_client_hello(&self.client_random);
        self.transcript
            .push(Direction::Client, HandshakeType::ClientHello, &msg);
        self.expect = Expect::ServerHello;
        Ok(msg)
    }

    /// Feed one complete server handshake message (header included).
    pub fn handle(&mut self, raw: &[u8]) -> Result<HandshakeAction, TlsError> {
        let (msg_type, body) = parse_handshake(raw)?;

        // Renegotiation refused by inaction, at any point.
        if msg_type == HandshakeType::HelloRequest {
            log::debug!("ignoring HelloRequest");
            return Ok(HandshakeAction::Continue);
        }

        match (msg_type, self.expect) {
            (HandshakeType::ServerHello, Expect::ServerHello) => {
                self.server_hello(raw, body)?;
                Ok(HandshakeAction::Continue)
            }
            (HandshakeType::Certificate, Expect::Certificate) => {
                self.certificate(raw, body)?;
                Ok(HandshakeAction::Continue)
            }
            (HandshakeType::CertificateRequest, Expect::CertificateRequest) => {
                decode_certificate_request(body)?;
                self.transcript
                    .push(Direction::Server, HandshakeType::CertificateRequest, raw);
                self.expect = Expect::ServerHelloDone;
                Ok(HandshakeAction::Continue)
            }
            (HandshakeType::ServerHelloDone, Expect::ServerHelloDone) => {
                let flight = self.server_hello_done(raw, body)?;
                Ok(HandshakeAction::StartFlight(flight))
            }
            (HandshakeType::Finished, Expect::Finished) => {
                self.finished(raw, body)?;
                Ok(HandshakeAction::Established)
            }
            (msg_type, expect) => Err(unexpected(format!(
                "{msg_type:?} while expecting {expect:?}"
            ))),
        }
    }

    fn server_hello(&mut self, raw: &[u8], body: &[u8]) -> Result<(), TlsError> {
        let sh = decode_server_hello(body)?;
        self.server_random = sh.random;
        self.session_id = sh.session_id;
        self.transcript
            .push(Direction::Server, HandshakeType::ServerHello, raw);

        // Both randoms are now fixed: choose the pre-master secret and
        // derive all keying material immediately.
        self.pre_master = vec![0u8; 48];
        self.pre_master[0] = 0x03;
        self.pre_master[1] = 0x03;
        rand::fill(&mut self.pre_master[2..]).map_err(TlsError::Crypto)?;

        self.master_secret =
            derive_master_secret(&self.pre_master, &self.client_random, &self.server_random)
                .map_err(TlsError::Crypto)?;
        self.keys = Some(
            derive_session_keys(&self.master_secret, &self.server_random, &self.client_random)
                .map_err(TlsError::Crypto)?,
        );

        self.expect = Expect::Certificate;
        Ok(())
    }

    fn certificate(&mut self, raw: &[u8], body: &[u8]) -> Result<(), TlsError> {
        let chain = decode_certificate_list(body)?;
        if chain.is_empty() {
            return Err(TlsError::protocol(
                AlertDescription::BadCertificate,
                "empty server certificate chain",
            ));
        }
        self.transcript
            .push(Direction::Server, HandshakeType::Certificate, raw);

        let opts = VerifyOptions {
            validity: self.validity,
        };
        self.verifier
            .verify_chain(&chain, &self.roots_der, &opts)
            .map_err(|e| TlsError::protocol(e.alert(), e.to_string()))?;

        let leaf = &chain[0];
        let cn = self
            .verifier
            .subject_common_name(leaf)
            .map_err(|e| TlsError::protocol(e.alert(), e.to_string()))?;
        if !host_matches_cn(&self.host, &cn) {
            return Err(TlsError::protocol(
                AlertDescription::CertificateUnknown,
                format!("certificate CN {cn:?} does not match host {:?}", self.host),
            ));
        }

        self.server_public_key = Some(
            self.verifier
                .leaf_public_key(leaf)
                .map_err(|e| TlsError::protocol(e.alert(), e.to_string()))?,
        );

        self.expect = Expect::CertificateRequest;
        Ok(())
    }

    fn server_hello_done(&mut self, raw: &[u8], body: &[u8]) -> Result<FlightStart, TlsError> {
        if !body.is_empty() {
            return Err(TlsError::protocol(
                AlertDescription::IllegalParameter,
                "ServerHelloDone with a non-empty body",
            ));
        }
        self.transcript
            .push(Direction::Server, HandshakeType::ServerHelloDone, raw);

        let certificate = encode_certificate(&self.client_cert_der);
        self.transcript
            .push(Direction::Client, HandshakeType::Certificate, &certificate);

        let server_key = self
            .server_public_key
            .as_ref()
            .ok_or_else(|| TlsError::protocol(AlertDescription::InternalError, "no server key"))?;
        let encrypted = server_key
            .encrypt(&self.pre_master)
            .map_err(TlsError::Crypto)?;
        let client_key_exchange = encode_client_key_exchange(&encrypted);
        self.transcript.push(
            Direction::Client,
            HandshakeType::ClientKeyExchange,
            &client_key_exchange,
        );

        // The CertificateVerify signature covers everything sent so far.
        let sign_input = self.transcript.concat();

        self.expect = Expect::AwaitingSignature;
        Ok(FlightStart {
            certificate,
            client_key_exchange,
            sign_input,
        })
    }

    /// Complete the client flight once the transcript signature exists.
    pub fn finish_flight(&mut self, signature: &[u8]) -> Result<FlightFinish, TlsError> {
        if self.expect != Expect::AwaitingSignature {
            return Err(unexpected("no signature was requested"));
        }
        let certificate_verify = encode_certificate_verify(signature);
        self.transcript.push(
            Direction::Client,
            HandshakeType::CertificateVerify,
            &certificate_verify,
        );

        let verify_data = compute_verify_data(
            &self.master_secret,
            "client finished",
            &self.transcript.hash().map_err(TlsError::Crypto)?,
        )
        .map_err(TlsError::Crypto)?;
        let finished = encode_finished(&verify_data);
        self.transcript
            .push(Direction::Client, HandshakeType::Finished, &finished);

        self.expect = Expect::ChangeCipherSpec;
        Ok(FlightFinish {
            certificate_verify,
            finished,
        })
    }

    /// The server's ChangeCipherSpec arrived; the caller installs the
    /// read decipher from [`Self::session_keys`].
    pub fn change_cipher_spec(&mut self) -> Result<(), TlsError> {
        if self.expect != Expect::ChangeCipherSpec {
            return Err(unexpected(format!(
                "ChangeCipherSpec while expecting {:?}",
                self.expect
            )));
        }
        self.expect = Expect::Finished;
        Ok(())
    }

    fn finished(&mut self, raw: &[u8], body: &[u8]) -> Result<(), TlsError> {
        debug_assert_eq!(
            self.transcript.last(),
            Some((Direction::Client, HandshakeType::Finished))
        );
        let received = decode_finished(body)?;
        let expected = compute_verify_data(
            &self.master_secret,
            "server finished",
            &self.transcript.hash().map_err(TlsError::Crypto)?,
        )
        .map_err(TlsError::Crypto)?;

        if received.ct_eq(&expected[..]).unwrap_u8() != 1 {
            return Err(TlsError::protocol(
                AlertDescription::DecryptError,
                "server Finished verify_data mismatch",
            ));
        }
        self.transcript
            .push(Direction::Server, HandshakeType::Finished, raw);
        self.expect = Expect::Established;
        Ok(())
    }

    /// The derived session keys, available from ServerHello until
    /// [`Self::release`].
    pub fn session_keys(&self) -> Option<&SessionKeys> {
        self.keys.as_ref()
    }

    /// The session id echoed by the server (unused, no resumption).
    pub fn session_id(&self) -> &[u8] {
        &self.session_id
    }

    /// Drop handshake-only material once the session is established.
    pub fn release(&mut self) {
        self.transcript.clear();
        self.pre_master.zeroize();
        self.pre_master.clear();
        self.master_secret.zeroize();
        self.master_secret.clear();
        self.keys = None;
        self.server_public_key = None;
    }
}

impl Drop for ClientHandshake {
    fn drop(&mut self) {
        self.pre_master.zeroize();
        self.master_secret.zeroize();
    }
}
