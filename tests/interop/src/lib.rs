//! Scenario tests for the mote TLS client.
//!
//! A scripted in-process server speaks the other half of the protocol
//! using the workspace's own primitives (PRF, CBC record protection, RSA
//! decrypt/verify), so every handshake here exercises both directions of
//! the record layer and the full key schedule.

#[cfg(test)]
mod tests {
    use mote_crypto::rsa::{RsaPrivateKey, RsaPublicKey};
    use mote_crypto::sha256::Sha256;
    use mote_tls::config::TlsOptions;
    use mote_tls::crypt::key_schedule::{
        compute_verify_data, derive_master_secret, derive_session_keys, SessionKeys,
    };
    use mote_tls::handshake::codec::{
        encode_certificate, parse_handshake, wrap_handshake, CIPHER_SUITE, PROTOCOL_VERSION,
        SIGNATURE_ALGORITHM,
    };
    use mote_tls::handshake::HandshakeType;
    use mote_tls::record::defrag::{Defragmenter, Message};
    use mote_tls::record::encryption::{CbcCipher, CbcDecipher};
    use mote_tls::record::{ContentType, RecordFramer};
    use mote_tls::signer::{sign_transcript, ClientKey};
    use mote_tls::stream::{ConnectionState, StreamEvent, TlsStream};
    use mote_tls::transport::BufferedTransport;
    use mote_tls::verify::{ChainVerifier, ChainVerifyError, ValidityCheck, VerifyOptions};
    use mote_types::{AlertDescription, TlsError};
    use std::sync::Arc;

    fn hex(s: &str) -> Vec<u8> {
        (0..s.len())
            .step_by(2)
            .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
            .collect()
    }

    // 512-bit RSA fixtures: the device identity and the broker identity.
    const CLIENT_N: &str = "ad43269f60cef51c6cb0c81af5d2088a5c4054225f245a311afe4e721aef666dc268bb0097c079f887ea084eb98d5d235ffae299ee7824443ea0c4328a63fed7";
    const CLIENT_D: &str = "44b7453220aaf3fb7a0002dcee7186819964c9f977d26b12dea9cd62e3dbdebb3224903e651559b53a1e6bb43735c4d4e35a90332c9984c3da6f35f217baa281";
    const SERVER_N: &str = "ed6315ae5cb1e17e040ed434bcf05fe15414bbdc0be80f41e86c1b765edb69d91d3b850fac6eae429dd30c878e161f13fa1810c03db87dea345b46be2c61208b";
    const SERVER_D: &str = "8764c321eec699e8e8e19850f80e55714c26833b2f234d48770ae9e2ea995455a2aca1e27f810e657c652702f639bdc5c269799d50dc31b30c2353002551a461";

    const RSA_E: &[u8] = &[0x01, 0x00, 0x01];
    const HOST: &str = "broker.example.com";
    const SERVER_RANDOM: [u8; 32] = [0x5A; 32];
    const CLIENT_CERT_DER: &[u8] = &[0x30, 0x06, 0x02, 0x01, 0x01, 0x02, 0x01, 0x02];
    const SERVER_CERT_DER: &[u8] = &[0x30, 0x06, 0x02, 0x01, 0x03, 0x02, 0x01, 0x04];

    fn client_private_key() -> RsaPrivateKey {
        RsaPrivateKey::new(&hex(CLIENT_N), RSA_E, &hex(CLIENT_D)).unwrap()
    }

    fn server_private_key() -> RsaPrivateKey {
        RsaPrivateKey::new(&hex(SERVER_N), RSA_E, &hex(SERVER_D)).unwrap()
    }

    /// Stub chain verifier standing in for the external X.509 collaborator.
    struct FixtureVerifier {
        cn: &'static str,
    }

    impl ChainVerifier for FixtureVerifier {
        fn verify_chain(
            &self,
            chain: &[Vec<u8>],
            _roots: &[Vec<u8>],
            _opts: &VerifyOptions,
        ) -> Result<(), ChainVerifyError> {
            if chain[0] == SERVER_CERT_DER {
                Ok(())
            } else {
                Err(ChainVerifyError::UnknownCa)
            }
        }
        fn subject_common_name(&self, _leaf: &[u8]) -> Result<String, ChainVerifyError> {
            Ok(self.cn.to_string())
        }
        fn leaf_public_key(&self, _leaf: &[u8]) -> Result<RsaPublicKey, ChainVerifyError> {
            RsaPublicKey::new(&hex(SERVER_N), RSA_E).map_err(|_| ChainVerifyError::BadCertificate)
        }
    }

    fn new_client(key: ClientKey) -> TlsStream<BufferedTransport> {
        let options = TlsOptions {
            host: HOST.into(),
            port: 8883,
            roots_der: vec![b"root".to_vec()],
            cert_der: CLIENT_CERT_DER.to_vec(),
            key,
            validity: ValidityCheck::Skip,
        };
        TlsStream::new(
            options,
            Arc::new(FixtureVerifier { cn: "*.example.com" }),
            BufferedTransport::new(),
        )
    }

    fn plain_record(content_type: ContentType, fragment: &[u8]) -> Vec<u8> {
        let mut record = vec![content_type as u8, 0x03, 0x03];
        record.extend_from_slice(&(fragment.len() as u16).to_be_bytes());
        record.extend_from_slice(fragment);
        record
    }

    #[derive(Debug, PartialEq, Eq)]
    enum ServerPhase {
        ExpectClientHello,
        ExpectFlight,
        Established,
    }

    /// The scripted broker side of the handshake.
    struct TestServer {
        key: RsaPrivateKey,
        client_public: RsaPublicKey,
        framer: RecordFramer,
        defrag: Defragmenter,
        transcript: Vec<u8>,
        client_random: [u8; 32],
        master: Vec<u8>,
        keys: Option<SessionKeys>,
        cipher: Option<CbcCipher>,
        phase: ServerPhase,
        flight_msgs: Vec<HandshakeType>,
        client_finished_verified: bool,
        received_app: Vec<Vec<u8>>,
        received_alerts: Vec<(u8, u8)>,
    }

    impl TestServer {
        fn new() -> Self {
            Self {
                key: server_private_key(),
                client_public: RsaPublicKey::new(&hex(CLIENT_N), RSA_E).unwrap(),
                framer: RecordFramer::new(),
                defrag: Defragmenter::new(),
                transcript: Vec::new(),
                client_random: [0u8; 32],
                master: Vec::new(),
                keys: None,
                cipher: None,
                phase: ServerPhase::ExpectClientHello,
                flight_msgs: Vec::new(),
                client_finished_verified: false,
                received_app: Vec::new(),
                received_alerts: Vec::new(),
            }
        }

        /// Feed bytes from the client and process every complete message.
        fn ingest(&mut self, bytes: &[u8]) {
            self.framer.feed(bytes);
            loop {
                match self.defrag.next_message(&mut self.framer) {
                    Ok(Some(message)) => self.on_message(message),
                    Ok(None) => break,
                    Err(e) => panic!("server failed to parse client bytes: {e}"),
                }
            }
        }

        fn on_message(&mut self, message: Message) {
            match message {
                Message::Handshake { raw, .. } => self.on_handshake(&raw),
                Message::ChangeCipherSpec(body) => {
                    assert_eq!(body, 0x01);
                    let keys = self.keys.as_ref().expect("keys before client CCS");
                    self.framer.activate_decipher(
                        CbcDecipher::new(&keys.client_write_key, &keys.client_mac_key).unwrap(),
                    );
                }
                Message::Alert(level, description) => {
                    self.received_alerts.push((level, description))
                }
                Message::ApplicationData(data) => self.received_app.push(data),
            }
        }

        fn on_handshake(&mut self, raw: &[u8]) {
            let (msg_type, body) = parse_handshake(raw).unwrap();
            match (msg_type, &self.phase) {
                (HandshakeType::ClientHello, ServerPhase::ExpectClientHello) => {
                    // The fixed hello: one suite, null compression, no
                    // extensions, empty session id.
                    assert_eq!(&body[..2], &PROTOCOL_VERSION);
                    self.client_random.copy_from_slice(&body[2..34]);
                    assert_eq!(body[34], 0);
                    assert_eq!(&body[35..39], &[0x00, 0x02, CIPHER_SUITE[0], CIPHER_SUITE[1]]);
                    assert_eq!(&body[39..41], &[0x01, 0x00]);
                    assert_eq!(body.len(), 41);
                    self.transcript.extend_from_slice(raw);
                    self.phase = ServerPhase::ExpectFlight;
                }
                (HandshakeType::Certificate, ServerPhase::ExpectFlight) => {
                    self.flight_msgs.push(msg_type);
                    self.transcript.extend_from_slice(raw);
                }
                (HandshakeType::ClientKeyExchange, ServerPhase::ExpectFlight) => {
                    self.flight_msgs.push(msg_type);
                    self.transcript.extend_from_slice(raw);
                    let len = u16::from_be_bytes([body[0], body[1]]) as usize;
                    let pre_master = self.key.decrypt(&body[2..2 + len]).unwrap();
                    assert_eq!(pre_master.len(), 48);
                    assert_eq!(&pre_master[..2], &[0x03, 0x03]);
                    self.master =
                        derive_master_secret(&pre_master, &self.client_random, &SERVER_RANDOM)
                            .unwrap();
                    self.keys = Some(
                        derive_session_keys(&self.master, &SERVER_RANDOM, &self.client_random)
                            .unwrap(),
                    );
                }
                (HandshakeType::CertificateVerify, ServerPhase::ExpectFlight) => {
                    self.flight_msgs.push(msg_type);
                    assert_eq!(&body[..2], &SIGNATURE_ALGORITHM);
                    let sig_len = u16::from_be_bytes([body[2], body[3]]) as usize;
                    let signature = &body[4..4 + sig_len];
                    // The signature covers the transcript through
                    // ClientKeyExchange.
                    let digest = Sha256::digest(&self.transcript).unwrap();
                    assert!(self.client_public.verify(&digest, signature).unwrap());
                    self.transcript.extend_from_slice(raw);
                }
                (HandshakeType::Finished, ServerPhase::ExpectFlight) => {
                    self.flight_msgs.push(msg_type);
                    let expected = compute_verify_data(
                        &self.master,
                        "client finished",
                        &Sha256::digest(&self.transcript).unwrap(),
                    )
                    .unwrap();
                    // Matching verify_data proves both transcripts are
                    // byte-identical.
                    assert_eq!(body, &expected[..]);
                    self.transcript.extend_from_slice(raw);
                    self.client_finished_verified = true;
                    self.phase = ServerPhase::Established;
                }
                (msg_type, phase) => panic!("server got {msg_type:?} in phase {phase:?}"),
            }
        }

        /// ServerHello, Certificate, CertificateRequest, ServerHelloDone.
        fn hello_flight(&mut self, fragment_certificate: bool) -> Vec<u8> {
            let mut sh_body = Vec::new();
            sh_body.extend_from_slice(&PROTOCOL_VERSION);
            sh_body.extend_from_slice(&SERVER_RANDOM);
            sh_body.push(0);
            sh_body.extend_from_slice(&CIPHER_SUITE);
            sh_body.push(0);
            let server_hello = wrap_handshake(HandshakeType::ServerHello, &sh_body);

            let certificate = encode_certificate(SERVER_CERT_DER);

            let mut cr_body = vec![1, 1];
            cr_body.extend_from_slice(&2u16.to_be_bytes());
            cr_body.extend_from_slice(&SIGNATURE_ALGORITHM);
            cr_body.extend_from_slice(&0u16.to_be_bytes());
            let certificate_request = wrap_handshake(HandshakeType::CertificateRequest, &cr_body);

            let server_hello_done = wrap_handshake(HandshakeType::ServerHelloDone, &[]);

            for msg in [
                &server_hello,
                &certificate,
                &certificate_request,
                &server_hello_done,
            ] {
                self.transcript.extend_from_slice(msg);
            }

            let mut wire = plain_record(ContentType::Handshake, &server_hello);
            if fragment_certificate {
                // One logical Certificate across three handshake records.
                let third = certificate.len() / 3;
                wire.extend_from_slice(&plain_record(
                    ContentType::Handshake,
                    &certificate[..third],
                ));
                wire.extend_from_slice(&plain_record(
                    ContentType::Handshake,
                    &certificate[third..2 * third],
                ));
                wire.extend_from_slice(&plain_record(
                    ContentType::Handshake,
                    &certificate[2 * third..],
                ));
            } else {
                wire.extend_from_slice(&plain_record(ContentType::Handshake, &certificate));
            }
            wire.extend_from_slice(&plain_record(ContentType::Handshake, &certificate_request));
            wire.extend_from_slice(&plain_record(ContentType::Handshake, &server_hello_done));
            wire
        }

        /// ChangeCipherSpec plus the encrypted server Finished.
        fn finished_flight(&mut self) -> Vec<u8> {
            let keys = self.keys.as_ref().expect("keys before server CCS");
            let mut cipher =
                CbcCipher::new(&keys.server_write_key, &keys.server_mac_key, 424242).unwrap();

            let verify_data = compute_verify_data(
                &self.master,
                "server finished",
                &Sha256::digest(&self.transcript).unwrap(),
            )
            .unwrap();
            let finished = wrap_handshake(HandshakeType::Finished, &verify_data);
            self.transcript.extend_from_slice(&finished);

            let mut wire = plain_record(ContentType::ChangeCipherSpec, &[0x01]);
            let fragment = cipher.encrypt(ContentType::Handshake, &finished).unwrap();
            wire.extend_from_slice(&plain_record(ContentType::Handshake, &fragment));
            self.cipher = Some(cipher);
            wire
        }

        /// An encrypted server record carrying `payload`.
        fn protected_record(&mut self, content_type: ContentType, payload: &[u8]) -> Vec<u8> {
            let cipher = self.cipher.as_mut().expect("server cipher active");
            let fragment = cipher.encrypt(content_type, payload).unwrap();
            plain_record(content_type, &fragment)
        }
    }

    /// Move all client output into the server.
    fn flush_to_server(client: &mut TlsStream<BufferedTransport>, server: &mut TestServer) {
        let out = client.transport_mut().take_output();
        if !out.is_empty() {
            server.ingest(&out);
        }
    }

    /// Run a full handshake with a locally held client key.
    fn establish() -> (TlsStream<BufferedTransport>, TestServer) {
        let mut client = new_client(ClientKey::Local(client_private_key()));
        let mut server = TestServer::new();

        client.transport_connected();
        flush_to_server(&mut client, &mut server);
        client.transport_data(&server.hello_flight(false));
        flush_to_server(&mut client, &mut server);
        let finished = server.finished_flight();
        client.transport_data(&finished);

        assert_eq!(client.state(), ConnectionState::Established);
        assert!(server.client_finished_verified);
        (client, server)
    }

    // -------------------------------------------------------------------
    // Scenarios
    // -------------------------------------------------------------------

    #[test]
    fn happy_handshake() {
        let _ = env_logger::builder().is_test(true).try_init();
        let (mut client, server) = establish();
        // The client flight arrived in order and verified.
        assert_eq!(
            server.flight_msgs,
            vec![
                HandshakeType::Certificate,
                HandshakeType::ClientKeyExchange,
                HandshakeType::CertificateVerify,
                HandshakeType::Finished,
            ]
        );
        // No events beyond the handshake itself.
        assert!(client.poll_event().is_none());
        assert!(client.read().is_none());
    }

    #[test]
    fn application_echo() {
        let (mut client, mut server) = establish();

        assert!(client.write(b"hello").unwrap());
        flush_to_server(&mut client, &mut server);
        // One record; decrypting under sequence number 1 proves the
        // counter advanced past the Finished record.
        assert_eq!(server.received_app, vec![b"hello".to_vec()]);

        // Echo it back under the server keys.
        let echo = server.protected_record(ContentType::ApplicationData, b"hello");
        client.transport_data(&echo);
        assert_eq!(client.read().unwrap(), b"hello");
        assert!(client.read().is_none());
    }

    #[test]
    fn peer_alert_fails_a_suspended_write() {
        let mut client = new_client(ClientKey::Local(client_private_key()));
        let mut server = TestServer::new();
        client.transport_connected();
        flush_to_server(&mut client, &mut server);

        // A write issued during the handshake parks in the pending slot.
        assert!(!client.write(&[0xAB; 4096]).unwrap());

        // The server aborts instead of continuing.
        client.transport_data(&plain_record(ContentType::Alert, &[2, 40]));
        assert_eq!(client.state(), ConnectionState::Terminated);

        assert!(matches!(client.poll_event(), Some(StreamEvent::End)));
        match client.poll_event() {
            Some(StreamEvent::WriteDone(Err(TlsError::PeerAlert(desc)))) => {
                assert_eq!(desc, AlertDescription::HandshakeFailure)
            }
            other => panic!("expected the write to fail, got {other:?}"),
        }
        assert!(matches!(client.poll_event(), Some(StreamEvent::Close)));
        assert!(client.poll_event().is_none());
    }

    #[test]
    fn tampered_record_is_bad_record_mac() {
        let (mut client, mut server) = establish();
        flush_to_server(&mut client, &mut server);

        let mut record = server.protected_record(ContentType::ApplicationData, b"sensitive");
        record[5 + 16 + 2] ^= 0x01; // flip one ciphertext byte past the IV
        client.transport_data(&record);

        assert_eq!(client.state(), ConnectionState::Terminated);
        assert!(client.read().is_none());
        assert!(matches!(client.poll_event(), Some(StreamEvent::End)));
        match client.poll_event() {
            Some(StreamEvent::Error(TlsError::Protocol { description, .. })) => {
                assert_eq!(description, AlertDescription::BadRecordMac)
            }
            other => panic!("expected bad_record_mac, got {other:?}"),
        }
        assert!(matches!(client.poll_event(), Some(StreamEvent::Close)));

        // The client's fatal alert went out encrypted; the server can
        // still read it.
        flush_to_server(&mut client, &mut server);
        assert_eq!(
            server.received_alerts,
            vec![(2, AlertDescription::BadRecordMac as u8)]
        );
    }

    #[test]
    fn upper_layer_end_sends_close_notify() {
        let (mut client, mut server) = establish();
        client.end();

        flush_to_server(&mut client, &mut server);
        assert_eq!(
            server.received_alerts,
            vec![(1, AlertDescription::CloseNotify as u8)]
        );
        assert!(client.transport_mut().is_ended());

        assert!(matches!(client.poll_event(), Some(StreamEvent::End)));
        assert!(matches!(client.poll_event(), Some(StreamEvent::Close)));
        assert!(client.poll_event().is_none());
    }

    #[test]
    fn fragmented_certificate_reassembles() {
        let mut client = new_client(ClientKey::Local(client_private_key()));
        let mut server = TestServer::new();

        client.transport_connected();
        flush_to_server(&mut client, &mut server);
        client.transport_data(&server.hello_flight(true));
        flush_to_server(&mut client, &mut server);
        let finished = server.finished_flight();
        client.transport_data(&finished);

        assert_eq!(client.state(), ConnectionState::Established);
        assert!(server.client_finished_verified);
    }

    #[test]
    fn external_signer_completes_the_flight() {
        let mut client = new_client(ClientKey::External);
        let mut server = TestServer::new();

        client.transport_connected();
        flush_to_server(&mut client, &mut server);
        client.transport_data(&server.hello_flight(false));

        // Certificate and ClientKeyExchange are already out; the flight
        // is suspended on the signature.
        let sign_input = match client.poll_event() {
            Some(StreamEvent::SignatureRequest(data)) => data,
            other => panic!("expected a signature request, got {other:?}"),
        };
        flush_to_server(&mut client, &mut server);
        assert_eq!(
            server.flight_msgs,
            vec![HandshakeType::Certificate, HandshakeType::ClientKeyExchange]
        );

        let signature = sign_transcript(&client_private_key(), &sign_input).unwrap();
        client.provide_signature(Ok(signature));
        flush_to_server(&mut client, &mut server);
        let finished = server.finished_flight();
        client.transport_data(&finished);

        assert_eq!(client.state(), ConnectionState::Established);
        assert!(server.client_finished_verified);
    }

    #[test]
    fn late_signer_completion_is_discarded() {
        let mut client = new_client(ClientKey::External);
        let mut server = TestServer::new();

        client.transport_connected();
        flush_to_server(&mut client, &mut server);
        client.transport_data(&server.hello_flight(false));
        let sign_input = match client.poll_event() {
            Some(StreamEvent::SignatureRequest(data)) => data,
            other => panic!("expected a signature request, got {other:?}"),
        };

        client.destroy(None);
        assert_eq!(client.state(), ConnectionState::Terminated);

        // The signer finishes after the connection died: no effect.
        let signature = sign_transcript(&client_private_key(), &sign_input).unwrap();
        client.provide_signature(Ok(signature));
        assert!(client.poll_event().is_none());
    }

    #[test]
    fn second_server_hello_is_unexpected_message() {
        let mut client = new_client(ClientKey::Local(client_private_key()));
        let mut server = TestServer::new();

        client.transport_connected();
        flush_to_server(&mut client, &mut server);
        client.transport_data(&server.hello_flight(false));
        assert_eq!(client.state(), ConnectionState::Handshaking);

        // Replay just the ServerHello.
        let mut sh_body = Vec::new();
        sh_body.extend_from_slice(&PROTOCOL_VERSION);
        sh_body.extend_from_slice(&SERVER_RANDOM);
        sh_body.push(0);
        sh_body.extend_from_slice(&CIPHER_SUITE);
        sh_body.push(0);
        let replay = wrap_handshake(HandshakeType::ServerHello, &sh_body);
        client.transport_data(&plain_record(ContentType::Handshake, &replay));

        assert_eq!(client.state(), ConnectionState::Terminated);
        assert!(matches!(client.poll_event(), Some(StreamEvent::End)));
        match client.poll_event() {
            Some(StreamEvent::Error(TlsError::Protocol { description, .. })) => {
                assert_eq!(description, AlertDescription::UnexpectedMessage)
            }
            other => panic!("expected unexpected_message, got {other:?}"),
        }
    }

    #[test]
    fn finished_before_change_cipher_spec_is_unexpected() {
        let mut client = new_client(ClientKey::Local(client_private_key()));
        let mut server = TestServer::new();

        client.transport_connected();
        flush_to_server(&mut client, &mut server);
        client.transport_data(&server.hello_flight(false));
        flush_to_server(&mut client, &mut server);

        // Skip the CCS: send a plaintext Finished directly.
        let bogus = wrap_handshake(HandshakeType::Finished, &[0u8; 12]);
        client.transport_data(&plain_record(ContentType::Handshake, &bogus));

        assert_eq!(client.state(), ConnectionState::Terminated);
        assert!(matches!(client.poll_event(), Some(StreamEvent::End)));
        match client.poll_event() {
            Some(StreamEvent::Error(TlsError::Protocol { description, .. })) => {
                assert_eq!(description, AlertDescription::UnexpectedMessage)
            }
            other => panic!("expected unexpected_message, got {other:?}"),
        }
    }

    #[test]
    fn application_data_before_established_is_fatal() {
        let mut client = new_client(ClientKey::Local(client_private_key()));
        let mut server = TestServer::new();

        client.transport_connected();
        flush_to_server(&mut client, &mut server);
        client.transport_data(&plain_record(ContentType::ApplicationData, b"too early"));

        assert_eq!(client.state(), ConnectionState::Terminated);
        assert!(client.read().is_none());
    }

    #[test]
    fn transport_drain_settles_a_backpressured_write() {
        let (mut client, mut server) = establish();
        flush_to_server(&mut client, &mut server);

        // Larger than the transport's high-water mark.
        let big = vec![0x42u8; 100 * 1024];
        assert!(!client.write(&big).unwrap());

        // The driver flushes the transport, then reports the drain.
        flush_to_server(&mut client, &mut server);
        assert!(client.transport_mut().poll_drain());
        client.transport_drain();

        match client.poll_event() {
            Some(StreamEvent::WriteDone(Ok(()))) => {}
            other => panic!("expected the write to settle, got {other:?}"),
        }
        let received: usize = server.received_app.iter().map(Vec::len).sum();
        assert_eq!(received, big.len());
    }

    #[test]
    fn write_parked_during_handshake_flushes_after_established() {
        let mut client = new_client(ClientKey::Local(client_private_key()));
        let mut server = TestServer::new();

        client.transport_connected();
        flush_to_server(&mut client, &mut server);
        assert!(!client.write(b"queued early").unwrap());

        client.transport_data(&server.hello_flight(false));
        flush_to_server(&mut client, &mut server);
        let finished = server.finished_flight();
        client.transport_data(&finished);
        assert_eq!(client.state(), ConnectionState::Established);

        // The parked chunk went out right after establishment.
        match client.poll_event() {
            Some(StreamEvent::WriteDone(Ok(()))) => {}
            other => panic!("expected the parked write to settle, got {other:?}"),
        }
        flush_to_server(&mut client, &mut server);
        assert_eq!(server.received_app, vec![b"queued early".to_vec()]);
    }

    #[test]
    fn server_close_notify_after_establishment_is_graceful() {
        let (mut client, mut server) = establish();
        let close = server.protected_record(ContentType::Alert, &[1, 0]);
        client.transport_data(&close);

        assert_eq!(client.state(), ConnectionState::Terminated);
        assert!(matches!(client.poll_event(), Some(StreamEvent::End)));
        assert!(matches!(client.poll_event(), Some(StreamEvent::Close)));
        assert!(client.poll_event().is_none());
    }

    #[test]
    fn warning_alert_is_ignored() {
        let (mut client, mut server) = establish();
        // unsupported_extension at warning level: logged and dropped.
        let warning = server.protected_record(ContentType::Alert, &[1, 110]);
        client.transport_data(&warning);
        assert_eq!(client.state(), ConnectionState::Established);

        // The session keeps working.
        let echo = server.protected_record(ContentType::ApplicationData, b"still alive");
        client.transport_data(&echo);
        assert_eq!(client.read().unwrap(), b"still alive");
    }

    #[test]
    fn outbound_sequence_counts_protected_records() {
        let (mut client, _server) = establish();
        // Finished consumed sequence 0.
        assert_eq!(client.write_sequence(), Some(1));
        client.write(b"one").unwrap();
        assert_eq!(client.write_sequence(), Some(2));
        client.write(b"two").unwrap();
        assert_eq!(client.write_sequence(), Some(3));
    }
}
