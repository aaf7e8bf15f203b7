//! Handshake message encoding and decoding.
//!
//! Exactly one cipher suite (TLS_RSA_WITH_AES_128_CBC_SHA) and one
//! signature algorithm (rsa_pkcs1_sha256) exist on the wire; the
//! ClientHello carries no extensions at all.

use super::HandshakeType;
use mote_types::{AlertDescription, TlsError};

/// TLS_RSA_WITH_AES_128_CBC_SHA.
pub const CIPHER_SUITE: [u8; 2] = [0x00, 0x2F];

/// rsa_pkcs1_sha256.
pub const SIGNATURE_ALGORITHM: [u8; 2] = [0x04, 0x01];

/// Protocol version {3, 3}.
pub const PROTOCOL_VERSION: [u8; 2] = [0x03, 0x03];

fn decode_error(reason: impl Into<String>) -> TlsError {
    TlsError::protocol(AlertDescription::DecodeError, reason)
}

fn illegal_parameter(reason: impl Into<String>) -> TlsError {
    TlsError::protocol(AlertDescription::IllegalParameter, reason)
}

/// Wrap a handshake body with the 4-byte header.
pub fn wrap_handshake(msg_type: HandshakeType, body: &[u8]) -> Vec<u8> {
    let len = body.len();
    let mut out = Vec::with_capacity(4 + len);
    out.push(msg_type as u8);
    out.push((len >> 16) as u8);
    out.push((len >> 8) as u8);
    out.push(len as u8);
    out.extend_from_slice(body);
    out
}

/// Parse a complete handshake message into (type, body).
pub fn parse_handshake(raw: &[u8]) -> Result<(HandshakeType, &[u8]), TlsError> {
    if raw.len() < 4 {
        return Err(decode_error("handshake header too short"));
    }
    let msg_type = HandshakeType::from_u8(raw[0])
        .map_err(|v| decode_error(format!("unknown handshake type {v}")))?;
    let length = ((raw[1] as usize) << 16) | ((raw[2] as usize) << 8) | raw[3] as usize;
    if raw.len() != 4 + length {
        return Err(decode_error("handshake length mismatch"));
    }
    Ok((msg_type, &raw[4..]))
}

// ---------------------------------------------------------------------------
// ClientHello
// ---------------------------------------------------------------------------

/// Encode the fixed ClientHello: one suite, null compression, no
/// extensions, empty session id.
pub fn encode_client_hello(client_random: &[u8; 32]) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 + 32 + 1 + 4 + 2);
    body.extend_from_slice(&PROTOCOL_VERSION);
    body.extend_from_slice(client_random);
    body.push(0); // empty session id
    body.extend_from_slice(&2u16.to_be_bytes());
    body.extend_from_slice(&CIPHER_SUITE);
    body.push(1); // one compression method
    body.push(0); // null
    wrap_handshake(HandshakeType::ClientHello, &body)
}

// ---------------------------------------------------------------------------
// ServerHello
// ---------------------------------------------------------------------------

/// A parsed ServerHello.
#[derive(Debug, Clone)]
pub struct ServerHello {
    pub random: [u8; 32],
    pub session_id: Vec<u8>,
}

/// Decode a ServerHello body, rejecting anything but the single
/// negotiable outcome.
pub fn decode_server_hello(body: &[u8]) -> Result<ServerHello, TlsError> {
    if body.len() < 2 + 32 + 1 {
        return Err(decode_error("ServerHello too short"));
    }
    if body[..2] != PROTOCOL_VERSION {
        return Err(illegal_parameter("ServerHello version is not TLS 1.2"));
    }
    let mut random = [0u8; 32];
    random.copy_from_slice(&body[2..34]);

    let sid_len = body[34] as usize;
    let mut pos = 35;
    if sid_len > 32 || body.len() < pos + sid_len + 3 {
        return Err(decode_error("ServerHello session id truncated"));
    }
    let session_id = body[pos..pos + sid_len].to_vec();
    pos += sid_len;

    if body[pos..pos + 2] != CIPHER_SUITE {
        return Err(illegal_parameter("server selected an unexpected cipher suite"));
    }
    pos += 2;
    if body[pos] != 0 {
        return Err(illegal_parameter("server selected non-null compression"));
    }
    pos += 1;
    if pos != body.len() {
        return Err(illegal_parameter("unexpected ServerHello extensions"));
    }

    Ok(ServerHello { random, session_id })
}

// ---------------------------------------------------------------------------
// Certificate
// ---------------------------------------------------------------------------

/// Encode a Certificate message holding the single client certificate.
pub fn encode_certificate(cert_der: &[u8]) -> Vec<u8> {
    let entry_len = 3 + cert_der.len();
    let mut body = Vec::with_capacity(3 + entry_len);
    push_u24(&mut body, entry_len);
    push_u24(&mut body, cert_der.len());
    body.extend_from_slice(cert_der);
    wrap_handshake(HandshakeType::Certificate, &body)
}

/// Decode a Certificate body into the DER chain, leaf first.
pub fn decode_certificate_list(body: &[u8]) -> Result<Vec<Vec<u8>>, TlsError> {
    if body.len() < 3 {
        return Err(decode_error("Certificate message too short"));
    }
    let total = read_u24(body);
    if body.len() != 3 + total {
        return Err(decode_error("Certificate list length mismatch"));
    }

    let mut chain = Vec::new();
    let mut pos = 3;
    let end = 3 + total;
    while pos < end {
        if pos + 3 > end {
            return Err(decode_error("Certificate entry header truncated"));
        }
        let cert_len = read_u24(&body[pos..]);
        pos += 3;
        if pos + cert_len > end {
            return Err(decode_error("Certificate entry truncated"));
        }
        chain.push(body[pos..pos + cert_len].to_vec());
        pos += cert_len;
    }
    Ok(chain)
}

// ---------------------------------------------------------------------------
// CertificateRequest
// ---------------------------------------------------------------------------

/// Validate a CertificateRequest body. Its content is otherwise ignored:
/// this client always answers with its one configured certificate.
pub fn decode_certificate_request(body: &[u8]) -> Result<(), TlsError> {
    if body.is_empty() {
        return Err(decode_error("CertificateRequest too short"));
    }
    let types_len = body[0] as usize;
    let mut pos = 1 + types_len;
    if body.len() < pos + 2 {
        return Err(decode_error("CertificateRequest certificate types truncated"));
    }

    let algs_len = u16::from_be_bytes([body[pos], body[pos + 1]]) as usize;
    pos += 2;
    if algs_len % 2 != 0 || body.len() < pos + algs_len + 2 {
        return Err(decode_error("CertificateRequest signature algorithms malformed"));
    }
    pos += algs_len;

    let names_len = u16::from_be_bytes([body[pos], body[pos + 1]]) as usize;
    pos += 2;
    if body.len() != pos + names_len {
        return Err(decode_error("CertificateRequest authorities length mismatch"));
    }
    let end = pos + names_len;
    while pos < end {
        if pos + 2 > end {
            return Err(decode_error("CertificateRequest authority header truncated"));
        }
        let name_len = u16::from_be_bytes([body[pos], body[pos + 1]]) as usize;
        pos += 2 + name_len;
        if pos > end {
            return Err(decode_error("CertificateRequest authority truncated"));
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// ClientKeyExchange / CertificateVerify / Finished
// ---------------------------------------------------------------------------

/// Encode a ClientKeyExchange carrying the RSA-encrypted pre-master secret.
pub fn encode_client_key_exchange(encrypted_pre_master: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(2 + encrypted_pre_master.len());
    body.extend_from_slice(&(encrypted_pre_master.len() as u16).to_be_bytes());
    body.extend_from_slice(encrypted_pre_master);
    wrap_handshake(HandshakeType::ClientKeyExchange, &body)
}

/// Encode a CertificateVerify carrying an rsa_pkcs1_sha256 signature.
pub fn encode_certificate_verify(signature: &[u8]) -> Vec<u8> {
    let mut body = Vec::with_capacity(4 + signature.len());
    body.extend_from_slice(&SIGNATURE_ALGORITHM);
    body.extend_from_slice(&(signature.len() as u16).to_be_bytes());
    body.extend_from_slice(signature);
    wrap_handshake(HandshakeType::CertificateVerify, &body)
}

/// Encode a Finished message (12-byte verify_data).
pub fn encode_finished(verify_data: &[u8]) -> Vec<u8> {
    wrap_handshake(HandshakeType::Finished, verify_data)
}

/// Decode a Finished body.
pub fn decode_finished(body: &[u8]) -> Result<[u8; 12], TlsError> {
    body.try_into()
        .map_err(|_| decode_error(format!("Finished verify_data must be 12 bytes, got {}", body.len())))
}

fn push_u24(buf: &mut Vec<u8>, val: usize) {
    buf.push((val >> 16) as u8);
    buf.push((val >> 8) as u8);
    buf.push(val as u8);
}

fn read_u24(data: &[u8]) -> usize {
    ((data[0] as usize) << 16) | ((data[1] as usize) << 8) | data[2] as usize
}
