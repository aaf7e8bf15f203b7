use crate::alert::AlertDescription;

/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("invalid argument")]
    InvalidArg,
    #[error("invalid key")]
    InvalidKey,
    #[error("invalid key length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },
    #[error("input data too long")]
    InputOverflow,
    #[error("big number: division by zero")]
    DivisionByZero,
    #[error("rsa: invalid padding")]
    RsaInvalidPadding,
    #[error("random generation failed")]
    RandFail,
    #[error("asn1 decode failed")]
    Asn1Decode,
}

/// External signer failures (spec: surfaced as `internal_error`).
#[derive(Debug, thiserror::Error)]
#[error("signer failed: {0}")]
pub struct SignerError(pub String);

/// TLS session errors.
///
/// `Protocol` carries the alert description the termination controller
/// sends on the wire; every other variant maps to `internal_error` (or no
/// alert at all when the transport is already gone).
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("tls protocol error ({description:?}): {reason}")]
    Protocol {
        description: AlertDescription,
        reason: String,
    },
    #[error("fatal alert received: {0:?}")]
    PeerAlert(AlertDescription),
    #[error("premature close")]
    PrematureClose,
    #[error("server closed the connection during the handshake")]
    HandshakeInterrupted,
    #[error("broken pipe: {0}")]
    BrokenPipe(&'static str),
    #[error("a write is already pending")]
    WritePending,
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

impl TlsError {
    /// Build a fatal protocol error carrying an alert description.
    pub fn protocol(description: AlertDescription, reason: impl Into<String>) -> Self {
        TlsError::Protocol {
            description,
            reason: reason.into(),
        }
    }

    /// The alert description to emit for this error, if it is a local
    /// protocol error. `None` means `internal_error`.
    pub fn alert_description(&self) -> Option<AlertDescription> {
        match self {
            TlsError::Protocol { description, .. } => Some(*description),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn protocol_error_display_and_alert() {
        let e = TlsError::protocol(AlertDescription::DecodeError, "zero-length record");
        assert_eq!(
            e.to_string(),
            "tls protocol error (DecodeError): zero-length record"
        );
        assert_eq!(e.alert_description(), Some(AlertDescription::DecodeError));
    }

    #[test]
    fn non_protocol_errors_have_no_alert() {
        assert_eq!(TlsError::PrematureClose.alert_description(), None);
        assert_eq!(
            TlsError::PeerAlert(AlertDescription::HandshakeFailure).alert_description(),
            None
        );
        let io = TlsError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionReset,
            "reset",
        ));
        assert_eq!(io.alert_description(), None);
    }

    #[test]
    fn crypto_error_display() {
        assert_eq!(
            CryptoError::InvalidKeyLength {
                expected: 16,
                got: 20
            }
            .to_string(),
            "invalid key length: expected 16, got 20"
        );
        assert_eq!(
            CryptoError::DivisionByZero.to_string(),
            "big number: division by zero"
        );
    }

    #[test]
    fn signer_error_converts() {
        let tls: TlsError = SignerError("device offline".into()).into();
        assert!(tls.to_string().contains("device offline"));
        assert_eq!(tls.alert_description(), None);
    }

    #[test]
    fn errors_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CryptoError>();
        assert_send_sync::<TlsError>();
        assert_send_sync::<SignerError>();
    }
}
