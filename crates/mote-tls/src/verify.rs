//! Certificate chain verification capability.
//!
//! X.509 parsing and chain building live outside this crate: the
//! handshake engine hands the received DER chain to an injected
//! [`ChainVerifier`] and maps its failures onto TLS alerts. The common
//! name check against the configured host, including the leading-`*`
//! wildcard rule, is done here.

use mote_crypto::rsa::RsaPublicKey;
use mote_types::AlertDescription;

/// How certificate validity dates are checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidityCheck {
    /// Validate against the current time.
    Current,
    /// Validate against a fixed UNIX timestamp.
    At(i64),
    /// Accept any date.
    Skip,
}

/// Options passed to the chain verifier.
#[derive(Debug, Clone, Copy)]
pub struct VerifyOptions {
    pub validity: ValidityCheck,
}

/// Chain verification failures, each mapping to a TLS alert.
#[derive(Debug, thiserror::Error)]
pub enum ChainVerifyError {
    #[error("malformed certificate")]
    BadCertificate,
    #[error("unsupported certificate")]
    UnsupportedCertificate,
    #[error("certificate expired")]
    Expired,
    #[error("no trusted issuer found")]
    UnknownCa,
    #[error("certificate rejected: {0}")]
    Other(String),
}

impl ChainVerifyError {
    pub fn alert(&self) -> AlertDescription {
        match self {
            ChainVerifyError::BadCertificate => AlertDescription::BadCertificate,
            ChainVerifyError::UnsupportedCertificate => AlertDescription::UnsupportedCertificate,
            ChainVerifyError::Expired => AlertDescription::CertificateExpired,
            ChainVerifyError::UnknownCa => AlertDescription::UnknownCa,
            ChainVerifyError::Other(_) => AlertDescription::CertificateUnknown,
        }
    }
}

/// External collaborator verifying the server chain and exposing the
/// leaf identity. The chain arrives in wire order, leaf first; issuer
/// search proceeds upward through `chain_der` and then `roots_der`.
pub trait ChainVerifier: Send + Sync {
    /// Verify `chain_der` against the configured roots.
    fn verify_chain(
        &self,
        chain_der: &[Vec<u8>],
        roots_der: &[Vec<u8>],
        opts: &VerifyOptions,
    ) -> Result<(), ChainVerifyError>;

    /// The subject common name of the leaf certificate.
    fn subject_common_name(&self, leaf_der: &[u8]) -> Result<String, ChainVerifyError>;

    /// The leaf's RSA public key.
    fn leaf_public_key(&self, leaf_der: &[u8]) -> Result<RsaPublicKey, ChainVerifyError>;
}

/// Match `host` against a certificate common name. A CN beginning with
/// `*` matches any host whose name ends with the remainder.
pub fn host_matches_cn(host: &str, cn: &str) -> bool {
    let host = host.to_ascii_lowercase();
    let cn = cn.to_ascii_lowercase();
    match cn.strip_prefix('*') {
        Some(suffix) => host.len() > suffix.len() && host.ends_with(suffix),
        None => host == cn,
    }
}
