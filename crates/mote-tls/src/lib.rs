#![forbid(unsafe_code)]
#![doc = "Minimal mutually-authenticated TLS 1.2 client for IoT message brokers."]

pub mod alert;
pub mod config;
pub mod connection;
pub mod crypt;
pub mod handshake;
pub mod record;
pub mod signer;
pub mod stream;
pub mod transport;
pub mod verify;

pub use config::{TlsOptions, TlsOptionsBuilder};
pub use connection::{RemoteSigner, TlsClient};
pub use mote_types::{AlertDescription, AlertLevel, CryptoError, SignerError, TlsError};
pub use stream::{ConnectionState, StreamEvent, TlsStream};
pub use transport::{BufferedTransport, Transport};
pub use verify::{ChainVerifier, ChainVerifyError, ValidityCheck, VerifyOptions};
