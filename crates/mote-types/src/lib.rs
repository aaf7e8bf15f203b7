#![forbid(unsafe_code)]
#![doc = "Shared error and alert types for the mote TLS client."]

mod alert;
mod error;

pub use alert::{AlertDescription, AlertLevel};
pub use error::{CryptoError, SignerError, TlsError};
