#![forbid(unsafe_code)]
#![doc = "Encoding helpers for the mote TLS client: Base64, PEM, minimal ASN.1 DER."]

pub mod asn1;
pub mod base64;
pub mod pem;
