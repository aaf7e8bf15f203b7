#![forbid(unsafe_code)]
#![doc = "Crypto primitives for the mote TLS client."]

pub mod aes;
pub mod bignum;
pub mod cbc;
pub mod digest;
pub mod hmac;
pub mod rand;
pub mod rsa;
pub mod sha1;
pub mod sha256;
