//! From-scratch SHA-256 and HMAC-SHA256, used by the cloud client to sign
//! identity proofs.

pub mod hmac;
pub mod sha256;

pub use hmac::{hmac_sha256, hmac_sha256_hex};
pub use sha256::{sha256, Sha256};
