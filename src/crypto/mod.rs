//! Cryptographic primitives for the credential vault.
//!
//! This module provides:
//! - AES-256-GCM envelope encryption (`envelope`)
//! - PBKDF2-HMAC-SHA256 key derivation (`kdf`)
//! - Master key sourcing and zeroization (`keys`)

pub mod envelope;
pub mod kdf;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{Envelope, MasterKey, ...};
pub use envelope::{Envelope, ENVELOPE_VERSION};
pub use kdf::{derive_key, generate_iv, generate_salt, DEFAULT_ITERATIONS};
pub use keys::{MasterKey, MASTER_KEY_ENV};
