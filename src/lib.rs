//! An in-process credential vault for workflow automation.
//!
//! Secrets (API keys, basic-auth pairs, OAuth tokens, SSH keys,
//! database parameters) are sealed into AES-256-GCM envelopes under a
//! key derived from a process master key, held in an in-memory record
//! store, and every sensitive access is written to a bounded audit
//! log.

pub mod api;
pub mod audit;
pub mod config;
pub mod crypto;
pub mod errors;
pub mod store;
pub mod vault;

pub use errors::{Result, VaultError};
pub use vault::{Actor, CredentialUpdate, CredentialVault, StoreCredentialRequest};
