//! Password-based key derivation using PBKDF2-HMAC-SHA256.
//!
//! The master key is never used directly as a cipher key.  Each
//! envelope carries a fresh random salt, and the actual AES key is
//! derived from master key + salt with a configurable iteration count
//! (default 100,000).

use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;

use crate::errors::{Result, VaultError};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the GCM initialization vector in bytes (128 bits).
pub const IV_LEN: usize = 16;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Default PBKDF2 iteration count.
pub const DEFAULT_ITERATIONS: u32 = 100_000;

/// Minimum allowed iteration count — anything lower is trivially
/// brute-forceable and rejected outright.
const MIN_ITERATIONS: u32 = 1_000;

/// Derive a 32-byte encryption key from a master key and salt.
///
/// The same master key + salt + iterations always produce the same key.
pub fn derive_key(master_key: &[u8], salt: &[u8], iterations: u32) -> Result<[u8; KEY_LEN]> {
    if iterations < MIN_ITERATIONS {
        return Err(VaultError::KeyDerivationFailed(format!(
            "iteration count must be at least {MIN_ITERATIONS} (got {iterations})"
        )));
    }
    if salt.is_empty() {
        return Err(VaultError::KeyDerivationFailed("empty salt".into()));
    }

    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(master_key, salt, iterations, &mut key);
    Ok(key)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);
    salt
}

/// Generate a cryptographically random 16-byte IV.
pub fn generate_iv() -> [u8; IV_LEN] {
    let mut iv = [0u8; IV_LEN];
    rand::rngs::OsRng.fill_bytes(&mut iv);
    iv
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_inputs_same_key() {
        let a = derive_key(b"master", b"salt-salt-salt-salt", 1_000).unwrap();
        let b = derive_key(b"master", b"salt-salt-salt-salt", 1_000).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn different_salt_different_key() {
        let a = derive_key(b"master", b"salt-one", 1_000).unwrap();
        let b = derive_key(b"master", b"salt-two", 1_000).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn different_iterations_different_key() {
        let a = derive_key(b"master", b"salt", 1_000).unwrap();
        let b = derive_key(b"master", b"salt", 2_000).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_weak_iteration_count() {
        let result = derive_key(b"master", b"salt", 10);
        assert!(result.is_err());
    }

    #[test]
    fn salts_are_random() {
        assert_ne!(generate_salt(), generate_salt());
        assert_ne!(generate_iv(), generate_iv());
    }
}
