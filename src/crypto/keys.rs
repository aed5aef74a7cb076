//! Master key handling.
//!
//! The master key is sourced from the `VAULT_MASTER_KEY` environment
//! variable and held in a wrapper that zeroes its memory on drop.  It
//! is only ever used transiently as PBKDF2 input — never stored in a
//! credential record or an envelope.

use zeroize::Zeroize;

/// Environment variable supplying the master encryption key.
pub const MASTER_KEY_ENV: &str = "VAULT_MASTER_KEY";

/// Insecure fallback for local development.  Any real deployment must
/// set `VAULT_MASTER_KEY`; startup logs a warning when this is in use.
const DEV_FALLBACK_KEY: &str = "dev-master-key-change-in-production";

/// A wrapper around the master key string that automatically zeroes
/// its memory when dropped.
#[derive(Zeroize)]
#[zeroize(drop)]
pub struct MasterKey {
    value: String,
}

impl MasterKey {
    /// Create a `MasterKey` from an explicit string.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Load the master key from `VAULT_MASTER_KEY`.
    ///
    /// Falls back to a fixed development key when the variable is
    /// unset or empty, and logs a warning — the fallback must never
    /// reach production.
    pub fn from_env() -> Self {
        match std::env::var(MASTER_KEY_ENV) {
            Ok(value) if !value.is_empty() => Self { value },
            _ => {
                tracing::warn!(
                    "{MASTER_KEY_ENV} is not set — using the insecure development master key"
                );
                Self {
                    value: DEV_FALLBACK_KEY.to_string(),
                }
            }
        }
    }

    /// Returns `true` if this key is the insecure development fallback.
    pub fn is_dev_fallback(&self) -> bool {
        self.value == DEV_FALLBACK_KEY
    }

    /// Access the raw key bytes (e.g. to pass to the KDF).
    pub fn as_bytes(&self) -> &[u8] {
        self.value.as_bytes()
    }
}

impl std::fmt::Debug for MasterKey {
    // Never print key material, even in debug output.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("MasterKey(..)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_hides_key_material() {
        let key = MasterKey::new("super-secret");
        assert_eq!(format!("{key:?}"), "MasterKey(..)");
    }

    #[test]
    fn explicit_key_is_not_dev_fallback() {
        assert!(!MasterKey::new("explicit").is_dev_fallback());
        assert!(MasterKey::new(DEV_FALLBACK_KEY).is_dev_fallback());
    }
}
