//! Vault policy configuration.
//!
//! Every field has a sensible default so the vault works out-of-the-box
//! with no config file at all.  A `credvault.toml` in the working
//! directory can override the defaults at startup, and a
//! `VaultConfigPatch` can merge partial overrides at runtime.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};

/// Process-wide vault policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultConfig {
    /// Cipher identifier for newly sealed envelopes.
    #[serde(default = "default_algorithm")]
    pub algorithm: String,

    /// PBKDF2 iteration count for newly sealed envelopes.
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Whether new credentials get a default rotation interval.
    #[serde(default = "default_true")]
    pub auto_rotation_enabled: bool,

    /// Rotation interval applied when a credential specifies none.
    #[serde(default = "default_rotation_interval_days")]
    pub default_rotation_interval_days: u32,

    /// Whether audited operations append to the access log.
    #[serde(default = "default_true")]
    pub access_logging_enabled: bool,

    /// Whether the expiration-alert projection is exposed.
    #[serde(default = "default_true")]
    pub expiration_alert_enabled: bool,

    /// Lead time for expiration alerts, in days.
    #[serde(default = "default_expiration_alert_days")]
    pub expiration_alert_days: u32,

    /// Access log retention cap (oldest entries evicted past this).
    #[serde(default = "default_max_access_log_entries")]
    pub max_access_log_entries: usize,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_algorithm() -> String {
    "aes-256-gcm".to_string()
}

fn default_kdf_iterations() -> u32 {
    crate::crypto::DEFAULT_ITERATIONS
}

fn default_true() -> bool {
    true
}

fn default_rotation_interval_days() -> u32 {
    90
}

fn default_expiration_alert_days() -> u32 {
    14
}

fn default_max_access_log_entries() -> usize {
    crate::audit::DEFAULT_MAX_ENTRIES
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            algorithm: default_algorithm(),
            kdf_iterations: default_kdf_iterations(),
            auto_rotation_enabled: default_true(),
            default_rotation_interval_days: default_rotation_interval_days(),
            access_logging_enabled: default_true(),
            expiration_alert_enabled: default_true(),
            expiration_alert_days: default_expiration_alert_days(),
            max_access_log_entries: default_max_access_log_entries(),
        }
    }
}

impl VaultConfig {
    /// Name of the config file we look for in the working directory.
    const FILE_NAME: &'static str = "credvault.toml";

    /// Load config from `<dir>/credvault.toml`.
    ///
    /// If the file does not exist, defaults are returned.  If the file
    /// exists but cannot be parsed, an error is returned.
    pub fn load(dir: &Path) -> Result<Self> {
        let config_path = dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)
            .map_err(|e| VaultError::Config(format!("{}: {e}", config_path.display())))?;

        toml::from_str(&contents).map_err(|e| {
            VaultError::Config(format!("Failed to parse {}: {e}", config_path.display()))
        })
    }

    /// Merge a partial override into this config.  Only fields present
    /// in the patch are overwritten.
    pub fn apply(&mut self, patch: VaultConfigPatch) {
        if let Some(algorithm) = patch.algorithm {
            self.algorithm = algorithm;
        }
        if let Some(kdf_iterations) = patch.kdf_iterations {
            self.kdf_iterations = kdf_iterations;
        }
        if let Some(enabled) = patch.auto_rotation_enabled {
            self.auto_rotation_enabled = enabled;
        }
        if let Some(days) = patch.default_rotation_interval_days {
            self.default_rotation_interval_days = days;
        }
        if let Some(enabled) = patch.access_logging_enabled {
            self.access_logging_enabled = enabled;
        }
        if let Some(enabled) = patch.expiration_alert_enabled {
            self.expiration_alert_enabled = enabled;
        }
        if let Some(days) = patch.expiration_alert_days {
            self.expiration_alert_days = days;
        }
        if let Some(cap) = patch.max_access_log_entries {
            self.max_access_log_entries = cap;
        }
    }
}

/// Partial config override.  Every field is optional; omitted fields
/// leave the current value untouched.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VaultConfigPatch {
    pub algorithm: Option<String>,
    pub kdf_iterations: Option<u32>,
    pub auto_rotation_enabled: Option<bool>,
    pub default_rotation_interval_days: Option<u32>,
    pub access_logging_enabled: Option<bool>,
    pub expiration_alert_enabled: Option<bool>,
    pub expiration_alert_days: Option<u32>,
    pub max_access_log_entries: Option<usize>,
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_config_is_sensible() {
        let c = VaultConfig::default();
        assert_eq!(c.algorithm, "aes-256-gcm");
        assert_eq!(c.kdf_iterations, 100_000);
        assert!(c.auto_rotation_enabled);
        assert_eq!(c.default_rotation_interval_days, 90);
        assert!(c.access_logging_enabled);
        assert_eq!(c.expiration_alert_days, 14);
        assert_eq!(c.max_access_log_entries, 1_000);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let config = VaultConfig::load(tmp.path()).unwrap();
        assert_eq!(config.kdf_iterations, 100_000);
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let contents = r#"
kdfIterations = 200000
defaultRotationIntervalDays = 30
accessLoggingEnabled = false
"#;
        fs::write(tmp.path().join("credvault.toml"), contents).unwrap();

        let config = VaultConfig::load(tmp.path()).unwrap();
        assert_eq!(config.kdf_iterations, 200_000);
        assert_eq!(config.default_rotation_interval_days, 30);
        assert!(!config.access_logging_enabled);
        // Rest should be defaults.
        assert_eq!(config.algorithm, "aes-256-gcm");
        assert_eq!(config.expiration_alert_days, 14);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("credvault.toml"), "not valid {{toml").unwrap();

        assert!(VaultConfig::load(tmp.path()).is_err());
    }

    #[test]
    fn apply_only_overwrites_present_fields() {
        let mut config = VaultConfig::default();
        config.apply(VaultConfigPatch {
            kdf_iterations: Some(150_000),
            expiration_alert_days: Some(7),
            ..Default::default()
        });

        assert_eq!(config.kdf_iterations, 150_000);
        assert_eq!(config.expiration_alert_days, 7);
        assert_eq!(config.default_rotation_interval_days, 90);
        assert!(config.auto_rotation_enabled);
    }
}
