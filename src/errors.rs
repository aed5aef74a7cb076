use thiserror::Error;

/// All errors that can occur in the credential vault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Input validation ---
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Credential name '{0}' already exists")]
    DuplicateName(String),

    // --- Lookup / lifecycle ---
    #[error("Credential '{0}' not found")]
    NotFound(String),

    #[error("Credential '{0}' has expired")]
    Expired(String),

    #[error("Credential '{0}' has been revoked")]
    Revoked(String),

    #[error("Credential '{name}' is in use by {} workflow(s)", workflows.len())]
    InUse {
        name: String,
        workflows: Vec<String>,
    },

    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed — wrong master key or corrupted envelope")]
    DecryptionFailed,

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    Serialization(String),

    // --- Config errors ---
    #[error("Config error: {0}")]
    Config(String),
}

impl VaultError {
    /// HTTP-equivalent status code for this error, used by the API
    /// boundary when building an error response.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation(_) => 400,
            Self::NotFound(_) => 404,
            Self::Expired(_) | Self::Revoked(_) => 403,
            Self::DuplicateName(_) | Self::InUse { .. } => 409,
            Self::EncryptionFailed(_)
            | Self::DecryptionFailed
            | Self::KeyDerivationFailed(_)
            | Self::Serialization(_)
            | Self::Config(_) => 500,
        }
    }

    /// Short machine-readable error kind for the API error body.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::DuplicateName(_) => "duplicate_name",
            Self::NotFound(_) => "not_found",
            Self::Expired(_) => "expired",
            Self::Revoked(_) => "revoked",
            Self::InUse { .. } => "in_use",
            Self::EncryptionFailed(_) => "encryption_error",
            Self::DecryptionFailed => "decryption_error",
            Self::KeyDerivationFailed(_) => "key_derivation_error",
            Self::Serialization(_) => "serialization_error",
            Self::Config(_) => "config_error",
        }
    }
}

/// Convenience type alias for vault results.
pub type Result<T> = std::result::Result<T, VaultError>;
