//! Credential record types.
//!
//! A `Credential` holds the metadata and the opaque encrypted envelope
//! for one named secret.  The plaintext payload never appears here —
//! only the crypto layer holding the master key can open
//! `encrypted_data`.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::VaultError;

/// Closed set of credential classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialType {
    ApiKey,
    BasicAuth,
    Oauth2,
    SshKey,
    Database,
    Custom,
}

impl std::str::FromStr for CredentialType {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "api_key" => Ok(Self::ApiKey),
            "basic_auth" => Ok(Self::BasicAuth),
            "oauth2" => Ok(Self::Oauth2),
            "ssh_key" => Ok(Self::SshKey),
            "database" => Ok(Self::Database),
            "custom" => Ok(Self::Custom),
            other => Err(VaultError::Validation(format!(
                "unknown credential type '{other}'"
            ))),
        }
    }
}

/// Lifecycle status of a credential.
///
/// `Revoked` is terminal — no operation transitions out of it.  Note
/// that time-based expiry is computed from `expires_at` at read time,
/// so a record can still carry `Active` here yet be rejected on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialStatus {
    Active,
    Expired,
    Revoked,
    PendingRotation,
}

impl std::str::FromStr for CredentialStatus {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "expired" => Ok(Self::Expired),
            "revoked" => Ok(Self::Revoked),
            "pending_rotation" => Ok(Self::PendingRotation),
            other => Err(VaultError::Validation(format!(
                "unknown credential status '{other}'"
            ))),
        }
    }
}

/// A single credential record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Credential {
    /// Opaque unique id, generated at creation.
    pub id: String,

    /// Human-readable name, unique across all live credentials.
    pub name: String,

    #[serde(rename = "type")]
    pub credential_type: CredentialType,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Serialized `Envelope` JSON.  Opaque to everything except the
    /// crypto layer.
    pub encrypted_data: String,

    pub status: CredentialStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_rotated_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_interval_days: Option<u32>,

    /// Actor id that created this credential.
    pub created_by: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,

    /// External workflow ids that currently depend on this credential.
    /// A credential with non-empty usage cannot be deleted.
    #[serde(default)]
    pub used_by_workflows: BTreeSet<String>,
}

impl Credential {
    /// Returns `true` if `expires_at` is set and in the past.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at < now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_and_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&CredentialType::ApiKey).unwrap(),
            "\"api_key\""
        );
        assert_eq!(
            serde_json::to_string(&CredentialType::Oauth2).unwrap(),
            "\"oauth2\""
        );
        assert_eq!(
            serde_json::to_string(&CredentialStatus::PendingRotation).unwrap(),
            "\"pending_rotation\""
        );
    }

    #[test]
    fn type_parses_from_str() {
        assert_eq!(
            "ssh_key".parse::<CredentialType>().unwrap(),
            CredentialType::SshKey
        );
        assert!("tls_cert".parse::<CredentialType>().is_err());
    }

    #[test]
    fn expiry_is_computed_from_timestamp() {
        let now = Utc::now();
        let mut cred = Credential {
            id: "c1".into(),
            name: "n".into(),
            credential_type: CredentialType::ApiKey,
            description: None,
            encrypted_data: String::new(),
            status: CredentialStatus::Active,
            created_at: now,
            updated_at: now,
            expires_at: Some(now - chrono::Duration::hours(1)),
            last_rotated_at: None,
            rotation_interval_days: None,
            created_by: "admin".into(),
            tags: Vec::new(),
            metadata: None,
            used_by_workflows: BTreeSet::new(),
        };
        assert!(cred.is_expired(now));

        cred.expires_at = Some(now + chrono::Duration::hours(1));
        assert!(!cred.is_expired(now));

        cred.expires_at = None;
        assert!(!cred.is_expired(now));
    }
}
