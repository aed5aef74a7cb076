//! In-memory credential record store.
//!
//! `RecordStore` is the authoritative keyed collection of credential
//! records: a map from credential id to `Credential` with a
//! uniqueness rule on `name`.  It answers the identity and state
//! queries the vault service needs; it never touches plaintext or the
//! master key.
//!
//! Durable persistence is an external collaborator's concern — a
//! database-backed store would implement this same surface.

pub mod credential;

use std::collections::HashMap;

use chrono::{DateTime, Utc};

pub use credential::{Credential, CredentialStatus, CredentialType};

use crate::errors::{Result, VaultError};

/// Optional predicate for `RecordStore::list`.
#[derive(Debug, Clone, Default)]
pub struct ListFilter {
    pub credential_type: Option<CredentialType>,
    pub status: Option<CredentialStatus>,
    /// Any-match: a record matches if it carries at least one of these.
    pub tags: Vec<String>,
    /// Case-insensitive substring match over name and description.
    pub search: Option<String>,
}

/// In-memory map of credential id -> record.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<String, Credential>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new record.  Fails if another record already holds the
    /// same name.
    pub fn insert(&mut self, credential: Credential) -> Result<()> {
        if self.contains_name(&credential.name) {
            return Err(VaultError::DuplicateName(credential.name));
        }
        self.records.insert(credential.id.clone(), credential);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&Credential> {
        self.records.get(id)
    }

    /// Apply `mutator` to the record and bump `updated_at`.
    pub fn update(
        &mut self,
        id: &str,
        mutator: impl FnOnce(&mut Credential),
    ) -> Result<&Credential> {
        let record = self
            .records
            .get_mut(id)
            .ok_or_else(|| VaultError::NotFound(id.to_string()))?;
        mutator(record);
        record.updated_at = Utc::now();
        Ok(record)
    }

    /// Remove a record.  Fails while any workflow usage is recorded.
    pub fn remove(&mut self, id: &str) -> Result<Credential> {
        if let Some(record) = self.records.get(id) {
            if !record.used_by_workflows.is_empty() {
                return Err(VaultError::InUse {
                    name: record.name.clone(),
                    workflows: record.used_by_workflows.iter().cloned().collect(),
                });
            }
        }

        self.records
            .remove(id)
            .ok_or_else(|| VaultError::NotFound(id.to_string()))
    }

    /// All records matching the filter, sorted by name.
    pub fn list(&self, filter: &ListFilter) -> Vec<&Credential> {
        let mut matches: Vec<&Credential> = self
            .records
            .values()
            .filter(|c| Self::matches(c, filter))
            .collect();
        matches.sort_by(|a, b| a.name.cmp(&b.name));
        matches
    }

    /// Active records whose `expires_at` falls in `(now, cutoff]`.
    pub fn find_expiring_before(
        &self,
        now: DateTime<Utc>,
        cutoff: DateTime<Utc>,
    ) -> Vec<&Credential> {
        let mut matches: Vec<&Credential> = self
            .records
            .values()
            .filter(|c| c.status == CredentialStatus::Active)
            .filter(|c| {
                c.expires_at
                    .is_some_and(|at| at > now && at <= cutoff)
            })
            .collect();
        matches.sort_by_key(|c| c.expires_at);
        matches
    }

    /// Active records with a rotation interval whose clock has run out.
    pub fn find_needing_rotation(&self, now: DateTime<Utc>) -> Vec<&Credential> {
        let mut matches: Vec<&Credential> = self
            .records
            .values()
            .filter(|c| c.status == CredentialStatus::Active)
            .filter(|c| match (c.rotation_interval_days, c.last_rotated_at) {
                (Some(days), Some(rotated)) => {
                    rotated + chrono::Duration::days(i64::from(days)) <= now
                }
                // An interval without a recorded rotation means the
                // clock never started — treat as due.
                (Some(_), None) => true,
                _ => false,
            })
            .collect();
        matches.sort_by_key(|c| c.last_rotated_at);
        matches
    }

    /// Metadata-only check — no decryption is performed.
    pub fn contains_name(&self, name: &str) -> bool {
        self.records.values().any(|c| c.name == name)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn matches(credential: &Credential, filter: &ListFilter) -> bool {
        if let Some(wanted) = filter.credential_type {
            if credential.credential_type != wanted {
                return false;
            }
        }
        if let Some(wanted) = filter.status {
            if credential.status != wanted {
                return false;
            }
        }
        if !filter.tags.is_empty()
            && !filter.tags.iter().any(|t| credential.tags.contains(t))
        {
            return false;
        }
        if let Some(ref needle) = filter.search {
            let needle = needle.to_lowercase();
            let in_name = credential.name.to_lowercase().contains(&needle);
            let in_description = credential
                .description
                .as_ref()
                .is_some_and(|d| d.to_lowercase().contains(&needle));
            if !in_name && !in_description {
                return false;
            }
        }
        true
    }
}
