//! High-level vault operations — the façade the rest of the
//! application talks to.
//!
//! `CredentialVault` owns the record store and the access log for its
//! process lifetime; nothing else mutates credential state.  Every
//! call to store/get/update/delete/rotate appends exactly one access
//! log entry, success or failure with a reason, before the error
//! propagates — audit completeness takes priority over clean error
//! propagation.
//!
//! Construct one vault at application startup and pass it by reference
//! to request handlers.  The vault itself has no interior locking: a
//! multi-threaded host must wrap it in a `Mutex` (or serialize access
//! behind an actor/channel) to preserve the name-uniqueness and
//! log-eviction invariants.

use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::audit::{AccessAction, AccessLog, AccessLogEntry, AccessStats, LogQuery};
use crate::config::{VaultConfig, VaultConfigPatch};
use crate::crypto::{Envelope, MasterKey};
use crate::errors::{Result, VaultError};
use crate::store::{Credential, CredentialStatus, CredentialType, ListFilter, RecordStore};

/// Placeholder recorded when an attempt fails before the target
/// credential resolves (e.g. unknown id).
const UNRESOLVED: &str = "unknown";

/// The acting identity, supplied by the host's session provider.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub user_id: String,
    pub user_name: String,
}

impl Actor {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
        }
    }
}

impl Default for Actor {
    /// Static placeholder identity for hosts without a session
    /// provider wired up yet.
    fn default() -> Self {
        Self::new("admin-user", "Admin")
    }
}

/// Input for `CredentialVault::store_credential`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreCredentialRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub credential_type: CredentialType,
    /// Plaintext secret payload, shaped by the caller to fit the type.
    pub data: serde_json::Value,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub rotation_interval_days: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

/// Partial update for `CredentialVault::update_credential`.  Omitted
/// fields leave the current value untouched; `data` re-encrypts the
/// payload with a fresh salt and IV.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub data: Option<serde_json::Value>,
    pub status: Option<CredentialStatus>,
    pub expires_at: Option<DateTime<Utc>>,
    pub rotation_interval_days: Option<u32>,
    pub tags: Option<Vec<String>>,
    pub metadata: Option<serde_json::Value>,
}

/// The main vault handle.
pub struct CredentialVault {
    config: VaultConfig,
    master_key: MasterKey,
    store: RecordStore,
    log: AccessLog,
}

impl CredentialVault {
    /// Build a vault with the given policy and master key.
    pub fn new(config: VaultConfig, master_key: MasterKey) -> Self {
        if master_key.is_dev_fallback() {
            tracing::warn!("vault is using the insecure development master key");
        }
        let log = AccessLog::new(config.max_access_log_entries);
        Self {
            config,
            master_key,
            store: RecordStore::new(),
            log,
        }
    }

    /// Build a vault with default policy and the master key from the
    /// environment.
    pub fn from_env() -> Self {
        Self::new(VaultConfig::default(), MasterKey::from_env())
    }

    // ------------------------------------------------------------------
    // Audited operations
    // ------------------------------------------------------------------

    /// Encrypt and store a new credential.  Returns the stored record
    /// (metadata plus the opaque envelope, never the plaintext).
    pub fn store_credential(
        &mut self,
        request: StoreCredentialRequest,
        actor: &Actor,
    ) -> Result<Credential> {
        let attempted_name = request.name.clone();
        let result = self.store_inner(request, actor);

        match &result {
            Ok(credential) => {
                let (id, name) = (credential.id.clone(), credential.name.clone());
                debug!(credential = %name, "credential stored");
                self.audit(&id, &name, AccessAction::Create, actor, true, None);
            }
            Err(e) => {
                let reason = e.to_string();
                self.audit(
                    UNRESOLVED,
                    &attempted_name,
                    AccessAction::Create,
                    actor,
                    false,
                    Some(reason),
                );
            }
        }
        result
    }

    /// Decrypt and return a credential's payload alongside its
    /// metadata.
    ///
    /// Read access is gated on lifecycle state: a revoked credential
    /// is rejected outright, and an `expires_at` in the past rejects
    /// the read even when the stored status still says `active`.
    pub fn get_credential(
        &mut self,
        id: &str,
        actor: &Actor,
    ) -> Result<(Credential, serde_json::Value)> {
        let name = self.resolved_name(id);
        let result = self.get_inner(id);

        let reason = result.as_ref().err().map(ToString::to_string);
        self.audit(id, &name, AccessAction::Read, actor, reason.is_none(), reason);
        result
    }

    /// Apply a partial update.  Only fields present in `update` are
    /// changed; a new `data` payload is re-encrypted with fresh
    /// salt/IV.
    pub fn update_credential(
        &mut self,
        id: &str,
        update: CredentialUpdate,
        actor: &Actor,
    ) -> Result<Credential> {
        let name = self.resolved_name(id);
        let result = self.update_inner(id, update);

        let reason = result.as_ref().err().map(ToString::to_string);
        self.audit(id, &name, AccessAction::Update, actor, reason.is_none(), reason);
        result
    }

    /// Delete a credential.  Blocked while any workflow usage is
    /// recorded.
    pub fn delete_credential(&mut self, id: &str, actor: &Actor) -> Result<()> {
        let name = self.resolved_name(id);
        let result = self.store.remove(id).map(|_| ());

        if result.is_ok() {
            debug!(credential = %name, "credential deleted");
        }
        let reason = result.as_ref().err().map(ToString::to_string);
        self.audit(id, &name, AccessAction::Delete, actor, reason.is_none(), reason);
        result
    }

    /// Replace a credential's secret value, resetting the rotation
    /// clock.  The previous ciphertext is discarded — secret history
    /// retention is itself a liability, so there is no rollback path.
    pub fn rotate_credential(
        &mut self,
        id: &str,
        new_data: serde_json::Value,
        actor: &Actor,
    ) -> Result<Credential> {
        let name = self.resolved_name(id);
        let result = self.rotate_inner(id, new_data);

        if result.is_ok() {
            debug!(credential = %name, "credential rotated");
        }
        let reason = result.as_ref().err().map(ToString::to_string);
        self.audit(id, &name, AccessAction::Rotate, actor, reason.is_none(), reason);
        result
    }

    // ------------------------------------------------------------------
    // Read-only projections (metadata only, never audited)
    // ------------------------------------------------------------------

    /// All credentials matching the filter.  No plaintext, no audit
    /// entry — only full `get_credential` reads are audited.
    pub fn list_credentials(&self, filter: &ListFilter) -> Vec<Credential> {
        self.store.list(filter).into_iter().cloned().collect()
    }

    /// Active credentials expiring within `days_ahead` days (config
    /// lead-time when unspecified).  Empty when expiration alerts are
    /// disabled.
    pub fn expiring_credentials(&self, days_ahead: Option<u32>) -> Vec<Credential> {
        if !self.config.expiration_alert_enabled {
            return Vec::new();
        }
        let days = days_ahead.unwrap_or(self.config.expiration_alert_days);
        let now = Utc::now();
        let cutoff = now + Duration::days(i64::from(days));
        self.store
            .find_expiring_before(now, cutoff)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Active credentials whose rotation interval has elapsed.  An
    /// external scheduler is expected to poll this and mark or rotate.
    pub fn credentials_needing_rotation(&self) -> Vec<Credential> {
        self.store
            .find_needing_rotation(Utc::now())
            .into_iter()
            .cloned()
            .collect()
    }

    // ------------------------------------------------------------------
    // Workflow usage tracking
    // ------------------------------------------------------------------

    /// Record that `workflow_id` depends on this credential.
    /// Idempotent: re-adding an existing id is a no-op.
    pub fn mark_used_by(&mut self, id: &str, workflow_id: &str) -> Result<()> {
        self.store
            .update(id, |c| {
                c.used_by_workflows.insert(workflow_id.to_string());
            })
            .map(|_| ())
    }

    /// Drop a recorded workflow dependency.  Removing an absent id is
    /// a no-op.
    pub fn remove_workflow_usage(&mut self, id: &str, workflow_id: &str) -> Result<()> {
        self.store
            .update(id, |c| {
                c.used_by_workflows.remove(workflow_id);
            })
            .map(|_| ())
    }

    // ------------------------------------------------------------------
    // Config and audit access
    // ------------------------------------------------------------------

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    /// Merge a partial config override, resizing the access log cap if
    /// it changed.
    pub fn update_config(&mut self, patch: VaultConfigPatch) -> &VaultConfig {
        self.config.apply(patch);
        self.log.set_max_entries(self.config.max_access_log_entries);
        &self.config
    }

    pub fn access_logs(&self, query: &LogQuery) -> Vec<AccessLogEntry> {
        self.log.query(query)
    }

    pub fn access_stats(&self, credential_id: Option<&str>) -> AccessStats {
        self.log.stats(credential_id)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn store_inner(
        &mut self,
        request: StoreCredentialRequest,
        actor: &Actor,
    ) -> Result<Credential> {
        if request.name.trim().is_empty() {
            return Err(VaultError::Validation("credential name is required".into()));
        }
        if request.data.is_null() {
            return Err(VaultError::Validation("credential data is required".into()));
        }
        if self.store.contains_name(&request.name) {
            return Err(VaultError::DuplicateName(request.name));
        }

        let encrypted_data = self.seal_payload(&request.data)?;

        let rotation_interval_days = request.rotation_interval_days.or_else(|| {
            self.config
                .auto_rotation_enabled
                .then_some(self.config.default_rotation_interval_days)
        });

        let now = Utc::now();
        let credential = Credential {
            id: uuid::Uuid::new_v4().to_string(),
            name: request.name,
            credential_type: request.credential_type,
            description: request.description,
            encrypted_data,
            status: CredentialStatus::Active,
            created_at: now,
            updated_at: now,
            expires_at: request.expires_at,
            last_rotated_at: Some(now),
            rotation_interval_days,
            created_by: actor.user_id.clone(),
            tags: request.tags,
            metadata: request.metadata,
            used_by_workflows: Default::default(),
        };

        self.store.insert(credential.clone())?;
        Ok(credential)
    }

    fn get_inner(&self, id: &str) -> Result<(Credential, serde_json::Value)> {
        let credential = self
            .store
            .get(id)
            .ok_or_else(|| VaultError::NotFound(id.to_string()))?;

        if credential.status == CredentialStatus::Revoked {
            return Err(VaultError::Revoked(credential.name.clone()));
        }
        if credential.is_expired(Utc::now()) {
            return Err(VaultError::Expired(credential.name.clone()));
        }

        let envelope = Envelope::from_json(&credential.encrypted_data)?;
        let plaintext = envelope.open(&self.master_key)?;
        let data: serde_json::Value = serde_json::from_str(&plaintext)
            .map_err(|e| VaultError::Serialization(format!("credential payload: {e}")))?;

        Ok((credential.clone(), data))
    }

    fn update_inner(&mut self, id: &str, update: CredentialUpdate) -> Result<Credential> {
        let current = self
            .store
            .get(id)
            .ok_or_else(|| VaultError::NotFound(id.to_string()))?;

        // Revoked is terminal — no status transition out of it.
        if current.status == CredentialStatus::Revoked
            && update
                .status
                .is_some_and(|s| s != CredentialStatus::Revoked)
        {
            return Err(VaultError::Validation(
                "a revoked credential cannot change status".into(),
            ));
        }

        if let Some(ref new_name) = update.name {
            if new_name != &current.name && self.store.contains_name(new_name) {
                return Err(VaultError::DuplicateName(new_name.clone()));
            }
        }

        let encrypted_data = match update.data {
            Some(ref data) => Some(self.seal_payload(data)?),
            None => None,
        };

        let updated = self.store.update(id, |c| {
            if let Some(name) = update.name {
                c.name = name;
            }
            if let Some(description) = update.description {
                c.description = Some(description);
            }
            if let Some(encrypted) = encrypted_data {
                c.encrypted_data = encrypted;
            }
            if let Some(status) = update.status {
                c.status = status;
            }
            if let Some(expires_at) = update.expires_at {
                c.expires_at = Some(expires_at);
            }
            if let Some(days) = update.rotation_interval_days {
                c.rotation_interval_days = Some(days);
            }
            if let Some(tags) = update.tags {
                c.tags = tags;
            }
            if let Some(metadata) = update.metadata {
                c.metadata = Some(metadata);
            }
        })?;

        Ok(updated.clone())
    }

    fn rotate_inner(&mut self, id: &str, new_data: serde_json::Value) -> Result<Credential> {
        if self.store.get(id).is_none() {
            return Err(VaultError::NotFound(id.to_string()));
        }
        if new_data.is_null() {
            return Err(VaultError::Validation("new credential data is required".into()));
        }

        let encrypted_data = self.seal_payload(&new_data)?;

        let updated = self.store.update(id, |c| {
            c.encrypted_data = encrypted_data;
            c.last_rotated_at = Some(Utc::now());
            if c.status == CredentialStatus::PendingRotation {
                c.status = CredentialStatus::Active;
            }
        })?;

        Ok(updated.clone())
    }

    /// Serialize a payload and seal it into an envelope JSON string.
    fn seal_payload(&self, data: &serde_json::Value) -> Result<String> {
        let plaintext = serde_json::to_string(data)
            .map_err(|e| VaultError::Serialization(format!("credential payload: {e}")))?;
        let envelope = Envelope::seal(&plaintext, &self.master_key, self.config.kdf_iterations)?;
        envelope.to_json()
    }

    /// Credential name for audit capture, or a placeholder when the id
    /// does not resolve.
    fn resolved_name(&self, id: &str) -> String {
        self.store
            .get(id)
            .map_or_else(|| UNRESOLVED.to_string(), |c| c.name.clone())
    }

    fn audit(
        &mut self,
        credential_id: &str,
        credential_name: &str,
        action: AccessAction,
        actor: &Actor,
        success: bool,
        reason: Option<String>,
    ) {
        if !self.config.access_logging_enabled {
            return;
        }
        self.log.append(
            credential_id,
            credential_name,
            action,
            &actor.user_id,
            &actor.user_name,
            success,
            reason,
        );
    }
}
