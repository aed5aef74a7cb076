//! Request/response boundary for the vault.
//!
//! This is the contract an HTTP layer mounts: a method, an `action`
//! query parameter, string params, and an optional JSON body, mapped
//! to a status code and a JSON body.  Keeping the dispatcher free of
//! any web framework lets the host embed it behind whatever router it
//! already runs, and makes the whole surface testable in-process.
//!
//! The dispatcher takes `&mut CredentialVault`; a multi-threaded host
//! wraps the vault in a `Mutex` around each call.
//!
//! Error responses are `{error, message}` with an HTTP-equivalent
//! status.  Messages never include ciphertext, key material, or raw
//! cipher internals.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::audit::LogQuery;
use crate::config::VaultConfigPatch;
use crate::errors::{Result, VaultError};
use crate::store::ListFilter;
use crate::vault::{Actor, CredentialUpdate, CredentialVault, StoreCredentialRequest};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// One inbound request.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    pub action: String,
    pub params: HashMap<String, String>,
    pub body: Option<Value>,
    pub actor: Actor,
}

impl ApiRequest {
    pub fn get(action: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            action: action.into(),
            params: HashMap::new(),
            body: None,
            actor: Actor::default(),
        }
    }

    pub fn post(action: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            action: action.into(),
            params: HashMap::new(),
            body: Some(body),
            actor: Actor::default(),
        }
    }

    pub fn param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn with_actor(mut self, actor: Actor) -> Self {
        self.actor = actor;
        self
    }
}

/// One outbound response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

impl ApiResponse {
    fn ok(body: Value) -> Self {
        Self { status: 200, body }
    }
}

impl From<VaultError> for ApiResponse {
    fn from(error: VaultError) -> Self {
        Self {
            status: error.status_code(),
            body: json!({
                "error": error.kind(),
                "message": error.to_string(),
            }),
        }
    }
}

/// Dispatch one request against the vault.
pub fn handle(vault: &mut CredentialVault, request: ApiRequest) -> ApiResponse {
    match dispatch(vault, &request) {
        Ok(body) => ApiResponse::ok(body),
        Err(error) => error.into(),
    }
}

fn dispatch(vault: &mut CredentialVault, request: &ApiRequest) -> Result<Value> {
    match (request.method, request.action.as_str()) {
        (Method::Get, "list") => list(vault, request),
        (Method::Get, "get") => get(vault, request),
        (Method::Get, "expiring") => expiring(vault, request),
        (Method::Get, "needs-rotation") => {
            Ok(json!({ "credentials": vault.credentials_needing_rotation() }))
        }
        (Method::Get, "access-logs") => access_logs(vault, request),
        (Method::Get, "access-stats") => {
            let stats = vault.access_stats(request.params.get("credentialId").map(String::as_str));
            Ok(json!({ "stats": stats }))
        }
        (Method::Get, "config") => Ok(json!({ "config": vault.config() })),

        (Method::Post, "create") => create(vault, request),
        (Method::Post, "update") => update(vault, request),
        (Method::Post, "delete") => delete(vault, request),
        (Method::Post, "rotate") => rotate(vault, request),
        (Method::Post, "mark-used-by") => {
            let (id, workflow) = usage_args(request)?;
            vault.mark_used_by(&id, &workflow)?;
            Ok(json!({ "success": true }))
        }
        (Method::Post, "remove-workflow-usage") => {
            let (id, workflow) = usage_args(request)?;
            vault.remove_workflow_usage(&id, &workflow)?;
            Ok(json!({ "success": true }))
        }
        (Method::Post, "update-config") => update_config(vault, request),

        (method, action) => Err(VaultError::Validation(format!(
            "unknown action '{action}' for {method:?} requests"
        ))),
    }
}

// ------------------------------------------------------------------
// GET handlers
// ------------------------------------------------------------------

fn list(vault: &CredentialVault, request: &ApiRequest) -> Result<Value> {
    let mut filter = ListFilter::default();

    if let Some(raw) = non_empty_param(request, "type") {
        filter.credential_type = Some(raw.parse()?);
    }
    if let Some(raw) = non_empty_param(request, "status") {
        filter.status = Some(raw.parse()?);
    }
    if let Some(raw) = non_empty_param(request, "search") {
        filter.search = Some(raw.to_string());
    }
    if let Some(raw) = non_empty_param(request, "tags") {
        filter.tags = raw
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(ToString::to_string)
            .collect();
    }

    Ok(json!({ "credentials": vault.list_credentials(&filter) }))
}

fn get(vault: &mut CredentialVault, request: &ApiRequest) -> Result<Value> {
    let id = require_param(request, "credentialId")?;
    let (credential, data) = vault.get_credential(&id, &request.actor)?;
    Ok(json!({ "credential": credential, "data": data }))
}

fn expiring(vault: &CredentialVault, request: &ApiRequest) -> Result<Value> {
    let days_ahead = match non_empty_param(request, "daysAhead") {
        Some(raw) => Some(raw.parse::<u32>().map_err(|_| {
            VaultError::Validation(format!("daysAhead must be a number (got '{raw}')"))
        })?),
        None => None,
    };
    Ok(json!({ "credentials": vault.expiring_credentials(days_ahead) }))
}

fn access_logs(vault: &CredentialVault, request: &ApiRequest) -> Result<Value> {
    let mut query = LogQuery {
        credential_id: non_empty_param(request, "credentialId").map(ToString::to_string),
        user_id: non_empty_param(request, "userId").map(ToString::to_string),
        ..Default::default()
    };
    if let Some(raw) = non_empty_param(request, "logAction") {
        query.action = Some(raw.parse()?);
    }
    if let Some(raw) = non_empty_param(request, "limit") {
        let limit = raw.parse::<usize>().map_err(|_| {
            VaultError::Validation(format!("limit must be a number (got '{raw}')"))
        })?;
        query.limit = Some(limit);
    }
    Ok(json!({ "logs": vault.access_logs(&query) }))
}

// ------------------------------------------------------------------
// POST handlers
// ------------------------------------------------------------------

fn create(vault: &mut CredentialVault, request: &ApiRequest) -> Result<Value> {
    let body = require_body(request)?;
    let store_request: StoreCredentialRequest = serde_json::from_value(body.clone())
        .map_err(|e| VaultError::Validation(format!("invalid create body: {e}")))?;
    let credential = vault.store_credential(store_request, &request.actor)?;
    Ok(json!({ "credential": credential }))
}

fn update(vault: &mut CredentialVault, request: &ApiRequest) -> Result<Value> {
    let body = require_body(request)?;
    let id = require_body_field(body, "credentialId")?;
    let patch: CredentialUpdate = serde_json::from_value(body.clone())
        .map_err(|e| VaultError::Validation(format!("invalid update body: {e}")))?;
    let credential = vault.update_credential(&id, patch, &request.actor)?;
    Ok(json!({ "credential": credential }))
}

fn delete(vault: &mut CredentialVault, request: &ApiRequest) -> Result<Value> {
    let body = require_body(request)?;
    let id = require_body_field(body, "credentialId")?;
    vault.delete_credential(&id, &request.actor)?;
    Ok(json!({ "success": true }))
}

fn rotate(vault: &mut CredentialVault, request: &ApiRequest) -> Result<Value> {
    let body = require_body(request)?;
    let id = require_body_field(body, "credentialId")?;
    let new_data = body
        .get("newData")
        .filter(|v| !v.is_null())
        .cloned()
        .ok_or_else(|| VaultError::Validation("newData is required".into()))?;
    let credential = vault.rotate_credential(&id, new_data, &request.actor)?;
    Ok(json!({ "credential": credential }))
}

fn update_config(vault: &mut CredentialVault, request: &ApiRequest) -> Result<Value> {
    let body = require_body(request)?;
    let raw = body
        .get("config")
        .cloned()
        .ok_or_else(|| VaultError::Validation("config is required".into()))?;
    let patch: VaultConfigPatch = serde_json::from_value(raw)
        .map_err(|e| VaultError::Validation(format!("invalid config body: {e}")))?;
    Ok(json!({ "config": vault.update_config(patch) }))
}

// ------------------------------------------------------------------
// Helpers
// ------------------------------------------------------------------

fn usage_args(request: &ApiRequest) -> Result<(String, String)> {
    let body = require_body(request)?;
    let id = require_body_field(body, "credentialId")?;
    let workflow = require_body_field(body, "workflowId")?;
    Ok((id, workflow))
}

fn non_empty_param<'a>(request: &'a ApiRequest, key: &str) -> Option<&'a str> {
    request
        .params
        .get(key)
        .map(String::as_str)
        .filter(|v| !v.is_empty())
}

fn require_param(request: &ApiRequest, key: &str) -> Result<String> {
    non_empty_param(request, key)
        .map(ToString::to_string)
        .ok_or_else(|| VaultError::Validation(format!("{key} is required")))
}

fn require_body(request: &ApiRequest) -> Result<&Value> {
    request
        .body
        .as_ref()
        .ok_or_else(|| VaultError::Validation("request body is required".into()))
}

fn require_body_field(body: &Value, key: &str) -> Result<String> {
    body.get(key)
        .and_then(Value::as_str)
        .filter(|v| !v.is_empty())
        .map(ToString::to_string)
        .ok_or_else(|| VaultError::Validation(format!("{key} is required")))
}
