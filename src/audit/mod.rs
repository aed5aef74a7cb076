//! Access log — bounded in-memory audit trail.
//!
//! Every audited vault operation (read, create, update, delete,
//! rotate) appends exactly one entry here, success or failure.
//! Entries are write-once: nothing mutates or removes an individual
//! entry.  The log is bounded by a retention cap; on overflow the
//! oldest entries are evicted first (plain FIFO — entries are never
//! re-accessed, so there is no "recency" to track).

use std::collections::{BTreeMap, HashSet, VecDeque};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::VaultError;

/// Default retention cap.
pub const DEFAULT_MAX_ENTRIES: usize = 1_000;

/// The audited operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessAction {
    Read,
    Create,
    Update,
    Delete,
    Rotate,
}

impl AccessAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
            Self::Rotate => "rotate",
        }
    }
}

impl std::str::FromStr for AccessAction {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "read" => Ok(Self::Read),
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            "rotate" => Ok(Self::Rotate),
            other => Err(VaultError::Validation(format!(
                "unknown access action '{other}'"
            ))),
        }
    }
}

/// Immutable record of one access attempt.
///
/// Credential id and name are captured at the time of the attempt, so
/// the entry stays meaningful even after the credential is deleted —
/// or when the attempt failed before the credential resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessLogEntry {
    pub id: u64,
    pub credential_id: String,
    pub credential_name: String,
    pub action: AccessAction,
    pub user_id: String,
    pub user_name: String,
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Filters for `AccessLog::query`.  All fields are conjunctive.
#[derive(Debug, Clone, Default)]
pub struct LogQuery {
    pub credential_id: Option<String>,
    pub user_id: Option<String>,
    pub action: Option<AccessAction>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
    /// Keep only the newest N matching entries.
    pub limit: Option<usize>,
}

/// Aggregate counts over the (optionally credential-scoped) log.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessStats {
    pub total: u64,
    pub success_count: u64,
    pub failure_count: u64,
    pub unique_users: u64,
    pub by_action: BTreeMap<String, u64>,
    pub by_user: BTreeMap<String, u64>,
}

/// Append-only bounded log.
#[derive(Debug)]
pub struct AccessLog {
    entries: VecDeque<AccessLogEntry>,
    max_entries: usize,
    next_id: u64,
}

impl AccessLog {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            max_entries: max_entries.max(1),
            next_id: 1,
        }
    }

    /// Record one access attempt.  Assigns the entry id and timestamp;
    /// evicts from the head once the retention cap is exceeded.
    #[allow(clippy::too_many_arguments)]
    pub fn append(
        &mut self,
        credential_id: &str,
        credential_name: &str,
        action: AccessAction,
        user_id: &str,
        user_name: &str,
        success: bool,
        reason: Option<String>,
    ) {
        let entry = AccessLogEntry {
            id: self.next_id,
            credential_id: credential_id.to_string(),
            credential_name: credential_name.to_string(),
            action,
            user_id: user_id.to_string(),
            user_name: user_name.to_string(),
            timestamp: Utc::now(),
            success,
            reason,
        };
        self.next_id += 1;

        self.entries.push_back(entry);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    /// Matching entries, most recent first.  `limit` truncates from
    /// the most recent end, so the caller sees the newest N matches.
    pub fn query(&self, query: &LogQuery) -> Vec<AccessLogEntry> {
        let mut matches: Vec<AccessLogEntry> = self
            .entries
            .iter()
            .rev()
            .filter(|e| {
                query
                    .credential_id
                    .as_ref()
                    .map_or(true, |id| &e.credential_id == id)
                    && query.user_id.as_ref().map_or(true, |id| &e.user_id == id)
                    && query.action.map_or(true, |a| e.action == a)
                    && query.since.map_or(true, |t| e.timestamp >= t)
                    && query.until.map_or(true, |t| e.timestamp <= t)
            })
            .cloned()
            .collect();

        if let Some(limit) = query.limit {
            matches.truncate(limit);
        }
        matches
    }

    /// Aggregate counts, optionally scoped to one credential.
    pub fn stats(&self, credential_id: Option<&str>) -> AccessStats {
        let mut total = 0u64;
        let mut success_count = 0u64;
        let mut by_action: BTreeMap<String, u64> = BTreeMap::new();
        let mut by_user: BTreeMap<String, u64> = BTreeMap::new();
        let mut users: HashSet<&str> = HashSet::new();

        for entry in &self.entries {
            if credential_id.is_some_and(|id| entry.credential_id != id) {
                continue;
            }
            total += 1;
            if entry.success {
                success_count += 1;
            }
            *by_action.entry(entry.action.as_str().to_string()).or_default() += 1;
            *by_user.entry(entry.user_id.clone()).or_default() += 1;
            users.insert(&entry.user_id);
        }

        AccessStats {
            total,
            success_count,
            failure_count: total - success_count,
            unique_users: users.len() as u64,
            by_action,
            by_user,
        }
    }

    /// Change the retention cap, evicting oldest entries immediately
    /// if the log already exceeds the new cap.
    pub fn set_max_entries(&mut self, max_entries: usize) {
        self.max_entries = max_entries.max(1);
        while self.entries.len() > self.max_entries {
            self.entries.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for AccessLog {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn append_n(log: &mut AccessLog, n: usize, action: AccessAction) {
        for i in 0..n {
            log.append(
                &format!("cred-{i}"),
                &format!("name-{i}"),
                action,
                "admin-user",
                "Admin",
                true,
                None,
            );
        }
    }

    #[test]
    fn append_assigns_increasing_ids() {
        let mut log = AccessLog::default();
        append_n(&mut log, 3, AccessAction::Read);

        let entries = log.query(&LogQuery::default());
        assert_eq!(entries.len(), 3);
        // Most recent first.
        assert!(entries[0].id > entries[1].id);
        assert!(entries[1].id > entries[2].id);
    }

    #[test]
    fn eviction_is_fifo_at_the_cap() {
        let mut log = AccessLog::new(5);
        append_n(&mut log, 8, AccessAction::Create);

        assert_eq!(log.len(), 5);
        let entries = log.query(&LogQuery::default());
        // The three oldest (ids 1..=3) are gone.
        assert_eq!(entries.last().unwrap().id, 4);
        assert_eq!(entries.first().unwrap().id, 8);
    }

    #[test]
    fn query_filters_are_conjunctive() {
        let mut log = AccessLog::default();
        log.append("c1", "db", AccessAction::Read, "alice", "Alice", true, None);
        log.append("c1", "db", AccessAction::Rotate, "bob", "Bob", true, None);
        log.append(
            "c2",
            "api",
            AccessAction::Read,
            "alice",
            "Alice",
            false,
            Some("expired".into()),
        );

        let by_cred = log.query(&LogQuery {
            credential_id: Some("c1".into()),
            ..Default::default()
        });
        assert_eq!(by_cred.len(), 2);

        let by_cred_and_user = log.query(&LogQuery {
            credential_id: Some("c1".into()),
            user_id: Some("alice".into()),
            ..Default::default()
        });
        assert_eq!(by_cred_and_user.len(), 1);
        assert_eq!(by_cred_and_user[0].action, AccessAction::Read);

        let by_action = log.query(&LogQuery {
            action: Some(AccessAction::Rotate),
            ..Default::default()
        });
        assert_eq!(by_action.len(), 1);
        assert_eq!(by_action[0].user_id, "bob");
    }

    #[test]
    fn limit_keeps_the_newest_matches() {
        let mut log = AccessLog::default();
        append_n(&mut log, 10, AccessAction::Read);

        let entries = log.query(&LogQuery {
            limit: Some(3),
            ..Default::default()
        });
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].id, 10);
        assert_eq!(entries[2].id, 8);
    }

    #[test]
    fn stats_aggregate_and_scope() {
        let mut log = AccessLog::default();
        log.append("c1", "db", AccessAction::Read, "alice", "Alice", true, None);
        log.append("c1", "db", AccessAction::Read, "bob", "Bob", true, None);
        log.append(
            "c1",
            "db",
            AccessAction::Delete,
            "bob",
            "Bob",
            false,
            Some("in use".into()),
        );
        log.append("c2", "api", AccessAction::Create, "alice", "Alice", true, None);

        let all = log.stats(None);
        assert_eq!(all.total, 4);
        assert_eq!(all.success_count, 3);
        assert_eq!(all.failure_count, 1);
        assert_eq!(all.unique_users, 2);
        assert_eq!(all.by_action.get("read"), Some(&2));

        let scoped = log.stats(Some("c1"));
        assert_eq!(scoped.total, 3);
        assert_eq!(scoped.by_user.get("bob"), Some(&2));
    }

    #[test]
    fn failure_entries_carry_a_reason() {
        let mut log = AccessLog::default();
        log.append(
            "c1",
            "db",
            AccessAction::Read,
            "alice",
            "Alice",
            false,
            Some("credential revoked".into()),
        );

        let entries = log.query(&LogQuery::default());
        assert!(!entries[0].success);
        assert_eq!(entries[0].reason.as_deref(), Some("credential revoked"));
    }
}
