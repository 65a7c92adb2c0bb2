//! Data models for practice sessions

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot of the draw parameters a session was actually created with.
///
/// Stored verbatim on the session record. The mapping is ordered so the
/// serialized form and the per-type draw order are deterministic.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsUsed {
    /// Requested number of cards per type tag; entries with a count <= 0
    /// are kept in the snapshot but skipped by the draw
    pub type_counts: BTreeMap<String, i64>,
    /// Cooldown in elapsed sessions
    pub interval_count: u64,
}

/// One completed draw. Immutable once created; administrative deletion
/// leaves a gap in the numbering rather than renumbering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PracticeSession {
    /// Store-assigned identifier, distinct from the session number
    pub id: i64,
    /// Strictly increasing and unique across the whole store
    pub session_number: u64,
    pub user_id: i64,
    pub settings_used: SettingsUsed,
    pub created_at: DateTime<Utc>,
}

/// Full session history of one user, for backup or offline analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExport {
    pub user_id: i64,
    pub total_sessions: usize,
    pub export_date: DateTime<Utc>,
    /// Ascending by session number
    pub sessions: Vec<SessionExportEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionExportEntry {
    pub session_number: u64,
    /// RFC 3339 creation timestamp
    pub date: String,
    pub settings_used: SettingsUsed,
}
