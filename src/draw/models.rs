//! Data models for the draw engine

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::cards::MemoryCard;
use crate::sessions::{PracticeSession, SettingsUsed};

/// Cooldown applied when neither the caller nor stored settings provide one
pub const DEFAULT_INTERVAL_COUNT: u64 = 2;

/// Engine-wide fallback mapping when neither the caller nor stored settings
/// provide one (or the stored mapping is empty).
pub fn default_type_counts() -> BTreeMap<String, i64> {
    BTreeMap::from([("M".to_string(), 3), ("N".to_string(), 2)])
}

/// Per-user default draw parameters. At most one record per user; absence
/// means the engine-wide defaults apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDrawSettings {
    pub user_id: i64,
    pub type_counts: BTreeMap<String, i64>,
    pub interval_count: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UserDrawSettings {
    pub fn new(user_id: i64, type_counts: BTreeMap<String, i64>, interval_count: u64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            type_counts,
            interval_count,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Result of one draw: the created session plus the selected cards.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawOutcome {
    pub session: PracticeSession,
    /// Selected cards per requested type; a type with no eligible cards
    /// maps to an empty list
    pub cards_by_type: BTreeMap<String, Vec<MemoryCard>>,
    pub total_cards: usize,
    /// The resolved parameters, identical to the snapshot on the session
    pub settings_used: SettingsUsed,
}

/// Compact per-user draw summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawStatistics {
    pub total_cards: usize,
    pub cards_by_type: BTreeMap<String, usize>,
    pub drawn_cards: usize,
    pub never_drawn: usize,
    pub total_sessions: usize,
}
