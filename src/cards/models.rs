//! Data model for memory cards

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A study item belonging to a single user.
///
/// `appear_count` and `last_appeared_session` are derived selection
/// statistics, mutated only by the draw engine. They satisfy the invariant
/// `appear_count == 0` iff `last_appeared_session` is `None`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryCard {
    /// Store-assigned identifier; 0 until inserted
    pub id: i64,
    /// Id of the owning user
    pub owner: i64,
    /// Open-ended category tag, e.g. "M". Immutable after creation.
    pub card_type: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Times this card has been selected into a session
    #[serde(default)]
    pub appear_count: u64,
    /// Session number of the most recent selection; `None` = never selected
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_appeared_session: Option<u64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl MemoryCard {
    pub fn new(owner: i64, card_type: String, content: String) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            owner,
            card_type,
            content,
            notes: None,
            appear_count: 0,
            last_appeared_session: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Record a selection into the session with the given number.
    pub fn mark_drawn(&mut self, session_number: u64) {
        self.appear_count += 1;
        self.last_appeared_session = Some(session_number);
        self.updated_at = Utc::now();
    }
}
