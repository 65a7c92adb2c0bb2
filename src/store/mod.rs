//! Storage boundary for cards, sessions, and user settings
//!
//! The engines depend only on the traits here; the bundled backends are
//! [`MemoryStore`] (in-memory, test-friendly) and [`SqliteStore`]
//! (durable). Card-statistics updates and the session insert of one draw
//! commit through a single [`SessionStore::commit_draw`] call so backends
//! can apply the pair atomically.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::cards::MemoryCard;
use crate::draw::UserDrawSettings;
use crate::sessions::{PracticeSession, SettingsUsed};

mod memory;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Card not found: {0}")]
    CardNotFound(i64),

    #[error("Session not found: {0}")]
    SessionNotFound(i64),

    #[error("Settings not found for user: {0}")]
    SettingsNotFound(i64),

    #[error("Session number already taken: {0}")]
    SessionNumberConflict(u64),

    #[error("Data directory not found")]
    DataDirNotFound,

    #[error("Invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, StoreError>;

/// A session record about to be committed. The store assigns the surrogate
/// id; everything else, including the creation timestamp, is provided by
/// the caller.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub user_id: i64,
    pub session_number: u64,
    pub settings_used: SettingsUsed,
    pub created_at: DateTime<Utc>,
}

/// Card records keyed by owner and type.
///
/// The draw engine only scans and field-updates cards; insert/delete exist
/// for the surrounding system and for test fixtures.
pub trait CardStore {
    /// Insert a card, assigning its id. Returns the stored copy.
    fn insert_card(&self, card: MemoryCard) -> Result<MemoryCard>;

    fn find_card(&self, id: i64) -> Result<MemoryCard>;

    /// All cards of one owner, optionally restricted to a type tag,
    /// ascending by id.
    fn find_cards(&self, owner: i64, card_type: Option<&str>) -> Result<Vec<MemoryCard>>;

    fn update_card(&self, card: &MemoryCard) -> Result<()>;

    fn delete_card(&self, id: i64) -> Result<()>;
}

/// Append-only log of practice sessions with a globally unique sequence
/// number.
pub trait SessionStore {
    /// Highest session number in the whole store, 0 when empty.
    fn max_session_number(&self) -> Result<u64>;

    fn find_session(&self, id: i64) -> Result<PracticeSession>;

    /// Sessions of one user, ascending by session number, optionally
    /// limited to those created at or after `since`.
    fn find_sessions(
        &self,
        user_id: i64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<PracticeSession>>;

    /// Administrative deletion. Numbering is never backfilled; a gap is
    /// not corruption.
    fn delete_session(&self, id: i64) -> Result<()>;

    /// Apply one draw's card-statistics updates and session insert as a
    /// single all-or-nothing unit. A duplicate session number fails with
    /// [`StoreError::SessionNumberConflict`] and leaves no trace.
    fn commit_draw(
        &self,
        card_updates: &[MemoryCard],
        session: NewSession,
    ) -> Result<PracticeSession>;
}

/// Per-user default draw parameters, at most one record per user.
pub trait SettingsStore {
    fn find_settings(&self, user_id: i64) -> Result<Option<UserDrawSettings>>;

    /// Create or replace the user's settings, preserving `created_at` on
    /// replace.
    fn upsert_settings(
        &self,
        user_id: i64,
        type_counts: BTreeMap<String, i64>,
        interval_count: u64,
    ) -> Result<UserDrawSettings>;

    /// Remove the user's settings so engine-wide defaults apply again.
    fn delete_settings(&self, user_id: i64) -> Result<()>;
}

/// Umbrella for the engines, which need all three surfaces.
pub trait Store: CardStore + SessionStore + SettingsStore {}

impl<T: CardStore + SessionStore + SettingsStore> Store for T {}
