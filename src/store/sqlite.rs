//! SQLite storage backend
//!
//! Durable store behind the same traits as [`super::MemoryStore`]. The
//! settings snapshot on a session row is a JSON column decoded into the
//! typed record on read, and `commit_draw` runs in one transaction with a
//! UNIQUE constraint on `session_number` enforcing the global numbering
//! invariant.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};

use super::{CardStore, NewSession, Result, SessionStore, SettingsStore, StoreError};
use crate::cards::MemoryCard;
use crate::draw::UserDrawSettings;
use crate::sessions::{PracticeSession, SettingsUsed};

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

const CARD_COLUMNS: &str =
    "id, owner, card_type, content, notes, appear_count, last_appeared_session, created_at, updated_at";

const SESSION_COLUMNS: &str = "id, session_number, user_id, settings_used, created_at";

impl SqliteStore {
    /// Open or create the store at the given path.
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(&path)?;
        Self::init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open or create the store at the default location under the
    /// platform-local data directory.
    pub fn open_default() -> Result<Self> {
        Self::open(Self::default_db_path()?)
    }

    /// Default database path (e.g. `~/.local/share/cardbox/cardbox.db`)
    pub fn default_db_path() -> Result<PathBuf> {
        dirs::data_local_dir()
            .map(|p| p.join("cardbox").join("cardbox.db"))
            .ok_or(StoreError::DataDirNotFound)
    }

    fn init_schema(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS memory_cards (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                owner INTEGER NOT NULL,
                card_type TEXT NOT NULL,
                content TEXT NOT NULL,
                notes TEXT,
                appear_count INTEGER NOT NULL DEFAULT 0,
                last_appeared_session INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- settings_used is the JSON-serialized snapshot record
            CREATE TABLE IF NOT EXISTS practice_sessions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                session_number INTEGER NOT NULL UNIQUE,
                user_id INTEGER NOT NULL,
                settings_used TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE TABLE IF NOT EXISTS user_draw_settings (
                user_id INTEGER PRIMARY KEY,
                type_counts TEXT NOT NULL,
                interval_count INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_cards_owner_type
                ON memory_cards(owner, card_type);
            CREATE INDEX IF NOT EXISTS idx_sessions_user
                ON practice_sessions(user_id);
            "#,
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| StoreError::InvalidOperation(format!("Failed to lock store: {}", e)))
    }
}

fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::InvalidOperation(format!("Invalid timestamp in store: {}", e)))
}

type CardRow = (
    i64,
    i64,
    String,
    String,
    Option<String>,
    i64,
    Option<i64>,
    String,
    String,
);

fn read_card_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<CardRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
        row.get(5)?,
        row.get(6)?,
        row.get(7)?,
        row.get(8)?,
    ))
}

fn card_from_row(row: CardRow) -> Result<MemoryCard> {
    let (id, owner, card_type, content, notes, appears, last, created_at, updated_at) = row;
    Ok(MemoryCard {
        id,
        owner,
        card_type,
        content,
        notes,
        appear_count: appears as u64,
        last_appeared_session: last.map(|n| n as u64),
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
    })
}

type SessionRow = (i64, i64, i64, String, String);

fn read_session_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok((
        row.get(0)?,
        row.get(1)?,
        row.get(2)?,
        row.get(3)?,
        row.get(4)?,
    ))
}

fn session_from_row(row: SessionRow) -> Result<PracticeSession> {
    let (id, number, user_id, settings_json, created_at) = row;
    let settings_used: SettingsUsed = serde_json::from_str(&settings_json)?;
    Ok(PracticeSession {
        id,
        session_number: number as u64,
        user_id,
        settings_used,
        created_at: parse_timestamp(&created_at)?,
    })
}

impl CardStore for SqliteStore {
    fn insert_card(&self, mut card: MemoryCard) -> Result<MemoryCard> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO memory_cards
                (owner, card_type, content, notes, appear_count, last_appeared_session, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                card.owner,
                card.card_type,
                card.content,
                card.notes,
                card.appear_count as i64,
                card.last_appeared_session.map(|n| n as i64),
                card.created_at.to_rfc3339(),
                card.updated_at.to_rfc3339(),
            ],
        )?;
        card.id = conn.last_insert_rowid();
        Ok(card)
    }

    fn find_card(&self, id: i64) -> Result<MemoryCard> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM memory_cards WHERE id = ?1", CARD_COLUMNS),
                params![id],
                read_card_row,
            )
            .optional()?
            .ok_or(StoreError::CardNotFound(id))?;
        card_from_row(row)
    }

    fn find_cards(&self, owner: i64, card_type: Option<&str>) -> Result<Vec<MemoryCard>> {
        let conn = self.lock()?;
        let rows: Vec<CardRow> = match card_type {
            Some(tag) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM memory_cards
                     WHERE owner = ?1 AND card_type = ?2 ORDER BY id",
                    CARD_COLUMNS
                ))?;
                let mapped = stmt.query_map(params![owner, tag], read_card_row)?;
                mapped.collect::<rusqlite::Result<_>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM memory_cards WHERE owner = ?1 ORDER BY id",
                    CARD_COLUMNS
                ))?;
                let mapped = stmt.query_map(params![owner], read_card_row)?;
                mapped.collect::<rusqlite::Result<_>>()?
            }
        };
        rows.into_iter().map(card_from_row).collect()
    }

    fn update_card(&self, card: &MemoryCard) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "UPDATE memory_cards
             SET content = ?1, notes = ?2, appear_count = ?3,
                 last_appeared_session = ?4, updated_at = ?5
             WHERE id = ?6",
            params![
                card.content,
                card.notes,
                card.appear_count as i64,
                card.last_appeared_session.map(|n| n as i64),
                card.updated_at.to_rfc3339(),
                card.id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::CardNotFound(card.id));
        }
        Ok(())
    }

    fn delete_card(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM memory_cards WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::CardNotFound(id));
        }
        Ok(())
    }
}

impl SessionStore for SqliteStore {
    fn max_session_number(&self) -> Result<u64> {
        let conn = self.lock()?;
        let max: Option<i64> = conn.query_row(
            "SELECT MAX(session_number) FROM practice_sessions",
            [],
            |row| row.get(0),
        )?;
        Ok(max.unwrap_or(0) as u64)
    }

    fn find_session(&self, id: i64) -> Result<PracticeSession> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM practice_sessions WHERE id = ?1",
                    SESSION_COLUMNS
                ),
                params![id],
                read_session_row,
            )
            .optional()?
            .ok_or(StoreError::SessionNotFound(id))?;
        session_from_row(row)
    }

    fn find_sessions(
        &self,
        user_id: i64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<PracticeSession>> {
        let conn = self.lock()?;
        let rows: Vec<SessionRow> = match since {
            Some(cutoff) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM practice_sessions
                     WHERE user_id = ?1 AND created_at >= ?2
                     ORDER BY session_number",
                    SESSION_COLUMNS
                ))?;
                let mapped =
                    stmt.query_map(params![user_id, cutoff.to_rfc3339()], read_session_row)?;
                mapped.collect::<rusqlite::Result<_>>()?
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM practice_sessions
                     WHERE user_id = ?1 ORDER BY session_number",
                    SESSION_COLUMNS
                ))?;
                let mapped = stmt.query_map(params![user_id], read_session_row)?;
                mapped.collect::<rusqlite::Result<_>>()?
            }
        };
        rows.into_iter().map(session_from_row).collect()
    }

    fn delete_session(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute("DELETE FROM practice_sessions WHERE id = ?1", params![id])?;
        if changed == 0 {
            return Err(StoreError::SessionNotFound(id));
        }
        Ok(())
    }

    fn commit_draw(
        &self,
        card_updates: &[MemoryCard],
        session: NewSession,
    ) -> Result<PracticeSession> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        for card in card_updates {
            let changed = tx.execute(
                "UPDATE memory_cards
                 SET appear_count = ?1, last_appeared_session = ?2, updated_at = ?3
                 WHERE id = ?4",
                params![
                    card.appear_count as i64,
                    card.last_appeared_session.map(|n| n as i64),
                    card.updated_at.to_rfc3339(),
                    card.id,
                ],
            )?;
            if changed == 0 {
                // Dropping the transaction rolls back the earlier updates.
                return Err(StoreError::CardNotFound(card.id));
            }
        }

        let settings_json = serde_json::to_string(&session.settings_used)?;
        let insert = tx.execute(
            "INSERT INTO practice_sessions (session_number, user_id, settings_used, created_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                session.session_number as i64,
                session.user_id,
                settings_json,
                session.created_at.to_rfc3339(),
            ],
        );
        match insert {
            Ok(_) => {}
            Err(rusqlite::Error::SqliteFailure(e, _))
                if e.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                return Err(StoreError::SessionNumberConflict(session.session_number));
            }
            Err(e) => return Err(e.into()),
        }
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(PracticeSession {
            id,
            session_number: session.session_number,
            user_id: session.user_id,
            settings_used: session.settings_used,
            created_at: session.created_at,
        })
    }
}

impl SettingsStore for SqliteStore {
    fn find_settings(&self, user_id: i64) -> Result<Option<UserDrawSettings>> {
        let conn = self.lock()?;
        let row: Option<(String, i64, String, String)> = conn
            .query_row(
                "SELECT type_counts, interval_count, created_at, updated_at
                 FROM user_draw_settings WHERE user_id = ?1",
                params![user_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        match row {
            Some((counts_json, interval, created_at, updated_at)) => {
                let type_counts: BTreeMap<String, i64> = serde_json::from_str(&counts_json)?;
                Ok(Some(UserDrawSettings {
                    user_id,
                    type_counts,
                    interval_count: interval as u64,
                    created_at: parse_timestamp(&created_at)?,
                    updated_at: parse_timestamp(&updated_at)?,
                }))
            }
            None => Ok(None),
        }
    }

    fn upsert_settings(
        &self,
        user_id: i64,
        type_counts: BTreeMap<String, i64>,
        interval_count: u64,
    ) -> Result<UserDrawSettings> {
        let existing = self.find_settings(user_id)?;
        let conn = self.lock()?;
        let counts_json = serde_json::to_string(&type_counts)?;
        let now = Utc::now();

        match existing {
            Some(mut settings) => {
                conn.execute(
                    "UPDATE user_draw_settings
                     SET type_counts = ?1, interval_count = ?2, updated_at = ?3
                     WHERE user_id = ?4",
                    params![counts_json, interval_count as i64, now.to_rfc3339(), user_id],
                )?;
                settings.type_counts = type_counts;
                settings.interval_count = interval_count;
                settings.updated_at = now;
                Ok(settings)
            }
            None => {
                conn.execute(
                    "INSERT INTO user_draw_settings
                        (user_id, type_counts, interval_count, created_at, updated_at)
                     VALUES (?1, ?2, ?3, ?4, ?5)",
                    params![
                        user_id,
                        counts_json,
                        interval_count as i64,
                        now.to_rfc3339(),
                        now.to_rfc3339(),
                    ],
                )?;
                Ok(UserDrawSettings {
                    user_id,
                    type_counts,
                    interval_count,
                    created_at: now,
                    updated_at: now,
                })
            }
        }
    }

    fn delete_settings(&self, user_id: i64) -> Result<()> {
        let conn = self.lock()?;
        let changed = conn.execute(
            "DELETE FROM user_draw_settings WHERE user_id = ?1",
            params![user_id],
        )?;
        if changed == 0 {
            return Err(StoreError::SettingsNotFound(user_id));
        }
        Ok(())
    }
}
