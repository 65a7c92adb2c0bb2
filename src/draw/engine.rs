//! Draw orchestration
//!
//! One draw is a single logical unit: allocate the next session number,
//! select cards per requested type, mutate the selected cards' statistics,
//! and append the session record. The store commits the mutation and the
//! insert together; a session-number conflict from a concurrent draw makes
//! the engine re-attempt the whole unit.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use super::models::{
    default_type_counts, DrawOutcome, DrawStatistics, DEFAULT_INTERVAL_COUNT,
};
use super::{eligibility, sampler};
use crate::sessions::{PracticeSession, SessionExport, SessionExportEntry, SettingsUsed};
use crate::store::{NewSession, Store, StoreError};

/// Retry bound for the session-number race. With N concurrent drawers a
/// loser conflicts at most N-1 times before the contention drains.
const MAX_DRAW_ATTEMPTS: u32 = 5;

#[derive(Error, Debug)]
pub enum DrawError {
    #[error("Invalid user id: {0}")]
    InvalidUserId(i64),

    #[error("Invalid session id: {0}")]
    InvalidSessionId(i64),

    #[error("Empty card type tag in type counts")]
    InvalidTypeTag,

    #[error("Draw contention: gave up after {attempts} attempts")]
    Contention { attempts: u32 },

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, DrawError>;

/// Session-aware card selection over a shared store.
///
/// The engine keeps no state of its own beyond the random source; every
/// call reads what it needs from the store, so any number of engines (or
/// threads sharing one) may run against the same store.
pub struct DrawEngine<S, R = StdRng> {
    store: Arc<S>,
    rng: Mutex<R>,
}

impl<S: Store> DrawEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self::with_rng(store, StdRng::from_entropy())
    }
}

impl<S: Store, R: Rng> DrawEngine<S, R> {
    /// Build an engine with a caller-supplied random source, e.g. a seeded
    /// `StdRng` for deterministic tests.
    pub fn with_rng(store: Arc<S>, rng: R) -> Self {
        Self {
            store,
            rng: Mutex::new(rng),
        }
    }

    /// Draw cards for a new practice session.
    ///
    /// Missing parameters resolve in order: explicit argument, the user's
    /// stored settings, the engine-wide fallback. The resolved values are
    /// recorded verbatim on the created session.
    pub fn draw(
        &self,
        user_id: i64,
        type_counts: Option<BTreeMap<String, i64>>,
        interval_count: Option<u64>,
    ) -> Result<DrawOutcome> {
        if user_id <= 0 {
            return Err(DrawError::InvalidUserId(user_id));
        }

        let settings_used = self.resolve_settings(user_id, type_counts, interval_count)?;
        if settings_used.type_counts.keys().any(|tag| tag.is_empty()) {
            return Err(DrawError::InvalidTypeTag);
        }

        for attempt in 1..=MAX_DRAW_ATTEMPTS {
            match self.attempt_draw(user_id, &settings_used) {
                Err(DrawError::Store(StoreError::SessionNumberConflict(number))) => {
                    log::warn!(
                        "Session number {} taken by a concurrent draw, retrying ({}/{})",
                        number,
                        attempt,
                        MAX_DRAW_ATTEMPTS
                    );
                }
                outcome => return outcome,
            }
        }
        Err(DrawError::Contention {
            attempts: MAX_DRAW_ATTEMPTS,
        })
    }

    /// One full pass of the draw unit against the current store state.
    fn attempt_draw(&self, user_id: i64, settings_used: &SettingsUsed) -> Result<DrawOutcome> {
        let session_number = self.store.max_session_number()? + 1;
        let interval = settings_used.interval_count;

        let mut cards_by_type = BTreeMap::new();
        let mut drawn = Vec::new();
        for (card_type, &count) in &settings_used.type_counts {
            if count <= 0 {
                continue;
            }
            let eligible = eligibility::eligible_cards(
                self.store.as_ref(),
                user_id,
                card_type,
                interval,
                session_number,
            )?;
            log::debug!(
                "Session {}: {} eligible '{}' cards, {} requested",
                session_number,
                eligible.len(),
                card_type,
                count
            );

            let mut picked = {
                let mut rng = self.rng.lock().map_err(|e| {
                    StoreError::InvalidOperation(format!("Failed to lock rng: {}", e))
                })?;
                sampler::sample(&mut *rng, eligible, count as usize)
            };
            for card in &mut picked {
                card.mark_drawn(session_number);
            }
            drawn.extend(picked.iter().cloned());
            cards_by_type.insert(card_type.clone(), picked);
        }

        let session = self.store.commit_draw(
            &drawn,
            NewSession {
                user_id,
                session_number,
                settings_used: settings_used.clone(),
                created_at: Utc::now(),
            },
        )?;
        log::debug!(
            "Created session {} for user {} with {} cards",
            session_number,
            user_id,
            drawn.len()
        );

        Ok(DrawOutcome {
            session,
            total_cards: drawn.len(),
            cards_by_type,
            settings_used: settings_used.clone(),
        })
    }

    fn resolve_settings(
        &self,
        user_id: i64,
        explicit_counts: Option<BTreeMap<String, i64>>,
        explicit_interval: Option<u64>,
    ) -> Result<SettingsUsed> {
        let stored = if explicit_counts.is_none() || explicit_interval.is_none() {
            self.store.find_settings(user_id)?
        } else {
            None
        };

        let type_counts = match explicit_counts {
            Some(counts) => counts,
            // An empty stored mapping falls through to the fallback.
            None => match &stored {
                Some(settings) if !settings.type_counts.is_empty() => {
                    settings.type_counts.clone()
                }
                _ => default_type_counts(),
            },
        };
        let interval_count = explicit_interval
            .or_else(|| stored.as_ref().map(|s| s.interval_count))
            .unwrap_or(DEFAULT_INTERVAL_COUNT);

        Ok(SettingsUsed {
            type_counts,
            interval_count,
        })
    }

    // ==================== Session History ====================

    /// Compact draw summary for one user.
    pub fn draw_statistics(&self, user_id: i64) -> Result<DrawStatistics> {
        if user_id <= 0 {
            return Err(DrawError::InvalidUserId(user_id));
        }
        let cards = self.store.find_cards(user_id, None)?;
        let sessions = self.store.find_sessions(user_id, None)?;

        let mut cards_by_type: BTreeMap<String, usize> = BTreeMap::new();
        for card in &cards {
            *cards_by_type.entry(card.card_type.clone()).or_insert(0) += 1;
        }
        let drawn_cards = cards.iter().filter(|c| c.appear_count > 0).count();

        Ok(DrawStatistics {
            total_cards: cards.len(),
            cards_by_type,
            drawn_cards,
            never_drawn: cards.len() - drawn_cards,
            total_sessions: sessions.len(),
        })
    }

    /// Session history page for one user, newest first.
    pub fn sessions(
        &self,
        user_id: i64,
        skip: usize,
        limit: usize,
    ) -> Result<Vec<PracticeSession>> {
        if user_id <= 0 {
            return Err(DrawError::InvalidUserId(user_id));
        }
        let mut sessions = self.store.find_sessions(user_id, None)?;
        sessions.reverse();
        Ok(sessions.into_iter().skip(skip).take(limit).collect())
    }

    pub fn session_detail(&self, session_id: i64) -> Result<PracticeSession> {
        if session_id <= 0 {
            return Err(DrawError::InvalidSessionId(session_id));
        }
        Ok(self.store.find_session(session_id)?)
    }

    /// Administrative deletion of one session record. Other sessions keep
    /// their numbers; the gap is expected.
    pub fn delete_session(&self, session_id: i64) -> Result<()> {
        if session_id <= 0 {
            return Err(DrawError::InvalidSessionId(session_id));
        }
        self.store.delete_session(session_id)?;
        log::info!("Deleted session {}", session_id);
        Ok(())
    }

    /// Full session history of one user for backup or offline analysis.
    pub fn export_sessions(&self, user_id: i64) -> Result<SessionExport> {
        if user_id <= 0 {
            return Err(DrawError::InvalidUserId(user_id));
        }
        let sessions = self.store.find_sessions(user_id, None)?;
        let entries: Vec<SessionExportEntry> = sessions
            .iter()
            .map(|s| SessionExportEntry {
                session_number: s.session_number,
                date: s.created_at.to_rfc3339(),
                settings_used: s.settings_used.clone(),
            })
            .collect();
        Ok(SessionExport {
            user_id,
            total_sessions: entries.len(),
            export_date: Utc::now(),
            sessions: entries,
        })
    }
}
