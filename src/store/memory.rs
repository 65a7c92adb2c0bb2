//! In-memory storage backend
//!
//! Mutex-guarded tables with monotonic id counters. The primary test
//! double, and sufficient for embedded single-process use. `commit_draw`
//! validates and applies everything under one lock guard, which is what
//! makes the draw unit atomic here.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use super::{CardStore, NewSession, Result, SessionStore, SettingsStore, StoreError};
use crate::cards::MemoryCard;
use crate::draw::UserDrawSettings;
use crate::sessions::PracticeSession;

#[derive(Default)]
struct Tables {
    cards: HashMap<i64, MemoryCard>,
    sessions: HashMap<i64, PracticeSession>,
    settings: HashMap<i64, UserDrawSettings>,
    next_card_id: i64,
    next_session_id: i64,
}

pub struct MemoryStore {
    inner: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Tables::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.inner
            .lock()
            .map_err(|e| StoreError::InvalidOperation(format!("Failed to lock store: {}", e)))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl CardStore for MemoryStore {
    fn insert_card(&self, mut card: MemoryCard) -> Result<MemoryCard> {
        let mut tables = self.lock()?;
        tables.next_card_id += 1;
        card.id = tables.next_card_id;
        tables.cards.insert(card.id, card.clone());
        Ok(card)
    }

    fn find_card(&self, id: i64) -> Result<MemoryCard> {
        let tables = self.lock()?;
        tables
            .cards
            .get(&id)
            .cloned()
            .ok_or(StoreError::CardNotFound(id))
    }

    fn find_cards(&self, owner: i64, card_type: Option<&str>) -> Result<Vec<MemoryCard>> {
        let tables = self.lock()?;
        let mut cards: Vec<MemoryCard> = tables
            .cards
            .values()
            .filter(|c| c.owner == owner)
            .filter(|c| card_type.map_or(true, |t| c.card_type == t))
            .cloned()
            .collect();
        cards.sort_by_key(|c| c.id);
        Ok(cards)
    }

    fn update_card(&self, card: &MemoryCard) -> Result<()> {
        let mut tables = self.lock()?;
        if !tables.cards.contains_key(&card.id) {
            return Err(StoreError::CardNotFound(card.id));
        }
        tables.cards.insert(card.id, card.clone());
        Ok(())
    }

    fn delete_card(&self, id: i64) -> Result<()> {
        let mut tables = self.lock()?;
        tables
            .cards
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::CardNotFound(id))
    }
}

impl SessionStore for MemoryStore {
    fn max_session_number(&self) -> Result<u64> {
        let tables = self.lock()?;
        Ok(tables
            .sessions
            .values()
            .map(|s| s.session_number)
            .max()
            .unwrap_or(0))
    }

    fn find_session(&self, id: i64) -> Result<PracticeSession> {
        let tables = self.lock()?;
        tables
            .sessions
            .get(&id)
            .cloned()
            .ok_or(StoreError::SessionNotFound(id))
    }

    fn find_sessions(
        &self,
        user_id: i64,
        since: Option<DateTime<Utc>>,
    ) -> Result<Vec<PracticeSession>> {
        let tables = self.lock()?;
        let mut sessions: Vec<PracticeSession> = tables
            .sessions
            .values()
            .filter(|s| s.user_id == user_id)
            .filter(|s| since.map_or(true, |cutoff| s.created_at >= cutoff))
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.session_number);
        Ok(sessions)
    }

    fn delete_session(&self, id: i64) -> Result<()> {
        let mut tables = self.lock()?;
        tables
            .sessions
            .remove(&id)
            .map(|_| ())
            .ok_or(StoreError::SessionNotFound(id))
    }

    fn commit_draw(
        &self,
        card_updates: &[MemoryCard],
        session: NewSession,
    ) -> Result<PracticeSession> {
        let mut tables = self.lock()?;

        // Uniqueness check and all validations happen before any write, so
        // a failure leaves the tables untouched.
        if tables
            .sessions
            .values()
            .any(|s| s.session_number == session.session_number)
        {
            return Err(StoreError::SessionNumberConflict(session.session_number));
        }
        for card in card_updates {
            if !tables.cards.contains_key(&card.id) {
                return Err(StoreError::CardNotFound(card.id));
            }
        }

        for card in card_updates {
            tables.cards.insert(card.id, card.clone());
        }

        tables.next_session_id += 1;
        let stored = PracticeSession {
            id: tables.next_session_id,
            session_number: session.session_number,
            user_id: session.user_id,
            settings_used: session.settings_used,
            created_at: session.created_at,
        };
        tables.sessions.insert(stored.id, stored.clone());
        Ok(stored)
    }
}

impl SettingsStore for MemoryStore {
    fn find_settings(&self, user_id: i64) -> Result<Option<UserDrawSettings>> {
        let tables = self.lock()?;
        Ok(tables.settings.get(&user_id).cloned())
    }

    fn upsert_settings(
        &self,
        user_id: i64,
        type_counts: BTreeMap<String, i64>,
        interval_count: u64,
    ) -> Result<UserDrawSettings> {
        let mut tables = self.lock()?;
        let settings = match tables.settings.get(&user_id) {
            Some(existing) => {
                let mut updated = existing.clone();
                updated.type_counts = type_counts;
                updated.interval_count = interval_count;
                updated.updated_at = Utc::now();
                updated
            }
            None => UserDrawSettings::new(user_id, type_counts, interval_count),
        };
        tables.settings.insert(user_id, settings.clone());
        Ok(settings)
    }

    fn delete_settings(&self, user_id: i64) -> Result<()> {
        let mut tables = self.lock()?;
        tables
            .settings
            .remove(&user_id)
            .map(|_| ())
            .ok_or(StoreError::SettingsNotFound(user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sessions::SettingsUsed;

    fn settings_used() -> SettingsUsed {
        SettingsUsed {
            type_counts: BTreeMap::from([("M".to_string(), 2)]),
            interval_count: 2,
        }
    }

    #[test]
    fn test_insert_assigns_sequential_ids() {
        let store = MemoryStore::new();
        let a = store
            .insert_card(MemoryCard::new(1, "M".to_string(), "a".to_string()))
            .unwrap();
        let b = store
            .insert_card(MemoryCard::new(1, "M".to_string(), "b".to_string()))
            .unwrap();
        assert_eq!(a.id, 1);
        assert_eq!(b.id, 2);
    }

    #[test]
    fn test_find_cards_filters_by_owner_and_type() {
        let store = MemoryStore::new();
        store
            .insert_card(MemoryCard::new(1, "M".to_string(), "a".to_string()))
            .unwrap();
        store
            .insert_card(MemoryCard::new(1, "N".to_string(), "b".to_string()))
            .unwrap();
        store
            .insert_card(MemoryCard::new(2, "M".to_string(), "c".to_string()))
            .unwrap();

        assert_eq!(store.find_cards(1, None).unwrap().len(), 2);
        assert_eq!(store.find_cards(1, Some("M")).unwrap().len(), 1);
        assert_eq!(store.find_cards(3, None).unwrap().len(), 0);
    }

    #[test]
    fn test_commit_draw_rejects_duplicate_session_number() {
        let store = MemoryStore::new();
        let session = NewSession {
            user_id: 1,
            session_number: 1,
            settings_used: settings_used(),
            created_at: Utc::now(),
        };
        store.commit_draw(&[], session.clone()).unwrap();

        let err = store.commit_draw(&[], session).unwrap_err();
        assert!(matches!(err, StoreError::SessionNumberConflict(1)));
        assert_eq!(store.max_session_number().unwrap(), 1);
    }

    #[test]
    fn test_commit_draw_applies_nothing_on_missing_card() {
        let store = MemoryStore::new();
        let card = store
            .insert_card(MemoryCard::new(1, "M".to_string(), "a".to_string()))
            .unwrap();

        let mut updated = card.clone();
        updated.mark_drawn(1);
        let mut ghost = card.clone();
        ghost.id = 99;
        ghost.mark_drawn(1);

        let err = store
            .commit_draw(
                &[updated, ghost],
                NewSession {
                    user_id: 1,
                    session_number: 1,
                    settings_used: settings_used(),
                    created_at: Utc::now(),
                },
            )
            .unwrap_err();
        assert!(matches!(err, StoreError::CardNotFound(99)));

        // Neither the valid update nor the session landed.
        assert_eq!(store.find_card(card.id).unwrap().appear_count, 0);
        assert_eq!(store.max_session_number().unwrap(), 0);
    }

    #[test]
    fn test_delete_session_leaves_gap() {
        let store = MemoryStore::new();
        for n in 1..=3 {
            store
                .commit_draw(
                    &[],
                    NewSession {
                        user_id: 1,
                        session_number: n,
                        settings_used: settings_used(),
                        created_at: Utc::now(),
                    },
                )
                .unwrap();
        }
        store.delete_session(2).unwrap();

        let numbers: Vec<u64> = store
            .find_sessions(1, None)
            .unwrap()
            .iter()
            .map(|s| s.session_number)
            .collect();
        assert_eq!(numbers, vec![1, 3]);
        assert_eq!(store.max_session_number().unwrap(), 3);
    }

    #[test]
    fn test_upsert_settings_preserves_created_at() {
        let store = MemoryStore::new();
        let first = store
            .upsert_settings(1, BTreeMap::from([("M".to_string(), 3)]), 2)
            .unwrap();
        let second = store
            .upsert_settings(1, BTreeMap::from([("M".to_string(), 5)]), 1)
            .unwrap();

        assert_eq!(first.created_at, second.created_at);
        assert_eq!(second.type_counts.get("M"), Some(&5));
        assert_eq!(second.interval_count, 1);
    }

    #[test]
    fn test_delete_settings_not_found() {
        let store = MemoryStore::new();
        let err = store.delete_settings(1).unwrap_err();
        assert!(matches!(err, StoreError::SettingsNotFound(1)));
    }
}
