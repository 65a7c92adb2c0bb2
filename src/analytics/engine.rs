//! Read-only analytics over card and session history

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{Duration, Utc};
use thiserror::Error;

use super::models::{
    summarize_content, CardStatistics, DrawnCardSummary, LearningProgress, NeverDrawnSummary,
    Overview, ProficiencyLevels, Recommendations, SessionAnalytics, TimelineEntry, TypeProgress,
};
use super::recommendations::{default_rules, RuleContext};
use crate::store::{Store, StoreError};

/// Trailing window applied when the caller does not specify one
pub const DEFAULT_ANALYTICS_WINDOW_DAYS: u32 = 30;

/// Timeline rows returned by session analytics
const TIMELINE_LIMIT: usize = 10;

/// Summary rows returned by card statistics
const TOP_CARDS_LIMIT: usize = 5;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("Invalid user id: {0}")]
    InvalidUserId(i64),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;

/// Stateless read engine over one store. Owns no entities and never
/// writes.
pub struct AnalyticsEngine<S> {
    store: Arc<S>,
}

impl<S: Store> AnalyticsEngine<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    fn check_user(user_id: i64) -> Result<()> {
        if user_id <= 0 {
            return Err(AnalyticsError::InvalidUserId(user_id));
        }
        Ok(())
    }

    /// High-level counts plus the overall draw rate.
    pub fn overview(&self, user_id: i64) -> Result<Overview> {
        Self::check_user(user_id)?;
        let cards = self.store.find_cards(user_id, None)?;
        let total_sessions = self.store.find_sessions(user_id, None)?.len();
        let week_ago = Utc::now() - Duration::days(7);
        let recent_sessions_7d = self.store.find_sessions(user_id, Some(week_ago))?.len();

        let mut cards_by_type: BTreeMap<String, usize> = BTreeMap::new();
        for card in &cards {
            *cards_by_type.entry(card.card_type.clone()).or_insert(0) += 1;
        }
        let drawn_cards = cards.iter().filter(|c| c.appear_count > 0).count();
        let draw_rate = if cards.is_empty() {
            0.0
        } else {
            round1(drawn_cards as f64 / cards.len() as f64 * 100.0)
        };

        Ok(Overview {
            total_cards: cards.len(),
            total_sessions,
            cards_by_type,
            drawn_cards,
            never_drawn: cards.len() - drawn_cards,
            recent_sessions_7d,
            draw_rate,
        })
    }

    /// Appearance-count distribution, optionally restricted to one type.
    pub fn card_statistics(
        &self,
        user_id: i64,
        card_type: Option<&str>,
    ) -> Result<CardStatistics> {
        Self::check_user(user_id)?;
        let cards = self.store.find_cards(user_id, card_type)?;

        let total_appears: u64 = cards.iter().map(|c| c.appear_count).sum();
        let avg_appears = if cards.is_empty() {
            0.0
        } else {
            round2(total_appears as f64 / cards.len() as f64)
        };
        let max_appears = cards.iter().map(|c| c.appear_count).max().unwrap_or(0);
        let min_appears = cards.iter().map(|c| c.appear_count).min().unwrap_or(0);

        let mut appear_distribution: BTreeMap<String, usize> = BTreeMap::new();
        for card in &cards {
            *appear_distribution
                .entry(card.appear_count.to_string())
                .or_insert(0) += 1;
        }

        let mut drawn: Vec<_> = cards.iter().filter(|c| c.appear_count > 0).collect();
        drawn.sort_by(|a, b| {
            b.appear_count
                .cmp(&a.appear_count)
                .then(b.last_appeared_session.cmp(&a.last_appeared_session))
        });
        let most_drawn_cards: Vec<DrawnCardSummary> = drawn
            .iter()
            .take(TOP_CARDS_LIMIT)
            .map(|c| DrawnCardSummary {
                id: c.id,
                content: summarize_content(&c.content),
                appear_count: c.appear_count,
                last_session: c.last_appeared_session,
            })
            .collect();

        let never_drawn_cards: Vec<NeverDrawnSummary> = cards
            .iter()
            .filter(|c| c.appear_count == 0)
            .take(TOP_CARDS_LIMIT)
            .map(|c| NeverDrawnSummary {
                id: c.id,
                content: summarize_content(&c.content),
                card_type: c.card_type.clone(),
            })
            .collect();

        Ok(CardStatistics {
            total_cards: cards.len(),
            total_appears,
            avg_appears,
            max_appears,
            min_appears,
            appear_distribution,
            most_drawn_cards,
            never_drawn_cards,
        })
    }

    /// Session activity over a trailing window of days (default 30,
    /// inclusive lower bound).
    pub fn session_analytics(
        &self,
        user_id: i64,
        days: Option<u32>,
    ) -> Result<SessionAnalytics> {
        Self::check_user(user_id)?;
        let days = days.unwrap_or(DEFAULT_ANALYTICS_WINDOW_DAYS);
        let since = Utc::now() - Duration::days(days as i64);

        let mut sessions = self.store.find_sessions(user_id, Some(since))?;
        sessions.sort_by_key(|s| s.created_at);
        if sessions.is_empty() {
            return Ok(SessionAnalytics {
                total_sessions: 0,
                avg_cards_per_session: 0.0,
                daily_sessions: BTreeMap::new(),
                type_preferences: BTreeMap::new(),
                session_timeline: Vec::new(),
            });
        }

        let mut daily_sessions: BTreeMap<String, usize> = BTreeMap::new();
        let mut type_preferences: BTreeMap<String, i64> = BTreeMap::new();
        let mut timeline: Vec<TimelineEntry> = Vec::new();
        let mut total_requested: i64 = 0;

        for session in &sessions {
            let date_key = session.created_at.format("%Y-%m-%d").to_string();
            *daily_sessions.entry(date_key).or_insert(0) += 1;

            // The snapshot is accumulated verbatim, so requested counts
            // (not actual selections) drive the preference totals.
            for (card_type, &count) in &session.settings_used.type_counts {
                *type_preferences.entry(card_type.clone()).or_insert(0) += count;
                total_requested += count;
            }

            timeline.push(TimelineEntry {
                session_number: session.session_number,
                date: session.created_at.format("%Y-%m-%d %H:%M").to_string(),
                settings: session.settings_used.clone(),
            });
        }

        let avg_cards_per_session = round1(total_requested as f64 / sessions.len() as f64);
        if timeline.len() > TIMELINE_LIMIT {
            timeline.drain(..timeline.len() - TIMELINE_LIMIT);
        }

        Ok(SessionAnalytics {
            total_sessions: sessions.len(),
            avg_cards_per_session,
            daily_sessions,
            type_preferences,
            session_timeline: timeline,
        })
    }

    /// Per-type progress plus the proficiency ladder.
    pub fn learning_progress(&self, user_id: i64) -> Result<LearningProgress> {
        Self::check_user(user_id)?;
        let cards = self.store.find_cards(user_id, None)?;

        let mut totals: BTreeMap<String, (usize, usize, u64)> = BTreeMap::new();
        let mut proficiency_levels = ProficiencyLevels::default();
        for card in &cards {
            let entry = totals.entry(card.card_type.clone()).or_insert((0, 0, 0));
            entry.0 += 1;
            if card.appear_count > 0 {
                entry.1 += 1;
            }
            entry.2 += card.appear_count;
            proficiency_levels.bucket(card.appear_count);
        }

        let progress_by_type: BTreeMap<String, TypeProgress> = totals
            .into_iter()
            .map(|(card_type, (total, practiced, appears))| {
                let progress_rate = if total == 0 {
                    0.0
                } else {
                    round1(practiced as f64 / total as f64 * 100.0)
                };
                let avg_appears = if total == 0 {
                    0.0
                } else {
                    round1(appears as f64 / total as f64)
                };
                (
                    card_type,
                    TypeProgress {
                        total,
                        practiced,
                        progress_rate,
                        avg_appears,
                    },
                )
            })
            .collect();

        Ok(LearningProgress {
            progress_by_type,
            proficiency_levels,
            total_cards: cards.len(),
        })
    }

    /// Evaluate the advisory rules in their fixed order.
    pub fn recommendations(&self, user_id: i64) -> Result<Recommendations> {
        Self::check_user(user_id)?;
        let ctx = RuleContext {
            overview: self.overview(user_id)?,
            progress: self.learning_progress(user_id)?,
        };

        let rules = default_rules();
        let recommendations: Vec<_> = rules.iter().filter_map(|rule| rule.evaluate(&ctx)).collect();
        log::debug!(
            "{} of {} advisory rules triggered for user {}",
            recommendations.len(),
            rules.len(),
            user_id
        );

        Ok(Recommendations {
            total_recommendations: recommendations.len(),
            recommendations,
        })
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use super::*;
    use crate::analytics::models::{AdviceKind, Severity};
    use crate::cards::MemoryCard;
    use crate::draw::DrawEngine;
    use crate::sessions::SettingsUsed;
    use crate::store::{CardStore, MemoryStore, NewSession, SessionStore};

    fn insert_card_with_stats(
        store: &MemoryStore,
        card_type: &str,
        content: &str,
        appears: u64,
        last: Option<u64>,
    ) -> i64 {
        let mut card = MemoryCard::new(1, card_type.to_string(), content.to_string());
        card.appear_count = appears;
        card.last_appeared_session = last;
        store.insert_card(card).unwrap().id
    }

    fn insert_session(
        store: &MemoryStore,
        number: u64,
        days_ago: i64,
        type_counts: &[(&str, i64)],
    ) {
        let settings_used = SettingsUsed {
            type_counts: type_counts
                .iter()
                .map(|(tag, n)| (tag.to_string(), *n))
                .collect(),
            interval_count: 2,
        };
        store
            .commit_draw(
                &[],
                NewSession {
                    user_id: 1,
                    session_number: number,
                    settings_used,
                    created_at: Utc::now() - Duration::days(days_ago),
                },
            )
            .unwrap();
    }

    #[test]
    fn test_overview_counts_and_rate() {
        let store = Arc::new(MemoryStore::new());
        insert_card_with_stats(&store, "M", "a", 2, Some(1));
        insert_card_with_stats(&store, "M", "b", 0, None);
        insert_card_with_stats(&store, "N", "c", 1, Some(2));
        insert_card_with_stats(&store, "N", "d", 0, None);
        insert_card_with_stats(&store, "N", "e", 0, None);
        insert_session(&store, 1, 20, &[("M", 2)]);
        insert_session(&store, 2, 1, &[("M", 2)]);

        let engine = AnalyticsEngine::new(store);
        let overview = engine.overview(1).unwrap();

        assert_eq!(overview.total_cards, 5);
        assert_eq!(overview.total_sessions, 2);
        assert_eq!(overview.cards_by_type["M"], 2);
        assert_eq!(overview.cards_by_type["N"], 3);
        assert_eq!(overview.drawn_cards, 2);
        assert_eq!(overview.never_drawn, 3);
        assert_eq!(overview.recent_sessions_7d, 1);
        assert_eq!(overview.draw_rate, 40.0);
    }

    #[test]
    fn test_overview_zero_cards_zero_rate() {
        let store = Arc::new(MemoryStore::new());
        let engine = AnalyticsEngine::new(store);
        let overview = engine.overview(1).unwrap();
        assert_eq!(overview.total_cards, 0);
        assert_eq!(overview.draw_rate, 0.0);
    }

    #[test]
    fn test_invalid_user_id_rejected() {
        let store = Arc::new(MemoryStore::new());
        let engine = AnalyticsEngine::new(store);
        assert!(matches!(
            engine.overview(0),
            Err(AnalyticsError::InvalidUserId(0))
        ));
        assert!(matches!(
            engine.recommendations(-1),
            Err(AnalyticsError::InvalidUserId(-1))
        ));
    }

    #[test]
    fn test_card_statistics_distribution_and_ranking() {
        let store = Arc::new(MemoryStore::new());
        let top = insert_card_with_stats(&store, "M", "top", 5, Some(9));
        // Same count as `top` but older: recency breaks the tie.
        let older = insert_card_with_stats(&store, "M", "older", 5, Some(4));
        insert_card_with_stats(&store, "M", "mid", 2, Some(7));
        insert_card_with_stats(&store, "M", "cold", 0, None);
        insert_card_with_stats(&store, "N", "other type", 1, Some(8));

        let engine = AnalyticsEngine::new(store);
        let stats = engine.card_statistics(1, None).unwrap();

        assert_eq!(stats.total_cards, 5);
        assert_eq!(stats.total_appears, 13);
        assert_eq!(stats.avg_appears, 2.6);
        assert_eq!(stats.max_appears, 5);
        assert_eq!(stats.min_appears, 0);
        assert_eq!(stats.appear_distribution["5"], 2);
        assert_eq!(stats.appear_distribution["0"], 1);

        let ranked: Vec<i64> = stats.most_drawn_cards.iter().map(|c| c.id).collect();
        assert_eq!(ranked[0], top);
        assert_eq!(ranked[1], older);
        assert_eq!(stats.most_drawn_cards.len(), 4);
        assert_eq!(stats.never_drawn_cards.len(), 1);

        // Type filter narrows every aggregate.
        let stats_m = engine.card_statistics(1, Some("M")).unwrap();
        assert_eq!(stats_m.total_cards, 4);
        assert_eq!(stats_m.total_appears, 12);
    }

    #[test]
    fn test_card_statistics_truncates_long_content() {
        let store = Arc::new(MemoryStore::new());
        let long = "z".repeat(80);
        insert_card_with_stats(&store, "M", &long, 1, Some(1));

        let engine = AnalyticsEngine::new(store.clone());
        let stats = engine.card_statistics(1, None).unwrap();
        assert_eq!(
            stats.most_drawn_cards[0].content,
            format!("{}...", "z".repeat(50))
        );

        // The stored card keeps its full content.
        let card = store.find_cards(1, None).unwrap().remove(0);
        assert_eq!(card.content.len(), 80);
    }

    #[test]
    fn test_session_analytics_window_and_aggregates() {
        let store = Arc::new(MemoryStore::new());
        insert_session(&store, 1, 40, &[("M", 3)]); // outside the window
        insert_session(&store, 2, 5, &[("M", 3), ("N", 2)]);
        insert_session(&store, 3, 5, &[("M", 1)]);
        insert_session(&store, 4, 0, &[("N", 2)]);

        let engine = AnalyticsEngine::new(store);
        let analytics = engine.session_analytics(1, None).unwrap();

        assert_eq!(analytics.total_sessions, 3);
        assert_eq!(analytics.type_preferences["M"], 4);
        assert_eq!(analytics.type_preferences["N"], 4);
        // (3 + 2) + 1 + 2 requested over 3 sessions
        assert_eq!(analytics.avg_cards_per_session, 2.7);

        let day_counts: Vec<usize> = analytics.daily_sessions.values().copied().collect();
        assert_eq!(day_counts.iter().sum::<usize>(), 3);
        assert_eq!(analytics.daily_sessions.len(), 2);

        // Timeline is oldest-first and stamped to the minute.
        let numbers: Vec<u64> = analytics
            .session_timeline
            .iter()
            .map(|t| t.session_number)
            .collect();
        assert_eq!(numbers, vec![2, 3, 4]);
        assert_eq!(analytics.session_timeline[0].date.len(), 16);
    }

    #[test]
    fn test_session_analytics_keeps_last_ten() {
        let store = Arc::new(MemoryStore::new());
        for n in 1..=13 {
            insert_session(&store, n, 1, &[("M", 1)]);
        }
        let engine = AnalyticsEngine::new(store);
        let analytics = engine.session_analytics(1, Some(7)).unwrap();

        assert_eq!(analytics.total_sessions, 13);
        let numbers: Vec<u64> = analytics
            .session_timeline
            .iter()
            .map(|t| t.session_number)
            .collect();
        assert_eq!(numbers, (4..=13).collect::<Vec<u64>>());
    }

    #[test]
    fn test_session_analytics_empty_window() {
        let store = Arc::new(MemoryStore::new());
        insert_session(&store, 1, 90, &[("M", 3)]);
        let engine = AnalyticsEngine::new(store);

        let analytics = engine.session_analytics(1, Some(30)).unwrap();
        assert_eq!(analytics.total_sessions, 0);
        assert_eq!(analytics.avg_cards_per_session, 0.0);
        assert!(analytics.daily_sessions.is_empty());
        assert!(analytics.session_timeline.is_empty());
    }

    #[test]
    fn test_learning_progress_rates_and_ladder() {
        let store = Arc::new(MemoryStore::new());
        insert_card_with_stats(&store, "M", "a", 0, None);
        insert_card_with_stats(&store, "M", "b", 2, Some(3));
        insert_card_with_stats(&store, "M", "c", 4, Some(5));
        insert_card_with_stats(&store, "N", "d", 7, Some(6));

        let engine = AnalyticsEngine::new(store);
        let progress = engine.learning_progress(1).unwrap();

        let m = &progress.progress_by_type["M"];
        assert_eq!(m.total, 3);
        assert_eq!(m.practiced, 2);
        assert_eq!(m.progress_rate, 66.7);
        assert_eq!(m.avg_appears, 2.0);

        let n = &progress.progress_by_type["N"];
        assert_eq!(n.progress_rate, 100.0);

        assert_eq!(progress.proficiency_levels.beginner, 1);
        assert_eq!(progress.proficiency_levels.practicing, 1);
        assert_eq!(progress.proficiency_levels.familiar, 1);
        assert_eq!(progress.proficiency_levels.mastered, 1);
        assert_eq!(progress.total_cards, 4);
    }

    #[test]
    fn test_recommendations_for_fresh_user() {
        // Untouched collection, no recent sessions: rules 1, 3, and 4
        // trigger; rule 2 stays quiet on balanced types.
        let store = Arc::new(MemoryStore::new());
        insert_card_with_stats(&store, "M", "a", 0, None);
        insert_card_with_stats(&store, "N", "b", 0, None);

        let engine = AnalyticsEngine::new(store);
        let result = engine.recommendations(1).unwrap();

        let kinds: Vec<AdviceKind> = result.recommendations.iter().map(|r| r.kind).collect();
        assert_eq!(
            kinds,
            vec![
                AdviceKind::PracticeNew,
                AdviceKind::IncreasePractice,
                AdviceKind::FocusBasics,
            ]
        );
        assert_eq!(result.total_recommendations, 3);
        assert_eq!(result.recommendations[1].severity, Severity::High);
    }

    #[test]
    fn test_recommendations_zero_cards_skips_basics_rule() {
        let store = Arc::new(MemoryStore::new());
        let engine = AnalyticsEngine::new(store);

        let result = engine.recommendations(1).unwrap();
        let kinds: Vec<AdviceKind> = result.recommendations.iter().map(|r| r.kind).collect();
        assert_eq!(kinds, vec![AdviceKind::IncreasePractice]);
    }

    #[test]
    fn test_empty_draw_leaves_statistics_unchanged() {
        let store = Arc::new(MemoryStore::new());
        insert_card_with_stats(&store, "M", "a", 1, Some(1));
        insert_card_with_stats(&store, "M", "b", 0, None);
        insert_session(&store, 1, 2, &[("M", 1)]);

        let analytics = AnalyticsEngine::new(store.clone());
        let before_cards = analytics.card_statistics(1, None).unwrap();
        let before_sessions = analytics.overview(1).unwrap().total_sessions;

        // A draw whose counts are all <= 0 selects nothing.
        let draw = DrawEngine::with_rng(store, StdRng::seed_from_u64(1));
        let type_counts: BTreeMap<String, i64> = BTreeMap::from([("M".to_string(), 0)]);
        draw.draw(1, Some(type_counts), Some(2)).unwrap();

        let after_cards = analytics.card_statistics(1, None).unwrap();
        let after = analytics.overview(1).unwrap();
        assert_eq!(after_cards, before_cards);
        assert_eq!(after.total_sessions, before_sessions + 1);
    }
}
