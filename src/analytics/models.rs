//! Result models for the analytics engine

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::sessions::SettingsUsed;

/// Content summaries are clipped to this many characters
const SUMMARY_CONTENT_LIMIT: usize = 50;

/// High-level counts for one user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub total_cards: usize,
    pub total_sessions: usize,
    pub cards_by_type: BTreeMap<String, usize>,
    pub drawn_cards: usize,
    pub never_drawn: usize,
    /// Sessions created within the trailing 7 days
    pub recent_sessions_7d: usize,
    /// Percentage of cards drawn at least once, one decimal; 0 when the
    /// user has no cards
    pub draw_rate: f64,
}

/// Summary row for a frequently drawn card.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawnCardSummary {
    pub id: i64,
    /// Content clipped for display; the stored card is untouched
    pub content: String,
    pub appear_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_session: Option<u64>,
}

/// Summary row for a card that was never drawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeverDrawnSummary {
    pub id: i64,
    pub content: String,
    pub card_type: String,
}

/// Appearance-count distribution over one user's cards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardStatistics {
    pub total_cards: usize,
    pub total_appears: u64,
    /// Two decimals; 0 when there are no cards
    pub avg_appears: f64,
    pub max_appears: u64,
    pub min_appears: u64,
    /// Number of cards per exact appearance count
    pub appear_distribution: BTreeMap<String, usize>,
    /// Up to 5, ordered by appearance count then recency
    pub most_drawn_cards: Vec<DrawnCardSummary>,
    /// Up to 5, order unspecified
    pub never_drawn_cards: Vec<NeverDrawnSummary>,
}

/// One row of the recent-session timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub session_number: u64,
    /// `YYYY-MM-DD HH:MM`
    pub date: String,
    pub settings: SettingsUsed,
}

/// Session activity over a trailing window of days.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAnalytics {
    pub total_sessions: usize,
    /// Average requested cards per session, one decimal
    pub avg_cards_per_session: f64,
    /// Sessions per calendar date (`YYYY-MM-DD` keys)
    pub daily_sessions: BTreeMap<String, usize>,
    /// Requested card counts accumulated per type from each session's
    /// settings snapshot
    pub type_preferences: BTreeMap<String, i64>,
    /// The 10 most recent sessions in the window, oldest first
    pub session_timeline: Vec<TimelineEntry>,
}

/// Per-type practice progress.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeProgress {
    pub total: usize,
    pub practiced: usize,
    /// Percentage, one decimal; 0 when the type has no cards
    pub progress_rate: f64,
    pub avg_appears: f64,
}

/// Card counts per proficiency bucket, keyed by appearance count:
/// 0, 1-2, 3-5, and above.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProficiencyLevels {
    pub beginner: usize,
    pub practicing: usize,
    pub familiar: usize,
    pub mastered: usize,
}

impl ProficiencyLevels {
    /// Count a card into its bucket.
    pub fn bucket(&mut self, appear_count: u64) {
        match appear_count {
            0 => self.beginner += 1,
            1..=2 => self.practicing += 1,
            3..=5 => self.familiar += 1,
            _ => self.mastered += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningProgress {
    pub progress_by_type: BTreeMap<String, TypeProgress>,
    pub proficiency_levels: ProficiencyLevels,
    pub total_cards: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    High,
    Medium,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdviceKind {
    PracticeNew,
    BalanceTypes,
    IncreasePractice,
    FocusBasics,
}

/// One triggered advisory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub kind: AdviceKind,
    pub severity: Severity,
    pub message: String,
}

/// All advisories triggered for one user, in rule order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
    pub recommendations: Vec<Recommendation>,
    pub total_recommendations: usize,
}

/// Clip content for a summary row, keeping char boundaries intact.
pub(crate) fn summarize_content(content: &str) -> String {
    if content.chars().count() > SUMMARY_CONTENT_LIMIT {
        let clipped: String = content.chars().take(SUMMARY_CONTENT_LIMIT).collect();
        format!("{}...", clipped)
    } else {
        content.to_string()
    }
}
