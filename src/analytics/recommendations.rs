//! Rule-based practice advisories
//!
//! An ordered list of independent predicate → advisory evaluators. Every
//! rule sees the same precomputed context and emits at most one advisory,
//! so rules can be added, removed, or reordered without touching the
//! others.

use super::models::{
    AdviceKind, LearningProgress, Overview, Recommendation, Severity,
};

/// Everything the rules are allowed to look at.
pub(crate) struct RuleContext {
    pub overview: Overview,
    pub progress: LearningProgress,
}

pub(crate) trait AdviceRule {
    fn evaluate(&self, ctx: &RuleContext) -> Option<Recommendation>;
}

/// The fixed evaluation order.
pub(crate) fn default_rules() -> Vec<Box<dyn AdviceRule>> {
    vec![
        Box::new(PracticeNewRule),
        Box::new(BalanceTypesRule),
        Box::new(PracticeFrequencyRule),
        Box::new(FocusBasicsRule),
    ]
}

/// Untouched cards exist: point the user at them first.
struct PracticeNewRule;

impl AdviceRule for PracticeNewRule {
    fn evaluate(&self, ctx: &RuleContext) -> Option<Recommendation> {
        if ctx.overview.never_drawn == 0 {
            return None;
        }
        Some(Recommendation {
            kind: AdviceKind::PracticeNew,
            severity: Severity::High,
            message: format!(
                "{} cards have never been practiced. Start with this new content first.",
                ctx.overview.never_drawn
            ),
        })
    }
}

/// One type dominates the collection: suggest topping up the smallest.
/// Ties on the counts resolve to the lexicographically first type tag.
struct BalanceTypesRule;

impl AdviceRule for BalanceTypesRule {
    fn evaluate(&self, ctx: &RuleContext) -> Option<Recommendation> {
        let mut types = ctx.overview.cards_by_type.iter();
        let (first_type, &first_count) = types.next()?;

        let mut max_count = first_count;
        let (mut min_type, mut min_count) = (first_type, first_count);
        for (tag, &count) in types {
            if count > max_count {
                max_count = count;
            }
            if count < min_count {
                min_type = tag;
                min_count = count;
            }
        }

        if max_count > min_count * 2 {
            Some(Recommendation {
                kind: AdviceKind::BalanceTypes,
                severity: Severity::Medium,
                message: format!(
                    "Add more \"{}\" cards to balance the mix of card types.",
                    min_type
                ),
            })
        } else {
            None
        }
    }
}

/// Too little recent practice: high severity when the trailing week is
/// empty, medium below 3 sessions.
struct PracticeFrequencyRule;

impl AdviceRule for PracticeFrequencyRule {
    fn evaluate(&self, ctx: &RuleContext) -> Option<Recommendation> {
        match ctx.overview.recent_sessions_7d {
            0 => Some(Recommendation {
                kind: AdviceKind::IncreasePractice,
                severity: Severity::High,
                message: "No practice sessions in the last 7 days. Regular practice keeps memory fresh.".to_string(),
            }),
            n if n < 3 => Some(Recommendation {
                kind: AdviceKind::IncreasePractice,
                severity: Severity::Medium,
                message: "Fewer than 3 sessions this week. Aim for 3-4 sessions per week.".to_string(),
            }),
            _ => None,
        }
    }
}

/// Most of the collection is untouched: focus on the basics. Skipped
/// outright for an empty collection, where the fraction is undefined.
struct FocusBasicsRule;

impl AdviceRule for FocusBasicsRule {
    fn evaluate(&self, ctx: &RuleContext) -> Option<Recommendation> {
        let total = ctx.progress.total_cards;
        if total == 0 {
            return None;
        }
        let beginner_rate =
            ctx.progress.proficiency_levels.beginner as f64 / total as f64 * 100.0;
        if beginner_rate > 50.0 {
            Some(Recommendation {
                kind: AdviceKind::FocusBasics,
                severity: Severity::High,
                message: format!(
                    "{:.1}% of your cards are still untouched. Focus on the basics before expanding.",
                    beginner_rate
                ),
            })
        } else {
            None
        }
    }
}
