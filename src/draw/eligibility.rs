//! Cooldown gating for card selection
//!
//! A card is on cooldown for `interval` sessions after it is drawn. The
//! check is made against the number of the session *about to be created*,
//! so an interval of 0 allows a card to reappear in the very next session.

use crate::cards::MemoryCard;
use crate::store::{CardStore, Result};

/// Whether a card may be selected into the session numbered
/// `current_session` under the given interval.
///
/// Never-drawn cards are always eligible. Otherwise the card qualifies
/// when `last_appeared_session <= current_session - interval`. The
/// subtraction saturates at 0, so an interval longer than the whole
/// history keeps drawn cards ineligible rather than overflowing.
pub fn is_eligible(card: &MemoryCard, interval: u64, current_session: u64) -> bool {
    match card.last_appeared_session {
        None => true,
        Some(last) => last <= current_session.saturating_sub(interval),
    }
}

/// All cards of `user_id` with the given type that are off cooldown for
/// the session numbered `current_session`. Pure read, no side effects.
pub fn eligible_cards<S: CardStore>(
    store: &S,
    user_id: i64,
    card_type: &str,
    interval: u64,
    current_session: u64,
) -> Result<Vec<MemoryCard>> {
    let cards = store.find_cards(user_id, Some(card_type))?;
    Ok(cards
        .into_iter()
        .filter(|card| is_eligible(card, interval, current_session))
        .collect())
}
