//! Session-aware memory card drawing with practice analytics.
//!
//! The crate is organized around two engines over a shared store boundary:
//! - [`draw::DrawEngine`] selects cards for a new practice session, honoring
//!   a per-card cooldown measured in elapsed sessions, and records the
//!   session atomically.
//! - [`analytics::AnalyticsEngine`] reads the accumulated card and session
//!   history to produce overviews, distributions, progress, and
//!   recommendations.
//!
//! Storage is behind the traits in [`store`]; [`store::MemoryStore`] and
//! [`store::SqliteStore`] are the bundled backends. Transport,
//! authentication, and presentation are the caller's concern.

pub mod analytics;
pub mod cards;
pub mod draw;
pub mod sessions;
pub mod store;
