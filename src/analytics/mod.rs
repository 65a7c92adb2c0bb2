//! Practice analytics over card and session history
//!
//! This module provides:
//! - Overview counts and draw rate
//! - Per-card appearance distributions
//! - Time-windowed session analytics
//! - Learning progress with proficiency buckets
//! - Rule-based practice recommendations
//!
//! Everything here is read-only over the store; no analytics call mutates
//! an entity.

pub mod engine;
pub mod models;
mod recommendations;

pub use engine::{AnalyticsEngine, AnalyticsError, DEFAULT_ANALYTICS_WINDOW_DAYS};
pub use models::*;
