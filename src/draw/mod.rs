//! Card drawing for practice sessions
//!
//! This module provides:
//! - Eligibility gating (per-card cooldown in elapsed sessions)
//! - Uniform random sampling without replacement
//! - The draw engine: parameter resolution, atomic session creation with
//!   bounded retry on numbering conflicts, and session-history operations

pub mod eligibility;
pub mod engine;
pub mod models;
pub mod sampler;

pub use engine::{DrawEngine, DrawError};
pub use models::{
    default_type_counts, DrawOutcome, DrawStatistics, UserDrawSettings, DEFAULT_INTERVAL_COUNT,
};
