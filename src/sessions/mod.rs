//! Practice session records
//!
//! Sessions form an append-only history: each carries a globally unique,
//! strictly increasing `session_number` and a verbatim snapshot of the
//! settings used for the draw, so historical analytics stay reproducible
//! after settings change.

pub mod models;

pub use models::{PracticeSession, SessionExport, SessionExportEntry, SettingsUsed};
