//! Progress and skill scoring engine
//!
//! Converts recorded developer interaction events, optionally enriched by
//! the architecture map, into per-area skill scores, aggregate developer
//! progress with a reconstructed timeline, and team-wide roll-ups.

pub mod areas;
pub mod scoring;
pub mod tracker;

pub use areas::{areas_from_architecture, classify_area};
pub use scoring::{compute_developer_progress, compute_skill_scores, overall_score};
pub use tracker::{ProgressTracker, RecordEventRequest};
