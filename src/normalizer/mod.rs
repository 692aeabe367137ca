//! Defensive reconciliation of upstream payloads into canonical records.
//!
//! Nothing in here returns an error: malformed input degrades to defaults.

pub mod candidate;
pub mod envelope;
pub mod job;
pub mod rules;

pub use candidate::{
    DEFAULT_SCORE, capitalize_section_name, normalize_candidate, normalize_candidates,
    normalize_score, normalize_sections,
};
pub use envelope::{parse_loose, unwrap_envelope};
pub use job::{extract_job_title, parse_job_description};
