use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Where a candidate record came from.
///
/// `Synthetic` marks client-fabricated placeholders (ranking transport
/// fallback, degraded upload samples) so consumers can label or drop them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    #[default]
    Real,
    Synthetic,
}

/// Canonical, post-normalization resume record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate {
    pub candidate_id: String,
    pub name: String,
    /// Always within `[0, 1]`.
    pub score: f64,
    pub job_id: Option<String>,
    pub sections: BTreeMap<String, String>,
    pub entities: Vec<String>,
    pub matched_keywords: Vec<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub timestamp: String,
    pub was_uploaded: bool,
    pub origin: Origin,
}

impl Candidate {
    pub fn is_synthetic(&self) -> bool {
        self.origin == Origin::Synthetic
    }

    pub fn score_percent(&self) -> f64 {
        self.score * 100.0
    }

    /// Lowercased text used by keyword filtering: name, email, entities,
    /// matched keywords and every section body.
    pub fn searchable_text(&self) -> String {
        let mut parts: Vec<&str> = vec![self.name.as_str()];

        if let Some(email) = &self.email {
            parts.push(email);
        }

        parts.extend(self.entities.iter().map(String::as_str));
        parts.extend(self.matched_keywords.iter().map(String::as_str));
        parts.extend(self.sections.values().map(String::as_str));

        parts.join(" ").to_lowercase()
    }
}

/// Display bucket for a candidate's score, driven by the configured
/// percentage thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreBand {
    High,
    Medium,
    Low,
}

impl ScoreBand {
    pub fn classify(score: f64, high_threshold: u8, medium_threshold: u8) -> Self {
        let percent = score * 100.0;
        if percent >= f64::from(high_threshold) {
            ScoreBand::High
        } else if percent >= f64::from(medium_threshold) {
            ScoreBand::Medium
        } else {
            ScoreBand::Low
        }
    }
}
