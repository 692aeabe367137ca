use serde::{Deserialize, Serialize};

/// Canonical job-description analysis.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobDescription {
    pub job_id: Option<String>,
    pub description: String,
    pub title: String,
    pub key_phrases: Vec<String>,
    pub entities: Vec<String>,
    pub keywords: Vec<String>,
}

impl JobDescription {
    /// Every requirement term carried by the analysis, in order of
    /// key phrases, entities, then keywords.
    pub fn requirement_terms(&self) -> impl Iterator<Item = &str> {
        self.key_phrases
            .iter()
            .chain(self.entities.iter())
            .chain(self.keywords.iter())
            .map(String::as_str)
    }
}
