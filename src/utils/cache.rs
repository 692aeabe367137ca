use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use log::debug;

use crate::models::{Candidate, JobDescription};

/// Session-scoped caches shared by the API client and the ranking session.
///
/// Holds the last discovered job id, job analyses keyed by their
/// description text, and any synthetic samples fabricated by the upload
/// probe. Last writer wins.
#[derive(Debug, Default)]
pub struct SessionContext {
    job_id: RwLock<Option<String>>,
    job_descriptions: RwLock<HashMap<String, JobDescription>>,
    synthetic_samples: RwLock<Vec<Candidate>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn job_id(&self) -> Option<String> {
        self.job_id.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn store_job_id(&self, job_id: &str) {
        if job_id.is_empty() {
            return;
        }

        let mut slot = self.job_id.write().unwrap_or_else(PoisonError::into_inner);
        if slot.as_deref() != Some(job_id) {
            debug!("cached job id: {}", job_id);
            *slot = Some(job_id.to_string());
        }
    }

    /// Looks up a job analysis by its (trimmed) description text. Only
    /// analyses that carry a job id are ever returned.
    pub fn cached_job(&self, description: &str) -> Option<JobDescription> {
        self.job_descriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(description.trim())
            .filter(|job| job.job_id.as_deref().is_some_and(|id| !id.is_empty()))
            .cloned()
    }

    pub fn cached_job_by_id(&self, job_id: &str) -> Option<JobDescription> {
        self.job_descriptions
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .find(|job| job.job_id.as_deref() == Some(job_id))
            .cloned()
    }

    /// Stores a job analysis keyed by its description. Analyses without a
    /// description or a job id are not cached.
    pub fn cache_job(&self, job: &JobDescription) {
        let key = job.description.trim();
        if key.is_empty() || !job.job_id.as_deref().is_some_and(|id| !id.is_empty()) {
            debug!("not caching job analysis without description or job id");
            return;
        }

        debug!("cached job analysis for {:?}", job.job_id);
        self.job_descriptions
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), job.clone());
    }

    pub fn add_synthetic_sample(&self, sample: Candidate) {
        self.synthetic_samples
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(sample);
    }

    pub fn has_synthetic_sample(&self, candidate_id: &str) -> bool {
        self.synthetic_samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|sample| sample.candidate_id == candidate_id)
    }

    pub fn synthetic_samples(&self) -> Vec<Candidate> {
        self.synthetic_samples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_synthetic_samples(&self) {
        self.synthetic_samples
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}
