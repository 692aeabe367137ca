use std::time::Duration;

use clap::ValueEnum;
use log::{debug, info, warn};
use tokio::sync::watch;

use crate::client::{ApiClient, Endpoint, UploadProbe};
use crate::error::RankerError;
use crate::models::{Candidate, JobDescription, Origin};
use crate::ranking::filter::filter_candidates;
use crate::ranking::matcher::KeywordMatcher;
use crate::utils::config::{ConfigInner, UploadConfig};
use crate::utils::files::{ResumeFile, validate_batch};

/// Progress of a submission. `Error` is not terminal: submitting again
/// restarts the flow.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlowState {
    #[default]
    Idle,
    Uploading,
    AnalyzingJob,
    Ranking,
    FetchingResults,
    Error,
}

/// Which candidates a submission shows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum RankMode {
    /// Only the resumes uploaded with this submission.
    #[default]
    Uploaded,
    /// Everything the service has indexed.
    All,
}

#[derive(Debug, Clone)]
pub struct FlowSettings {
    /// Pause after analysis and after ranking.
    pub settle_delay: Duration,
    pub upload: UploadConfig,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            settle_delay: Duration::ZERO,
            upload: UploadConfig::default(),
        }
    }
}

impl From<&ConfigInner> for FlowSettings {
    fn from(config: &ConfigInner) -> Self {
        Self {
            settle_delay: config.flow.settle_delay(),
            upload: config.upload.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedResume {
    pub file_name: String,
    pub candidate_id: String,
    pub origin: Origin,
}

#[derive(Debug)]
pub struct UploadFailure {
    pub file_name: String,
    pub error: RankerError,
}

/// Per-file results of one upload batch.
#[derive(Debug, Default)]
pub struct UploadReport {
    pub succeeded: Vec<UploadedResume>,
    pub failed: Vec<UploadFailure>,
}

impl UploadReport {
    pub fn absorb(mut self, file_name: &str, result: Result<UploadedResume, RankerError>) -> Self {
        match result {
            Ok(uploaded) => self.succeeded.push(uploaded),
            Err(error) => self.failed.push(UploadFailure {
                file_name: file_name.to_string(),
                error,
            }),
        }
        self
    }

    pub fn candidate_ids(&self) -> Vec<String> {
        self.succeeded
            .iter()
            .map(|uploaded| uploaded.candidate_id.clone())
            .collect()
    }
}

#[derive(Debug)]
pub struct SubmitOutcome {
    pub uploads: UploadReport,
    /// The job description matched the last analysis, so it was not sent
    /// again.
    pub analysis_reused: bool,
    pub result_count: usize,
}

/// Drives upload, analysis, ranking and retrieval for one user session.
pub struct RankingSession {
    client: ApiClient,
    probe: UploadProbe,
    settings: FlowSettings,
    state: watch::Sender<FlowState>,

    job_id: Option<String>,
    last_analyzed: Option<String>,
    job: Option<JobDescription>,
    uploaded_ids: Vec<String>,
    original: Vec<Candidate>,
    filtered: Vec<Candidate>,
    last_error: Option<String>,
}

impl RankingSession {
    pub fn new(client: ApiClient, settings: FlowSettings) -> Self {
        let probe = UploadProbe::new(client.clone())
            .with_synthetic_fallback(settings.upload.synthetic_fallback);

        Self {
            client,
            probe,
            settings,
            state: watch::Sender::new(FlowState::Idle),
            job_id: None,
            last_analyzed: None,
            job: None,
            uploaded_ids: Vec::new(),
            original: Vec::new(),
            filtered: Vec::new(),
            last_error: None,
        }
    }

    pub fn with_probe(mut self, probe: UploadProbe) -> Self {
        self.probe = probe;
        self
    }

    pub fn state(&self) -> FlowState {
        *self.state.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<FlowState> {
        self.state.subscribe()
    }

    fn set_state(&self, state: FlowState) {
        debug!("flow state: {:?}", state);
        self.state.send_replace(state);
    }

    /// Runs one full submission. On failure the session moves to
    /// [`FlowState::Error`] and keeps its previous results.
    pub async fn submit(
        &mut self,
        job_text: &str,
        files: &[ResumeFile],
        mode: RankMode,
    ) -> Result<SubmitOutcome, RankerError> {
        self.last_error = None;

        match self.run(job_text, files, mode).await {
            Ok(outcome) => {
                self.set_state(FlowState::Idle);
                Ok(outcome)
            }
            Err(e) => {
                warn!("submission failed: {}", e);
                self.last_error = Some(e.user_message());
                self.set_state(FlowState::Error);
                Err(e)
            }
        }
    }

    async fn run(
        &mut self,
        job_text: &str,
        files: &[ResumeFile],
        mode: RankMode,
    ) -> Result<SubmitOutcome, RankerError> {
        self.validate(job_text, files, mode)?;

        let uploads = match mode {
            RankMode::Uploaded => {
                self.set_state(FlowState::Uploading);
                let report = self.upload_all(files).await;
                if report.succeeded.is_empty() {
                    return Err(RankerError::NoUploads(files.len()));
                }

                self.uploaded_ids = report.candidate_ids();
                report
            }
            RankMode::All => UploadReport::default(),
        };

        self.set_state(FlowState::AnalyzingJob);
        let (job_id, analysis_reused) = match self.reusable_job_id(job_text) {
            Some(job_id) => {
                info!("job description unchanged, reusing job {}", job_id);
                (job_id, true)
            }
            None => (self.analyze(job_text).await?, false),
        };

        self.set_state(FlowState::Ranking);
        let ranked = self.client.rank_candidates(Some(&job_id), None).await?;
        info!("ranking returned {} candidate(s)", ranked.len());
        self.settle().await;

        self.set_state(FlowState::FetchingResults);
        let results = self.fetch_results(&job_id, mode, ranked).await;

        info!("showing {} candidate(s)", results.len());
        self.original = results;
        self.filtered = self.original.clone();

        Ok(SubmitOutcome {
            uploads,
            analysis_reused,
            result_count: self.original.len(),
        })
    }

    fn validate(&self, job_text: &str, files: &[ResumeFile], mode: RankMode) -> Result<(), RankerError> {
        if job_text.trim().is_empty() {
            return Err(RankerError::Validation(
                "Please enter a job description".to_string(),
            ));
        }

        if mode == RankMode::Uploaded && files.is_empty() {
            return Err(RankerError::Validation(
                "Please upload at least one resume".to_string(),
            ));
        }

        validate_batch(files, &self.settings.upload)
    }

    /// Uploads files one at a time. A failing file is recorded and the
    /// batch moves on.
    async fn upload_all(&self, files: &[ResumeFile]) -> UploadReport {
        let mut report = UploadReport::default();

        for file in files {
            let result = self.upload_one(file).await;
            match &result {
                Ok(uploaded) => info!("uploaded {} as {}", file.name, uploaded.candidate_id),
                Err(e) => warn!("failed to upload {}: {}", file.name, e),
            }
            report = report.absorb(&file.name, result);
        }

        info!(
            "uploaded {} of {} file(s)",
            report.succeeded.len(),
            files.len()
        );
        report
    }

    async fn upload_one(&self, file: &ResumeFile) -> Result<UploadedResume, RankerError> {
        file.validate(&self.settings.upload)?;

        let outcome = self.probe.probe(&file.name).await?;
        if outcome.is_synthetic() {
            debug!("skipping storage upload for synthetic {}", outcome.presigned.candidate_id);
        } else {
            self.client
                .upload_file(&outcome.presigned.upload_url, file)
                .await?;
        }

        Ok(UploadedResume {
            file_name: file.name.clone(),
            origin: outcome.origin(),
            candidate_id: outcome.presigned.candidate_id,
        })
    }

    fn reusable_job_id(&self, job_text: &str) -> Option<String> {
        match (&self.last_analyzed, &self.job_id) {
            (Some(last), Some(job_id)) if last == job_text => Some(job_id.clone()),
            _ => None,
        }
    }

    async fn analyze(&mut self, job_text: &str) -> Result<String, RankerError> {
        let job = self.client.analyze_job_description(job_text).await?;
        let job_id = job.job_id.clone().ok_or(RankerError::MissingField {
            endpoint: Endpoint::AnalyzeJd.path(),
            field: "job_id",
        })?;

        info!("job analyzed as {} ({})", job_id, job.title);
        self.job_id = Some(job_id.clone());
        self.last_analyzed = Some(job_text.to_string());
        self.job = Some(job);
        self.settle().await;

        Ok(job_id)
    }

    /// Fetches full detail for the ranked population. In uploaded mode only
    /// the batch's candidates are kept, unless none of them came back.
    async fn fetch_results(&self, job_id: &str, mode: RankMode, ranked: Vec<Candidate>) -> Vec<Candidate> {
        let ids = match mode {
            RankMode::Uploaded => Some(self.uploaded_ids.as_slice()),
            RankMode::All => None,
        };

        let mut results = self.client.search_candidates("", Some(job_id), ids).await;

        if let Some(ids) = ids {
            let batch: Vec<Candidate> = results
                .iter()
                .filter(|candidate| ids.contains(&candidate.candidate_id))
                .cloned()
                .map(|mut candidate| {
                    candidate.was_uploaded = true;
                    candidate
                })
                .collect();

            if batch.is_empty() {
                debug!("no uploaded candidates in results, showing everything");
            } else {
                results = batch;
            }
        }

        if results.is_empty() {
            debug!("search returned nothing, using ranking results");
            results = ranked;
        }

        results
    }

    async fn settle(&self) {
        if !self.settings.settle_delay.is_zero() {
            debug!("waiting {:?} for the service to settle", self.settings.settle_delay);
            tokio::time::sleep(self.settings.settle_delay).await;
        }
    }

    /// Re-derives the visible results from the last submission.
    pub fn filter(&mut self, keywords: &[String]) -> &[Candidate] {
        self.filtered = filter_candidates(&self.original, keywords);
        debug!(
            "filter {:?} kept {} of {} candidate(s)",
            keywords,
            self.filtered.len(),
            self.original.len()
        );
        &self.filtered
    }

    /// Resets session state and drops synthetic samples. Cached job
    /// analyses are kept.
    pub fn clear(&mut self) {
        self.job_id = None;
        self.last_analyzed = None;
        self.job = None;
        self.uploaded_ids.clear();
        self.original.clear();
        self.filtered.clear();
        self.last_error = None;
        self.client.context().clear_synthetic_samples();
        self.set_state(FlowState::Idle);
    }

    pub fn results(&self) -> &[Candidate] {
        &self.filtered
    }

    pub fn original_results(&self) -> &[Candidate] {
        &self.original
    }

    pub fn job(&self) -> Option<&JobDescription> {
        self.job.as_ref()
    }

    pub fn job_id(&self) -> Option<&str> {
        self.job_id.as_deref()
    }

    pub fn uploaded_ids(&self) -> &[String] {
        &self.uploaded_ids
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// Display keywords for each visible result, in order.
    pub fn display_keywords(&self) -> Vec<Vec<String>> {
        match &self.job {
            Some(job) => KeywordMatcher::new(job).display_all(&self.filtered),
            None => self
                .filtered
                .iter()
                .map(|candidate| candidate.matched_keywords.clone())
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::utils::cache::SessionContext;
    use crate::utils::config::ApiConfig;

    fn session() -> RankingSession {
        let client = ApiClient::new(
            // Nothing listens here; validation must fail before any request.
            &ApiConfig::new("http://127.0.0.1:9"),
            Arc::new(SessionContext::new()),
        )
        .unwrap();
        RankingSession::new(client, FlowSettings::default())
    }

    fn resume(name: &str) -> ResumeFile {
        ResumeFile::new(name, "application/pdf", b"%PDF-1.4".to_vec())
    }

    #[tokio::test]
    async fn empty_job_description_is_rejected() {
        let mut session = session();
        let error = session
            .submit("   ", &[resume("a.pdf")], RankMode::Uploaded)
            .await
            .unwrap_err();

        assert!(matches!(error, RankerError::Validation(_)));
        assert_eq!(session.state(), FlowState::Error);
        assert_eq!(session.last_error(), Some("Please enter a job description"));
    }

    #[tokio::test]
    async fn uploaded_mode_needs_files() {
        let mut session = session();
        let error = session
            .submit("Job Title: SRE", &[], RankMode::Uploaded)
            .await
            .unwrap_err();

        assert!(matches!(error, RankerError::Validation(_)));
    }

    #[tokio::test]
    async fn too_many_files_are_rejected() {
        let mut session = session();
        let files: Vec<ResumeFile> = (0..11).map(|i| resume(&format!("{}.pdf", i))).collect();
        let error = session
            .submit("Job Title: SRE", &files, RankMode::All)
            .await
            .unwrap_err();

        assert!(matches!(error, RankerError::Validation(message) if message.contains("maximum of 10")));
    }

    #[test]
    fn report_folds_successes_and_failures() {
        let report = UploadReport::default()
            .absorb(
                "a.pdf",
                Ok(UploadedResume {
                    file_name: "a.pdf".to_string(),
                    candidate_id: "c-a".to_string(),
                    origin: Origin::Real,
                }),
            )
            .absorb("b.pdf", Err(RankerError::Upload("rejected".to_string())));

        assert_eq!(report.candidate_ids(), ["c-a"]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].file_name, "b.pdf");
    }

    #[test]
    fn clear_resets_to_idle() {
        let mut session = session();
        session.set_state(FlowState::Error);
        session.clear();

        assert_eq!(session.state(), FlowState::Idle);
        assert!(session.results().is_empty());
        assert!(session.job().is_none());
    }
}
