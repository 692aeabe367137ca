//! Typed access to the ranking service.
//!
//! Every response passes through [`ApiClient::intercept`], which records any
//! discoverable job id in the shared [`SessionContext`] and unwraps gateway
//! envelopes before the normalizer sees the payload.

pub mod probe;

use std::sync::{Arc, LazyLock};

use backon::{ExponentialBuilder, Retryable};
use chrono::Utc;
use log::{debug, info, warn};
use regex::Regex;
use reqwest::RequestBuilder;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};

use crate::error::{RankerError, is_transient};
use crate::models::{Candidate, JobDescription};
use crate::normalizer::rules::as_text;
use crate::normalizer::{
    extract_job_title, normalize_candidates, parse_job_description, unwrap_envelope,
};
use crate::utils::cache::SessionContext;
use crate::utils::config::ApiConfig;
use crate::utils::files::ResumeFile;

pub use probe::{PresignedUpload, ProbeApproach, ProbeOutcome, UploadEncoding, UploadProbe};

static JOB_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""job_id":\s*"([^"]+)""#).expect("valid job id pattern"));

const USER_AGENT: &str = concat!("resume-ranker/", env!("CARGO_PKG_VERSION"));

/// Storage PUTs always declare PDF, whatever the file actually is.
const UPLOAD_CONTENT_TYPE: &str = "application/pdf";

const PLACEHOLDER_CANDIDATE_ID: &str = "mock-candidate-1";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endpoint {
    AnalyzeJd,
    RankResumes,
    UploadResume,
    ViewResume,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::AnalyzeJd => "/analyze-jd",
            Endpoint::RankResumes => "/rank-resumes",
            Endpoint::UploadResume => "/upload-resume",
            Endpoint::ViewResume => "/view-resume",
        }
    }
}

#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    context: Arc<SessionContext>,
    upload_retries: usize,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, context: Arc<SessionContext>) -> Result<Self, RankerError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            context,
            upload_retries: 3,
        })
    }

    /// Retries for the object-storage PUT.
    pub fn with_upload_retries(mut self, retries: usize) -> Self {
        self.upload_retries = retries;
        self
    }

    pub fn context(&self) -> &Arc<SessionContext> {
        &self.context
    }

    pub fn url(&self, endpoint: Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Sends a request and returns its intercepted JSON payload. Bodies that
    /// are not JSON come back as a string value.
    async fn exchange(&self, endpoint: Endpoint, request: RequestBuilder) -> Result<Value, RankerError> {
        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            warn!("{} returned {}", endpoint.path(), status);
            return Err(RankerError::Status {
                endpoint: endpoint.path(),
                status: status.as_u16(),
            });
        }

        let text = response.text().await?;
        let data = serde_json::from_str(&text).unwrap_or(Value::String(text));
        debug!("raw response from {}: {}", endpoint.path(), data);

        Ok(self.intercept(data))
    }

    async fn post_json(&self, endpoint: Endpoint, mut body: Value) -> Result<Value, RankerError> {
        if endpoint == Endpoint::RankResumes {
            inject_job_id(&mut body, self.context.job_id().as_deref());
        }

        let request = self.http.post(self.url(endpoint)).json(&body);
        self.exchange(endpoint, request).await
    }

    async fn get(&self, endpoint: Endpoint, params: &[(&str, &str)]) -> Result<Value, RankerError> {
        let mut url = self.url(endpoint);
        if !params.is_empty() {
            url.push('?');
            url.push_str(&encode_params(params));
        }

        let request = self.http.get(url);
        self.exchange(endpoint, request).await
    }

    /// Records the response's job id and unwraps its envelope, carrying the
    /// job id onto the unwrapped object when it lacks one.
    pub fn intercept(&self, data: Value) -> Value {
        let job_id = discover_job_id(&data);
        if let Some(ref id) = job_id {
            self.context.store_job_id(id);
        }

        let mut data = unwrap_envelope(data);
        if let (Some(id), Some(map)) = (job_id, data.as_object_mut())
            && !map.get("job_id").and_then(as_text).is_some_and(|v| !v.is_empty())
        {
            map.insert("job_id".to_string(), Value::String(id));
        }

        data
    }

    /// Submits a job description for analysis.
    ///
    /// Identical descriptions are answered from the session memo. The
    /// returned analysis has no job id when the service did not provide one,
    /// and such an analysis is never memoized.
    pub async fn analyze_job_description(&self, text: &str) -> Result<JobDescription, RankerError> {
        if text.trim().is_empty() {
            return Err(RankerError::Validation(
                "Please enter a job description".to_string(),
            ));
        }

        if let Some(job) = self.context.cached_job(text) {
            debug!("job analysis served from cache: {:?}", job.job_id);
            if let Some(ref id) = job.job_id {
                self.context.store_job_id(id);
            }
            return Ok(job);
        }

        info!("analyzing job description");
        let data = self
            .post_json(Endpoint::AnalyzeJd, json!({ "job_description": text }))
            .await?;

        let mut job = parse_job_description(&data);
        if job.description.trim().is_empty() {
            job.description = text.to_string();
            job.title = extract_job_title(text);
        }

        match job.job_id {
            Some(ref id) => {
                self.context.store_job_id(id);
                self.context.cache_job(&job);
            }
            None => warn!("job analysis carried no job id, not caching it"),
        }

        Ok(job)
    }

    /// Triggers a ranking run.
    ///
    /// Falls back to the cached job id when none is given. Timeouts and
    /// connection failures degrade to a single synthetic placeholder.
    pub async fn rank_candidates(
        &self,
        job_id: Option<&str>,
        candidate_ids: Option<&[String]>,
    ) -> Result<Vec<Candidate>, RankerError> {
        let job_id = self.effective_job_id(job_id).ok_or(RankerError::MissingJobId)?;

        let mut payload = json!({ "job_id": job_id });
        if let Some(ids) = candidate_ids.filter(|ids| !ids.is_empty()) {
            payload["candidate_ids"] = json!(ids);
        }

        info!("ranking resumes for job {}", job_id);
        match self.post_json(Endpoint::RankResumes, payload).await {
            Ok(data) => Ok(normalize_candidates(&data, Some(&job_id))),
            Err(RankerError::Transport(e)) if is_transient(&e) => {
                warn!("ranking request failed ({}), using placeholder result", e);
                Ok(placeholder_results(Some(&job_id)))
            }
            Err(e) => Err(e),
        }
    }

    /// Fetches ranked results with full detail.
    ///
    /// Synthetic samples from degraded uploads are prepended. When
    /// `candidate_ids` is given the results are narrowed to those ids, unless
    /// that would leave nothing. Never fails: errors degrade to the synthetic
    /// samples (or an empty list).
    pub async fn search_candidates(
        &self,
        query: &str,
        job_id: Option<&str>,
        candidate_ids: Option<&[String]>,
    ) -> Vec<Candidate> {
        let job_id = self.effective_job_id(job_id);

        let mut params = Vec::new();
        if let Some(ref id) = job_id {
            params.push(("job_id", id.as_str()));
        }
        if !query.trim().is_empty() {
            params.push(("query", query.trim()));
        }

        debug!("searching resumes with {:?}", params);
        let results = match self.get(Endpoint::RankResumes, &params).await {
            Ok(data) => normalize_candidates(&data, job_id.as_deref()),
            Err(RankerError::Transport(e)) if is_transient(&e) => {
                warn!("search request failed ({}), using placeholder result", e);
                placeholder_results(job_id.as_deref())
            }
            Err(e) => {
                warn!("search failed, returning synthetic samples only: {}", e);
                return self.synthetic_results(job_id.as_deref());
            }
        };

        let mut combined = self.synthetic_results(job_id.as_deref());
        if !combined.is_empty() {
            debug!("adding {} synthetic sample(s) to results", combined.len());
        }
        combined.extend(results.into_iter().map(|mut candidate| {
            if job_id.is_some() {
                candidate.job_id = job_id.clone();
            }
            candidate
        }));

        match candidate_ids.filter(|ids| !ids.is_empty()) {
            Some(ids) => {
                let narrowed: Vec<Candidate> = combined
                    .iter()
                    .filter(|candidate| ids.contains(&candidate.candidate_id))
                    .cloned()
                    .collect();

                debug!("narrowed {} result(s) to {} by candidate id", combined.len(), narrowed.len());
                if narrowed.is_empty() { combined } else { narrowed }
            }
            None => combined,
        }
    }

    /// Requests a presigned upload URL using the service's documented
    /// request shape.
    pub async fn get_presigned_upload(&self, filename: &str) -> Result<PresignedUpload, RankerError> {
        self.request_presigned(UploadEncoding::WrappedQueryBody, filename)
            .await
    }

    /// One presigned-URL request in the given encoding, checked structurally.
    pub async fn request_presigned(
        &self,
        encoding: UploadEncoding,
        filename: &str,
    ) -> Result<PresignedUpload, RankerError> {
        let response = encoding.request(self, filename).send().await?;
        let status = response.status().as_u16();
        let text = response.text().await?;
        let data = serde_json::from_str(&text).unwrap_or(Value::String(text));
        debug!("{} responded {}: {}", encoding.describe(), status, data);

        probe::extract_presigned(status, &data)
    }

    /// PUTs the file bytes to a presigned URL, retrying timeouts, connection
    /// failures and storage-side 5xx responses.
    pub async fn upload_file(&self, upload_url: &str, file: &ResumeFile) -> Result<(), RankerError> {
        if upload_url.trim().is_empty() {
            return Err(RankerError::Upload("upload URL is missing".to_string()));
        }
        if file.bytes.is_empty() {
            return Err(RankerError::Validation(format!("{} is empty", file.name)));
        }

        info!("uploading {} ({} bytes)", file.name, file.size());

        (|| async {
            let response = self
                .http
                .put(upload_url)
                .header(CONTENT_TYPE, UPLOAD_CONTENT_TYPE)
                .body(file.bytes.clone())
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                return Err(RankerError::Status {
                    endpoint: "object storage",
                    status: status.as_u16(),
                });
            }

            Ok::<(), RankerError>(())
        })
        .retry(ExponentialBuilder::default().with_max_times(self.upload_retries))
        .when(retryable_upload_error)
        .notify(|e, delay| warn!("upload of {} failed ({}), retrying in {:?}", file.name, e, delay))
        .await
    }

    pub async fn get_resume_view_url(&self, candidate_id: &str) -> Result<String, RankerError> {
        let data = self
            .get(Endpoint::ViewResume, &[("candidate_id", candidate_id)])
            .await?;

        ["view_url", "url"]
            .into_iter()
            .find_map(|key| data.get(key).and_then(as_text))
            .ok_or(RankerError::MissingField {
                endpoint: Endpoint::ViewResume.path(),
                field: "view_url",
            })
    }

    /// Fetches a job analysis by id, consulting the session memo first.
    pub async fn get_job_details(&self, job_id: &str) -> Result<JobDescription, RankerError> {
        if let Some(job) = self.context.cached_job_by_id(job_id) {
            debug!("job details for {} served from cache", job_id);
            return Ok(job);
        }

        info!("fetching job details for {}", job_id);
        let data = self.get(Endpoint::AnalyzeJd, &[("job_id", job_id)]).await?;

        let mut job = parse_job_description(&data);
        if job.job_id.is_none() {
            job.job_id = Some(job_id.to_string());
        }
        self.context.cache_job(&job);

        Ok(job)
    }

    fn effective_job_id(&self, job_id: Option<&str>) -> Option<String> {
        job_id
            .filter(|id| !id.is_empty())
            .map(String::from)
            .or_else(|| self.context.job_id())
    }

    fn synthetic_results(&self, job_id: Option<&str>) -> Vec<Candidate> {
        self.context
            .synthetic_samples()
            .into_iter()
            .map(|mut sample| {
                sample.job_id = job_id.map(String::from);
                sample.was_uploaded = true;
                sample
            })
            .collect()
    }
}

/// Finds a job id anywhere in a response: top level, inside a stringified
/// `body`, one level into nested objects, then by scanning the serialized
/// payload.
pub fn discover_job_id(data: &Value) -> Option<String> {
    if let Some(id) = job_id_of(data) {
        return Some(id);
    }

    if let Some(body) = data.get("body").and_then(Value::as_str)
        && let Ok(parsed) = serde_json::from_str::<Value>(body)
        && let Some(id) = job_id_of(&parsed)
    {
        return Some(id);
    }

    if let Some(map) = data.as_object()
        && let Some(id) = map
            .values()
            .filter(|value| value.is_object())
            .find_map(job_id_of)
    {
        return Some(id);
    }

    let serialized = match data {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    };
    JOB_ID_PATTERN
        .captures(&serialized)
        .map(|captures| captures[1].to_string())
}

fn job_id_of(value: &Value) -> Option<String> {
    value
        .get("job_id")
        .and_then(as_text)
        .filter(|id| !id.is_empty())
}

/// Adds `job_id` to an outgoing payload that lacks one.
pub fn inject_job_id(payload: &mut Value, job_id: Option<&str>) {
    let Some(job_id) = job_id else {
        return;
    };

    if payload.is_null() {
        *payload = json!({});
    }

    if let Some(map) = payload.as_object_mut()
        && !map.get("job_id").and_then(as_text).is_some_and(|v| !v.is_empty())
    {
        debug!("injecting cached job id {} into request", job_id);
        map.insert("job_id".to_string(), Value::String(job_id.to_string()));
    }
}

fn encode_params(params: &[(&str, &str)]) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{}={}", key, urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn retryable_upload_error(error: &RankerError) -> bool {
    match error {
        RankerError::Transport(e) => is_transient(e),
        RankerError::Status { status, .. } => *status >= 500,
        _ => false,
    }
}

/// The single stand-in result used when the ranking endpoint is unreachable.
fn placeholder_results(job_id: Option<&str>) -> Vec<Candidate> {
    let placeholder = json!({
        "candidate_id": PLACEHOLDER_CANDIDATE_ID,
        "score": 95,
        "job_id": job_id,
        "timestamp": Utc::now().to_rfc3339(),
        "origin": "synthetic",
    });

    normalize_candidates(&json!([placeholder]), job_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Origin;

    #[test]
    fn job_id_is_found_at_every_depth() {
        assert_eq!(
            discover_job_id(&json!({ "job_id": "top" })).as_deref(),
            Some("top")
        );
        assert_eq!(
            discover_job_id(&json!({ "body": "{\"job_id\":\"inner\"}" })).as_deref(),
            Some("inner")
        );
        assert_eq!(
            discover_job_id(&json!({ "analysis": { "job_id": "nested" } })).as_deref(),
            Some("nested")
        );
        assert_eq!(
            discover_job_id(&json!({ "a": [{ "b": { "job_id": "deep" } }] })).as_deref(),
            Some("deep")
        );
        assert_eq!(discover_job_id(&json!({ "results": [] })), None);
    }

    #[test]
    fn top_level_job_id_wins_over_nested() {
        let data = json!({
            "job_id": "outer",
            "body": "{\"job_id\":\"inner\"}",
        });
        assert_eq!(discover_job_id(&data).as_deref(), Some("outer"));
    }

    #[test]
    fn injection_keeps_an_explicit_job_id() {
        let mut payload = json!({ "job_id": "explicit" });
        inject_job_id(&mut payload, Some("cached"));
        assert_eq!(payload["job_id"], "explicit");

        let mut payload = json!({ "candidate_ids": ["a"] });
        inject_job_id(&mut payload, Some("cached"));
        assert_eq!(payload["job_id"], "cached");

        let mut payload = Value::Null;
        inject_job_id(&mut payload, Some("cached"));
        assert_eq!(payload, json!({ "job_id": "cached" }));

        let mut payload = json!({});
        inject_job_id(&mut payload, None);
        assert_eq!(payload, json!({}));
    }

    #[test]
    fn intercept_unwraps_and_carries_job_id() {
        let client = ApiClient::new(
            &ApiConfig::new("http://localhost"),
            Arc::new(SessionContext::new()),
        )
        .unwrap();

        let data = client.intercept(json!({
            "statusCode": 200,
            "body": "{\"job_id\":\"job-7\",\"key_phrases\":[\"Go\"]}",
        }));

        assert_eq!(data, json!({ "job_id": "job-7", "key_phrases": ["Go"] }));
        assert_eq!(client.context().job_id().as_deref(), Some("job-7"));
    }

    #[test]
    fn placeholder_is_a_single_synthetic_candidate() {
        let results = placeholder_results(Some("job-1"));
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].candidate_id, PLACEHOLDER_CANDIDATE_ID);
        assert_eq!(results[0].score, 0.95);
        assert_eq!(results[0].origin, Origin::Synthetic);
        assert_eq!(results[0].job_id.as_deref(), Some("job-1"));
    }

    #[test]
    fn query_params_are_encoded() {
        assert_eq!(
            encode_params(&[("job_id", "a b"), ("query", "c&d")]),
            "job_id=a%20b&query=c%26d"
        );
    }
}
