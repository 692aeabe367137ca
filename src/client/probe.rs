use std::collections::BTreeMap;

use chrono::Utc;
use log::{debug, info, warn};
use reqwest::RequestBuilder;
use reqwest::header::CONTENT_TYPE;
use serde_json::{Value, json};

use crate::client::{ApiClient, Endpoint};
use crate::error::RankerError;
use crate::models::{Candidate, Origin};
use crate::normalizer::envelope::has_error;
use crate::normalizer::rules::{as_number, as_text};

/// Request shapes the upload endpoint has been seen to accept, in the order
/// they are tried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadEncoding {
    /// `{"queryStringParameters": {"filename": ...}}` as a JSON body.
    WrappedQueryBody,
    EncodedQuery,
    RawQuery,
    FormBody,
    JsonBody,
    /// JSON body plus an `extension=pdf` hint in both body and query.
    JsonWithExtension,
}

impl UploadEncoding {
    pub const ALL: [UploadEncoding; 6] = [
        UploadEncoding::WrappedQueryBody,
        UploadEncoding::EncodedQuery,
        UploadEncoding::RawQuery,
        UploadEncoding::FormBody,
        UploadEncoding::JsonBody,
        UploadEncoding::JsonWithExtension,
    ];

    pub fn describe(self) -> &'static str {
        match self {
            UploadEncoding::WrappedQueryBody => "query parameters wrapped in a JSON body",
            UploadEncoding::EncodedQuery => "encoded query parameter",
            UploadEncoding::RawQuery => "unencoded query parameter",
            UploadEncoding::FormBody => "form-urlencoded body",
            UploadEncoding::JsonBody => "JSON body",
            UploadEncoding::JsonWithExtension => "JSON body with extension",
        }
    }

    pub(crate) fn request(self, client: &ApiClient, filename: &str) -> RequestBuilder {
        let url = client.url(Endpoint::UploadResume);
        let encoded = urlencoding::encode(filename);
        let http = client.http();

        match self {
            UploadEncoding::WrappedQueryBody => http
                .post(url)
                .json(&json!({ "queryStringParameters": { "filename": filename } })),
            UploadEncoding::EncodedQuery => http
                .post(format!("{}?filename={}", url, encoded))
                .header(CONTENT_TYPE, "application/json"),
            UploadEncoding::RawQuery => http
                .post(format!("{}?filename={}", url, filename))
                .header(CONTENT_TYPE, "application/json"),
            UploadEncoding::FormBody => http
                .post(url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(format!("filename={}", encoded)),
            UploadEncoding::JsonBody => http.post(url).json(&json!({ "filename": filename })),
            UploadEncoding::JsonWithExtension => http
                .post(format!("{}?filename={}&extension=pdf", url, encoded))
                .json(&json!({ "filename": filename, "extension": "pdf" })),
        }
    }
}

/// Where to PUT a resume, and the id it will be known by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresignedUpload {
    pub candidate_id: String,
    pub upload_url: String,
    pub s3_key: Option<String>,
}

/// Checks an upload-endpoint response structurally. A 200 that lacks the
/// required fields, or that carries an error inside its envelope, is a
/// failure.
pub fn extract_presigned(status: u16, data: &Value) -> Result<PresignedUpload, RankerError> {
    let endpoint = Endpoint::UploadResume.path();

    if !(200..300).contains(&status) {
        return Err(RankerError::Status { endpoint, status });
    }

    if let Some(code) = data.get("statusCode").and_then(as_number)
        && code >= 400.0
    {
        return Err(RankerError::Status {
            endpoint,
            status: code as u16,
        });
    }

    let payload = match data.get("body") {
        Some(Value::String(body)) => serde_json::from_str(body).map_err(|_| {
            RankerError::Upload(format!("unreadable response body: {}", body))
        })?,
        Some(body @ Value::Object(_)) => body.clone(),
        _ => data.clone(),
    };

    if has_error(&payload) {
        let reason = as_text(&payload["error"]).unwrap_or_else(|| payload["error"].to_string());
        return Err(RankerError::Upload(reason));
    }

    let required = |field: &'static str| {
        payload
            .get(field)
            .and_then(as_text)
            .filter(|value| !value.is_empty())
            .ok_or(RankerError::MissingField { endpoint, field })
    };

    Ok(PresignedUpload {
        candidate_id: required("candidate_id")?,
        upload_url: required("upload_url")?,
        s3_key: ["s3_key", "key"]
            .into_iter()
            .find_map(|key| payload.get(key).and_then(as_text)),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeApproach {
    Encoding(UploadEncoding),
    /// Every encoding failed and the outcome was fabricated locally.
    Synthetic,
}

#[derive(Debug, Clone)]
pub struct ProbeOutcome {
    pub presigned: PresignedUpload,
    pub approach: ProbeApproach,
    /// The fabricated record merged into search results in degraded mode.
    pub sample: Option<Candidate>,
}

impl ProbeOutcome {
    pub fn origin(&self) -> Origin {
        match self.approach {
            ProbeApproach::Synthetic => Origin::Synthetic,
            ProbeApproach::Encoding(_) => Origin::Real,
        }
    }

    pub fn is_synthetic(&self) -> bool {
        self.origin() == Origin::Synthetic
    }
}

/// Tries each upload encoding in turn until one yields a usable presigned
/// URL.
#[derive(Debug, Clone)]
pub struct UploadProbe {
    client: ApiClient,
    encodings: Vec<UploadEncoding>,
    synthetic_fallback: bool,
}

impl UploadProbe {
    pub fn new(client: ApiClient) -> Self {
        Self {
            client,
            encodings: UploadEncoding::ALL.to_vec(),
            synthetic_fallback: true,
        }
    }

    pub fn with_encodings(mut self, encodings: Vec<UploadEncoding>) -> Self {
        self.encodings = encodings;
        self
    }

    pub fn with_synthetic_fallback(mut self, enabled: bool) -> Self {
        self.synthetic_fallback = enabled;
        self
    }

    pub async fn probe(&self, filename: &str) -> Result<ProbeOutcome, RankerError> {
        let mut last_error = None;

        for encoding in &self.encodings {
            debug!("trying upload encoding: {}", encoding.describe());

            match self.client.request_presigned(*encoding, filename).await {
                Ok(presigned) => {
                    info!(
                        "upload endpoint accepted {} for {}",
                        encoding.describe(),
                        filename
                    );
                    return Ok(ProbeOutcome {
                        presigned,
                        approach: ProbeApproach::Encoding(*encoding),
                        sample: None,
                    });
                }
                Err(e) => {
                    debug!("{} rejected: {}", encoding.describe(), e);
                    last_error = Some(e);
                }
            }
        }

        if self.synthetic_fallback {
            warn!("every upload encoding failed for {}, using synthetic upload", filename);
            return Ok(self.synthetic(filename));
        }

        Err(last_error.unwrap_or_else(|| {
            RankerError::Upload(format!("no upload encoding accepted {}", filename))
        }))
    }

    /// Fabricates a flagged upload and a sample record for it, registering
    /// the sample with the session so searches include it.
    pub fn synthetic(&self, filename: &str) -> ProbeOutcome {
        let context = self.client.context();
        let now = Utc::now();

        let mut millis = now.timestamp_millis();
        while context.has_synthetic_sample(&format!("test-{}", millis)) {
            millis += 1;
        }
        let candidate_id = format!("test-{}", millis);

        let upload_url = format!(
            "https://resume-upload-storage.s3.amazonaws.com/{}?AWSAccessKeyId=TESTKEY&Signature=test&content-type=application%2Fpdf&Expires={}",
            urlencoding::encode(filename),
            now.timestamp() + 3600
        );

        let sample = Candidate {
            candidate_id: candidate_id.clone(),
            name: filename.to_string(),
            score: 0.9,
            job_id: context.job_id(),
            sections: BTreeMap::from([
                (
                    "Education".to_string(),
                    "Bachelor's degree in Computer Science".to_string(),
                ),
                (
                    "Experience".to_string(),
                    "Software Engineer - Developed web applications using React and Node.js"
                        .to_string(),
                ),
                (
                    "Skills".to_string(),
                    "JavaScript, React, AWS, Cloud Computing".to_string(),
                ),
            ]),
            entities: ["JavaScript", "React", "AWS", "Cloud Engineering", "Web Development"]
                .map(String::from)
                .to_vec(),
            matched_keywords: ["React", "AWS", "Cloud Engineering"].map(String::from).to_vec(),
            email: None,
            phone: None,
            timestamp: now.to_rfc3339(),
            was_uploaded: true,
            origin: Origin::Synthetic,
        };

        context.add_synthetic_sample(sample.clone());
        debug!("registered synthetic sample {}", candidate_id);

        ProbeOutcome {
            presigned: PresignedUpload {
                candidate_id,
                upload_url,
                s3_key: Some(filename.to_string()),
            },
            approach: ProbeApproach::Synthetic,
            sample: Some(sample),
        }
    }
}
