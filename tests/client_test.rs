use std::sync::Arc;

use resume_ranker::client::ApiClient;
use resume_ranker::utils::cache::SessionContext;
use resume_ranker::utils::config::ApiConfig;
use resume_ranker::utils::files::ResumeFile;
use resume_ranker::{Origin, RankerError};
use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(base_url: &str) -> ApiClient {
    ApiClient::new(&ApiConfig::new(base_url), Arc::new(SessionContext::new()))
        .expect("client should build")
        .with_upload_retries(0)
}

#[tokio::test]
async fn analysis_unwraps_envelope_and_caches_job_id() {
    let server = MockServer::start().await;

    let inner = json!({
        "job_id": "job-42",
        "job_description": "Job Title: Backend Engineer\nRequired Skills: Go, gRPC",
        "key_phrases": ["distributed systems"],
        "entities": [{ "Text": "Go" }, { "Text": "gRPC" }],
    });

    Mock::given(method("POST"))
        .and(path("/analyze-jd"))
        .and(body_json(json!({
            "job_description": "Job Title: Backend Engineer\nRequired Skills: Go, gRPC"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statusCode": 200,
            "body": inner.to_string(),
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let text = "Job Title: Backend Engineer\nRequired Skills: Go, gRPC";

    let job = client.analyze_job_description(text).await.unwrap();
    assert_eq!(job.job_id.as_deref(), Some("job-42"));
    assert_eq!(job.title, "Backend Engineer");
    assert_eq!(job.entities, vec!["Go", "gRPC"]);
    assert_eq!(client.context().job_id().as_deref(), Some("job-42"));

    // Identical text is served from the session memo.
    let again = client.analyze_job_description(text).await.unwrap();
    assert_eq!(again, job);
}

#[tokio::test]
async fn cached_job_id_is_injected_into_ranking_requests() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze-jd"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "analysis": { "job_id": "job-9" },
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/rank-resumes"))
        .and(body_json(json!({ "job_id": "job-9" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "rankings": [
                { "resume_id": "r-1", "score": 91 },
                { "resume_id": "r-2", "score": 0.4 },
            ],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    client.analyze_job_description("Job Title: SRE").await.unwrap();

    let ranked = client.rank_candidates(None, None).await.unwrap();
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].candidate_id, "r-1");
    assert_eq!(ranked[0].score, 0.91);
    assert_eq!(ranked[0].job_id.as_deref(), Some("job-9"));
    assert_eq!(ranked[1].score, 0.4);
}

#[tokio::test]
async fn ranking_without_any_job_id_fails_before_sending() {
    let server = MockServer::start().await;
    let client = client_for(&server.uri());

    let error = client.rank_candidates(None, None).await.unwrap_err();
    assert!(matches!(error, RankerError::MissingJobId));
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn unreachable_ranking_service_degrades_to_placeholder() {
    // Port 1 is never listening.
    let client = client_for("http://127.0.0.1:1");

    let ranked = client
        .rank_candidates(Some("job-1"), Some(&["c-1".to_string()]))
        .await
        .unwrap();
    assert_eq!(ranked.len(), 1);
    assert_eq!(ranked[0].candidate_id, "mock-candidate-1");
    assert_eq!(ranked[0].origin, Origin::Synthetic);
    assert!((0.0..=1.0).contains(&ranked[0].score));

    let searched = client.search_candidates("", Some("job-1"), None).await;
    assert_eq!(searched.len(), 1);
    assert!(searched[0].is_synthetic());
}

#[tokio::test]
async fn non_transient_errors_still_propagate() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/analyze-jd"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let error = client
        .analyze_job_description("Job Title: SRE")
        .await
        .unwrap_err();

    assert!(matches!(
        error,
        RankerError::Status { endpoint: "/analyze-jd", status: 500 }
    ));
}

#[tokio::test]
async fn search_narrows_to_requested_ids_unless_none_match() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rank-resumes"))
        .and(query_param("job_id", "job-1"))
        .and(query_param("query", "rust"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "query": "rust",
            "results": [
                { "candidate_id": "a", "name": "Ada", "score": 0.9, "job_id": "stale" },
                { "candidate_id": "b", "name": "Bob", "score": 0.7 },
            ],
        })))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());

    let narrowed = client
        .search_candidates(" rust ", Some("job-1"), Some(&["b".to_string()]))
        .await;
    assert_eq!(narrowed.len(), 1);
    assert_eq!(narrowed[0].name, "Bob");

    let unmatched = client
        .search_candidates("rust", Some("job-1"), Some(&["zzz".to_string()]))
        .await;
    assert_eq!(unmatched.len(), 2);
    assert!(unmatched.iter().all(|c| c.job_id.as_deref() == Some("job-1")));
}

#[tokio::test]
async fn search_without_a_job_id_keeps_upstream_job_ids() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rank-resumes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "results": [
                { "candidate_id": "a", "score": 0.9, "job_id": "job-upstream" },
            ],
        })))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let results = client.search_candidates("", None, None).await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].job_id.as_deref(), Some("job-upstream"));
}

#[tokio::test]
async fn failed_search_returns_empty_results() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/rank-resumes"))
        .respond_with(ResponseTemplate::new(502))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    assert!(client.search_candidates("", Some("job-1"), None).await.is_empty());
}

#[tokio::test]
async fn view_url_accepts_either_field() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/view-resume"))
        .and(query_param("candidate_id", "c-1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "body": "{\"url\":\"https://storage.example/c-1.pdf\"}",
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/view-resume"))
        .and(query_param("candidate_id", "c-2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    assert_eq!(
        client.get_resume_view_url("c-1").await.unwrap(),
        "https://storage.example/c-1.pdf"
    );
    assert!(matches!(
        client.get_resume_view_url("c-2").await,
        Err(RankerError::MissingField { field: "view_url", .. })
    ));
}

#[tokio::test]
async fn job_details_are_memoized() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/analyze-jd"))
        .and(query_param("job_id", "job-5"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "job_id": "job-5",
            "description": "Position: Data Engineer\nSpark and Airflow",
            "keyPhrases": ["Spark", "Airflow"],
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri());

    let job = client.get_job_details("job-5").await.unwrap();
    assert_eq!(job.title, "Data Engineer");
    assert_eq!(job.key_phrases, vec!["Spark", "Airflow"]);

    let again = client.get_job_details("job-5").await.unwrap();
    assert_eq!(again, job);
    assert!(client.context().cached_job("Position: Data Engineer\nSpark and Airflow").is_some());
}

#[tokio::test]
async fn upload_puts_pdf_bytes_and_retries_server_errors() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .and(path("/storage/resume.pdf"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("PUT"))
        .and(path("/storage/resume.pdf"))
        .and(header("content-type", "application/pdf"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server.uri()).with_upload_retries(1);
    let file = ResumeFile::new("resume.pdf", "application/pdf", b"%PDF-1.4 test".to_vec());

    client
        .upload_file(&format!("{}/storage/resume.pdf", server.uri()), &file)
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].body, b"%PDF-1.4 test");
}

#[tokio::test]
async fn upload_rejections_surface_as_errors() {
    let server = MockServer::start().await;

    Mock::given(method("PUT"))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let client = client_for(&server.uri()).with_upload_retries(2);
    let file = ResumeFile::new("resume.pdf", "application/pdf", b"%PDF".to_vec());

    let error = client
        .upload_file(&format!("{}/storage/resume.pdf", server.uri()), &file)
        .await
        .unwrap_err();

    assert!(matches!(error, RankerError::Status { status: 403, .. }));
    // Client errors are not retried.
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn presigned_upload_uses_wrapped_query_body() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/upload-resume"))
        .and(body_partial_json(json!({
            "queryStringParameters": { "filename": "cv.pdf" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "statusCode": 200,
            "body": "{\"candidate_id\":\"c-9\",\"upload_url\":\"https://s3.example/put\",\"s3_key\":\"uploads/cv.pdf\"}",
        })))
        .mount(&server)
        .await;

    let client = client_for(&server.uri());
    let presigned = client.get_presigned_upload("cv.pdf").await.unwrap();

    assert_eq!(presigned.candidate_id, "c-9");
    assert_eq!(presigned.upload_url, "https://s3.example/put");
    assert_eq!(presigned.s3_key.as_deref(), Some("uploads/cv.pdf"));
}
