use std::sync::LazyLock;

use log::warn;
use regex::Regex;
use serde_json::Value;

use crate::models::JobDescription;
use crate::normalizer::envelope::{parse_loose, unwrap_envelope};
use crate::normalizer::rules::{Record, Rule, as_list, as_text, resolve};

const TITLE_LINE_MIN: usize = 5;
const TITLE_LINE_MAX: usize = 50;

static TITLE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [r"(?i)job title:\s*([^\n]+)", r"(?i)position:\s*([^\n]+)", r"(?i)title:\s*([^\n]+)"]
        .map(|pattern| Regex::new(pattern).expect("title pattern is valid"))
});

const JOB_ID: &[Rule<String>] = &[Rule::new("job_id", as_text), Rule::new("jobId", as_text)];

const DESCRIPTION: &[Rule<String>] = &[
    Rule::new("job_description", as_text),
    Rule::new("description", as_text),
];

const KEY_PHRASES: &[Rule<Vec<String>>] = &[
    Rule::new("key_phrases", as_list),
    Rule::new("keyPhrases", as_list),
    Rule::new("KeyPhrases", as_list),
];

const ENTITIES: &[Rule<Vec<String>>] = &[
    Rule::new("entities", as_list),
    Rule::new("skills", as_list),
    Rule::new("Entities", as_list),
];

const KEYWORDS: &[Rule<Vec<String>>] = &[
    Rule::new("keywords", as_list),
    Rule::new("key_words", as_list),
];

/// Parses an upstream job-analysis payload. Never fails; absent or broken
/// payloads produce an analysis with empty term lists.
pub fn parse_job_description(data: &Value) -> JobDescription {
    let record = match parse_loose(data).map(unwrap_envelope) {
        Some(Value::Object(map)) if has_error_map(&map) => {
            warn!("job analysis returned an error: {}", map["error"]);
            Record::new()
        }
        Some(Value::Object(map)) => map,
        _ => Record::new(),
    };

    let description = resolve(&record, DESCRIPTION).unwrap_or_default();

    JobDescription {
        job_id: resolve(&record, JOB_ID),
        title: extract_job_title(&description),
        description,
        key_phrases: resolve(&record, KEY_PHRASES).unwrap_or_default(),
        entities: resolve(&record, ENTITIES).unwrap_or_default(),
        keywords: resolve(&record, KEYWORDS).unwrap_or_default(),
    }
}

/// Pulls a display title out of free-form job-description text.
///
/// Tries `Job Title:`, `Position:`, `Title:` in that order, then a first
/// line of reasonable length, then a truncated description.
pub fn extract_job_title(description: &str) -> String {
    if description.trim().is_empty() {
        return "Untitled Job".to_string();
    }

    for pattern in TITLE_PATTERNS.iter() {
        if let Some(title) = pattern.captures(description).and_then(|c| c.get(1)) {
            let title = title.as_str().trim();
            if !title.is_empty() {
                return title.to_string();
            }
        }
    }

    let first_line = description.trim_start().lines().next().unwrap_or_default().trim();
    if (TITLE_LINE_MIN..=TITLE_LINE_MAX).contains(&first_line.chars().count()) {
        return first_line.to_string();
    }

    let truncated: String = description.trim().chars().take(TITLE_LINE_MAX).collect();
    format!("{}...", truncated.trim())
}

fn has_error_map(map: &Record) -> bool {
    map.get("error").is_some_and(|error| !error.is_null())
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn title_patterns_in_priority_order() {
        assert_eq!(
            extract_job_title("Job Title: Backend Engineer\nRequired Skills: Go, gRPC"),
            "Backend Engineer"
        );
        assert_eq!(extract_job_title("We are hiring.\nPosition: Data Analyst"), "Data Analyst");
        assert_eq!(extract_job_title("Title: SRE\nTeam: infrastructure"), "SRE");
        assert_eq!(extract_job_title("Title: ignored\nPosition: Tech Lead"), "Tech Lead");
        assert_eq!(extract_job_title("Staff Frontend Developer\nReact, CSS"), "Staff Frontend Developer");
        assert_eq!(extract_job_title(""), "Untitled Job");
    }

    #[test]
    fn long_first_lines_are_truncated() {
        let text = "We are looking for a seasoned engineer who enjoys distributed systems and on-call rotations";
        let title = extract_job_title(text);
        assert!(title.ends_with("..."));
        assert!(title.chars().count() <= TITLE_LINE_MAX + 3);
    }

    #[test]
    fn parses_comprehend_style_payloads() {
        let data = json!({
            "statusCode": 200,
            "body": json!({
                "job_id": "job-42",
                "job_description": "Job Title: Backend Engineer\nGo, gRPC",
                "key_phrases": [{ "Text": "distributed systems", "Score": 0.99 }],
                "entities": [{ "Text": "Go", "Type": "OTHER" }, "gRPC"]
            })
            .to_string()
        });

        let job = parse_job_description(&data);
        assert_eq!(job.job_id.as_deref(), Some("job-42"));
        assert_eq!(job.title, "Backend Engineer");
        assert_eq!(job.key_phrases, vec!["distributed systems"]);
        assert_eq!(job.entities, vec!["Go", "gRPC"]);
        assert!(job.keywords.is_empty());
    }

    #[test]
    fn envelope_round_trip() {
        let payload = json!({ "job_id": "j", "description": "Position: QA Lead", "keyPhrases": ["testing"] });
        let wrapped = json!({ "body": payload.to_string() });
        assert_eq!(parse_job_description(&wrapped), parse_job_description(&payload));
    }

    #[test]
    fn errors_and_garbage_yield_empty_analysis() {
        let job = parse_job_description(&json!({ "body": "{\"error\": \"comprehend throttled\"}" }));
        assert_eq!(job.job_id, None);
        assert_eq!(job.title, "Untitled Job");

        let job = parse_job_description(&json!("<html>502</html>"));
        assert!(job.key_phrases.is_empty());
    }
}
