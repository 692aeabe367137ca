use std::collections::BTreeMap;

use chrono::Utc;
use log::{debug, warn};
use serde_json::Value;

use crate::models::{Candidate, Origin};
use crate::normalizer::envelope::{has_error, parse_loose, unwrap_envelope};
use crate::normalizer::rules::{
    Record, Rule, any_present, as_bool, as_list, as_number, as_object, as_origin, as_text, resolve,
};

/// Score used whenever upstream gives nothing usable.
pub const DEFAULT_SCORE: f64 = 0.5;

/// Number of entities shown as matched keywords when upstream sends none.
const ENTITY_KEYWORD_FALLBACK: usize = 5;

const CANDIDATE_ID: &[Rule<String>] = &[
    Rule::new("candidate_id", as_text),
    Rule::new("candidateId", as_text),
    Rule::new("id", as_text),
    Rule::new("resume_id", as_text),
];

const NAME: &[Rule<String>] = &[
    Rule::new("name", as_text),
    Rule::new("file_name", as_text),
    Rule::new("filename", as_text),
];

const SCORE: &[Rule<f64>] = &[
    Rule::new("score", as_number),
    Rule::new("match_score", as_number),
    Rule::new("similarity", as_number),
];

const JOB_ID: &[Rule<String>] = &[
    Rule::new("job_id", as_text),
    Rule::new("jobId", as_text),
    Rule::new("last_ranked_job_id", as_text),
];

const TIMESTAMP: &[Rule<String>] = &[
    Rule::new("timestamp", as_text),
    Rule::new("ranked_at", as_text),
    Rule::new("created_at", as_text),
    Rule::new("last_ranked_at", as_text),
];

const EMAIL: &[Rule<String>] = &[
    Rule::new("email", as_text),
    Rule::new("contact_email", as_text),
];

const PHONE: &[Rule<String>] = &[
    Rule::new("phone", as_text),
    Rule::new("contact_phone", as_text),
];

const SECTIONS: &[Rule<Record>] = &[
    Rule::new("sections", as_object),
    Rule::new("parsed_sections", as_object),
];

const ENTITIES: &[Rule<Vec<String>>] = &[
    Rule::new("entities", as_list),
    Rule::new("skills", as_list),
    Rule::new("extracted_entities", as_list),
];

const MATCHED_KEYWORDS: &[Rule<Vec<String>>] = &[
    Rule::new("matched_keywords", as_list),
    Rule::new("matching_keywords", as_list),
    Rule::new("key_skills", as_list),
    Rule::new("matches", as_list),
];

const WAS_UPLOADED: &[Rule<bool>] = &[Rule::new("was_uploaded", as_bool)];

const ORIGIN: &[Rule<Origin>] = &[
    Rule::new("origin", as_origin),
    Rule::new("isTest", as_origin),
    Rule::new("is_test", as_origin),
];

/// Normalizes any upstream candidate payload into a list of candidates.
///
/// Accepts arrays, `{results}` / `{rankings}` collections, enveloped or
/// stringified JSON, and single candidate objects. Never fails: anything
/// unusable yields an empty list.
pub fn normalize_candidates(data: &Value, job_id: Option<&str>) -> Vec<Candidate> {
    let Some(data) = parse_loose(data) else {
        return Vec::new();
    };
    let data = unwrap_envelope(data);

    if has_error(&data) {
        warn!("upstream reported an error, treating as no candidates: {}", data["error"]);
        return Vec::new();
    }

    let items = match data {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            let collection = ["results", "rankings"]
                .into_iter()
                .find(|key| map.get(*key).is_some_and(Value::is_array));

            if let Some(key) = collection {
                match map.remove(key) {
                    Some(Value::Array(items)) => items,
                    _ => Vec::new(),
                }
            } else if map.contains_key("query") || map.contains_key("results") {
                debug!("query response without results");
                return Vec::new();
            } else if looks_like_candidate(&map) {
                vec![Value::Object(map)]
            } else {
                debug!("payload carries no candidate fields");
                return Vec::new();
            }
        }
        _ => return Vec::new(),
    };

    items
        .iter()
        .filter_map(|item| normalize_candidate(item, job_id))
        .collect()
}

/// Normalizes one candidate object. Returns `None` only when the payload is
/// not an object at all.
pub fn normalize_candidate(raw: &Value, job_id: Option<&str>) -> Option<Candidate> {
    let raw = unwrap_envelope(parse_loose(raw)?);
    let record = raw.as_object()?;

    let candidate_id = resolve(record, CANDIDATE_ID).unwrap_or_else(|| generated_id(&raw));

    let name = resolve(record, NAME)
        .unwrap_or_else(|| format!("Resume {}", candidate_id.chars().take(8).collect::<String>()));

    let score = match resolve(record, SCORE) {
        Some(score) => normalize_score(score),
        None => {
            warn!(
                "missing or invalid score for {}, defaulting to {}",
                candidate_id, DEFAULT_SCORE
            );
            DEFAULT_SCORE
        }
    };

    let entities = resolve(record, ENTITIES).unwrap_or_default();
    let matched_keywords = resolve(record, MATCHED_KEYWORDS)
        .or_else(|| match_details_keywords(record))
        .unwrap_or_else(|| entities.iter().take(ENTITY_KEYWORD_FALLBACK).cloned().collect());

    Some(Candidate {
        name,
        score,
        job_id: resolve(record, JOB_ID).or_else(|| job_id.map(String::from)),
        sections: resolve(record, SECTIONS)
            .map(|sections| normalize_sections(&sections))
            .unwrap_or_default(),
        entities,
        matched_keywords,
        email: resolve(record, EMAIL),
        phone: resolve(record, PHONE),
        timestamp: resolve(record, TIMESTAMP).unwrap_or_else(|| Utc::now().to_rfc3339()),
        was_uploaded: resolve(record, WAS_UPLOADED).unwrap_or(false),
        origin: resolve(record, ORIGIN).unwrap_or_default(),
        candidate_id,
    })
}

/// Rescales a raw score onto `[0, 1]`.
///
/// `[0, 1]` passes through, `(1, 100]` is divided by 100, anything else
/// (NaN, negative, above 100) becomes [`DEFAULT_SCORE`].
pub fn normalize_score(score: f64) -> f64 {
    if (0.0..=1.0).contains(&score) {
        score
    } else if score > 1.0 && score <= 100.0 {
        score / 100.0
    } else {
        warn!("invalid score value {}, defaulting to {}", score, DEFAULT_SCORE);
        DEFAULT_SCORE
    }
}

/// Drops `unknown` sections and title-cases the remaining keys.
pub fn normalize_sections(sections: &Record) -> BTreeMap<String, String> {
    sections
        .iter()
        .filter(|(_, value)| !value.is_null())
        .map(|(key, value)| (capitalize_section_name(key), value))
        .filter(|(name, _)| name != "Unknown")
        .map(|(name, value)| {
            let content = match value {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            };
            (name, content)
        })
        .collect()
}

pub fn capitalize_section_name(name: &str) -> String {
    let words: Vec<String> = name
        .split(['_', '-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect();

    if words.is_empty() {
        "Other".to_string()
    } else {
        words.join(" ")
    }
}

fn looks_like_candidate(record: &Record) -> bool {
    any_present(record, CANDIDATE_ID) || any_present(record, NAME) || any_present(record, SCORE)
}

fn match_details_keywords(record: &Record) -> Option<Vec<String>> {
    let details = record.get("match_details").and_then(parse_loose)?;
    details.get("matched_skills").and_then(as_list)
}

/// Client-side id for records the upstream sent without one. Derived from
/// the payload so the same payload always maps to the same id.
fn generated_id(raw: &Value) -> String {
    format!("f{}", string_hash(&raw.to_string()))
}

pub(crate) fn string_hash(input: &str) -> String {
    let hash = input.encode_utf16().fold(0i32, |hash, unit| {
        hash.wrapping_shl(5).wrapping_sub(hash).wrapping_add(i32::from(unit))
    });
    format!("{:08x}", hash.unsigned_abs())
}
