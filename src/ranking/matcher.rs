use std::sync::LazyLock;

use rayon::prelude::*;
use regex::Regex;

use crate::models::{Candidate, JobDescription};

static BUSINESS_DOMAIN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(business|management|manager|stakeholders?|strategy|operations|analyst|consult(ant|ing))\b")
        .expect("valid business domain pattern")
});

const BUSINESS_VOCABULARY: &[&str] = &[
    "Business Analysis",
    "Project Management",
    "Stakeholder Management",
    "Requirements Gathering",
    "Process Improvement",
    "Strategic Planning",
    "Data Analysis",
    "Risk Management",
    "Budgeting",
    "Reporting",
    "Communication",
    "Leadership",
];

/// Section names whose bodies are scanned for requirement terms.
const SKILL_SECTION_HINTS: &[&str] = &[
    "skill",
    "experience",
    "summary",
    "qualification",
    "competenc",
    "expertise",
    "technolog",
];

const MIN_DISPLAYED: usize = 3;
const MAX_DISPLAYED: usize = 15;

/// Derives display-ready "matched skill" tags by cross-referencing a
/// candidate against a job analysis.
#[derive(Debug, Clone)]
pub struct KeywordMatcher {
    terms: Vec<String>,
    lowered: Vec<String>,
}

impl KeywordMatcher {
    pub fn new(job: &JobDescription) -> Self {
        let mut terms: Vec<String> = job
            .requirement_terms()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(String::from)
            .collect();

        if BUSINESS_DOMAIN.is_match(&job.description) {
            terms.extend(BUSINESS_VOCABULARY.iter().map(|term| term.to_string()));
        }

        let terms = dedupe(terms);
        let lowered = terms.iter().map(|term| term.to_lowercase()).collect();

        Self { terms, lowered }
    }

    pub fn requirement_terms(&self) -> &[String] {
        &self.terms
    }

    /// Entities that line up with a requirement term, plus requirement terms
    /// found in skill-like resume sections.
    pub fn matches(&self, candidate: &Candidate) -> Vec<String> {
        let mut found: Vec<String> = candidate
            .entities
            .iter()
            .filter(|entity| {
                let entity = entity.to_lowercase();
                self.lowered.iter().any(|term| {
                    equivalent(&entity, term)
                        || contains_word(&entity, term)
                        || contains_word(term, &entity)
                })
            })
            .cloned()
            .collect();

        let sections = skill_section_text(candidate);
        if !sections.is_empty() {
            found.extend(
                self.terms
                    .iter()
                    .zip(&self.lowered)
                    .filter(|(_, lowered)| contains_word(&sections, lowered))
                    .map(|(term, _)| term.clone()),
            );
        }

        dedupe(found)
    }

    /// Keywords to show for a candidate: exact matches, padded from the
    /// wider pool up to a score-dependent target.
    pub fn display_keywords(&self, candidate: &Candidate) -> Vec<String> {
        let target = display_target(candidate.score);
        let mut shown = self.matches(candidate);

        if shown.len() < target {
            let text = candidate.searchable_text();
            let anywhere = self
                .terms
                .iter()
                .zip(&self.lowered)
                .filter(|(_, lowered)| contains_word(&text, lowered))
                .map(|(term, _)| term);

            let pool = candidate
                .matched_keywords
                .iter()
                .chain(candidate.entities.iter())
                .chain(anywhere);

            for keyword in pool {
                if shown.len() >= target {
                    break;
                }

                let lowered = keyword.to_lowercase();
                if !shown.iter().any(|s| overlaps(&s.to_lowercase(), &lowered)) {
                    shown.push(keyword.clone());
                }
            }
        }

        shown.truncate(target);
        shown
    }

    pub fn display_all(&self, candidates: &[Candidate]) -> Vec<Vec<String>> {
        candidates
            .par_iter()
            .map(|candidate| self.display_keywords(candidate))
            .collect()
    }
}

/// How many keywords a candidate with this score should show.
pub fn display_target(score: f64) -> usize {
    let target = MIN_DISPLAYED as f64 + ((MAX_DISPLAYED - MIN_DISPLAYED) as f64 * score).round();
    (target as usize).clamp(MIN_DISPLAYED, MAX_DISPLAYED)
}

/// Collapses case, singular/plural and prefix variants, keeping the longer
/// surface form in the position of the first occurrence.
pub fn dedupe(terms: Vec<String>) -> Vec<String> {
    let mut kept: Vec<String> = Vec::with_capacity(terms.len());

    for term in terms {
        let lowered = term.to_lowercase();
        match kept.iter_mut().find(|k| overlaps(&k.to_lowercase(), &lowered)) {
            Some(existing) if term.len() > existing.len() => *existing = term,
            Some(_) => {}
            None => kept.push(term),
        }
    }

    kept
}

fn skill_section_text(candidate: &Candidate) -> String {
    candidate
        .sections
        .iter()
        .filter(|(name, _)| {
            let name = name.to_lowercase();
            SKILL_SECTION_HINTS.iter().any(|hint| name.contains(hint))
        })
        .map(|(_, body)| body.to_lowercase())
        .collect::<Vec<_>>()
        .join("\n")
}

fn singular(term: &str) -> &str {
    match term.strip_suffix('s') {
        Some(stem) if term.len() > 3 && !stem.ends_with('s') => stem,
        _ => term,
    }
}

fn equivalent(a: &str, b: &str) -> bool {
    a == b || singular(a) == singular(b)
}

/// Both arguments lowercased.
fn overlaps(a: &str, b: &str) -> bool {
    if equivalent(a, b) {
        return true;
    }

    let (long, short) = if a.len() >= b.len() { (a, b) } else { (b, a) };
    long.starts_with(short) && contains_word(long, short)
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Substring match that respects word boundaries on both ends.
fn contains_word(haystack: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return false;
    }

    haystack.match_indices(needle).any(|(start, _)| {
        let before = haystack[..start].chars().next_back();
        let after = haystack[start + needle.len()..].chars().next();
        !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
    })
}
