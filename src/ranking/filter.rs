use crate::models::Candidate;

/// Keeps the candidates whose searchable text contains every keyword,
/// ignoring case. Blank keywords are ignored; no keywords keeps everything.
pub fn filter_candidates(candidates: &[Candidate], keywords: &[String]) -> Vec<Candidate> {
    let keywords: Vec<String> = keywords
        .iter()
        .map(|keyword| keyword.trim().to_lowercase())
        .filter(|keyword| !keyword.is_empty())
        .collect();

    if keywords.is_empty() {
        return candidates.to_vec();
    }

    candidates
        .iter()
        .filter(|candidate| {
            let text = candidate.searchable_text();
            keywords.iter().all(|keyword| text.contains(keyword.as_str()))
        })
        .cloned()
        .collect()
}
