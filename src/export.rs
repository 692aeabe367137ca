use chrono::NaiveDate;

use crate::error::RankerError;
use crate::models::Candidate;

/// Renders ranked results as `Rank,Name,Score,Skills` CSV.
pub fn to_csv(candidates: &[Candidate]) -> Result<String, RankerError> {
    let mut writer = csv::WriterBuilder::new().from_writer(Vec::new());

    writer
        .write_record(["Rank", "Name", "Score", "Skills"])
        .map_err(|e| RankerError::Export(e.to_string()))?;

    for (index, candidate) in candidates.iter().enumerate() {
        writer
            .write_record([
                (index + 1).to_string(),
                candidate.name.clone(),
                format!("{:.1}%", candidate.score_percent()),
                candidate.entities.join(";"),
            ])
            .map_err(|e| RankerError::Export(e.to_string()))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| RankerError::Export(e.to_string()))?;

    String::from_utf8(bytes).map_err(|e| RankerError::Export(e.to_string()))
}

pub fn export_file_name(date: NaiveDate) -> String {
    format!("resume-ranking-{}.csv", date.format("%Y-%m-%d"))
}
