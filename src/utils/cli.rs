use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::ranking::RankMode;
use crate::samples::SampleJob;

#[derive(Parser, Debug)]
#[command(name = "resume-ranker")]
#[command(about = "Rank resumes against a job description using the remote ranking service", long_about = None)]
pub struct Args {
    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE", default_value = "config.toml")]
    pub config: PathBuf,

    /// Path to file containing the job description
    #[arg(short, long, value_name = "FILE")]
    pub job_file: Option<PathBuf>,

    /// Job description passed inline
    #[arg(long, value_name = "TEXT", conflicts_with = "job_file")]
    pub job_text: Option<String>,

    /// Use one of the bundled sample job descriptions
    #[arg(short, long, value_enum, conflicts_with_all = ["job_file", "job_text"])]
    pub sample: Option<SampleJob>,

    /// Show only the uploaded resumes, or every candidate the service knows
    #[arg(short, long, value_enum, default_value_t = RankMode::Uploaded)]
    pub mode: RankMode,

    /// Keep only candidates matching every keyword (repeatable or comma-separated)
    #[arg(short, long, value_name = "KEYWORD", value_delimiter = ',')]
    pub filter: Vec<String>,

    /// Write the ranked results as CSV to this file (or directory)
    #[arg(short, long, value_name = "PATH")]
    pub export: Option<PathBuf>,

    /// Sets the logger's verbosity level
    #[arg(short, long, value_name = "VERBOSITY", default_value_t = LevelFilter::Info)]
    pub verbosity: LevelFilter,

    /// Resume files to upload (PDF or plain text)
    #[arg(value_name = "RESUME")]
    pub resumes: Vec<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_typical_invocation() {
        let args = Args::try_parse_from([
            "resume-ranker",
            "--job-file",
            "jd.txt",
            "--filter",
            "rust,aws",
            "-f",
            "kubernetes",
            "alice.pdf",
            "bob.txt",
        ])
        .unwrap();

        assert_eq!(args.mode, RankMode::Uploaded);
        assert_eq!(args.filter, vec!["rust", "aws", "kubernetes"]);
        assert_eq!(args.resumes.len(), 2);
    }

    #[test]
    fn job_sources_are_mutually_exclusive() {
        let result = Args::try_parse_from([
            "resume-ranker",
            "--job-file",
            "jd.txt",
            "--sample",
            "data-scientist",
        ]);
        assert!(result.is_err());
    }
}
