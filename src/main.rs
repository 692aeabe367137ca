use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Parser;
use colored::Colorize;
use eyre::Result;
use log::{debug, info, warn};

use resume_ranker::export::{export_file_name, to_csv};
use resume_ranker::ranking::FlowState;
use resume_ranker::utils::cli::Args;
use resume_ranker::utils::config::{Config, DisplayConfig, config};
use resume_ranker::utils::input::{get_job_description, load_resume_files};
use resume_ranker::utils::log::Logger;
use resume_ranker::{ApiClient, Candidate, FlowSettings, Origin, RankingSession, ScoreBand, SessionContext};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    Logger::init(args.verbosity);

    info!(
        "starting resume-ranker {}",
        format!("v{}", env!("CARGO_PKG_VERSION")).magenta()
    );

    let config: Config = config(args.config.clone())?;
    let job_text = get_job_description(&args).await?;
    let files = load_resume_files(&args.resumes).await?;

    let context = Arc::new(SessionContext::new());
    let client = ApiClient::new(&config.api, context)?.with_upload_retries(config.upload.max_retries);
    let mut session = RankingSession::new(client, FlowSettings::from(&*config));

    let mut progress = session.subscribe();
    let watcher = tokio::spawn(async move {
        while progress.changed().await.is_ok() {
            let state = *progress.borrow_and_update();
            if let Some(label) = describe(state) {
                println!("{} {}", "→".cyan(), label);
            }
        }
    });

    let outcome = match session.submit(&job_text, &files, args.mode).await {
        Ok(outcome) => outcome,
        Err(e) => {
            watcher.abort();
            eprintln!("{}", e.user_message().red());
            return Err(e.into());
        }
    };
    watcher.abort();

    for failure in &outcome.uploads.failed {
        println!(
            "{} {}: {}",
            "✗".red(),
            failure.file_name,
            failure.error.user_message()
        );
    }

    if outcome
        .uploads
        .succeeded
        .iter()
        .any(|uploaded| uploaded.origin == Origin::Synthetic)
    {
        warn!("upload endpoint unavailable, results include sample data");
    }

    if outcome.analysis_reused {
        debug!("job analysis reused from earlier submission");
    }

    if !args.filter.is_empty() {
        let kept = session.filter(&args.filter).len();
        info!(
            "filter kept {} of {} candidate(s)",
            kept,
            session.original_results().len()
        );
    }

    print_results(&session, &config.display);

    if let Some(path) = args.export {
        let path = export_results(session.results(), path).await?;
        info!("saved results to {}", path.display());
    }

    Ok(())
}

fn describe(state: FlowState) -> Option<&'static str> {
    match state {
        FlowState::Uploading => Some("uploading resumes"),
        FlowState::AnalyzingJob => Some("analyzing job description"),
        FlowState::Ranking => Some("ranking candidates"),
        FlowState::FetchingResults => Some("fetching results"),
        FlowState::Idle | FlowState::Error => None,
    }
}

fn print_results(session: &RankingSession, display: &DisplayConfig) {
    let results = session.results();
    if results.is_empty() {
        println!("{}", "No candidates matched.".yellow());
        return;
    }

    let title = session
        .job()
        .map(|job| job.title.as_str())
        .unwrap_or("job description");
    println!("\n{}", format!("=== Ranking for {} ===", title).cyan().bold());

    let keywords = session.display_keywords();
    for (index, (candidate, keywords)) in results.iter().zip(keywords).enumerate() {
        println!(
            "{}. {} {}{}",
            index + 1,
            candidate.name.bold(),
            colored_score(candidate, display),
            if candidate.is_synthetic() {
                " [sample]".dimmed().to_string()
            } else {
                String::new()
            }
        );

        if !keywords.is_empty() {
            println!("   {}", keywords.join(", ").dimmed());
        }
    }
}

fn colored_score(candidate: &Candidate, display: &DisplayConfig) -> String {
    let score = format!("{:.1}%", candidate.score_percent());

    match ScoreBand::classify(
        candidate.score,
        display.high_score_threshold,
        display.medium_score_threshold,
    ) {
        ScoreBand::High => score.green().bold().to_string(),
        ScoreBand::Medium => score.yellow().to_string(),
        ScoreBand::Low => score.red().to_string(),
    }
}

/// Writes CSV to `path`, or into it under a dated name when it is a
/// directory.
async fn export_results(results: &[Candidate], path: PathBuf) -> Result<PathBuf> {
    let path = if is_dir(&path).await {
        path.join(export_file_name(chrono::Local::now().date_naive()))
    } else {
        path
    };

    tokio::fs::write(&path, to_csv(results)?).await?;
    Ok(path)
}

async fn is_dir(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .is_ok_and(|metadata| metadata.is_dir())
}
