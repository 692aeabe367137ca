use std::path::{Path, PathBuf};

use eyre::{Result, eyre};
use log::info;

use crate::utils::cli::Args;
use crate::utils::files::ResumeFile;

pub async fn from_file(path: &Path) -> Result<String> {
    info!("reading job description from file: {}", path.display());

    tokio::fs::read_to_string(path).await.map_err(Into::into)
}

pub async fn get_job_description(args: &Args) -> Result<String> {
    if let Some(ref file) = args.job_file {
        from_file(file).await
    } else if let Some(ref text) = args.job_text {
        Ok(text.clone())
    } else if let Some(sample) = args.sample {
        info!("using sample job description: {}", sample.label());
        Ok(sample.text().to_string())
    } else {
        Err(eyre!(
            "no job description provided, use --job-file, --job-text or --sample"
        ))
    }
}

pub async fn load_resume_files(paths: &[PathBuf]) -> Result<Vec<ResumeFile>> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(ResumeFile::from_path(path).await?);
    }

    info!("loaded {} resume file(s)", files.len());
    Ok(files)
}
