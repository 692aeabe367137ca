use std::path::Path;

use log::debug;

use crate::error::RankerError;
use crate::utils::config::UploadConfig;

/// A resume selected for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct ResumeFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl ResumeFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    pub async fn from_path(path: &Path) -> Result<Self, RankerError> {
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        debug!("read {} ({} bytes)", name, bytes.len());

        Ok(Self::new(name, content_type_for(path), bytes))
    }

    pub fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    /// Checks size and type against the configured limits.
    pub fn validate(&self, limits: &UploadConfig) -> Result<(), RankerError> {
        if self.bytes.is_empty() {
            return Err(RankerError::Validation(format!("{} is empty", self.name)));
        }

        if self.size() > limits.max_file_size {
            return Err(RankerError::Validation(format!(
                "{} exceeds the maximum file size of {}MB",
                self.name,
                limits.max_file_size / (1024 * 1024)
            )));
        }

        if !limits
            .accepted_types
            .iter()
            .any(|accepted| accepted.eq_ignore_ascii_case(&self.content_type))
        {
            return Err(RankerError::Validation(format!(
                "{} is not a PDF or TXT file",
                self.name
            )));
        }

        Ok(())
    }
}

/// Content type inferred from the file extension.
pub fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("pdf") => "application/pdf",
        Some("txt") | Some("text") => "text/plain",
        _ => "application/octet-stream",
    }
}

/// Rejects batches larger than the configured maximum.
pub fn validate_batch(files: &[ResumeFile], limits: &UploadConfig) -> Result<(), RankerError> {
    if files.len() > limits.max_files {
        return Err(RankerError::Validation(format!(
            "You can upload a maximum of {} files",
            limits.max_files
        )));
    }

    Ok(())
}
