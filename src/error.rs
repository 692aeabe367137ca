use thiserror::Error;

/// Every failure the ranking client can surface.
///
/// Malformed upstream payloads never show up here: the normalizer absorbs
/// them.
#[derive(Debug, Error)]
pub enum RankerError {
    #[error("validation error: {0}")]
    Validation(String),

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{endpoint} returned HTTP {status}")]
    Status { endpoint: &'static str, status: u16 },

    #[error("no job id available for ranking")]
    MissingJobId,

    #[error("{endpoint} response is missing `{field}`")]
    MissingField {
        endpoint: &'static str,
        field: &'static str,
    },

    #[error("upload failed: {0}")]
    Upload(String),

    #[error("none of the {0} resume(s) could be uploaded")]
    NoUploads(usize),

    #[error("export failed: {0}")]
    Export(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RankerError {
    /// Message suitable for an error banner.
    pub fn user_message(&self) -> String {
        match self {
            RankerError::Validation(message) => message.clone(),
            RankerError::Transport(e) if e.is_timeout() => {
                "The ranking service took too long to respond. Please try again.".to_string()
            }
            RankerError::Transport(_) => {
                "Could not reach the ranking service. Check your connection and try again.".to_string()
            }
            RankerError::Status { status, .. } if *status >= 500 => {
                "The ranking service hit an internal error. Please try again later.".to_string()
            }
            RankerError::Status { endpoint, status } => {
                format!("The ranking service rejected the request to {} (HTTP {}).", endpoint, status)
            }
            RankerError::MissingJobId | RankerError::MissingField { .. } => {
                "The job description could not be analyzed. Please try again.".to_string()
            }
            RankerError::Upload(reason) => format!("Resume upload failed: {}", reason),
            RankerError::NoUploads(_) => {
                "None of the resumes could be uploaded. Please check the files and try again.".to_string()
            }
            RankerError::Export(reason) => format!("Failed to save results: {}", reason),
            RankerError::Io(e) => format!("Could not read a file: {}", e),
        }
    }

    /// Timeouts and connection failures, the cases the ranking endpoint
    /// degrades instead of failing.
    pub fn is_transient(&self) -> bool {
        matches!(self, RankerError::Transport(e) if is_transient(e))
    }
}

pub(crate) fn is_transient(error: &reqwest::Error) -> bool {
    error.is_timeout() || error.is_connect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_messages_are_shown_verbatim() {
        let error = RankerError::Validation("Please enter a job description".to_string());
        assert_eq!(error.user_message(), "Please enter a job description");
        assert!(!error.is_transient());
    }

    #[test]
    fn server_errors_get_a_generic_message() {
        let error = RankerError::Status { endpoint: "/rank-resumes", status: 502 };
        assert!(error.user_message().contains("internal error"));

        let error = RankerError::Status { endpoint: "/rank-resumes", status: 403 };
        assert!(error.user_message().contains("HTTP 403"));
    }
}
