//! Client core for a remote resume-ranking service.
//!
//! [`normalizer`] reconciles the service's loosely shaped payloads,
//! [`client`] wraps its endpoints (including the upload probe) and
//! [`ranking`] drives a full submission and derives display keywords.

pub mod client;
pub mod error;
pub mod export;
pub mod models;
pub mod normalizer;
pub mod ranking;
pub mod samples;
pub mod utils;

pub use client::{ApiClient, UploadProbe};
pub use error::RankerError;
pub use models::{Candidate, JobDescription, Origin, ScoreBand};
pub use ranking::{FlowSettings, FlowState, KeywordMatcher, RankMode, RankingSession};
pub use utils::cache::SessionContext;
