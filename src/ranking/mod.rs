pub mod filter;
pub mod matcher;
pub mod session;

pub use filter::filter_candidates;
pub use matcher::KeywordMatcher;
pub use session::{
    FlowSettings, FlowState, RankMode, RankingSession, SubmitOutcome, UploadFailure,
    UploadReport, UploadedResume,
};
