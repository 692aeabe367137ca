pub mod candidate;
pub mod job;

pub use candidate::{Candidate, Origin, ScoreBand};
pub use job::JobDescription;
