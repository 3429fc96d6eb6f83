pub mod metrics;
pub mod result;
pub mod scheduler;
pub mod scoring;

pub use metrics::{RunCounters, RunSummary};
pub use result::{AnalysisResult, ResultsMap};
pub use scheduler::{AnalysisEngine, SchedulerError};
pub use scoring::{score_pathway, ScoreError};
