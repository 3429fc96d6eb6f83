pub mod config;
pub mod data;
pub mod dataset;
pub mod error;
pub mod stats;

pub use config::{AnalysisConfig, RandMethod, SortMethod};
pub use data::DataRow;
pub use dataset::Dataset;
pub use error::EnrichError;
pub use stats::EmpiricalDistribution;
