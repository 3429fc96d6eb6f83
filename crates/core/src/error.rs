use thiserror::Error;

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("Invalid data row: {0}")]
    InvalidRow(String),

    #[error("Dataset already finalized")]
    AlreadyFinalized,

    #[error("Dataset not finalized")]
    NotFinalized,

    #[error("Operation not supported on a mock dataset: {0}")]
    MockDataset(String),

    #[error("Mock replicate index out of range: {0}")]
    MockIndex(usize),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Dataset has no finite ratios to fit an empirical distribution")]
    NoFiniteRatios,
}
