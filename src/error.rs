use thiserror::Error;

#[derive(Debug, Error)]
pub enum EstimateError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("cannot aggregate zero runs")]
    NoRuns,
    #[error("run {run} has {found} observations, expected {expected}")]
    LengthMismatch {
        run: usize,
        expected: usize,
        found: usize,
    },
    #[error("export io error: {0}")]
    Export(#[from] std::io::Error),
    #[error("export serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, EstimateError>;
