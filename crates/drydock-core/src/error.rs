//! Error types for drydock-core

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DrydockError {
    #[error("namespace allocation failed: {0}")]
    Allocation(String),

    #[error("invalid option used: {0}")]
    InvalidOption(String),

    #[error("invalid submission: {0}")]
    Submission(String),

    #[error("execution error: {0}")]
    Execution(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
