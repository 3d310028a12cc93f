//! Error types

use thiserror::Error;

/// Failures raised by the optimizer core, the fitness evaluator and the result builder
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OptimizerError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Degenerate state: {0}")]
    DegenerateState(String),

    #[error("Undefined metric: {0}")]
    UndefinedMetric(String),

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

/// Crate-level error
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Optimizer(#[from] OptimizerError),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Task failed: {0}")]
    Task(String),
}

pub type Result<T> = std::result::Result<T, Error>;
