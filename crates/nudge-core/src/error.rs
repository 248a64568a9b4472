//! Error types for the Budget Nudge engine
//!
//! Only configuration problems surface from the analysis path. Missing or
//! degenerate data is handled inside each component, and an unavailable
//! classifier artifact falls back to the heuristic predictor.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
