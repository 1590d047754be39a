// crates/murtel-core/src/error.rs

use chrono::NaiveDateTime;
use murtel_parser::ParserError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error(transparent)]
    Parser(#[from] ParserError),

    #[error("Invalid configuration: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("Failed to render configuration: {0}")]
    ConfigRender(#[from] toml::ser::Error),

    #[error("Invalid input pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("Column '{0}' is not a depth in metres")]
    InvalidDepthColumn(String),

    #[error("Frame has neither a 'date' nor a 'time' column")]
    MissingTimeColumn,

    #[error("Reference time {0} does not occur in the record")]
    ReferenceTimeNotFound(NaiveDateTime),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Data processing error: {0}")]
    Processing(String),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
