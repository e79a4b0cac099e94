use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DataError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(String),

    #[error("remote resource unavailable: {0}")]
    RemoteResourceUnavailable(String),

    #[error("raw data is missing: {0}")]
    #[diagnostic(help("fetch the raw data first; a failed fetch leaves the raw file absent"))]
    RawDataMissing(PathBuf),

    #[error("processed data is missing: {0}")]
    #[diagnostic(help("run the catalog pipeline for this transient before fixing its epoch"))]
    ProcessedDataMissing(PathBuf),

    #[error("missing config file tdata.json in current directory")]
    MissingConfig,

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("remote returned status {status}: {message}")]
    HttpStatus { status: u16, message: String },

    #[error("browser session failed: {0}")]
    Browser(String),

    #[error("failed to parse data: {0}")]
    Parse(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
