use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum DiceError {
    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("invalid configuration: {0}")]
    ConfigParse(String),

    #[error("failed to read translation table at {0}")]
    TranslationTableRead(PathBuf),

    #[error("malformed translation table: {0}")]
    TranslationTableParse(String),

    #[error("unknown converter: {0}")]
    UnknownConverter(String),

    #[error("failed to load metadata snapshot: {0}")]
    Snapshot(String),

    #[error("ledger error: {0}")]
    Ledger(String),

    #[error("failed to lock {path}: {message}")]
    Lock { path: PathBuf, message: String },

    #[error("conversion failed for {file}: {message}")]
    Conversion { file: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
