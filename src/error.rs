use std::path::PathBuf;
use thiserror::Error;

pub type SaveResult<T> = Result<T, SaveError>;

#[derive(Error, Debug)]
pub enum SaveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No save file_path provided.")]
    NoPath,

    #[error("File extension must be one of {expected} (got {path})")]
    UnsupportedExtension { path: PathBuf, expected: String },

    #[error("The file {0} does not exist.")]
    SourceNotFound(PathBuf),

    #[error("File {path} is still locked after {attempts} attempts")]
    FileLocked { path: PathBuf, attempts: u32 },

    #[error("Table shape error: {0}")]
    Shape(String),

    #[error("Export error: {0}")]
    Export(String),

    #[error("Import error: {0}")]
    Import(String),

    /// Malformed or unreadable reference workbook during format transplantation
    #[error("Reference format error: {0}")]
    Format(String),

    #[error("Worker error: {0}")]
    Worker(String),
}

impl From<serde_yaml::Error> for SaveError {
    fn from(e: serde_yaml::Error) -> Self {
        SaveError::Config(e.to_string())
    }
}
