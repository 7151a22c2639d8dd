use std::path::PathBuf;
use thiserror::Error;

/// Error type for invalid inputs and failed operations.
#[derive(Error, Debug)]
pub enum IsmipError {
    #[error("{0}")]
    Validation(String),
    #[error("Required file is missing: {0}")]
    MissingFile(PathBuf),
    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("Cannot repair missing trailing temperature: {0}")]
    InsufficientData(String),
    #[error("Invalid configuration: {0}")]
    Config(String),
    #[error("Serialization failed: {0}")]
    Serialization(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl IsmipError {
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        IsmipError::Parse {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Convenience type for `Result<T, IsmipError>`.
pub type IsmipResult<T> = Result<T, IsmipError>;

/// Fail with [`IsmipError::MissingFile`] unless `path` exists.
pub fn require_file(path: &std::path::Path) -> IsmipResult<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(IsmipError::MissingFile(path.to_path_buf()))
    }
}
