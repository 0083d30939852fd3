use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, SproutError>;

#[derive(Error, Debug)]
pub enum SproutError {
    // Template acquisition (clone, copy, timeout)
    #[error("Template source unavailable: {0}")]
    SourceUnavailable(String),

    // Local filesystem errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error at {}: {source}", .path.display())]
    PathIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Encoding error: {0}")]
    Encoding(String),

    // Input validation
    #[error("Invalid application name: {0}")]
    InvalidName(String),

    #[error("Destination already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    #[error("Dependency resolution failed: {0}")]
    DependencyResolution(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl SproutError {
    /// Attach the offending path to an IO error
    pub fn io_at(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SproutError::PathIo {
            path: path.into(),
            source,
        }
    }

    /// True for the local filesystem class of errors (`Io` and `PathIo`)
    pub fn is_io(&self) -> bool {
        matches!(self, SproutError::Io(_) | SproutError::PathIo { .. })
    }
}

impl From<config::ConfigError> for SproutError {
    fn from(err: config::ConfigError) -> Self {
        SproutError::Configuration(err.to_string())
    }
}
