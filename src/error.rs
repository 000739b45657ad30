use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HubError {
    /// Bad, duplicate or reserved name / port. Nothing was mutated.
    #[error("{0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error at '{path}': {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    StdIoError(#[from] std::io::Error),

    #[error("KDL parse error: {0}")]
    KdlError(#[from] kdl::KdlError),

    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error("Package manager error: {0}")]
    PackageManagerError(String),

    #[error("System command '{command}' failed: {reason}")]
    SystemCommandFailed { command: String, reason: String },

    /// The subprocess finished but the artifact it should have produced is missing or corrupt
    #[error("Verification failed: {0}")]
    Verification(String),

    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    #[error("Archive error: {0}")]
    Archive(String),

    #[error("Config decryption failed: {0}")]
    Crypto(String),

    /// Path resolution or validation error
    #[error("Path error: {0}")]
    PathError(String),

    #[error("Operation interrupted by user")]
    Interrupted,

    #[error("{0}")]
    Other(String),
}

impl HubError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        HubError::IoError {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, HubError>;
