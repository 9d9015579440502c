use std::path::PathBuf;
use thiserror::Error;
use uuid::Uuid;

/// Main error type for reelsmith
#[derive(Error, Debug)]
pub enum ReelsmithError {
    #[error("Invalid content signal: {message}")]
    InvalidSignal { message: String },

    #[error("Rating {rating} outside configured scale {min}..={max}")]
    RatingOutOfRange { rating: u8, min: u8, max: u8 },

    #[error("Reward {reward} outside clamp range [{min}, {max}]")]
    RewardOutOfRange { reward: f64, min: f64, max: f64 },

    #[error("Action space is empty")]
    EmptyActionSpace,

    #[error("Malformed artifact: {message}")]
    MalformedArtifact { message: String },

    #[error("Content not found: {content_id}")]
    ContentNotFound { content_id: Uuid },

    #[error("Content already registered: {content_id}")]
    AlreadyRegistered { content_id: Uuid },

    #[error("No artifact for content {content_id} (version {version:?})")]
    ArtifactNotFound {
        content_id: Uuid,
        version: Option<u64>,
    },

    #[error("Enhancement failed: {message}")]
    Enhancement { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("IO error: {source}")]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },
}

impl ReelsmithError {
    /// Create a new invalid signal error
    pub fn invalid_signal(message: impl Into<String>) -> Self {
        Self::InvalidSignal {
            message: message.into(),
        }
    }

    /// Create a new malformed artifact error
    pub fn malformed_artifact(message: impl Into<String>) -> Self {
        Self::MalformedArtifact {
            message: message.into(),
        }
    }

    /// Create a new enhancement error
    pub fn enhancement(message: impl Into<String>) -> Self {
        Self::Enhancement {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a new persistence error
    pub fn persistence(message: impl Into<String>) -> Self {
        Self::Persistence {
            message: message.into(),
        }
    }

    /// Create a new parse error
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    /// Create a new IO error with path context
    pub fn io_error(err: std::io::Error, path: Option<impl Into<PathBuf>>) -> Self {
        Self::Io {
            source: err,
            path: path.map(|p| p.into()),
        }
    }
}

impl From<std::io::Error> for ReelsmithError {
    fn from(error: std::io::Error) -> Self {
        ReelsmithError::io_error(error, None::<PathBuf>)
    }
}

impl From<serde_json::Error> for ReelsmithError {
    fn from(error: serde_json::Error) -> Self {
        ReelsmithError::parse_error(error.to_string())
    }
}

impl From<toml::de::Error> for ReelsmithError {
    fn from(error: toml::de::Error) -> Self {
        ReelsmithError::parse_error(error.to_string())
    }
}

impl From<toml::ser::Error> for ReelsmithError {
    fn from(error: toml::ser::Error) -> Self {
        ReelsmithError::parse_error(error.to_string())
    }
}

impl From<rusqlite::Error> for ReelsmithError {
    fn from(error: rusqlite::Error) -> Self {
        ReelsmithError::persistence(error.to_string())
    }
}

impl From<reqwest::Error> for ReelsmithError {
    fn from(error: reqwest::Error) -> Self {
        ReelsmithError::enhancement(error.to_string())
    }
}

/// Result type alias using ReelsmithError
pub type ReelsmithResult<T> = Result<T, ReelsmithError>;
