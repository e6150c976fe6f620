use strum::{AsRefStr, Display, EnumIter, IntoStaticStr};

/// Broad category of a [`LoadError`], used in log lines and by callers that
/// only care about the failure class.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    InvalidKey,
    Network,
    HttpStatus,
    Decode,
    Interrupted,
}

/// Errors surfaced by [`DataLoader`](crate::DataLoader).
///
/// Every caller joined onto the same in-flight fetch receives a clone of the
/// same error, so this type carries owned strings rather than source errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LoadError {
    #[error("Resource key must not be empty")]
    InvalidKey,
    #[error("Failed to fetch {url}: {message}")]
    Network { url: String, message: String },
    #[error("Fetching {url} returned HTTP status {status}")]
    HttpStatus { url: String, status: u16 },
    #[error("Failed to decode {url}: {message}")]
    Decode { url: String, message: String },
    #[error("Fetch for {url} was interrupted before completing")]
    Interrupted { url: String },
}

impl LoadError {
    pub fn network(url: impl Into<String>, message: impl ToString) -> Self {
        LoadError::Network {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn decode(url: impl Into<String>, message: impl ToString) -> Self {
        LoadError::Decode {
            url: url.into(),
            message: message.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            LoadError::InvalidKey => ErrorKind::InvalidKey,
            LoadError::Network { .. } => ErrorKind::Network,
            LoadError::HttpStatus { .. } => ErrorKind::HttpStatus,
            LoadError::Decode { .. } => ErrorKind::Decode,
            LoadError::Interrupted { .. } => ErrorKind::Interrupted,
        }
    }

    /// The status code carried by an [`LoadError::HttpStatus`] error.
    pub fn status(&self) -> Option<u16> {
        match self {
            LoadError::HttpStatus { status, .. } => Some(*status),
            _ => None,
        }
    }
}
