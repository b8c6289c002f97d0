use thiserror::Error;

/// Failure of one categories fetch. The alert shows the `Display` form.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("unexpected HTTP status {0}")]
    Status(u16),
    #[error("invalid JSON body: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    #[error("'{0}' is not an id selector")]
    InvalidSelector(String),
    #[error("view is already mounted on {0}")]
    AlreadyMounted(String),
    #[error("view is not mounted")]
    NotMounted,
    #[error("unknown method '{0}'")]
    UnknownMethod(String),
}
