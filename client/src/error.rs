use thiserror::Error;

/// Failure taxonomy for the room client. Background loops never let these
/// escape: transient failures are retried on the next poll tick, cancelled
/// requests are dropped, rejections and room loss are surfaced as notices.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or transport failure; the next poll tick retries implicitly.
    #[error("transport failure: {0}")]
    Transport(String),

    /// Request superseded or torn down; never shown to the user.
    #[error("request cancelled")]
    Cancelled,

    /// The server processed the request and said no (`success: false`).
    #[error("{0}")]
    Rejected(String),

    /// The room does not exist (anymore); the user is routed out.
    #[error("room not found")]
    RoomNotFound,

    /// The peer sent something outside the known wire schema.
    #[error("protocol violation: {0}")]
    Protocol(String),
}

impl ClientError {
    /// Transient errors are suppressed rather than surfaced.
    pub fn is_transient(&self) -> bool {
        matches!(self, ClientError::Transport(_) | ClientError::Cancelled)
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ClientError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        ClientError::Transport(err.to_string())
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        ClientError::Protocol(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_and_cancellation_are_transient() {
        assert!(ClientError::Transport("timed out".into()).is_transient());
        assert!(ClientError::Cancelled.is_transient());
        assert!(!ClientError::Rejected("race already started".into()).is_transient());
        assert!(!ClientError::RoomNotFound.is_transient());
        assert!(!ClientError::Protocol("bad tag".into()).is_transient());
    }
}
