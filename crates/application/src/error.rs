use domain::ConnectionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("connection closed: {0}")]
    ConnectionClosed(ConnectionId),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
