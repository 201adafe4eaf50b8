use thiserror::Error;

/// Errors surfaced by a [`super::KvBackend`] implementation.
#[derive(Debug, Error)]
pub enum KvError {
    #[error("KV connection error: {0}")]
    Connection(String),

    #[error("KV command failed: {0}")]
    Command(String),

    #[error("unexpected reply shape for {0}")]
    UnexpectedReply(&'static str),
}

impl From<redis::RedisError> for KvError {
    fn from(e: redis::RedisError) -> Self {
        KvError::Command(e.to_string())
    }
}
