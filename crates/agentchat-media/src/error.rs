use thiserror::Error;

/// Failure of a single network fetch.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// Connection, TLS, timeout or body read failure.
    #[error("Transport error: {0}")]
    Transport(String),

    /// The request was abandoned before completing. Not a real failure.
    /// Fetchers tied to an external cancellation signal return this instead
    /// of a transport error.
    #[error("Request cancelled")]
    Cancelled,
}

/// Errors produced inside the asset cache. Public operations turn these
/// into `None` after logging.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("Network error: {0}")]
    Network(#[from] FetchError),

    #[error("Decode error: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Filesystem error: {0}")]
    Filesystem(#[from] std::io::Error),

    #[error("Encode error: {0}")]
    Encode(String),

    #[error("Invalid file name: {0}")]
    InvalidName(String),

    #[error("Thumbnail error: {0}")]
    Thumbnail(String),

    #[error("Could not determine cache directory")]
    NoCacheDir,

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl CacheError {
    /// Whether this error only means the request was abandoned, either by
    /// the fetcher or by the runtime dropping the fetch task.
    pub fn is_cancelled(&self) -> bool {
        match self {
            CacheError::Network(FetchError::Cancelled) => true,
            CacheError::Task(e) => e.is_cancelled(),
            _ => false,
        }
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_cancelled_fetch_is_cancellation() {
        assert!(CacheError::Network(FetchError::Cancelled).is_cancelled());
        assert!(!CacheError::Network(FetchError::Status(500)).is_cancelled());
        assert!(!CacheError::Network(FetchError::Transport("reset".into())).is_cancelled());
        assert!(!CacheError::Encode("bad".into()).is_cancelled());
    }

    #[tokio::test]
    async fn test_aborted_task_is_cancellation() {
        let task = tokio::spawn(std::future::pending::<()>());
        task.abort();
        let err = CacheError::from(task.await.unwrap_err());
        assert!(err.is_cancelled());
    }
}
