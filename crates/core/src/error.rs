use thiserror::Error;

/// Result type alias for rill-core
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for the rill chat client
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error for file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Prompt rejected before a session was started
    #[error("validation error: {0}")]
    Validation(String),

    /// Request or mid-stream network failure
    #[error("transport error: {0}")]
    Transport(String),

    /// Endpoint answered with a non-success status
    #[error("endpoint returned status {0}")]
    Status(u16),

    /// A generation session is already in flight
    #[error("a generation is already in progress")]
    Busy,

    /// Configuration errors
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error terminates a stream session as `Failed`.
    ///
    /// Validation and busy errors are rejected at the boundary and never
    /// reach an open session.
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Status(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let validation: Error = Error::Validation("empty prompt".to_string());
        assert_eq!(validation.to_string(), "validation error: empty prompt");

        let transport: Error = Error::Transport("connection refused".to_string());
        assert_eq!(transport.to_string(), "transport error: connection refused");

        let status: Error = Error::Status(500);
        assert_eq!(status.to_string(), "endpoint returned status 500");

        let busy: Error = Error::Busy;
        assert_eq!(busy.to_string(), "a generation is already in progress");

        let config: Error = Error::Config("bad preferences".to_string());
        assert_eq!(config.to_string(), "configuration error: bad preferences");
    }

    #[test]
    fn test_error_from_io_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: Error = io_err.into();
        assert_eq!(error.to_string(), "I/O error: file not found");
    }

    #[test]
    fn test_session_fatal_classification() {
        assert!(Error::Transport("reset".to_string()).is_session_fatal());
        assert!(Error::Status(503).is_session_fatal());
        assert!(!Error::Validation("too long".to_string()).is_session_fatal());
        assert!(!Error::Busy.is_session_fatal());
    }

    #[test]
    fn test_result_type_alias() {
        let ok: Result<i32> = Ok(42);
        assert!(ok.is_ok());

        let err: Result<i32> = Err(Error::Busy);
        assert!(err.is_err());
    }
}
