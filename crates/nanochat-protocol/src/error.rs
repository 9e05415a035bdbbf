//! Protocol-level error types.

use thiserror::Error;

/// Errors that can occur while reading or validating protocol frames.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// A line exceeded the configured maximum length before its terminator.
    #[error("line too long (max: {max} bytes)")]
    LineTooLong {
        /// Maximum accepted line length in bytes
        max: usize,
    },

    /// The peer closed the stream in the middle of a line.
    #[error("connection closed mid-line ({partial} bytes pending)")]
    UnterminatedLine {
        /// Number of bytes received without a terminator
        partial: usize,
    },

    /// A line was not valid UTF-8.
    #[error("line is not valid UTF-8")]
    InvalidUtf8,

    /// A username cannot be sent as a single login line.
    #[error("invalid username: {0}")]
    InvalidUsername(String),

    /// I/O error passthrough.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::LineTooLong { max: 1024 };
        assert_eq!(err.to_string(), "line too long (max: 1024 bytes)");

        let err = ProtocolError::UnterminatedLine { partial: 3 };
        assert_eq!(err.to_string(), "connection closed mid-line (3 bytes pending)");

        let err = ProtocolError::InvalidUsername("must not contain a line break".to_string());
        assert_eq!(err.to_string(), "invalid username: must not contain a line break");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: ProtocolError = io_err.into();
        assert!(matches!(err, ProtocolError::Io(_)));
        assert!(err.to_string().contains("pipe closed"));
    }
}
