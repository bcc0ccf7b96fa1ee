//! Error taxonomy for the backend protocol layer.
//!
//! Three families matter to callers:
//! - caller-contract violations (`Contract`, `NonAsciiMarker`,
//!   `UnnamedArgument`): detected before any bytes reach the backend;
//! - backend-reported failures (`Backend`): the `!!! ` responses, expected
//!   and recoverable;
//! - transport failures (everything `is_fatal`): the stream is in an
//!   unknown state afterwards, so the session poisons itself.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    /// Backend answered with an `!!! `-prefixed error payload.
    #[error("backend error: {0}")]
    Backend(String),

    /// A command argument resolved to an empty name.
    #[error("attempted to pass an unnamed object to the core")]
    UnnamedArgument,

    /// Request writer used out of order (header missing, doubled, etc.).
    #[error("request writer misuse: {0}")]
    Contract(&'static str),

    /// A structural marker must be a single ASCII character.
    #[error("non-ASCII marker character: {0:?}")]
    NonAsciiMarker(char),

    #[error("I/O failure talking to the backend: {0}")]
    Io(#[from] std::io::Error),

    /// Response ended without the `' '` byte in front of the 0x08 sentinel.
    #[error("malformed response terminator")]
    MalformedResponse,

    #[error("backend response was not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),

    #[error("timed out waiting for the backend")]
    Timeout,

    /// Session already hit a transport failure; the stream cannot be
    /// resynchronized after startup, so every later command fails here.
    #[error("session is unusable after a transport failure")]
    Poisoned,

    #[error("handshake with the backend failed: {0}")]
    Handshake(String),
}

impl CoreError {
    /// Fatal errors poison the session; the rest are returned to the
    /// caller and the session keeps going.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            CoreError::Io(_)
                | CoreError::MalformedResponse
                | CoreError::InvalidUtf8(_)
                | CoreError::Timeout
                | CoreError::Poisoned
                | CoreError::Handshake(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::CoreError;

    #[test]
    fn backend_errors_are_recoverable() {
        assert!(!CoreError::Backend("no such graph".into()).is_fatal());
        assert!(!CoreError::UnnamedArgument.is_fatal());
        assert!(!CoreError::Contract("header missing").is_fatal());
    }

    #[test]
    fn transport_errors_are_fatal() {
        assert!(CoreError::Timeout.is_fatal());
        assert!(CoreError::MalformedResponse.is_fatal());
        assert!(CoreError::Io(std::io::Error::new(
            std::io::ErrorKind::UnexpectedEof,
            "closed"
        ))
        .is_fatal());
    }
}
