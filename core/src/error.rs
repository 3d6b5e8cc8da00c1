//! Error types for the HTTP engine.
//!
//! # Design
//! Transport failures keep the underlying `io::Error` so callers can inspect
//! the kind (timeouts surface as `TimedOut`/`WouldBlock`, refused connections
//! as `ConnectionRefused`, and so on). Hook errors are carried opaquely and
//! propagate unchanged: the engine never reinterprets what a listener raised.
//!
//! Non-2xx status codes are deliberately *not* an error variant. The engine
//! returns them as ordinary responses and leaves status interpretation to the
//! caller.

use thiserror::Error;

/// Boxed error raised by a [`ConnectionListener`](crate::ConnectionListener)
/// hook. Propagated through [`Error::Hook`] without wrapping or rewording.
pub type HookError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by [`HttpEngine::execute`](crate::HttpEngine::execute)
/// and by [`ResponseBody`](crate::ResponseBody) read operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The request URL could not be parsed.
    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    /// Connection open, DNS resolution, socket I/O, or output streaming
    /// failed before a status line was obtained, or a body read failed.
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A pre- or post-connect hook aborted the exchange.
    #[error("connection hook failed: {0}")]
    Hook(#[source] HookError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transport_error_preserves_io_kind() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "read timed out");
        let err = Error::from(io);
        match err {
            Error::Transport(inner) => {
                assert_eq!(inner.kind(), std::io::ErrorKind::TimedOut);
            }
            other => panic!("expected Transport, got {other:?}"),
        }
    }

    #[test]
    fn hook_error_message_includes_cause() {
        let cause: HookError = "auth token expired".into();
        let err = Error::Hook(cause);
        assert!(err.to_string().contains("connection hook failed"));
    }
}
