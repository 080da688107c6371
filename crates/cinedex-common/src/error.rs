//! Unified error type for cinedex.
//!
//! Every failure crossing a crate boundary is classified into one of the
//! variants below, so the presentation layer only ever has to render a
//! message. Network and backend failures carry the text the remote service
//! returned.

use std::fmt;

/// Common error type for cinedex.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The requested record does not exist.
    #[error("{entity} not found")]
    NotFound {
        /// The kind of record (e.g. "Movie").
        entity: String,
        /// The identifier that was looked up.
        id: String,
    },

    /// Credentials were rejected or no session is available.
    #[error("{0}")]
    Unauthorized(String),

    /// Input failed a local check before any request was issued.
    #[error("Validation error: {0}")]
    Validation(String),

    /// The request never produced a usable response.
    #[error("Network error: {0}")]
    Network(String),

    /// The backend answered with a non-success status.
    #[error("Backend error ({status}): {message}")]
    Backend {
        /// HTTP status code returned by the backend.
        status: u16,
        /// Message extracted from the response body.
        message: String,
    },

    /// A payload could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A local I/O operation failed.
    #[error("IO error: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Catch-all for unexpected internal errors.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a new NotFound error.
    pub fn not_found(entity: impl Into<String>, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Create a new Validation error.
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new Network error.
    pub fn network<S: Into<String>>(msg: S) -> Self {
        Self::Network(msg.into())
    }

    /// Create a new Backend error.
    pub fn backend(status: u16, message: impl Into<String>) -> Self {
        Self::Backend {
            status,
            message: message.into(),
        }
    }

    /// Create a new Internal error.
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// True for failures caught locally before a request was sent.
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// True for transport and backend failures.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Network(_) | Self::Backend { .. })
    }
}

/// Result type alias using the common Error type.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_display_omits_id() {
        let err = Error::not_found("Movie", "m1");
        assert_eq!(err.to_string(), "Movie not found");
        match err {
            Error::NotFound { entity, id } => {
                assert_eq!(entity, "Movie");
                assert_eq!(id, "m1");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unauthorized_shows_message_verbatim() {
        let err = Error::Unauthorized("Invalid email or password".into());
        assert_eq!(err.to_string(), "Invalid email or password");
    }

    #[test]
    fn backend_display() {
        let err = Error::backend(401, "Permission denied");
        assert_eq!(err.to_string(), "Backend error (401): Permission denied");
        assert!(err.is_remote());
        assert!(!err.is_validation());
    }

    #[test]
    fn validation_display() {
        let err = Error::validation("movie id is empty");
        assert_eq!(err.to_string(), "Validation error: movie id is empty");
        assert!(err.is_validation());
    }

    #[test]
    fn io_from_std() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file missing");
        let err = Error::from(io_err);
        assert!(matches!(err, Error::Io { .. }));
        assert!(err.to_string().contains("file missing"));
    }

    #[test]
    fn serialization_from_serde() {
        let json_err = serde_json::from_str::<i32>("not json").unwrap_err();
        let err = Error::from(json_err);
        assert!(matches!(err, Error::Serialization(_)));
    }
}
