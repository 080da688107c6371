//! The `(success, message)` pair surfaced to users.

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Terminal, already-classified result of an operation, ready for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub success: bool,
    pub message: String,
}

impl Outcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// Collapse a result into an outcome, using `success_message` when it
    /// succeeded and the error's display text otherwise.
    pub fn from_result<T>(result: &Result<T>, success_message: &str) -> Self {
        match result {
            Ok(_) => Self::ok(success_message),
            Err(e) => Self::failed(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn success_uses_given_message() {
        let res: Result<()> = Ok(());
        assert_eq!(
            Outcome::from_result(&res, "Movie deleted successfully"),
            Outcome::ok("Movie deleted successfully")
        );
    }

    #[test]
    fn failure_uses_error_text() {
        let res: Result<()> = Err(Error::validation("movie id is empty"));
        let outcome = Outcome::from_result(&res, "unused");
        assert!(!outcome.success);
        assert_eq!(outcome.message, "Validation error: movie id is empty");
    }
}
