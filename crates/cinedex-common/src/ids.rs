//! Typed ID wrappers for store-assigned keys.
//!
//! The backing store hands out opaque string keys, so these newtypes wrap a
//! `String` rather than a UUID. They still keep a movie key from being
//! passed where a user key is expected.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Generate a newtype ID wrapper over `String`.
///
/// The macro produces a struct with:
/// - `new()` taking anything convertible into a `String`
/// - `as_str()` and `is_empty()`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `Default`, `Serialize`, `Deserialize`
/// - `Display`, `From<String>`, `From<&str>` and `AsRef<str>`
macro_rules! string_id {
    ($($(#[doc = $doc:expr])* $name:ident),+ $(,)?) => {
        $(
            $(#[doc = $doc])*
            #[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
            #[serde(transparent)]
            pub struct $name(String);

            impl $name {
                /// Wrap an existing key.
                #[must_use]
                pub fn new(key: impl Into<String>) -> Self {
                    Self(key.into())
                }

                /// Borrow the key as a string slice.
                #[must_use]
                pub fn as_str(&self) -> &str {
                    &self.0
                }

                /// An empty key means "not yet persisted".
                #[must_use]
                pub fn is_empty(&self) -> bool {
                    self.0.trim().is_empty()
                }
            }

            impl fmt::Display for $name {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(&self.0)
                }
            }

            impl From<String> for $name {
                fn from(key: String) -> Self {
                    Self(key)
                }
            }

            impl From<&str> for $name {
                fn from(key: &str) -> Self {
                    Self(key.to_string())
                }
            }

            impl AsRef<str> for $name {
                fn as_ref(&self) -> &str {
                    &self.0
                }
            }
        )+
    };
}

string_id! {
    /// Store-assigned identifier of a movie record.
    MovieId,
    /// Identity-service user id (the `localId` of an account).
    UserId,
}
