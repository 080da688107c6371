//! Cinedex-Common: shared types used by every cinedex crate.
//!
//! - **Error handling**: [`Error`] and the [`Result`] alias
//! - **Typed IDs**: string-backed wrappers for store-assigned keys
//! - **Outcomes**: the `(success, message)` shape shown to users
//!
//! # Examples
//!
//! ```
//! use cinedex_common::{Error, MovieId, Outcome, Result};
//!
//! fn lookup(id: &MovieId) -> Result<()> {
//!     Err(Error::not_found("Movie", id))
//! }
//!
//! let id = MovieId::from("m1");
//! let outcome = Outcome::from_result(&lookup(&id), "Movie fetched");
//! assert!(!outcome.success);
//! assert_eq!(outcome.message, "Movie not found");
//! ```

pub mod error;
pub mod ids;
pub mod outcome;

pub use error::{Error, Result};
pub use ids::*;
pub use outcome::Outcome;
