//! Cinedex-Store: the movie catalog's data layer.
//!
//! Records live in a hosted, tree-structured real-time database. This crate
//! describes that store as the [`TreeStore`] trait and ships two
//! implementations plus the repository that sits on top.
//!
//! # Modules
//!
//! - `models` - The `Movie` record and `MoviePatch` merge-patch
//! - `tree` - The `TreeStore` trait and scoped `Subscription` handle
//! - `memory` - In-process store with the hosted store's semantics
//! - `realtime` - REST and server-sent-events client for the hosted store
//! - `repository` - Movie CRUD over the `movies` collection
//! - `push_id`, `sse`, `tree_path` - Helpers shared by the stores
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use cinedex_store::memory::MemoryStore;
//! use cinedex_store::models::Movie;
//! use cinedex_store::repository::MovieRepository;
//!
//! # async fn demo() -> cinedex_common::Result<()> {
//! let repo = MovieRepository::new(Arc::new(MemoryStore::new()));
//! let mut movie = Movie {
//!     name: "Alpha".into(),
//!     rating: 7.5,
//!     ..Default::default()
//! };
//! let id = repo.add(&mut movie).await?;
//! assert_eq!(repo.get_by_id(&id).await?.name, "Alpha");
//! # Ok(())
//! # }
//! ```

pub mod memory;
pub mod models;
pub mod push_id;
pub mod realtime;
pub mod repository;
pub mod sse;
pub mod tree;
pub mod tree_path;

pub use tree::{Snapshot, Subscription, TreeStore};
