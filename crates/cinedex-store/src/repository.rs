//! Movie CRUD over the `movies` collection.
//!
//! Records are stored flat under the collection path, keyed by the
//! identifier the store generates on creation. Every operation is a single
//! async request with a typed result; nothing here retries, caches, or
//! orders concurrent writes.

use std::sync::Arc;

use cinedex_common::{Error, MovieId, Result};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::models::{sample_movies, Movie, MoviePatch};
use crate::tree::{Snapshot, Subscription, TreeStore};
use crate::tree_path;

/// Collection path the catalog lives under.
pub const MOVIES_COLLECTION: &str = "movies";

/// Entity name used in not-found errors.
const ENTITY: &str = "Movie";

/// Messages shown to users after a successful operation.
pub mod messages {
    pub const ADDED: &str = "Movie added successfully";
    pub const UPDATED: &str = "Movie updated successfully";
    pub const DELETED: &str = "Movie deleted successfully";
    pub const FETCHED: &str = "Movies fetched";
}

/// Repository over a [`TreeStore`].
#[derive(Clone)]
pub struct MovieRepository {
    store: Arc<dyn TreeStore>,
    collection: String,
}

impl MovieRepository {
    pub fn new(store: Arc<dyn TreeStore>) -> Self {
        Self::with_collection(store, MOVIES_COLLECTION)
    }

    pub fn with_collection(store: Arc<dyn TreeStore>, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// The underlying store, for writes outside the movie collection.
    pub fn store(&self) -> Arc<dyn TreeStore> {
        self.store.clone()
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    fn record_path(&self, id: &MovieId) -> String {
        format!("{}/{}", self.collection, id)
    }

    /// An id must address exactly one record directly under the collection.
    fn require_id(id: &MovieId) -> Result<()> {
        if id.is_empty() {
            return Err(Error::validation("movie id is empty"));
        }
        let segs = tree_path::segments(id.as_str())?;
        if segs.len() != 1 || segs[0] != id.as_str() {
            return Err(Error::validation(format!("invalid movie id: {:?}", id.as_str())));
        }
        Ok(())
    }

    /// Persist a new movie.
    ///
    /// A fresh key is generated and written into `movie` before the
    /// request goes out, so on failure the record carries an identifier
    /// that was never stored. Check the result, not the field.
    pub async fn add(&self, movie: &mut Movie) -> Result<MovieId> {
        let id = MovieId::from(self.store.generate_key());
        movie.id = id.clone();
        debug!(movie_id = %id, name = %movie.name, "Adding movie");

        let value = serde_json::to_value(&*movie)?;
        match self.store.write(&self.record_path(&id), value).await {
            Ok(()) => {
                info!(movie_id = %id, "Movie added");
                Ok(id)
            }
            Err(e) => {
                error!(movie_id = %id, error = %e, "Failed to add movie");
                Err(e)
            }
        }
    }

    /// Merge `patch` into the stored record.
    ///
    /// The record must already exist. Field values are merged by the
    /// store; nothing is read back or rewritten locally.
    pub async fn update(&self, id: &MovieId, patch: MoviePatch) -> Result<()> {
        Self::require_id(id)?;
        if patch.is_empty() {
            return Err(Error::validation("update contains no fields"));
        }

        let path = self.record_path(id);
        if self.store.read_once(&path).await?.is_none() {
            return Err(Error::not_found(ENTITY, id));
        }

        debug!(movie_id = %id, fields = patch.len(), "Updating movie");
        self.store
            .patch(&path, patch.into_fields())
            .await
            .inspect_err(|e| error!(movie_id = %id, error = %e, "Failed to update movie"))
    }

    /// Remove the record. Removing an absent record succeeds.
    pub async fn delete(&self, id: &MovieId) -> Result<()> {
        Self::require_id(id)?;
        debug!(movie_id = %id, "Deleting movie");
        self.store
            .remove(&self.record_path(id))
            .await
            .inspect_err(|e| error!(movie_id = %id, error = %e, "Failed to delete movie"))
    }

    /// Standing subscription to the whole collection.
    ///
    /// The first delivery is the current list; every later change anywhere
    /// in the collection re-delivers the full list. Release the handle to
    /// stop listening.
    pub async fn get_all(&self) -> Result<MovieSubscription> {
        let inner = self.store.subscribe(&self.collection).await?;
        Ok(MovieSubscription { inner })
    }

    /// One-shot read of a single record.
    pub async fn get_by_id(&self, id: &MovieId) -> Result<Movie> {
        Self::require_id(id)?;
        match self.store.read_once(&self.record_path(id)).await? {
            Some(value) => Movie::from_record(id.as_str(), value),
            None => Err(Error::not_found(ENTITY, id)),
        }
    }

    /// One-shot read of the whole collection.
    pub async fn list_once(&self) -> Result<Vec<Movie>> {
        let snapshot = self.store.read_once(&self.collection).await?;
        movies_from_snapshot(snapshot)
    }

    /// One-shot read of every movie whose name matches exactly.
    pub async fn find_by_name(&self, name: &str) -> Result<Vec<Movie>> {
        let movies = self.list_once().await?;
        Ok(movies.into_iter().filter(|m| m.name == name).collect())
    }

    /// Add the built-in sample catalog. Returns how many were stored.
    ///
    /// Each sample is added independently; a failure is logged and the
    /// rest are still attempted.
    pub async fn seed_samples(&self) -> Result<usize> {
        let mut added = 0;
        let mut last_error = None;
        for mut movie in sample_movies() {
            match self.add(&mut movie).await {
                Ok(_) => added += 1,
                Err(e) => {
                    warn!(name = %movie.name, error = %e, "Sample movie not added");
                    last_error = Some(e);
                }
            }
        }
        match (added, last_error) {
            (0, Some(e)) => Err(e),
            _ => Ok(added),
        }
    }
}

/// Decode a collection snapshot into movies ordered by key.
///
/// Entries that are not records are skipped with a warning rather than
/// failing the whole list.
pub fn movies_from_snapshot(snapshot: Snapshot) -> Result<Vec<Movie>> {
    let Some(value) = snapshot else {
        return Ok(Vec::new());
    };
    let Value::Object(entries) = value else {
        return Err(Error::internal("movie collection is not an object"));
    };

    let mut movies = Vec::with_capacity(entries.len());
    for (key, entry) in entries {
        if !entry.is_object() {
            warn!(key = %key, "Skipping non-record entry in movie collection");
            continue;
        }
        match Movie::from_record(&key, entry) {
            Ok(movie) => movies.push(movie),
            Err(e) => warn!(key = %key, error = %e, "Skipping undecodable movie record"),
        }
    }
    movies.sort_by(|a, b| a.id.as_str().cmp(b.id.as_str()));
    Ok(movies)
}

/// Live view of the movie collection.
///
/// Dropping the handle, or calling [`cancel`](Self::cancel), releases the
/// underlying listener.
#[derive(Debug)]
pub struct MovieSubscription {
    inner: Subscription,
}

impl MovieSubscription {
    /// Wait for the next full list. `None` once the listener has stopped.
    pub async fn next(&mut self) -> Option<Result<Vec<Movie>>> {
        let item = self.inner.next().await?;
        Some(item.and_then(movies_from_snapshot))
    }

    pub fn cancel(&self) {
        self.inner.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.is_cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fields;
    use serde_json::json;

    #[test]
    fn empty_snapshot_is_empty_list() {
        assert!(movies_from_snapshot(None).unwrap().is_empty());
    }

    #[test]
    fn snapshot_entries_are_sorted_and_keyed() {
        let snapshot = json!({
            "-Nb": { "MovieName": "Second" },
            "-Na": { "MovieId": "-Na", "MovieName": "First", "Rating": 7 },
            "junk": 5
        });
        let movies = movies_from_snapshot(Some(snapshot)).unwrap();
        assert_eq!(movies.len(), 2);
        assert_eq!(movies[0].name, "First");
        assert_eq!(movies[1].id.as_str(), "-Nb");
    }

    #[test]
    fn non_object_collection_is_error() {
        assert!(movies_from_snapshot(Some(json!([1, 2]))).is_err());
    }

    #[test]
    fn name_field_constant_matches_wire_name() {
        let value = serde_json::to_value(Movie::default()).unwrap();
        assert!(value.get(fields::NAME).is_some());
    }
}
