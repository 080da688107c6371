//! View state for the movie list and detail screens.
//!
//! [`MovieListModel`] keeps the latest list from a standing subscription in
//! a `watch` channel, so a screen can render whatever is current and wait
//! for the next change. [`MovieDetailModel`] is a one-shot load.

use cinedex_common::{Error, MovieId};
use cinedex_store::models::Movie;
use cinedex_store::repository::MovieRepository;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// What the list screen shows.
#[derive(Debug, Clone, PartialEq)]
pub enum ListState {
    Loading,
    Loaded(Vec<Movie>),
    Failed(String),
}

impl ListState {
    pub fn movies(&self) -> &[Movie] {
        match self {
            Self::Loaded(movies) => movies,
            _ => &[],
        }
    }
}

/// Live movie list. Dropping the model releases the subscription.
pub struct MovieListModel {
    state: watch::Receiver<ListState>,
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl MovieListModel {
    /// Subscribe to the collection on a background task.
    pub fn spawn(repo: MovieRepository) -> Self {
        let (tx, rx) = watch::channel(ListState::Loading);
        let token = CancellationToken::new();
        let task_token = token.clone();

        let task = tokio::spawn(async move {
            let mut sub = match repo.get_all().await {
                Ok(sub) => sub,
                Err(e) => {
                    warn!(error = %e, "Could not subscribe to movies");
                    let _ = tx.send(ListState::Failed(e.to_string()));
                    return;
                }
            };

            loop {
                let next = tokio::select! {
                    _ = task_token.cancelled() => break,
                    next = sub.next() => next,
                };
                match next {
                    Some(Ok(movies)) => {
                        debug!(count = movies.len(), "Movie list updated");
                        if tx.send(ListState::Loaded(movies)).is_err() {
                            break;
                        }
                    }
                    Some(Err(e)) => {
                        warn!(error = %e, "Movie subscription failed");
                        let _ = tx.send(ListState::Failed(e.to_string()));
                    }
                    None => break,
                }
            }
            sub.cancel();
        });

        Self {
            state: rx,
            token,
            task,
        }
    }

    /// Snapshot of the current state.
    pub fn current(&self) -> ListState {
        self.state.borrow().clone()
    }

    /// A receiver for rendering loops that want every change.
    pub fn watch(&self) -> watch::Receiver<ListState> {
        self.state.clone()
    }

    /// Wait for the next state change. `None` once the subscription has ended.
    pub async fn changed(&mut self) -> Option<ListState> {
        self.state.changed().await.ok()?;
        Some(self.state.borrow_and_update().clone())
    }

    /// Whether the background subscription is still running.
    pub fn is_active(&self) -> bool {
        !self.task.is_finished()
    }
}

impl Drop for MovieListModel {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// What the detail screen shows.
#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Loaded(Movie),
    NotFound(String),
    Failed(String),
}

pub struct MovieDetailModel {
    id: MovieId,
    state: DetailState,
}

impl MovieDetailModel {
    pub async fn load(repo: &MovieRepository, id: &MovieId) -> Self {
        let state = match repo.get_by_id(id).await {
            Ok(movie) => DetailState::Loaded(movie),
            Err(e @ Error::NotFound { .. }) => DetailState::NotFound(e.to_string()),
            Err(e) => DetailState::Failed(e.to_string()),
        };
        Self {
            id: id.clone(),
            state,
        }
    }

    pub fn id(&self) -> &MovieId {
        &self.id
    }

    pub fn state(&self) -> &DetailState {
        &self.state
    }

    pub fn into_state(self) -> DetailState {
        self.state
    }
}
