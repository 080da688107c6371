//! End-to-end catalog flows over the in-memory store.

mod common;

use std::time::Duration;

use cinedex::auth::{self, AuthProvider};
use cinedex::catalog::{DetailState, ListState, MovieDetailModel, MovieListModel};
use cinedex_common::Outcome;
use cinedex_store::models::{Movie, MoviePatch};
use cinedex_store::repository::messages;
use cinedex_store::TreeStore;
use common::{poster_file, TestHarness};

async fn next_state(model: &mut MovieListModel) -> ListState {
    tokio::time::timeout(Duration::from_secs(2), model.changed())
        .await
        .expect("timed out")
        .expect("model ended")
}

#[tokio::test]
async fn register_upload_add_and_browse() {
    let h = TestHarness::new().await;

    let session = auth::register(
        h.auth.as_ref(),
        h.store.as_ref(),
        "ana@example.com",
        "secret1",
        "secret1",
    )
    .await
    .unwrap();
    assert_eq!(h.auth.current_session(), Some(session.clone()));
    assert!(h
        .store
        .read_once(&format!("users/{}", session.user_id))
        .await
        .unwrap()
        .is_some());

    let mut list = MovieListModel::spawn(h.repo.clone());
    assert_eq!(next_state(&mut list).await, ListState::Loaded(vec![]));

    let (_dir, poster) = poster_file("poster.jpg");
    let image_url = h.images.upload(&poster).await.unwrap();
    assert!(image_url.starts_with("https://"));

    let mut movie = Movie {
        name: "Alpha".into(),
        rating: 7.5,
        image_url: image_url.clone(),
        genres: vec!["Sci-Fi".into()],
        ..Default::default()
    };
    let res = h.repo.add(&mut movie).await;
    let outcome = Outcome::from_result(&res, messages::ADDED);
    assert!(outcome.success);
    assert_eq!(outcome.message, "Movie added successfully");

    let state = next_state(&mut list).await;
    assert_eq!(state.movies().len(), 1);
    assert_eq!(state.movies()[0].image_url, image_url);

    let res = h.repo.update(&movie.id, MoviePatch::new().rating(8.0)).await;
    assert_eq!(
        Outcome::from_result(&res, messages::UPDATED).message,
        "Movie updated successfully"
    );
    let state = next_state(&mut list).await;
    assert_eq!(state.movies()[0].rating, 8.0);
    assert_eq!(state.movies()[0].name, "Alpha");

    let detail = MovieDetailModel::load(&h.repo, &movie.id).await;
    assert!(matches!(detail.state(), DetailState::Loaded(m) if m.rating == 8.0));

    let res = h.repo.delete(&movie.id).await;
    assert_eq!(
        Outcome::from_result(&res, messages::DELETED).message,
        "Movie deleted successfully"
    );
    assert_eq!(next_state(&mut list).await, ListState::Loaded(vec![]));

    let detail = MovieDetailModel::load(&h.repo, &movie.id).await;
    assert_eq!(
        detail.into_state(),
        DetailState::NotFound("Movie not found".into())
    );
}

#[tokio::test]
async fn seeded_catalog_is_listed_and_searchable() {
    let h = TestHarness::new().await;
    let added = h.repo.seed_samples().await.unwrap();

    let mut list = MovieListModel::spawn(h.repo.clone());
    let state = next_state(&mut list).await;
    assert_eq!(state.movies().len(), added);

    let first = state.movies()[0].clone();
    let found = h.repo.find_by_name(&first.name).await.unwrap();
    assert!(found.iter().any(|m| m.id == first.id));
}

#[tokio::test]
async fn offline_store_shows_failure() {
    let h = TestHarness::new().await;
    h.store.set_offline(true);

    let mut list = MovieListModel::spawn(h.repo.clone());
    assert!(matches!(next_state(&mut list).await, ListState::Failed(_)));

    let mut movie = Movie {
        name: "Offline".into(),
        ..Default::default()
    };
    let res = h.repo.add(&mut movie).await;
    let outcome = Outcome::from_result(&res, messages::ADDED);
    assert!(!outcome.success);
    assert!(movie.is_persisted());
}
