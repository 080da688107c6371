//! Repository behaviour against the in-memory store.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use cinedex_common::{Error, MovieId, Outcome};
use cinedex_store::memory::MemoryStore;
use cinedex_store::models::{Movie, MoviePatch};
use cinedex_store::repository::{messages, MovieRepository, MovieSubscription};
use serde_json::{json, Map};

fn setup() -> (Arc<MemoryStore>, MovieRepository) {
    let store = Arc::new(MemoryStore::new());
    let repo = MovieRepository::new(store.clone());
    (store, repo)
}

fn movie(name: &str, rating: f64) -> Movie {
    Movie {
        name: name.to_string(),
        description: format!("{name} description"),
        rating,
        release_year: "2022".into(),
        genres: vec!["Drama".into()],
        ..Default::default()
    }
}

async fn next_list(sub: &mut MovieSubscription) -> Vec<Movie> {
    tokio::time::timeout(Duration::from_secs(1), sub.next())
        .await
        .expect("timed out waiting for delivery")
        .expect("subscription ended")
        .expect("subscription errored")
}

#[tokio::test]
async fn add_assigns_id_and_round_trips() {
    let (_store, repo) = setup();
    let mut m = movie("Alpha", 7.5);

    let id = repo.add(&mut m).await.unwrap();
    assert!(!id.is_empty());
    assert_eq!(m.id, id);

    let fetched = repo.get_by_id(&id).await.unwrap();
    assert_eq!(fetched, m);
}

#[tokio::test]
async fn add_failure_still_mutates_id_but_reports_error() {
    let (store, repo) = setup();
    store.set_deny_writes(true);

    let mut m = movie("Denied", 5.0);
    let res = repo.add(&mut m).await;
    assert_matches!(res, Err(Error::Backend { status: 401, .. }));
    assert!(m.is_persisted());

    let outcome = Outcome::from_result(&res, messages::ADDED);
    assert!(!outcome.success);
    assert!(outcome.message.contains("Permission denied"));

    store.set_deny_writes(false);
    assert_matches!(repo.get_by_id(&m.id).await, Err(Error::NotFound { .. }));
}

#[tokio::test]
async fn update_changes_only_named_field() {
    let (store, repo) = setup();
    let mut m = movie("Alpha", 7.5);
    let id = repo.add(&mut m).await.unwrap();

    repo.update(&id, MoviePatch::new().name("X")).await.unwrap();

    let fetched = repo.get_by_id(&id).await.unwrap();
    assert_eq!(fetched.name, "X");
    assert_eq!(fetched.description, m.description);
    assert_eq!(fetched.rating, m.rating);
    assert_eq!(fetched.genres, m.genres);
    assert_eq!(fetched.id, id);

    let raw = store.dump();
    assert_eq!(raw["movies"][id.as_str()]["MovieName"], "X");
}

#[tokio::test]
async fn update_from_raw_field_map() {
    let (_store, repo) = setup();
    let mut m = movie("Alpha", 7.5);
    let id = repo.add(&mut m).await.unwrap();

    let mut fields = Map::new();
    fields.insert("MovieName".into(), json!("Renamed"));
    fields.insert("Rating".into(), json!(9));
    let patch = MoviePatch::from_fields(fields).unwrap();
    repo.update(&id, patch).await.unwrap();

    let fetched = repo.get_by_id(&id).await.unwrap();
    assert_eq!(fetched.name, "Renamed");
    assert_eq!(fetched.rating, 9.0);
}

#[tokio::test]
async fn update_rejects_empty_and_unknown_ids() {
    let (store, repo) = setup();

    let err = repo
        .update(&MovieId::default(), MoviePatch::new().rating(1.0))
        .await
        .unwrap_err();
    assert!(err.is_validation());

    let err = repo
        .update(&MovieId::from("ghost"), MoviePatch::new().rating(1.0))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Movie not found");
    // Nothing was created for the unknown id.
    assert_eq!(store.dump(), serde_json::Value::Null);
}

#[tokio::test]
async fn update_rejects_empty_patch() {
    let (_store, repo) = setup();
    let mut m = movie("Alpha", 7.5);
    let id = repo.add(&mut m).await.unwrap();
    assert!(repo.update(&id, MoviePatch::new()).await.unwrap_err().is_validation());
}

#[tokio::test]
async fn delete_then_get_is_not_found() {
    let (_store, repo) = setup();
    let mut m = movie("Alpha", 7.5);
    let id = repo.add(&mut m).await.unwrap();

    repo.delete(&id).await.unwrap();
    let res = repo.get_by_id(&id).await;
    let outcome = Outcome::from_result(&res, "unused");
    assert!(!outcome.success);
    assert_eq!(outcome.message, "Movie not found");
}

#[tokio::test]
async fn delete_is_idempotent_but_needs_an_id() {
    let (_store, repo) = setup();
    repo.delete(&MovieId::from("never-existed")).await.unwrap();
    assert!(repo.delete(&MovieId::from("")).await.unwrap_err().is_validation());
}

#[tokio::test]
async fn network_failure_is_classified() {
    let (store, repo) = setup();
    store.set_offline(true);
    let err = repo.get_by_id(&MovieId::from("m1")).await.unwrap_err();
    assert!(err.is_remote());
    assert_matches!(repo.get_all().await, Err(Error::Network(_)));
}

#[tokio::test]
async fn get_all_delivers_full_list_per_change() {
    let (_store, repo) = setup();
    let mut existing = movie("Existing", 6.0);
    repo.add(&mut existing).await.unwrap();

    let mut sub = repo.get_all().await.unwrap();
    let initial = next_list(&mut sub).await;
    assert_eq!(initial, vec![existing.clone()]);

    let mut added = movie("Added", 8.0);
    repo.add(&mut added).await.unwrap();
    let after_add = next_list(&mut sub).await;
    assert_eq!(after_add.len(), 2);
    assert_eq!(after_add[1], added);

    // Exactly one delivery for that add.
    let extra = tokio::time::timeout(Duration::from_millis(50), sub.next()).await;
    assert!(extra.is_err(), "unexpected extra delivery");

    repo.update(&added.id, MoviePatch::new().rating(9.0)).await.unwrap();
    let after_update = next_list(&mut sub).await;
    assert_eq!(after_update[1].rating, 9.0);

    repo.delete(&existing.id).await.unwrap();
    let after_delete = next_list(&mut sub).await;
    assert_eq!(after_delete.len(), 1);
    assert_eq!(after_delete[0].id, added.id);
}

#[tokio::test]
async fn get_all_on_empty_collection_delivers_empty_list() {
    let (_store, repo) = setup();
    let mut sub = repo.get_all().await.unwrap();
    assert!(next_list(&mut sub).await.is_empty());
}

#[tokio::test]
async fn cancelled_subscription_stops_delivering() {
    let (_store, repo) = setup();
    let mut sub = repo.get_all().await.unwrap();
    next_list(&mut sub).await;

    sub.cancel();
    assert!(sub.is_cancelled());

    let mut m = movie("After cancel", 5.0);
    repo.add(&mut m).await.unwrap();
    assert!(sub.next().await.is_none());
}

#[tokio::test]
async fn list_once_and_find_by_name() {
    let (_store, repo) = setup();
    for name in ["Alpha", "Beta", "Alpha"] {
        let mut m = movie(name, 7.0);
        repo.add(&mut m).await.unwrap();
    }

    assert_eq!(repo.list_once().await.unwrap().len(), 3);
    let alphas = repo.find_by_name("Alpha").await.unwrap();
    assert_eq!(alphas.len(), 2);
    assert!(alphas.iter().all(|m| m.name == "Alpha"));
    assert!(repo.find_by_name("Gamma").await.unwrap().is_empty());
}

#[tokio::test]
async fn seed_samples_adds_catalog() {
    let (store, repo) = setup();
    assert_eq!(repo.seed_samples().await.unwrap(), 4);
    assert_eq!(repo.list_once().await.unwrap().len(), 4);

    store.set_deny_writes(true);
    assert!(repo.seed_samples().await.is_err());
}

#[tokio::test]
async fn scenario_add_update_delete() {
    let (_store, repo) = setup();

    let mut alpha = Movie {
        name: "Alpha".into(),
        rating: 7.5,
        ..Default::default()
    };
    let id = repo.add(&mut alpha).await.unwrap();

    let fetched = repo.get_by_id(&id).await.unwrap();
    assert_eq!(fetched.id, id);
    assert_eq!(fetched.name, "Alpha");
    assert_eq!(fetched.rating, 7.5);

    repo.update(&id, MoviePatch::new().rating(8.0)).await.unwrap();
    let fetched = repo.get_by_id(&id).await.unwrap();
    assert_eq!(fetched.name, "Alpha");
    assert_eq!(fetched.rating, 8.0);

    repo.delete(&id).await.unwrap();
    let err = repo.get_by_id(&id).await.unwrap_err();
    assert_eq!(err.to_string(), "Movie not found");
}

#[tokio::test]
async fn ids_that_are_not_a_single_key_are_rejected() {
    let (store, repo) = setup();
    let mut keep = movie("Keep", 7.0);
    let id = repo.add(&mut keep).await.unwrap();
    let mut other = movie("Other", 6.0);
    repo.add(&mut other).await.unwrap();
    let before = store.dump();

    let nested = format!("{id}/description");
    for bad in ["/", "a/b", "a.b", nested.as_str(), "a/"] {
        let bad = MovieId::from(bad);
        assert!(repo.delete(&bad).await.unwrap_err().is_validation(), "delete {bad}");
        assert!(
            repo.update(&bad, MoviePatch::new().name("X"))
                .await
                .unwrap_err()
                .is_validation(),
            "update {bad}"
        );
        assert!(repo.get_by_id(&bad).await.unwrap_err().is_validation(), "get {bad}");
    }

    assert_eq!(store.dump(), before);
    assert_eq!(repo.list_once().await.unwrap().len(), 2);
    assert_eq!(repo.get_by_id(&id).await.unwrap().description, keep.description);
}

#[tokio::test]
async fn stale_embedded_id_is_replaced_by_key() {
    let store = Arc::new(MemoryStore::with_data(json!({
        "movies": { "k1": { "MovieId": "stale", "MovieName": "Alpha", "Rating": 7.0 } }
    })));
    let repo = MovieRepository::new(store.clone());

    let listed = repo.list_once().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, MovieId::from("k1"));
    assert_eq!(repo.get_by_id(&MovieId::from("k1")).await.unwrap().id, MovieId::from("k1"));

    repo.delete(&listed[0].id).await.unwrap();
    assert!(repo.list_once().await.unwrap().is_empty());
}
