//! Catalog integration: the classic dataset queried, mutated, and
//! subscribed to through the execution engine.

use reelql_catalog::store::{ActorStore, InMemoryActorStore, MovieStore, StoreError, StoreResult};
use reelql_catalog::{Catalog, Movie, NewMovie};
use reelql_runtime::{Context, Operation, PathSegment, SelectionNode};
use serde_json::{json, Value};
use std::sync::Arc;

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

#[tokio::test]
async fn test_movies_listing() {
    init_tracing();
    let catalog = Arc::new(Catalog::in_memory());
    let executor = catalog.executor().unwrap();

    let operation = Operation::query([SelectionNode::field("movies").select([
        SelectionNode::field("id"),
        SelectionNode::field("title"),
        SelectionNode::field("rating"),
    ])]);

    let result = executor.execute(&operation, json!({}), &Context::new()).await;

    assert!(!result.has_errors(), "unexpected errors: {:?}", result.errors);
    assert_eq!(
        result.data,
        json!({
            "movies": [
                {"id": "321", "title": "5 Deadly Venoms", "rating": 5},
                {"id": "456", "title": "36 Chambers", "rating": 5},
            ]
        })
    );
}

#[tokio::test]
async fn test_release_date_serializes_as_epoch_millis() {
    init_tracing();
    let catalog = Arc::new(Catalog::in_memory());
    let executor = catalog.executor().unwrap();

    let operation = Operation::query([SelectionNode::field("movie")
        .argument("id", json!("321"))
        .select([
            SelectionNode::field("releaseDate"),
            SelectionNode::field("status"),
        ])]);

    let result = executor.execute(&operation, json!({}), &Context::new()).await;

    assert!(!result.has_errors());
    // 1983-10-10T00:00:00Z
    assert_eq!(result.data["movie"]["releaseDate"], json!(434_592_000_000_i64));
    assert_eq!(result.data["movie"]["status"], Value::Null);
}

#[tokio::test]
async fn test_status_enum_round_trip() {
    init_tracing();
    let catalog = Arc::new(Catalog::in_memory());
    let executor = catalog.executor().unwrap();

    let operation = Operation::query([SelectionNode::field("movie")
        .argument("id", json!("456"))
        .select([SelectionNode::field("status")])]);

    let result = executor.execute(&operation, json!({}), &Context::new()).await;
    assert!(!result.has_errors());
    assert_eq!(result.data["movie"]["status"], "INTERESTED");
}

#[tokio::test]
async fn test_missing_movie_resolves_to_null() {
    init_tracing();
    let catalog = Arc::new(Catalog::in_memory());
    let executor = catalog.executor().unwrap();

    let operation = Operation::query([SelectionNode::field("movie")
        .argument("id", json!("999"))
        .select([SelectionNode::field("title")])]);

    let result = executor.execute(&operation, json!({}), &Context::new()).await;
    assert!(!result.has_errors());
    assert_eq!(result.data, json!({"movie": null}));
}

#[tokio::test]
async fn test_add_movie_feeds_active_subscribers() {
    init_tracing();
    let catalog = Arc::new(Catalog::in_memory());
    let executor = catalog.executor().unwrap();

    let subscription = Operation::subscription([SelectionNode::field("movieAdded").select([
        SelectionNode::field("id"),
        SelectionNode::field("title"),
        SelectionNode::field("releaseDate"),
        SelectionNode::field("status"),
    ])]);
    let mut live = executor.subscribe(&subscription, &Context::new()).await.unwrap();
    let mut cancelled = executor.subscribe(&subscription, &Context::new()).await.unwrap();
    cancelled.cancel();

    let mutation = Operation::mutation([SelectionNode::field("addMovie")
        .argument("title", json!("Enter the Dragon"))
        .argument("releaseDate", json!(115_430_400_000_i64))
        .argument("status", json!("WATCHED"))
        .select([SelectionNode::field("id"), SelectionNode::field("title")])]);

    let result = executor.execute(&mutation, json!({}), &Context::new()).await;
    assert!(!result.has_errors(), "unexpected errors: {:?}", result.errors);
    assert_eq!(result.data["addMovie"]["id"], "1000");

    let event = live.next().await.unwrap();
    assert!(!event.has_errors());
    assert_eq!(event.data["movieAdded"]["title"], "Enter the Dragon");
    assert_eq!(event.data["movieAdded"]["releaseDate"], json!(115_430_400_000_i64));
    assert_eq!(event.data["movieAdded"]["status"], "WATCHED");

    assert!(cancelled.next().await.is_none());

    // The created movie is queryable afterwards.
    let operation = Operation::query([SelectionNode::field("movie")
        .argument("id", json!("1000"))
        .select([SelectionNode::field("title")])]);
    let result = executor.execute(&operation, json!({}), &Context::new()).await;
    assert_eq!(result.data["movie"]["title"], "Enter the Dragon");
}

#[tokio::test]
async fn test_unknown_selection_fails_whole_request() {
    init_tracing();
    let catalog = Arc::new(Catalog::in_memory());
    let executor = catalog.executor().unwrap();

    let operation = Operation::query([SelectionNode::field("movies")
        .select([SelectionNode::field("id"), SelectionNode::field("director")])]);

    let result = executor.execute(&operation, json!({}), &Context::new()).await;
    assert_eq!(result.data, Value::Null);
    assert!(result.errors[0].message.contains("director"));
}

/// A movie store whose backend is down.
struct FailingMovieStore;

#[async_trait::async_trait]
impl MovieStore for FailingMovieStore {
    async fn find_all(&self) -> StoreResult<Vec<Movie>> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn find_by_id(&self, _id: &str) -> StoreResult<Option<Movie>> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }

    async fn create(&self, _new: NewMovie) -> StoreResult<Movie> {
        Err(StoreError::Unavailable("connection refused".to_string()))
    }
}

#[tokio::test]
async fn test_store_failure_surfaces_as_field_error() {
    init_tracing();
    let catalog = Arc::new(Catalog::new(
        Arc::new(FailingMovieStore),
        Arc::new(InMemoryActorStore::with_seed_data()) as Arc<dyn ActorStore>,
    ));
    let executor = catalog.executor().unwrap();

    let operation = Operation::query([
        SelectionNode::field("movies").select([SelectionNode::field("id")])
    ]);

    let result = executor.execute(&operation, json!({}), &Context::new()).await;

    // The field nulls and the failure is reported; nothing crashes.
    assert_eq!(result.data, json!({"movies": null}));
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].path, vec![PathSegment::from("movies")]);
    assert!(result.errors[0].message.contains("connection refused"));

    // The executor stays usable for the next request.
    let result = executor.execute(&operation, json!({}), &Context::new()).await;
    assert_eq!(result.data, json!({"movies": null}));
}
