//! Persistence collaborators.
//!
//! The engine never talks to storage directly; resolvers go through these
//! traits, and a store failure surfaces as a field-level resolver error.
//! The in-memory implementations stand in for a real backend.

use crate::entities::{Actor, Movie, NewMovie, WatchStatus};
use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::info;

/// Storage-layer failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("storage backend unavailable: {0}")]
    Unavailable(String),

    #[error("record `{0}` already exists")]
    Duplicate(String),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// CRUD contract for movies.
#[async_trait]
pub trait MovieStore: Send + Sync {
    async fn find_all(&self) -> StoreResult<Vec<Movie>>;
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Movie>>;
    async fn create(&self, new: NewMovie) -> StoreResult<Movie>;
}

/// Read contract for actors.
#[async_trait]
pub trait ActorStore: Send + Sync {
    async fn find_all(&self) -> StoreResult<Vec<Actor>>;
    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Actor>>;
}

fn numeric_id(id: &str) -> u64 {
    id.parse().unwrap_or(u64::MAX)
}

/// In-memory movie store.
pub struct InMemoryMovieStore {
    movies: RwLock<HashMap<String, Movie>>,
    next_id: AtomicU64,
}

impl Default for InMemoryMovieStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryMovieStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            movies: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1000),
        }
    }

    /// Creates a store seeded with the classic dataset.
    pub fn with_seed_data() -> Self {
        let mut movies = HashMap::new();
        for movie in [
            Movie {
                id: "321".to_string(),
                title: "5 Deadly Venoms".to_string(),
                release_date: Utc.with_ymd_and_hms(1983, 10, 10, 0, 0, 0).single(),
                rating: Some(5),
                status: None,
                actor_ids: None,
            },
            Movie {
                id: "456".to_string(),
                title: "36 Chambers".to_string(),
                release_date: Utc.with_ymd_and_hms(1983, 8, 20, 0, 0, 0).single(),
                rating: Some(5),
                status: Some(WatchStatus::Interested),
                actor_ids: Some(vec!["123".to_string()]),
            },
        ] {
            movies.insert(movie.id.clone(), movie);
        }
        info!(count = movies.len(), "seeded movie store");
        Self {
            movies: RwLock::new(movies),
            next_id: AtomicU64::new(1000),
        }
    }
}

#[async_trait]
impl MovieStore for InMemoryMovieStore {
    async fn find_all(&self) -> StoreResult<Vec<Movie>> {
        let movies = self.movies.read().await;
        let mut all: Vec<_> = movies.values().cloned().collect();
        // Ids are numeric strings; keep listing order stable.
        all.sort_by_key(|m| numeric_id(&m.id));
        Ok(all)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Movie>> {
        Ok(self.movies.read().await.get(id).cloned())
    }

    async fn create(&self, new: NewMovie) -> StoreResult<Movie> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed).to_string();
        let movie = Movie {
            id: id.clone(),
            title: new.title,
            release_date: new.release_date,
            rating: new.rating,
            status: new.status,
            actor_ids: new.actor_ids,
        };

        let mut movies = self.movies.write().await;
        if movies.contains_key(&id) {
            return Err(StoreError::Duplicate(id));
        }
        movies.insert(id, movie.clone());
        Ok(movie)
    }
}

/// In-memory actor store.
pub struct InMemoryActorStore {
    actors: RwLock<HashMap<String, Actor>>,
}

impl Default for InMemoryActorStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryActorStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            actors: RwLock::new(HashMap::new()),
        }
    }

    /// Creates a store seeded with the classic dataset.
    pub fn with_seed_data() -> Self {
        let mut actors = HashMap::new();
        actors.insert(
            "123".to_string(),
            Actor {
                id: "123".to_string(),
                name: "Bruce Lee".to_string(),
            },
        );
        Self {
            actors: RwLock::new(actors),
        }
    }
}

#[async_trait]
impl ActorStore for InMemoryActorStore {
    async fn find_all(&self) -> StoreResult<Vec<Actor>> {
        let actors = self.actors.read().await;
        let mut all: Vec<_> = actors.values().cloned().collect();
        all.sort_by_key(|a| numeric_id(&a.id));
        Ok(all)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Actor>> {
        Ok(self.actors.read().await.get(id).cloned())
    }
}
