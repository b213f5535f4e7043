//! Resolver wiring over the stores and the event channel.

use crate::entities::{NewMovie, WatchStatus};
use crate::schema;
use crate::store::{ActorStore, InMemoryActorStore, InMemoryMovieStore, MovieStore};
use chrono::{DateTime, Utc};
use reelql_runtime::{
    EventChannel, Executor, FnSource, RegistryError, ResolverError, ResolverTable,
};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

/// Topic carrying newly created movies to subscribers.
pub const MOVIE_ADDED_TOPIC: &str = "movieAdded";

fn store_error(e: impl std::fmt::Display) -> ResolverError {
    ResolverError::custom(e.to_string())
}

/// The catalog's shared backends: stores plus the event channel.
pub struct Catalog {
    movies: Arc<dyn MovieStore>,
    actors: Arc<dyn ActorStore>,
    events: EventChannel,
}

impl Catalog {
    /// Creates a catalog over the given stores.
    pub fn new(movies: Arc<dyn MovieStore>, actors: Arc<dyn ActorStore>) -> Self {
        Self {
            movies,
            actors,
            events: EventChannel::new(),
        }
    }

    /// Creates a catalog over the seeded in-memory stores.
    pub fn in_memory() -> Self {
        Self::new(
            Arc::new(InMemoryMovieStore::with_seed_data()),
            Arc::new(InMemoryActorStore::with_seed_data()),
        )
    }

    /// The movie store.
    pub fn movies(&self) -> &Arc<dyn MovieStore> {
        &self.movies
    }

    /// The actor store.
    pub fn actors(&self) -> &Arc<dyn ActorStore> {
        &self.actors
    }

    /// The event channel mutations publish to.
    pub fn events(&self) -> &EventChannel {
        &self.events
    }

    /// Assembles schema, codecs, and resolvers into a ready executor.
    pub fn executor(self: Arc<Self>) -> Result<Executor, RegistryError> {
        Executor::new(
            schema::registry()?,
            schema::codecs()?,
            resolver_table(self)?,
        )
    }
}

/// Builds the catalog's resolver table.
///
/// Only the fields that need store access or side effects get resolvers;
/// everything else falls through to the default property lookup.
pub fn resolver_table(catalog: Arc<Catalog>) -> Result<ResolverTable, RegistryError> {
    let mut table = ResolverTable::new();

    {
        let catalog = Arc::clone(&catalog);
        table.register_async("Query", "movies", move |_parent, _args, _ctx, _info| {
            let catalog = Arc::clone(&catalog);
            async move {
                let movies = catalog.movies.find_all().await.map_err(store_error)?;
                serde_json::to_value(movies).map_err(store_error)
            }
        })?;
    }

    {
        let catalog = Arc::clone(&catalog);
        table.register_async("Query", "movie", move |_parent, args, _ctx, _info| {
            let catalog = Arc::clone(&catalog);
            async move {
                let Some(id) = args.get_as::<String>("id") else {
                    return Ok(Value::Null);
                };
                let movie = catalog.movies.find_by_id(&id).await.map_err(store_error)?;
                match movie {
                    Some(movie) => serde_json::to_value(movie).map_err(store_error),
                    None => Ok(Value::Null),
                }
            }
        })?;
    }

    {
        let catalog = Arc::clone(&catalog);
        table.register_async("Movie", "actor", move |parent, _args, _ctx, _info| {
            let catalog = Arc::clone(&catalog);
            async move {
                // A movie without a cast keeps the original null shape.
                let Some(ids) = parent.get("actorIds").and_then(Value::as_array).cloned() else {
                    return Ok(Value::Null);
                };
                let mut actors = Vec::with_capacity(ids.len());
                for id in &ids {
                    let Some(id) = id.as_str() else {
                        return Err(ResolverError::custom("actor ids must be strings"));
                    };
                    let actor = catalog.actors.find_by_id(id).await.map_err(store_error)?;
                    match actor {
                        Some(actor) => {
                            actors.push(serde_json::to_value(actor).map_err(store_error)?);
                        }
                        None => actors.push(Value::Null),
                    }
                }
                Ok(Value::Array(actors))
            }
        })?;
    }

    {
        let catalog = Arc::clone(&catalog);
        table.register_async("Mutation", "addMovie", move |_parent, args, _ctx, _info| {
            let catalog = Arc::clone(&catalog);
            async move {
                let title: String = args.require("title")?;
                let release_date = args
                    .get_as::<i64>("releaseDate")
                    .and_then(DateTime::<Utc>::from_timestamp_millis);
                let rating: Option<i32> = args.get_as("rating");
                let status = args
                    .get_as::<String>("status")
                    .and_then(|name| WatchStatus::from_name(&name));

                let created = catalog
                    .movies
                    .create(NewMovie {
                        title,
                        release_date,
                        rating,
                        status,
                        actor_ids: None,
                    })
                    .await
                    .map_err(store_error)?;
                info!(id = %created.id, title = %created.title, "movie created");

                let payload = serde_json::to_value(&created).map_err(store_error)?;
                let delivered = catalog
                    .events
                    .publish(MOVIE_ADDED_TOPIC, payload.clone())
                    .await;
                debug!(delivered, "movie event published");
                Ok(payload)
            }
        })?;
    }

    {
        let events = catalog.events.clone();
        table.register_source(
            "movieAdded",
            FnSource::new(move |_args, _ctx| {
                let events = events.clone();
                async move { Ok(events.subscribe(MOVIE_ADDED_TOPIC).await) }
            }),
        )?;
    }

    Ok(table)
}
