//! Movie/actor dataset served through the reelql execution engine.
//!
//! - `entities`: domain entities and their wire forms
//! - `store`: persistence collaborators (traits + in-memory backends)
//! - `schema`: the movie type registry and codec set
//! - `resolvers`: resolver wiring, mutations, and the `movieAdded` feed

pub mod entities;
pub mod resolvers;
pub mod schema;
pub mod store;

pub use entities::{Actor, Movie, NewMovie, WatchStatus};
pub use resolvers::{resolver_table, Catalog, MOVIE_ADDED_TOPIC};
pub use store::{
    ActorStore, InMemoryActorStore, InMemoryMovieStore, MovieStore, StoreError, StoreResult,
};
