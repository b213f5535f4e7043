//! Domain entities for the movie catalog.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Viewing status of a movie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WatchStatus {
    Watched,
    Interested,
    NotInterested,
    Unknown,
}

impl WatchStatus {
    /// The schema-facing name of the value.
    pub fn as_str(self) -> &'static str {
        match self {
            WatchStatus::Watched => "WATCHED",
            WatchStatus::Interested => "INTERESTED",
            WatchStatus::NotInterested => "NOT_INTERESTED",
            WatchStatus::Unknown => "UNKNOWN",
        }
    }

    /// Parses a schema-facing name.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "WATCHED" => Some(WatchStatus::Watched),
            "INTERESTED" => Some(WatchStatus::Interested),
            "NOT_INTERESTED" => Some(WatchStatus::NotInterested),
            "UNKNOWN" => Some(WatchStatus::Unknown),
            _ => None,
        }
    }
}

impl std::fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Actor entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: String,
    pub name: String,
}

/// Movie entity.
///
/// The wire form is camelCase. `actor_ids` is storage-side only: the
/// `Movie.actor` resolver expands it through the actor store, and a movie
/// without a cast omits it entirely so the field resolves to null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub release_date: Option<DateTime<Utc>>,
    pub rating: Option<i32>,
    pub status: Option<WatchStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor_ids: Option<Vec<String>>,
}

/// Fields accepted when creating a movie; the store allocates the id.
#[derive(Debug, Clone, Default)]
pub struct NewMovie {
    pub title: String,
    pub release_date: Option<DateTime<Utc>>,
    pub rating: Option<i32>,
    pub status: Option<WatchStatus>,
    pub actor_ids: Option<Vec<String>>,
}
