//! # podium-store
//!
//! Relational storage for Podium, backed by SQLite.
//!
//! The crate exposes a synchronous [`Database`] handle that wraps a
//! `rusqlite::Connection`, runs the versioned migrations on open, and
//! provides typed queries for posts, media, ratings, user-to-user votes and
//! profile statistics.  Every statement binds its values as parameters.

pub mod database;
pub mod migrations;
pub mod models;
pub mod posts;
pub mod schema;
pub mod user_votes;
pub mod users;
pub mod votes;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use models::*;
