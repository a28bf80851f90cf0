//! Fakebook social core.
//!
//! Friend requests, post visibility, likes, comments and a small admin panel,
//! written against a [`DataStore`] collaborator. Two stores ship with the
//! crate: [`MemoryStore`] for tests and demos and [`RedisStore`], which keeps
//! rows as JSON and enforces unique constraints inside a Lua script.
//!
//! Tables are declared with `#[derive(Record)]`; the derive registers each
//! table's unique constraints so both stores enforce the same rules.

extern crate self as fakebook;

pub mod auth;
pub mod config;
pub mod errors;
pub mod id;
pub mod keys;
pub mod models;
pub mod query;
pub mod registry;
pub mod repository;
pub mod social;
pub mod store;
pub mod types;
pub mod validators;

pub use auth::{AuthProvider, Authenticator, SessionUser};
pub use config::FakebookConfig;
pub use errors::{AuthError, DuplicateReason, SocialError, SocialResult, StoreError, ValidationError, ValidationIssue};
pub use fakebook_macros::Record;
pub use query::{Filter, Query, Row, SortOrder};
pub use repository::Repo;
pub use store::{DataStore, MemoryStore, RedisStore};
pub use types::{Record, UniqueConstraint};

pub use inventory;
pub use redis;
pub use redis::aio::ConnectionManager;
