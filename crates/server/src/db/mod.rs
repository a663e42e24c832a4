//! Database access for the rating backend.
//!
//! The service layer talks to storage through the [`EntityStore`] trait so
//! the invariants (one rating per pair, transactional cascade delete) can be
//! exercised against a test double. [`PgStore`] is the production
//! implementation backed by `PostgreSQL`.
//!
//! ## Tables
//!
//! - `app_user` - platform users (managed by the external auth service)
//! - `store` - stores, one per owner, unique email
//! - `rating` - one row per (user, store) pair, enforced by a unique
//!   constraint
//!
//! Migrations live in `crates/server/migrations` and are applied at startup.

pub mod postgres;

use std::time::Duration;

use async_trait::async_trait;
use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

use rately_core::{RatingId, RatingValue, StoreId, UserId};

use crate::models::{
    NewStore, PageWindow, Rating, RatingRecord, SortSpec, Store, StoreFilter, StorePatch,
    StoreRatingRow, StoreRecord, UserRef,
};

pub use postgres::PgStore;

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,

    /// Constraint violation (e.g., duplicate email or rating pair).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}

/// Transactional entity storage.
///
/// Uniqueness of (user, store) rating pairs and of emails is enforced by the
/// implementation's own atomicity guarantee, never by check-then-insert in
/// callers: concurrent inserts of the same pair must resolve to exactly one
/// success and one [`RepositoryError::Conflict`].
#[async_trait]
pub trait EntityStore: Send + Sync {
    // -- Users ---------------------------------------------------------------

    /// Look up a user projection by id.
    async fn user_by_id(&self, id: UserId) -> Result<Option<UserRef>, RepositoryError>;

    /// Total number of users.
    async fn count_users(&self) -> Result<i64, RepositoryError>;

    // -- Stores --------------------------------------------------------------

    /// Insert a store. Fails with [`RepositoryError::Conflict`] when the
    /// email or the owner already has a store.
    async fn insert_store(&self, new_store: NewStore) -> Result<StoreRecord, RepositoryError>;

    /// Look up a store row by id.
    async fn store_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError>;

    /// Look up a store joined with its owner projection.
    async fn store_record_by_id(
        &self,
        id: StoreId,
    ) -> Result<Option<StoreRecord>, RepositoryError>;

    /// Look up a store by its exact email.
    async fn store_by_email(&self, email: &str) -> Result<Option<Store>, RepositoryError>;

    /// Look up the single store owned by a user.
    async fn store_by_owner(&self, owner_id: UserId) -> Result<Option<Store>, RepositoryError>;

    /// Apply a partial update. Fails with [`RepositoryError::NotFound`] when
    /// the store is absent and [`RepositoryError::Conflict`] on an email
    /// collision.
    async fn update_store(
        &self,
        id: StoreId,
        patch: StorePatch,
    ) -> Result<StoreRecord, RepositoryError>;

    /// Delete a store (its ratings cascade) and its owning user as a single
    /// atomic transaction. Any failure rolls back the whole operation.
    async fn delete_store_with_owner(
        &self,
        store_id: StoreId,
        owner_id: UserId,
    ) -> Result<(), RepositoryError>;

    /// Fetch one page of stores joined with owners, plus the unwindowed
    /// total count under the same predicate.
    async fn list_stores(
        &self,
        filter: &StoreFilter,
        sort: SortSpec,
        window: PageWindow,
    ) -> Result<(Vec<StoreRecord>, i64), RepositoryError>;

    /// Total number of stores.
    async fn count_stores(&self) -> Result<i64, RepositoryError>;

    // -- Ratings -------------------------------------------------------------

    /// Insert a rating. Fails with [`RepositoryError::Conflict`] when the
    /// (user, store) pair already has one.
    async fn insert_rating(
        &self,
        user_id: UserId,
        store_id: StoreId,
        value: RatingValue,
    ) -> Result<RatingRecord, RepositoryError>;

    /// Look up a rating row by id.
    async fn rating_by_id(&self, id: RatingId) -> Result<Option<Rating>, RepositoryError>;

    /// Overwrite the value of a rating and refresh its `updated_at`.
    async fn update_rating(
        &self,
        id: RatingId,
        value: RatingValue,
    ) -> Result<RatingRecord, RepositoryError>;

    /// Physically remove a rating row.
    async fn delete_rating(&self, id: RatingId) -> Result<(), RepositoryError>;

    /// The single rating a user gave a store, if any.
    async fn rating_for_user_and_store(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<Option<RatingRecord>, RepositoryError>;

    /// All ratings for a store, newest first.
    async fn ratings_by_store(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<RatingRecord>, RepositoryError>;

    /// All ratings by a user, newest first.
    async fn ratings_by_user(&self, user_id: UserId)
    -> Result<Vec<RatingRecord>, RepositoryError>;

    /// Every rating on the platform, newest first.
    async fn all_ratings(&self) -> Result<Vec<RatingRecord>, RepositoryError>;

    /// Bare rating values for one store.
    async fn rating_values_by_store(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<RatingValue>, RepositoryError>;

    /// Rating rows for a batch of stores, for listing aggregation.
    async fn ratings_for_stores(
        &self,
        store_ids: &[StoreId],
    ) -> Result<Vec<StoreRatingRow>, RepositoryError>;

    /// Total number of ratings.
    async fn count_ratings(&self) -> Result<i64, RepositoryError>;

    /// Count of ratings per star value, indexed by star - 1.
    async fn rating_distribution(&self) -> Result<[i64; 5], RepositoryError>;
}
