//! `PostgreSQL` implementation of the entity store.
//!
//! Queries use the sqlx runtime API. Uniqueness invariants (store email,
//! one store per owner, one rating per (user, store) pair) live in the
//! schema; violations surface as [`RepositoryError::Conflict`]. The cascade
//! delete of a store and its owner runs inside a single transaction.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};

use rately_core::{Email, RatingId, RatingValue, Role, StoreId, UserId};

use super::{EntityStore, RepositoryError};
use crate::models::{
    NewStore, PageWindow, Rating, RatingRecord, SortSpec, Store, StoreFilter, StorePatch,
    StoreRatingRow, StoreRecord, StoreRef, UserRef,
};
use crate::models::user::OwnerSummary;

// =============================================================================
// Internal Row Types
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct UserRefRow {
    id: UserId,
    name: String,
    email: Email,
}

impl From<UserRefRow> for UserRef {
    fn from(row: UserRefRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StoreRow {
    id: StoreId,
    name: String,
    email: Email,
    address: Option<String>,
    owner_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<StoreRow> for Store {
    fn from(row: StoreRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            email: row.email,
            address: row.address,
            owner_id: row.owner_id,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Store joined with its owner projection.
#[derive(Debug, sqlx::FromRow)]
struct StoreRecordRow {
    id: StoreId,
    name: String,
    email: Email,
    address: Option<String>,
    owner_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    owner_name: String,
    owner_email: Email,
    owner_address: Option<String>,
    owner_role: Role,
}

impl From<StoreRecordRow> for StoreRecord {
    fn from(row: StoreRecordRow) -> Self {
        Self {
            store: Store {
                id: row.id,
                name: row.name,
                email: row.email,
                address: row.address,
                owner_id: row.owner_id,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            owner: OwnerSummary {
                id: row.owner_id,
                name: row.owner_name,
                email: row.owner_email,
                address: row.owner_address,
                role: row.owner_role,
            },
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct RatingRow {
    id: RatingId,
    user_id: UserId,
    store_id: StoreId,
    value: RatingValue,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RatingRow> for Rating {
    fn from(row: RatingRow) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            store_id: row.store_id,
            value: row.value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Rating joined with minimal user and store projections.
#[derive(Debug, sqlx::FromRow)]
struct RatingRecordRow {
    id: RatingId,
    user_id: UserId,
    store_id: StoreId,
    value: RatingValue,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    user_name: String,
    user_email: Email,
    store_name: String,
    store_email: Email,
}

impl From<RatingRecordRow> for RatingRecord {
    fn from(row: RatingRecordRow) -> Self {
        Self {
            rating: Rating {
                id: row.id,
                user_id: row.user_id,
                store_id: row.store_id,
                value: row.value,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            user: UserRef {
                id: row.user_id,
                name: row.user_name,
                email: row.user_email,
            },
            store: StoreRef {
                id: row.store_id,
                name: row.store_name,
                email: row.store_email,
            },
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct StoreRatingValueRow {
    store_id: StoreId,
    user_id: UserId,
    value: RatingValue,
}

// =============================================================================
// Helpers
// =============================================================================

/// Map a unique-constraint violation to `Conflict`, pass everything else
/// through as a database error.
fn conflict_on_unique(e: sqlx::Error, message: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(message.to_owned());
    }
    RepositoryError::Database(e)
}

/// Build a `%term%` ILIKE pattern with LIKE metacharacters escaped.
fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    format!("%{escaped}%")
}

/// Append the WHERE clause for a store filter. `search` OR-matches name and
/// address; otherwise the discrete filters are ANDed.
fn push_store_predicate(qb: &mut QueryBuilder<'_, Postgres>, filter: &StoreFilter) {
    if let Some(search) = &filter.search {
        let pattern = like_pattern(search);
        qb.push(" WHERE (s.name ILIKE ");
        qb.push_bind(pattern.clone());
        qb.push(" OR s.address ILIKE ");
        qb.push_bind(pattern);
        qb.push(")");
        return;
    }

    let mut has_where = false;
    for (column, term) in [
        ("s.name", &filter.name),
        ("s.email", &filter.email),
        ("s.address", &filter.address),
    ] {
        if let Some(term) = term {
            qb.push(if has_where { " AND " } else { " WHERE " });
            qb.push(column);
            qb.push(" ILIKE ");
            qb.push_bind(like_pattern(term));
            has_where = true;
        }
    }
}

const STORE_RECORD_SELECT: &str = "SELECT s.id, s.name, s.email, s.address, s.owner_id, \
     s.created_at, s.updated_at, \
     u.name AS owner_name, u.email AS owner_email, \
     u.address AS owner_address, u.role AS owner_role \
     FROM store s JOIN app_user u ON u.id = s.owner_id";

const RATING_RECORD_SELECT: &str = "SELECT r.id, r.user_id, r.store_id, r.value, \
     r.created_at, r.updated_at, \
     u.name AS user_name, u.email AS user_email, \
     s.name AS store_name, s.email AS store_email \
     FROM rating r \
     JOIN app_user u ON u.id = r.user_id \
     JOIN store s ON s.id = r.store_id";

// =============================================================================
// Repository
// =============================================================================

/// `PostgreSQL`-backed [`EntityStore`].
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Create a new store on top of an existing pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntityStore for PgStore {
    async fn user_by_id(&self, id: UserId) -> Result<Option<UserRef>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRefRow>(
            "SELECT id, name, email FROM app_user WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn count_users(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM app_user")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_store(&self, new_store: NewStore) -> Result<StoreRecord, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRecordRow>(
            "WITH ins AS ( \
                 INSERT INTO store (name, email, address, owner_id) \
                 VALUES ($1, $2, $3, $4) \
                 RETURNING id, name, email, address, owner_id, created_at, updated_at \
             ) \
             SELECT ins.id, ins.name, ins.email, ins.address, ins.owner_id, \
                    ins.created_at, ins.updated_at, \
                    u.name AS owner_name, u.email AS owner_email, \
                    u.address AS owner_address, u.role AS owner_role \
             FROM ins JOIN app_user u ON u.id = ins.owner_id",
        )
        .bind(&new_store.name)
        .bind(new_store.email.as_str())
        .bind(&new_store.address)
        .bind(new_store.owner_id.as_i32())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.is_unique_violation()
            {
                let message = match db_err.constraint() {
                    Some("store_owner_id_key") => "owner already has a store",
                    _ => "store email already exists",
                };
                return RepositoryError::Conflict(message.to_owned());
            }
            RepositoryError::Database(e)
        })?;

        Ok(row.into())
    }

    async fn store_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            "SELECT id, name, email, address, owner_id, created_at, updated_at \
             FROM store WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn store_record_by_id(
        &self,
        id: StoreId,
    ) -> Result<Option<StoreRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRecordRow>(&format!(
            "{STORE_RECORD_SELECT} WHERE s.id = $1"
        ))
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn store_by_email(&self, email: &str) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            "SELECT id, name, email, address, owner_id, created_at, updated_at \
             FROM store WHERE email = $1",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn store_by_owner(&self, owner_id: UserId) -> Result<Option<Store>, RepositoryError> {
        let row = sqlx::query_as::<_, StoreRow>(
            "SELECT id, name, email, address, owner_id, created_at, updated_at \
             FROM store WHERE owner_id = $1",
        )
        .bind(owner_id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn update_store(
        &self,
        id: StoreId,
        patch: StorePatch,
    ) -> Result<StoreRecord, RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE store SET updated_at = now()");
        if let Some(name) = patch.name {
            qb.push(", name = ");
            qb.push_bind(name);
        }
        if let Some(email) = patch.email {
            qb.push(", email = ");
            qb.push_bind(email.into_inner());
        }
        if let Some(address) = patch.address {
            qb.push(", address = ");
            qb.push_bind(address);
        }
        qb.push(" WHERE id = ");
        qb.push_bind(id.as_i32());
        qb.push(" RETURNING id");

        let updated = qb
            .build()
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| conflict_on_unique(e, "email already taken by another store"))?;

        if updated.is_none() {
            return Err(RepositoryError::NotFound);
        }

        self.store_record_by_id(id)
            .await?
            .ok_or(RepositoryError::NotFound)
    }

    async fn delete_store_with_owner(
        &self,
        store_id: StoreId,
        owner_id: UserId,
    ) -> Result<(), RepositoryError> {
        // Single transaction: store delete (ratings cascade via FK) plus
        // owner delete succeed or fail together.
        let mut tx = self.pool.begin().await?;

        let store_result = sqlx::query("DELETE FROM store WHERE id = $1")
            .bind(store_id.as_i32())
            .execute(&mut *tx)
            .await?;
        if store_result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        let owner_result = sqlx::query("DELETE FROM app_user WHERE id = $1")
            .bind(owner_id.as_i32())
            .execute(&mut *tx)
            .await?;
        if owner_result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_stores(
        &self,
        filter: &StoreFilter,
        sort: SortSpec,
        window: PageWindow,
    ) -> Result<(Vec<StoreRecord>, i64), RepositoryError> {
        let mut qb = QueryBuilder::<Postgres>::new(STORE_RECORD_SELECT);
        push_store_predicate(&mut qb, filter);
        // Sort column comes from the SortBy whitelist, never from input.
        qb.push(format!(
            " ORDER BY s.{} {}",
            sort.by.column(),
            sort.order.as_sql()
        ));
        qb.push(" LIMIT ");
        qb.push_bind(window.limit);
        qb.push(" OFFSET ");
        qb.push_bind(window.offset);

        let rows: Vec<StoreRecordRow> = qb.build_query_as().fetch_all(&self.pool).await?;

        let mut count_qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM store s");
        push_store_predicate(&mut count_qb, filter);
        let total: i64 = count_qb.build_query_scalar().fetch_one(&self.pool).await?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    async fn count_stores(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM store")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn insert_rating(
        &self,
        user_id: UserId,
        store_id: StoreId,
        value: RatingValue,
    ) -> Result<RatingRecord, RepositoryError> {
        let row = sqlx::query_as::<_, RatingRecordRow>(
            "WITH ins AS ( \
                 INSERT INTO rating (user_id, store_id, value) \
                 VALUES ($1, $2, $3) \
                 RETURNING id, user_id, store_id, value, created_at, updated_at \
             ) \
             SELECT ins.id, ins.user_id, ins.store_id, ins.value, \
                    ins.created_at, ins.updated_at, \
                    u.name AS user_name, u.email AS user_email, \
                    s.name AS store_name, s.email AS store_email \
             FROM ins \
             JOIN app_user u ON u.id = ins.user_id \
             JOIN store s ON s.id = ins.store_id",
        )
        .bind(user_id.as_i32())
        .bind(store_id.as_i32())
        .bind(value)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "rating already exists for this user and store"))?;

        Ok(row.into())
    }

    async fn rating_by_id(&self, id: RatingId) -> Result<Option<Rating>, RepositoryError> {
        let row = sqlx::query_as::<_, RatingRow>(
            "SELECT id, user_id, store_id, value, created_at, updated_at \
             FROM rating WHERE id = $1",
        )
        .bind(id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn update_rating(
        &self,
        id: RatingId,
        value: RatingValue,
    ) -> Result<RatingRecord, RepositoryError> {
        let row = sqlx::query_as::<_, RatingRecordRow>(
            "WITH upd AS ( \
                 UPDATE rating SET value = $2, updated_at = now() \
                 WHERE id = $1 \
                 RETURNING id, user_id, store_id, value, created_at, updated_at \
             ) \
             SELECT upd.id, upd.user_id, upd.store_id, upd.value, \
                    upd.created_at, upd.updated_at, \
                    u.name AS user_name, u.email AS user_email, \
                    s.name AS store_name, s.email AS store_email \
             FROM upd \
             JOIN app_user u ON u.id = upd.user_id \
             JOIN store s ON s.id = upd.store_id",
        )
        .bind(id.as_i32())
        .bind(value)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Into::into).ok_or(RepositoryError::NotFound)
    }

    async fn delete_rating(&self, id: RatingId) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM rating WHERE id = $1")
            .bind(id.as_i32())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }

        Ok(())
    }

    async fn rating_for_user_and_store(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<Option<RatingRecord>, RepositoryError> {
        let row = sqlx::query_as::<_, RatingRecordRow>(&format!(
            "{RATING_RECORD_SELECT} WHERE r.user_id = $1 AND r.store_id = $2"
        ))
        .bind(user_id.as_i32())
        .bind(store_id.as_i32())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Into::into))
    }

    async fn ratings_by_store(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<RatingRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, RatingRecordRow>(&format!(
            "{RATING_RECORD_SELECT} WHERE r.store_id = $1 ORDER BY r.created_at DESC"
        ))
        .bind(store_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn ratings_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<RatingRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, RatingRecordRow>(&format!(
            "{RATING_RECORD_SELECT} WHERE r.user_id = $1 ORDER BY r.created_at DESC"
        ))
        .bind(user_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn all_ratings(&self) -> Result<Vec<RatingRecord>, RepositoryError> {
        let rows = sqlx::query_as::<_, RatingRecordRow>(&format!(
            "{RATING_RECORD_SELECT} ORDER BY r.created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn rating_values_by_store(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<RatingValue>, RepositoryError> {
        let values = sqlx::query_scalar::<_, RatingValue>(
            "SELECT value FROM rating WHERE store_id = $1",
        )
        .bind(store_id.as_i32())
        .fetch_all(&self.pool)
        .await?;

        Ok(values)
    }

    async fn ratings_for_stores(
        &self,
        store_ids: &[StoreId],
    ) -> Result<Vec<StoreRatingRow>, RepositoryError> {
        if store_ids.is_empty() {
            return Ok(Vec::new());
        }

        let ids: Vec<i32> = store_ids.iter().map(StoreId::as_i32).collect();
        let rows = sqlx::query_as::<_, StoreRatingValueRow>(
            "SELECT store_id, user_id, value FROM rating WHERE store_id = ANY($1)",
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| StoreRatingRow {
                store_id: row.store_id,
                user_id: row.user_id,
                value: row.value,
            })
            .collect())
    }

    async fn count_ratings(&self) -> Result<i64, RepositoryError> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM rating")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn rating_distribution(&self) -> Result<[i64; 5], RepositoryError> {
        let rows = sqlx::query_as::<_, (i16, i64)>(
            "SELECT value, COUNT(*) FROM rating GROUP BY value",
        )
        .fetch_all(&self.pool)
        .await?;

        let mut distribution = [0_i64; 5];
        for (value, count) in rows {
            if !(1..=5).contains(&value) {
                return Err(RepositoryError::DataCorruption(format!(
                    "rating value {value} out of range"
                )));
            }
            distribution[(value - 1) as usize] = count;
        }
        Ok(distribution)
    }
}
