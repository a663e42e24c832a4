//! Test support for exercising the rating backend without `PostgreSQL`.
//!
//! [`MemoryStore`] implements the server's `EntityStore` trait over plain
//! vectors behind one mutex, emulating the constraints the real schema
//! enforces: unique emails, one store per owner, one rating per (user,
//! store) pair, and the transactional store-plus-owner delete. Tests drive
//! the real service layer against it.

use std::cmp::Ordering;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use rately_core::{Email, RatingId, RatingValue, Role, StoreId, UserId};
use rately_server::db::{EntityStore, RepositoryError};
use rately_server::models::{
    NewStore, OwnerSummary, PageWindow, Rating, RatingRecord, SortBy, SortOrder, SortSpec, Store,
    StoreFilter, StorePatch, StoreRatingRow, StoreRecord, StoreRef, UserRef,
};

#[derive(Debug, Clone)]
struct UserRow {
    id: UserId,
    name: String,
    email: Email,
    address: Option<String>,
    role: Role,
}

#[derive(Debug, Clone)]
struct StoreRow {
    id: StoreId,
    name: String,
    email: Email,
    address: Option<String>,
    owner_id: UserId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct RatingRow {
    id: RatingId,
    user_id: UserId,
    store_id: StoreId,
    value: RatingValue,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Inner {
    users: Vec<UserRow>,
    stores: Vec<StoreRow>,
    ratings: Vec<RatingRow>,
    next_id: i32,
    clock: i64,
    fail_next_owner_delete: bool,
}

impl Inner {
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    /// Strictly increasing timestamps so "newest first" orderings are
    /// deterministic.
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += 1;
        DateTime::<Utc>::UNIX_EPOCH + Duration::seconds(self.clock)
    }
}

/// In-memory [`EntityStore`] double.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert a user directly, bypassing the (external) user service.
    pub fn seed_user(&self, name: &str, email: &str, role: Role) -> UserId {
        let mut inner = self.lock();
        let id = UserId::new(inner.next_id());
        let email = Email::parse(email).expect("seed email must be valid");
        inner.users.push(UserRow {
            id,
            name: name.to_string(),
            email,
            address: None,
            role,
        });
        id
    }

    /// Insert a store directly, without constraint checks.
    pub fn seed_store(
        &self,
        name: &str,
        email: &str,
        address: Option<&str>,
        owner_id: UserId,
    ) -> StoreId {
        let mut inner = self.lock();
        let id = StoreId::new(inner.next_id());
        let now = inner.tick();
        let email = Email::parse(email).expect("seed email must be valid");
        inner.stores.push(StoreRow {
            id,
            name: name.to_string(),
            email,
            address: address.map(ToString::to_string),
            owner_id,
            created_at: now,
            updated_at: now,
        });
        id
    }

    /// Make the next `delete_store_with_owner` call fail before touching
    /// any row, as a rolled-back transaction would.
    pub fn fail_next_owner_delete(&self) {
        self.lock().fail_next_owner_delete = true;
    }

    /// Whether a user row still exists.
    pub fn has_user(&self, id: UserId) -> bool {
        self.lock().users.iter().any(|u| u.id == id)
    }
}

fn user_ref(row: &UserRow) -> UserRef {
    UserRef {
        id: row.id,
        name: row.name.clone(),
        email: row.email.clone(),
    }
}

fn owner_summary(row: &UserRow) -> OwnerSummary {
    OwnerSummary {
        id: row.id,
        name: row.name.clone(),
        email: row.email.clone(),
        address: row.address.clone(),
        role: row.role,
    }
}

fn store(row: &StoreRow) -> Store {
    Store {
        id: row.id,
        name: row.name.clone(),
        email: row.email.clone(),
        address: row.address.clone(),
        owner_id: row.owner_id,
        created_at: row.created_at,
        updated_at: row.updated_at,
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn matches_filter(row: &StoreRow, filter: &StoreFilter) -> bool {
    if let Some(search) = &filter.search {
        return contains_ci(&row.name, search)
            || row
                .address
                .as_deref()
                .is_some_and(|address| contains_ci(address, search));
    }
    if let Some(name) = &filter.name
        && !contains_ci(&row.name, name)
    {
        return false;
    }
    if let Some(email) = &filter.email
        && !contains_ci(row.email.as_str(), email)
    {
        return false;
    }
    if let Some(address) = &filter.address
        && !row
            .address
            .as_deref()
            .is_some_and(|value| contains_ci(value, address))
    {
        return false;
    }
    true
}

// NULLs sort last ascending and first descending, like Postgres defaults.
fn compare(a: &StoreRow, b: &StoreRow, sort: SortSpec) -> Ordering {
    let ordering = match sort.by {
        SortBy::Name => a.name.cmp(&b.name),
        SortBy::Email => a.email.as_str().cmp(b.email.as_str()),
        SortBy::Address => match (&a.address, &b.address) {
            (Some(left), Some(right)) => left.cmp(right),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        },
        SortBy::CreatedAt => a.created_at.cmp(&b.created_at),
    };
    match sort.order {
        SortOrder::Asc => ordering,
        SortOrder::Desc => ordering.reverse(),
    }
}

impl Inner {
    fn rating_record(&self, row: RatingRow) -> Result<RatingRecord, RepositoryError> {
        let user = self
            .users
            .iter()
            .find(|u| u.id == row.user_id)
            .ok_or_else(|| RepositoryError::DataCorruption("rating without user".to_string()))?;
        let store_row = self
            .stores
            .iter()
            .find(|s| s.id == row.store_id)
            .ok_or_else(|| RepositoryError::DataCorruption("rating without store".to_string()))?;
        Ok(RatingRecord {
            rating: Rating {
                id: row.id,
                user_id: row.user_id,
                store_id: row.store_id,
                value: row.value,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            user: user_ref(user),
            store: StoreRef {
                id: store_row.id,
                name: store_row.name.clone(),
                email: store_row.email.clone(),
            },
        })
    }

    fn store_record(&self, row: &StoreRow) -> Result<StoreRecord, RepositoryError> {
        let owner = self
            .users
            .iter()
            .find(|u| u.id == row.owner_id)
            .ok_or_else(|| RepositoryError::DataCorruption("store without owner".to_string()))?;
        Ok(StoreRecord {
            store: store(row),
            owner: owner_summary(owner),
        })
    }

    /// Newest first.
    fn sorted_ratings(&self, mut rows: Vec<RatingRow>) -> Vec<RatingRow> {
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rows
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn user_by_id(&self, id: UserId) -> Result<Option<UserRef>, RepositoryError> {
        let inner = self.lock();
        Ok(inner.users.iter().find(|u| u.id == id).map(user_ref))
    }

    async fn count_users(&self) -> Result<i64, RepositoryError> {
        Ok(self.lock().users.len() as i64)
    }

    async fn insert_store(&self, new_store: NewStore) -> Result<StoreRecord, RepositoryError> {
        let mut inner = self.lock();
        if inner.stores.iter().any(|s| s.email == new_store.email) {
            return Err(RepositoryError::Conflict(
                "store email already exists".to_string(),
            ));
        }
        if inner.stores.iter().any(|s| s.owner_id == new_store.owner_id) {
            return Err(RepositoryError::Conflict(
                "owner already has a store".to_string(),
            ));
        }
        if !inner.users.iter().any(|u| u.id == new_store.owner_id) {
            return Err(RepositoryError::NotFound);
        }

        let id = StoreId::new(inner.next_id());
        let now = inner.tick();
        let row = StoreRow {
            id,
            name: new_store.name,
            email: new_store.email,
            address: new_store.address,
            owner_id: new_store.owner_id,
            created_at: now,
            updated_at: now,
        };
        let record = inner.store_record(&row)?;
        inner.stores.push(row);
        Ok(record)
    }

    async fn store_by_id(&self, id: StoreId) -> Result<Option<Store>, RepositoryError> {
        let inner = self.lock();
        Ok(inner.stores.iter().find(|s| s.id == id).map(store))
    }

    async fn store_record_by_id(
        &self,
        id: StoreId,
    ) -> Result<Option<StoreRecord>, RepositoryError> {
        let inner = self.lock();
        inner
            .stores
            .iter()
            .find(|s| s.id == id)
            .map(|row| inner.store_record(row))
            .transpose()
    }

    async fn store_by_email(&self, email: &str) -> Result<Option<Store>, RepositoryError> {
        let inner = self.lock();
        Ok(inner
            .stores
            .iter()
            .find(|s| s.email.as_str() == email)
            .map(store))
    }

    async fn store_by_owner(&self, owner_id: UserId) -> Result<Option<Store>, RepositoryError> {
        let inner = self.lock();
        Ok(inner
            .stores
            .iter()
            .find(|s| s.owner_id == owner_id)
            .map(store))
    }

    async fn update_store(
        &self,
        id: StoreId,
        patch: StorePatch,
    ) -> Result<StoreRecord, RepositoryError> {
        let mut inner = self.lock();
        if let Some(email) = &patch.email
            && inner.stores.iter().any(|s| s.id != id && s.email == *email)
        {
            return Err(RepositoryError::Conflict(
                "store email already exists".to_string(),
            ));
        }
        let now = inner.tick();
        let row = inner
            .stores
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(RepositoryError::NotFound)?;
        if let Some(name) = patch.name {
            row.name = name;
        }
        if let Some(email) = patch.email {
            row.email = email;
        }
        if let Some(address) = patch.address {
            row.address = Some(address);
        }
        row.updated_at = now;
        let row = row.clone();
        inner.store_record(&row)
    }

    async fn delete_store_with_owner(
        &self,
        store_id: StoreId,
        owner_id: UserId,
    ) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if inner.fail_next_owner_delete {
            inner.fail_next_owner_delete = false;
            return Err(RepositoryError::DataCorruption(
                "simulated transaction failure".to_string(),
            ));
        }
        if !inner.stores.iter().any(|s| s.id == store_id) {
            return Err(RepositoryError::NotFound);
        }
        if !inner.users.iter().any(|u| u.id == owner_id) {
            return Err(RepositoryError::NotFound);
        }
        inner
            .ratings
            .retain(|r| r.store_id != store_id && r.user_id != owner_id);
        inner.stores.retain(|s| s.id != store_id);
        inner.users.retain(|u| u.id != owner_id);
        Ok(())
    }

    async fn list_stores(
        &self,
        filter: &StoreFilter,
        sort: SortSpec,
        window: PageWindow,
    ) -> Result<(Vec<StoreRecord>, i64), RepositoryError> {
        let inner = self.lock();
        let mut rows: Vec<_> = inner
            .stores
            .iter()
            .filter(|row| matches_filter(row, filter))
            .cloned()
            .collect();
        rows.sort_by(|a, b| compare(a, b, sort));

        let total = rows.len() as i64;
        let page = rows
            .into_iter()
            .skip(usize::try_from(window.offset).unwrap_or(0))
            .take(usize::try_from(window.limit).unwrap_or(0))
            .map(|row| inner.store_record(&row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok((page, total))
    }

    async fn count_stores(&self) -> Result<i64, RepositoryError> {
        Ok(self.lock().stores.len() as i64)
    }

    async fn insert_rating(
        &self,
        user_id: UserId,
        store_id: StoreId,
        value: RatingValue,
    ) -> Result<RatingRecord, RepositoryError> {
        let mut inner = self.lock();
        if inner
            .ratings
            .iter()
            .any(|r| r.user_id == user_id && r.store_id == store_id)
        {
            return Err(RepositoryError::Conflict(
                "rating already exists for this user and store".to_string(),
            ));
        }
        if !inner.users.iter().any(|u| u.id == user_id)
            || !inner.stores.iter().any(|s| s.id == store_id)
        {
            return Err(RepositoryError::NotFound);
        }

        let id = RatingId::new(inner.next_id());
        let now = inner.tick();
        let row = RatingRow {
            id,
            user_id,
            store_id,
            value,
            created_at: now,
            updated_at: now,
        };
        inner.ratings.push(row);
        inner.rating_record(row)
    }

    async fn rating_by_id(&self, id: RatingId) -> Result<Option<Rating>, RepositoryError> {
        let inner = self.lock();
        Ok(inner.ratings.iter().find(|r| r.id == id).map(|row| Rating {
            id: row.id,
            user_id: row.user_id,
            store_id: row.store_id,
            value: row.value,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }))
    }

    async fn update_rating(
        &self,
        id: RatingId,
        value: RatingValue,
    ) -> Result<RatingRecord, RepositoryError> {
        let mut inner = self.lock();
        let now = inner.tick();
        let row = inner
            .ratings
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(RepositoryError::NotFound)?;
        row.value = value;
        row.updated_at = now;
        let row = *row;
        inner.rating_record(row)
    }

    async fn delete_rating(&self, id: RatingId) -> Result<(), RepositoryError> {
        let mut inner = self.lock();
        if !inner.ratings.iter().any(|r| r.id == id) {
            return Err(RepositoryError::NotFound);
        }
        inner.ratings.retain(|r| r.id != id);
        Ok(())
    }

    async fn rating_for_user_and_store(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<Option<RatingRecord>, RepositoryError> {
        let inner = self.lock();
        inner
            .ratings
            .iter()
            .find(|r| r.user_id == user_id && r.store_id == store_id)
            .map(|row| inner.rating_record(*row))
            .transpose()
    }

    async fn ratings_by_store(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<RatingRecord>, RepositoryError> {
        let inner = self.lock();
        let rows: Vec<_> = inner
            .ratings
            .iter()
            .filter(|r| r.store_id == store_id)
            .copied()
            .collect();
        inner
            .sorted_ratings(rows)
            .into_iter()
            .map(|row| inner.rating_record(row))
            .collect()
    }

    async fn ratings_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Vec<RatingRecord>, RepositoryError> {
        let inner = self.lock();
        let rows: Vec<_> = inner
            .ratings
            .iter()
            .filter(|r| r.user_id == user_id)
            .copied()
            .collect();
        inner
            .sorted_ratings(rows)
            .into_iter()
            .map(|row| inner.rating_record(row))
            .collect()
    }

    async fn all_ratings(&self) -> Result<Vec<RatingRecord>, RepositoryError> {
        let inner = self.lock();
        inner
            .sorted_ratings(inner.ratings.clone())
            .into_iter()
            .map(|row| inner.rating_record(row))
            .collect()
    }

    async fn rating_values_by_store(
        &self,
        store_id: StoreId,
    ) -> Result<Vec<RatingValue>, RepositoryError> {
        let inner = self.lock();
        Ok(inner
            .ratings
            .iter()
            .filter(|r| r.store_id == store_id)
            .map(|r| r.value)
            .collect())
    }

    async fn ratings_for_stores(
        &self,
        store_ids: &[StoreId],
    ) -> Result<Vec<StoreRatingRow>, RepositoryError> {
        let inner = self.lock();
        Ok(inner
            .ratings
            .iter()
            .filter(|r| store_ids.contains(&r.store_id))
            .map(|r| StoreRatingRow {
                store_id: r.store_id,
                user_id: r.user_id,
                value: r.value,
            })
            .collect())
    }

    async fn count_ratings(&self) -> Result<i64, RepositoryError> {
        Ok(self.lock().ratings.len() as i64)
    }

    async fn rating_distribution(&self) -> Result<[i64; 5], RepositoryError> {
        let inner = self.lock();
        let mut counts = [0_i64; 5];
        for row in &inner.ratings {
            counts[row.value.index()] += 1;
        }
        Ok(counts)
    }
}
