//! Store domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use rately_core::{Email, StoreId, UserId};

use super::user::OwnerSummary;

/// A store (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Store {
    /// Unique store ID.
    pub id: StoreId,
    /// Store name.
    pub name: String,
    /// Store contact email, unique across stores.
    pub email: Email,
    /// Postal address, if recorded.
    pub address: Option<String>,
    /// Owning user. Exactly one store per owner.
    pub owner_id: UserId,
    /// When the store was created.
    pub created_at: DateTime<Utc>,
    /// When the store was last updated.
    pub updated_at: DateTime<Utc>,
}

/// Minimal store projection attached to rating results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreRef {
    /// Unique store ID.
    pub id: StoreId,
    /// Store name.
    pub name: String,
    /// Store contact email.
    pub email: Email,
}

impl From<&Store> for StoreRef {
    fn from(store: &Store) -> Self {
        Self {
            id: store.id,
            name: store.name.clone(),
            email: store.email.clone(),
        }
    }
}

/// A store joined with its owner projection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreRecord {
    /// The store row.
    pub store: Store,
    /// Owner projection for admin-facing views.
    pub owner: OwnerSummary,
}

/// Fields for creating a store.
#[derive(Debug, Clone)]
pub struct NewStore {
    pub name: String,
    pub email: Email,
    pub address: Option<String>,
    pub owner_id: UserId,
}

/// Partial update of a store. `None` fields are left untouched.
#[derive(Debug, Clone, Default)]
pub struct StorePatch {
    pub name: Option<String>,
    pub email: Option<Email>,
    pub address: Option<String>,
}

impl StorePatch {
    /// Whether the patch changes nothing.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none() && self.address.is_none()
    }
}
