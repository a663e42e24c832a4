//! Role-shaped response projections.
//!
//! Two explicit shaping strategies exist for store listings: the admin view
//! (owner projection, no viewer-specific fields) and the public view
//! (reduced fields plus the viewer's own rating). The variant is selected
//! once at the service entry point.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use rately_core::{Email, RatingId, StoreId, UserId};

use super::query::Paged;
use super::rating::{RatingRecord, RatingStats};
use super::store::{StoreRecord, StoreRef};
use super::user::{OwnerSummary, UserRef};

/// A rating joined with minimal user/store projections.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingView {
    pub id: RatingId,
    pub rating: i16,
    pub user_id: UserId,
    pub store_id: StoreId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub user: UserRef,
    pub store: StoreRef,
}

impl From<RatingRecord> for RatingView {
    fn from(record: RatingRecord) -> Self {
        Self {
            id: record.rating.id,
            rating: record.rating.value.as_i16(),
            user_id: record.rating.user_id,
            store_id: record.rating.store_id,
            created_at: record.rating.created_at,
            updated_at: record.rating.updated_at,
            user: record.user,
            store: record.store,
        }
    }
}

/// Per-store rating statistics.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsView {
    pub store_id: StoreId,
    pub store_name: String,
    pub average_rating: f64,
    pub total_ratings: u64,
    pub rating_breakdown: BTreeMap<u8, u64>,
}

impl StatsView {
    /// Attach computed stats to a store identity.
    #[must_use]
    pub fn new(store_id: StoreId, store_name: String, stats: RatingStats) -> Self {
        Self {
            store_id,
            store_name,
            average_rating: stats.average,
            total_ratings: stats.total,
            rating_breakdown: stats.breakdown,
        }
    }
}

/// Admin-facing store projection with owner and aggregates.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreView {
    pub id: StoreId,
    pub name: String,
    pub email: Email,
    pub address: Option<String>,
    pub owner_id: UserId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub owner: OwnerSummary,
    pub average_rating: f64,
    pub total_ratings: u64,
}

impl StoreView {
    /// Shape an admin store view from a joined record and its aggregates.
    #[must_use]
    pub fn new(record: StoreRecord, stats: &RatingStats) -> Self {
        Self {
            id: record.store.id,
            name: record.store.name,
            email: record.store.email,
            address: record.store.address,
            owner_id: record.store.owner_id,
            created_at: record.store.created_at,
            updated_at: record.store.updated_at,
            owner: record.owner,
            average_rating: stats.average,
            total_ratings: stats.total,
        }
    }
}

/// Admin-facing store detail: the full view plus the joined rating list.
#[derive(Debug, Clone, Serialize)]
pub struct StoreDetailView {
    #[serde(flatten)]
    pub store: StoreView,
    pub ratings: Vec<RatingView>,
}

/// Public store projection: no email, no owner, plus the viewer's rating.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicStoreView {
    pub id: StoreId,
    pub name: String,
    pub address: Option<String>,
    pub average_rating: f64,
    pub total_ratings: u64,
    /// The requesting viewer's own rating value, if any.
    pub user_rating: Option<i16>,
}

/// Store summary shown on the owner dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStoreSummary {
    pub id: StoreId,
    pub name: String,
    pub email: Email,
    pub address: Option<String>,
    pub average_rating: f64,
    pub total_ratings: u64,
}

/// One rating on the owner dashboard, joined with the rater's identity.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardRatingView {
    pub id: RatingId,
    pub rating: i16,
    pub created_at: DateTime<Utc>,
    pub user: UserRef,
}

/// Owner dashboard: store summary plus the full rating list, newest first.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub store: DashboardStoreSummary,
    pub ratings: Vec<DashboardRatingView>,
}

/// Global statistics for the admin dashboard.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStats {
    pub total_users: u64,
    pub total_stores: u64,
    pub total_ratings: u64,
    /// Global average rating, 0 when no ratings exist.
    pub average_rating: f64,
    /// Frequency per star value, all five keys present.
    pub distribution: BTreeMap<u8, u64>,
}

/// A page of admin store views.
pub type PagedStores = Paged<StoreView>;
/// A page of public store views.
pub type PagedPublicStores = Paged<PublicStoreView>;
