//! Rating domain types.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use rately_core::{RatingId, RatingValue, StoreId, UserId};

use super::store::StoreRef;
use super::user::UserRef;

/// A rating row (domain type).
///
/// Exactly one rating exists per (user, store) pair; the database enforces
/// this with a unique constraint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rating {
    /// Unique rating ID.
    pub id: RatingId,
    /// The user who submitted the rating.
    pub user_id: UserId,
    /// The rated store.
    pub store_id: StoreId,
    /// Star value, 1..=5.
    pub value: RatingValue,
    /// When the rating was created.
    pub created_at: DateTime<Utc>,
    /// When the rating was last updated.
    pub updated_at: DateTime<Utc>,
}

/// A rating joined with minimal user and store projections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatingRecord {
    /// The rating row.
    pub rating: Rating,
    /// Projection of the submitting user.
    pub user: UserRef,
    /// Projection of the rated store.
    pub store: StoreRef,
}

/// One rating value within a store listing page, used to attach aggregates
/// and the viewer's own rating to each listed store in a single fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StoreRatingRow {
    pub store_id: StoreId,
    pub user_id: UserId,
    pub value: RatingValue,
}

/// Derived aggregate over a set of rating values.
///
/// Never stored; recomputed from current rating rows on every read so a
/// future cache layer cannot drift from the authoritative collection.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingStats {
    /// Mean value rounded to one decimal place; 0 when there are no ratings.
    pub average: f64,
    /// Number of ratings.
    pub total: u64,
    /// Frequency per star value. All five keys are always present.
    pub breakdown: BTreeMap<u8, u64>,
}

impl RatingStats {
    /// Stats for an empty rating set: zero average, zero total, zeroed
    /// breakdown with all five keys present.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            average: 0.0,
            total: 0,
            breakdown: (1..=5).map(|star| (star, 0)).collect(),
        }
    }
}
