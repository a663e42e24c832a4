//! Rating lifecycle and aggregate computation.

use std::sync::Arc;

use rately_core::{RatingId, RatingValue, StoreId, UserId};

use crate::db::{EntityStore, RepositoryError};
use crate::error::AppError;
use crate::models::RatingStats;
use crate::models::views::{RatingView, StatsView};

use super::policy::{self, Action, Requester};

/// Round to one decimal place, standard rounding.
pub(crate) fn round1(x: f64) -> f64 {
    (x * 10.0).round() / 10.0
}

/// Compute aggregate statistics for a set of rating values.
///
/// Pure function: empty input degrades to zero-valued stats rather than
/// failing, and the breakdown always carries all five star keys.
#[must_use]
#[allow(clippy::cast_precision_loss)] // rating counts stay far below f64 precision
pub fn compute_stats(values: &[RatingValue]) -> RatingStats {
    if values.is_empty() {
        return RatingStats::empty();
    }

    let mut counts = [0_u64; 5];
    let mut sum = 0_i64;
    for value in values {
        counts[value.index()] += 1;
        sum += i64::from(value.as_i16());
    }

    let mut stats = RatingStats::empty();
    stats.average = round1(sum as f64 / values.len() as f64);
    stats.total = values.len() as u64;
    for (star, count) in (1..=5_u8).zip(counts) {
        stats.breakdown.insert(star, count);
    }
    stats
}

/// Rating operations: create, update, delete, reads, and per-store stats.
#[derive(Clone)]
pub struct RatingService {
    store: Arc<dyn EntityStore>,
}

impl RatingService {
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Submit a new rating for a store.
    ///
    /// The (user, store) uniqueness is resolved by the entity store's own
    /// constraint, so concurrent creates for the same pair end with exactly
    /// one success and one `Conflict`.
    ///
    /// # Errors
    ///
    /// `NotFound` when the store is absent, `Conflict` when the requester
    /// already rated it.
    pub async fn create(
        &self,
        requester: Requester,
        store_id: StoreId,
        value: RatingValue,
    ) -> Result<RatingView, AppError> {
        if self.store.store_by_id(store_id).await?.is_none() {
            return Err(AppError::not_found("Store", store_id));
        }

        let record = self
            .store
            .insert_rating(requester.id, store_id, value)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AppError::Conflict(
                    "you have already rated this store, update your rating instead".to_string(),
                ),
                other => other.into(),
            })?;

        Ok(record.into())
    }

    /// Overwrite the value of an existing rating.
    ///
    /// # Errors
    ///
    /// `NotFound` when the rating is absent, `Forbidden` when it belongs to
    /// another user.
    pub async fn update(
        &self,
        requester: Requester,
        rating_id: RatingId,
        value: RatingValue,
    ) -> Result<RatingView, AppError> {
        let rating = self
            .store
            .rating_by_id(rating_id)
            .await?
            .ok_or_else(|| AppError::not_found("Rating", rating_id))?;

        policy::authorize(
            requester,
            Action::MutateRating {
                owner: rating.user_id,
            },
        )?;

        let record = self.store.update_rating(rating_id, value).await?;
        Ok(record.into())
    }

    /// Physically remove a rating.
    ///
    /// # Errors
    ///
    /// Same existence/ownership checks as [`Self::update`].
    pub async fn delete(&self, requester: Requester, rating_id: RatingId) -> Result<(), AppError> {
        let rating = self
            .store
            .rating_by_id(rating_id)
            .await?
            .ok_or_else(|| AppError::not_found("Rating", rating_id))?;

        policy::authorize(
            requester,
            Action::MutateRating {
                owner: rating.user_id,
            },
        )?;

        self.store.delete_rating(rating_id).await?;
        Ok(())
    }

    /// All ratings for a store, newest first (admin or the owning
    /// store owner).
    ///
    /// # Errors
    ///
    /// `NotFound` when the store is absent, `Forbidden` for other callers.
    pub async fn list_by_store(
        &self,
        store_id: StoreId,
        requester: Requester,
    ) -> Result<Vec<RatingView>, AppError> {
        let store = self
            .store
            .store_by_id(store_id)
            .await?
            .ok_or_else(|| AppError::not_found("Store", store_id))?;

        policy::authorize(
            requester,
            Action::ViewStoreRatings {
                store_owner: store.owner_id,
            },
        )?;

        let records = self.store.ratings_by_store(store_id).await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    /// All ratings submitted by a user, newest first (admin or the user
    /// themselves).
    ///
    /// # Errors
    ///
    /// `NotFound` when the user is absent, `Forbidden` for other callers.
    pub async fn list_by_user(
        &self,
        target_user_id: UserId,
        requester: Requester,
    ) -> Result<Vec<RatingView>, AppError> {
        if self.store.user_by_id(target_user_id).await?.is_none() {
            return Err(AppError::not_found("User", target_user_id));
        }

        policy::authorize(
            requester,
            Action::ViewUserRatings {
                target: target_user_id,
            },
        )?;

        let records = self.store.ratings_by_user(target_user_id).await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Every rating on the platform, newest first (admin only).
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admin callers.
    pub async fn list_all(&self, requester: Requester) -> Result<Vec<RatingView>, AppError> {
        policy::authorize(requester, Action::AdminOnly)?;

        let records = self.store.all_ratings().await?;
        Ok(records.into_iter().map(Into::into).collect())
    }

    /// Rating statistics for one store (admin or the owning store owner).
    ///
    /// Aggregates are recomputed from the current rating rows on every
    /// call; nothing is cached.
    ///
    /// # Errors
    ///
    /// `NotFound` when the store is absent, `Forbidden` for other callers.
    pub async fn store_stats(
        &self,
        store_id: StoreId,
        requester: Requester,
    ) -> Result<StatsView, AppError> {
        let store = self
            .store
            .store_by_id(store_id)
            .await?
            .ok_or_else(|| AppError::not_found("Store", store_id))?;

        policy::authorize(
            requester,
            Action::ViewStoreRatings {
                store_owner: store.owner_id,
            },
        )?;

        let values = self.store.rating_values_by_store(store_id).await?;
        Ok(StatsView::new(store.id, store.name, compute_stats(&values)))
    }

    /// The rating a user gave a store, if any.
    ///
    /// Deliberately unauthorized: any caller may probe a (user, store)
    /// pair, matching the public listing's `userRating` field.
    ///
    /// # Errors
    ///
    /// Only on repository failure.
    pub async fn for_user_and_store(
        &self,
        user_id: UserId,
        store_id: StoreId,
    ) -> Result<Option<RatingView>, AppError> {
        let record = self
            .store
            .rating_for_user_and_store(user_id, store_id)
            .await?;
        Ok(record.map(Into::into))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn values(raw: &[i16]) -> Vec<RatingValue> {
        raw.iter().map(|&v| RatingValue::new(v).unwrap()).collect()
    }

    #[test]
    fn test_empty_stats_are_zeroed() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.average, 0.0);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.breakdown.len(), 5);
        assert!(stats.breakdown.values().all(|&count| count == 0));
    }

    #[test]
    fn test_average_rounds_to_one_decimal() {
        // 13 / 3 = 4.333... -> 4.3
        let stats = compute_stats(&values(&[4, 4, 5]));
        assert_eq!(stats.average, 4.3);

        // 14 / 3 = 4.666... -> 4.7
        let stats = compute_stats(&values(&[4, 5, 5]));
        assert_eq!(stats.average, 4.7);
    }

    #[test]
    fn test_breakdown_counts_every_star() {
        let stats = compute_stats(&values(&[1, 1, 3, 5, 5, 5]));
        assert_eq!(stats.breakdown[&1], 2);
        assert_eq!(stats.breakdown[&2], 0);
        assert_eq!(stats.breakdown[&3], 1);
        assert_eq!(stats.breakdown[&4], 0);
        assert_eq!(stats.breakdown[&5], 3);
    }

    #[test]
    fn test_breakdown_sums_to_total() {
        let input = values(&[2, 3, 3, 4, 5, 5, 1]);
        let stats = compute_stats(&input);
        let sum: u64 = stats.breakdown.values().sum();
        assert_eq!(sum, stats.total);
        assert_eq!(stats.total, input.len() as u64);
    }

    #[test]
    fn test_single_value() {
        let stats = compute_stats(&values(&[3]));
        assert_eq!(stats.average, 3.0);
        assert_eq!(stats.total, 1);
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(4.25), 4.3);
        assert_eq!(round1(4.24), 4.2);
        assert_eq!(round1(0.0), 0.0);
    }
}
