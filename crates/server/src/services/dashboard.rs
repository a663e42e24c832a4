//! Platform-wide statistics for the admin dashboard.

use std::sync::Arc;

use crate::db::EntityStore;
use crate::error::AppError;
use crate::models::views::PlatformStats;

use super::policy::{self, Action, Requester};
use super::ratings::round1;

/// Read-only global statistics (admin only).
#[derive(Clone)]
pub struct DashboardService {
    store: Arc<dyn EntityStore>,
}

impl DashboardService {
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Entity counts plus the global rating average and distribution.
    ///
    /// Everything is recomputed from current rows; an empty platform yields
    /// all zeroes with all five distribution keys present.
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admin callers.
    #[allow(clippy::cast_precision_loss, clippy::cast_sign_loss)] // counts are non-negative
    pub async fn platform_stats(&self, requester: Requester) -> Result<PlatformStats, AppError> {
        policy::authorize(requester, Action::AdminOnly)?;

        let total_users = self.store.count_users().await?;
        let total_stores = self.store.count_stores().await?;
        let total_ratings = self.store.count_ratings().await?;
        let per_star = self.store.rating_distribution().await?;

        let sum: i64 = per_star
            .iter()
            .enumerate()
            .map(|(index, count)| (index as i64 + 1) * count)
            .sum();
        let average = if total_ratings > 0 {
            round1(sum as f64 / total_ratings as f64)
        } else {
            0.0
        };

        let distribution = (1..=5_u8)
            .zip(per_star)
            .map(|(star, count)| (star, count.max(0) as u64))
            .collect();

        Ok(PlatformStats {
            total_users: total_users.max(0) as u64,
            total_stores: total_stores.max(0) as u64,
            total_ratings: total_ratings.max(0) as u64,
            average_rating: average,
            distribution,
        })
    }
}
