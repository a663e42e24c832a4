//! Store CRUD, listings, and the owner dashboard.

use std::collections::HashMap;
use std::sync::Arc;

use rately_core::{Role, StoreId, UserId};

use crate::db::EntityStore;
use crate::error::AppError;
use crate::models::views::{
    DashboardRatingView, DashboardStoreSummary, DashboardView, PagedPublicStores, PagedStores,
    PublicStoreView, StoreDetailView, StoreView,
};
use crate::models::{
    NewStore, Paged, Pagination, RatingStats, StoreFilter, StorePatch, StoreQuery, StoreRatingRow,
};

use super::policy::{self, Action, Requester};
use super::ratings::compute_stats;

/// Store operations: create, list (admin and public), read, update, delete,
/// and the owner dashboard.
#[derive(Clone)]
pub struct StoreService {
    store: Arc<dyn EntityStore>,
}

impl StoreService {
    #[must_use]
    pub fn new(store: Arc<dyn EntityStore>) -> Self {
        Self { store }
    }

    /// Register a store for an existing owner (admin only).
    ///
    /// The email check runs before the owner lookup, so a request that is
    /// wrong on both counts reports the email conflict.
    ///
    /// # Errors
    ///
    /// `Conflict` when the email or the owner's store slot is taken,
    /// `NotFound` when the owner does not exist.
    pub async fn create(
        &self,
        requester: Requester,
        new_store: NewStore,
    ) -> Result<StoreView, AppError> {
        policy::authorize(requester, Action::AdminOnly)?;

        if self
            .store
            .store_by_email(new_store.email.as_str())
            .await?
            .is_some()
        {
            return Err(AppError::Conflict(
                "store with this email already exists".to_string(),
            ));
        }
        if self.store.user_by_id(new_store.owner_id).await?.is_none() {
            return Err(AppError::not_found("User", new_store.owner_id));
        }

        let record = self.store.insert_store(new_store).await?;
        Ok(StoreView::new(record, &RatingStats::empty()))
    }

    /// One page of stores with owner projections and aggregates (admin only).
    ///
    /// # Errors
    ///
    /// `Forbidden` for non-admin callers, `InvalidArgument` on bad
    /// pagination bounds.
    pub async fn list(
        &self,
        requester: Requester,
        query: &StoreQuery,
    ) -> Result<PagedStores, AppError> {
        policy::authorize(requester, Action::AdminOnly)?;
        query
            .validate()
            .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

        let filter = StoreFilter::admin(query);
        let (records, total) = self
            .store
            .list_stores(&filter, query.sort(), query.window())
            .await?;

        let ratings = self.page_ratings(&records, |r| r.store.id).await?;
        let items = records
            .into_iter()
            .map(|record| {
                let stats = stats_for(&ratings, record.store.id);
                StoreView::new(record, &stats)
            })
            .collect();

        Ok(Paged {
            items,
            pagination: page_meta(query, total),
        })
    }

    /// One page of public store projections, each carrying the viewer's own
    /// rating when a viewer is known. No authorization; the email filter is
    /// silently ignored by [`StoreFilter::public`].
    ///
    /// # Errors
    ///
    /// `InvalidArgument` on bad pagination bounds.
    pub async fn list_public(
        &self,
        query: &StoreQuery,
        viewer: Option<UserId>,
    ) -> Result<PagedPublicStores, AppError> {
        query
            .validate()
            .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

        let filter = StoreFilter::public(query);
        let (records, total) = self
            .store
            .list_stores(&filter, query.sort(), query.window())
            .await?;

        let ratings = self.page_ratings(&records, |r| r.store.id).await?;
        let items = records
            .into_iter()
            .map(|record| {
                let stats = stats_for(&ratings, record.store.id);
                let user_rating = viewer.and_then(|viewer_id| {
                    ratings.get(&record.store.id).and_then(|rows| {
                        rows.iter()
                            .find(|row| row.user_id == viewer_id)
                            .map(|row| row.value.as_i16())
                    })
                });
                PublicStoreView {
                    id: record.store.id,
                    name: record.store.name,
                    address: record.store.address,
                    average_rating: stats.average,
                    total_ratings: stats.total,
                    user_rating,
                }
            })
            .collect();

        Ok(Paged {
            items,
            pagination: page_meta(query, total),
        })
    }

    /// Full store detail with owner, aggregates, and the complete rating
    /// list (admin only).
    ///
    /// # Errors
    ///
    /// `NotFound` when the store is absent, `Forbidden` for non-admins.
    pub async fn get_by_id(
        &self,
        requester: Requester,
        store_id: StoreId,
    ) -> Result<StoreDetailView, AppError> {
        policy::authorize(requester, Action::AdminOnly)?;

        let record = self
            .store
            .store_record_by_id(store_id)
            .await?
            .ok_or_else(|| AppError::not_found("Store", store_id))?;

        let ratings = self.store.ratings_by_store(store_id).await?;
        let values: Vec<_> = ratings.iter().map(|r| r.rating.value).collect();
        let stats = compute_stats(&values);

        Ok(StoreDetailView {
            store: StoreView::new(record, &stats),
            ratings: ratings.into_iter().map(Into::into).collect(),
        })
    }

    /// Apply a partial update to a store (admin only).
    ///
    /// # Errors
    ///
    /// `NotFound` when the store is absent, `Conflict` when a new email
    /// collides with another store.
    pub async fn update(
        &self,
        requester: Requester,
        store_id: StoreId,
        patch: StorePatch,
    ) -> Result<StoreView, AppError> {
        policy::authorize(requester, Action::AdminOnly)?;

        let current = self
            .store
            .store_by_id(store_id)
            .await?
            .ok_or_else(|| AppError::not_found("Store", store_id))?;

        if let Some(email) = &patch.email
            && *email != current.email
            && self.store.store_by_email(email.as_str()).await?.is_some()
        {
            return Err(AppError::Conflict(
                "store with this email already exists".to_string(),
            ));
        }

        let record = if patch.is_empty() {
            self.store
                .store_record_by_id(store_id)
                .await?
                .ok_or_else(|| AppError::not_found("Store", store_id))?
        } else {
            self.store.update_store(store_id, patch).await?
        };

        let values = self.store.rating_values_by_store(store_id).await?;
        Ok(StoreView::new(record, &compute_stats(&values)))
    }

    /// Delete a store together with its owning user (admin only).
    ///
    /// The store's ratings cascade with the store; the whole removal is one
    /// transaction, so a failure on either row leaves everything in place.
    ///
    /// # Errors
    ///
    /// `NotFound` when the store is absent, `Forbidden` for non-admins.
    pub async fn delete(&self, requester: Requester, store_id: StoreId) -> Result<(), AppError> {
        policy::authorize(requester, Action::AdminOnly)?;

        let store = self
            .store
            .store_by_id(store_id)
            .await?
            .ok_or_else(|| AppError::not_found("Store", store_id))?;

        self.store
            .delete_store_with_owner(store.id, store.owner_id)
            .await?;
        Ok(())
    }

    /// The owner dashboard: the requester's store with aggregates and its
    /// full rating list, newest first.
    ///
    /// # Errors
    ///
    /// `Forbidden` when the requester is not a store owner, `NotFound` when
    /// no store is registered to them.
    pub async fn dashboard(&self, requester: Requester) -> Result<DashboardView, AppError> {
        if requester.role != Role::StoreOwner {
            return Err(AppError::Forbidden(
                "store owner access required".to_string(),
            ));
        }

        let store = self
            .store
            .store_by_owner(requester.id)
            .await?
            .ok_or_else(|| AppError::NotFound("you do not own a store".to_string()))?;

        let ratings = self.store.ratings_by_store(store.id).await?;
        let values: Vec<_> = ratings.iter().map(|r| r.rating.value).collect();
        let stats = compute_stats(&values);

        Ok(DashboardView {
            store: DashboardStoreSummary {
                id: store.id,
                name: store.name,
                email: store.email,
                address: store.address,
                average_rating: stats.average,
                total_ratings: stats.total,
            },
            ratings: ratings
                .into_iter()
                .map(|record| DashboardRatingView {
                    id: record.rating.id,
                    rating: record.rating.value.as_i16(),
                    created_at: record.rating.created_at,
                    user: record.user,
                })
                .collect(),
        })
    }

    /// Fetch rating rows for one page of stores in a single query, grouped
    /// by store.
    async fn page_ratings<T>(
        &self,
        records: &[T],
        id_of: impl Fn(&T) -> StoreId,
    ) -> Result<HashMap<StoreId, Vec<StoreRatingRow>>, AppError> {
        let ids: Vec<_> = records.iter().map(id_of).collect();
        let rows = self.store.ratings_for_stores(&ids).await?;

        let mut grouped: HashMap<StoreId, Vec<StoreRatingRow>> = HashMap::new();
        for row in rows {
            grouped.entry(row.store_id).or_default().push(row);
        }
        Ok(grouped)
    }
}

fn stats_for(ratings: &HashMap<StoreId, Vec<StoreRatingRow>>, store_id: StoreId) -> RatingStats {
    ratings.get(&store_id).map_or_else(RatingStats::empty, |rows| {
        let values: Vec<_> = rows.iter().map(|row| row.value).collect();
        compute_stats(&values)
    })
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)] // counts are non-negative
fn page_meta(query: &StoreQuery, total: i64) -> Pagination {
    Pagination::new(query.page, query.limit, total.max(0) as u64)
}
