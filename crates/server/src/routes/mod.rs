//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Health check
//!
//! # Ratings
//! POST   /ratings                             - Submit a rating
//! GET    /ratings                             - All ratings (admin)
//! PATCH  /ratings/{id}                        - Update own rating
//! DELETE /ratings/{id}                        - Delete own rating
//! GET    /ratings/store/{storeId}             - Ratings for a store (admin/owner)
//! GET    /ratings/store/{storeId}/stats       - Stats for a store (admin/owner)
//! GET    /ratings/user/{userId}               - Ratings by a user (admin/self)
//! GET    /ratings/user/{userId}/store/{storeId} - One (user, store) rating
//! GET    /ratings/my-ratings                  - Own ratings
//! GET    /ratings/my-rating/store/{storeId}   - Own rating for a store
//!
//! # Stores
//! GET    /stores/public                       - Public listing with viewer rating
//! POST   /stores                              - Create store (admin)
//! GET    /stores                              - Admin listing
//! GET    /stores/{id}                         - Store detail (admin)
//! PATCH  /stores/{id}                         - Update store (admin)
//! DELETE /stores/{id}                         - Delete store and owner (admin)
//! GET    /stores/dashboard/my-store           - Owner dashboard
//! GET    /stores/stats/overview               - Platform stats (admin)
//! ```

pub mod ratings;
pub mod stores;

use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

/// Create the rating routes router.
pub fn rating_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(ratings::create).get(ratings::list_all))
        .route(
            "/{id}",
            axum::routing::patch(ratings::update).delete(ratings::delete),
        )
        .route("/store/{store_id}", get(ratings::list_by_store))
        .route("/store/{store_id}/stats", get(ratings::store_stats))
        .route("/user/{user_id}", get(ratings::list_by_user))
        .route(
            "/user/{user_id}/store/{store_id}",
            get(ratings::for_user_and_store),
        )
        .route("/my-ratings", get(ratings::my_ratings))
        .route("/my-rating/store/{store_id}", get(ratings::my_store_rating))
}

/// Create the store routes router.
pub fn store_routes() -> Router<AppState> {
    Router::new()
        .route("/", post(stores::create).get(stores::list))
        .route("/public", get(stores::list_public))
        .route(
            "/{id}",
            get(stores::get_by_id)
                .patch(stores::update)
                .delete(stores::delete),
        )
        .route("/dashboard/my-store", get(stores::dashboard))
        .route("/stats/overview", get(stores::platform_stats))
}

/// Create all routes for the server.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/ratings", rating_routes())
        .nest("/stores", store_routes())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}
