//! Rating route handlers.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::instrument;

use rately_core::{RatingId, RatingValue, StoreId, UserId};

use crate::error::AppError;
use crate::middleware::RequireAuth;
use crate::models::views::{RatingView, StatsView};
use crate::state::AppState;

/// Body for submitting a rating.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRatingRequest {
    pub store_id: i32,
    pub rating: i16,
}

/// Body for updating a rating.
#[derive(Debug, Deserialize)]
pub struct UpdateRatingRequest {
    pub rating: i16,
}

fn parse_value(raw: i16) -> Result<RatingValue, AppError> {
    RatingValue::new(raw).map_err(|e| AppError::InvalidArgument(e.to_string()))
}

/// `POST /ratings`
#[instrument(skip(state, body), fields(user_id = %requester.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(requester): RequireAuth,
    Json(body): Json<CreateRatingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let value = parse_value(body.rating)?;
    let view = state
        .ratings()
        .create(requester, StoreId::new(body.store_id), value)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// `PATCH /ratings/{id}`
#[instrument(skip(state, body), fields(user_id = %requester.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(requester): RequireAuth,
    Path(id): Path<i32>,
    Json(body): Json<UpdateRatingRequest>,
) -> Result<Json<RatingView>, AppError> {
    let value = parse_value(body.rating)?;
    let view = state
        .ratings()
        .update(requester, RatingId::new(id), value)
        .await?;
    Ok(Json(view))
}

/// `DELETE /ratings/{id}`
#[instrument(skip(state), fields(user_id = %requester.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(requester): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.ratings().delete(requester, RatingId::new(id)).await?;
    Ok(Json(
        serde_json::json!({ "message": "rating deleted successfully" }),
    ))
}

/// `GET /ratings`
#[instrument(skip(state))]
pub async fn list_all(
    State(state): State<AppState>,
    RequireAuth(requester): RequireAuth,
) -> Result<Json<Vec<RatingView>>, AppError> {
    Ok(Json(state.ratings().list_all(requester).await?))
}

/// `GET /ratings/store/{store_id}`
#[instrument(skip(state))]
pub async fn list_by_store(
    State(state): State<AppState>,
    RequireAuth(requester): RequireAuth,
    Path(store_id): Path<i32>,
) -> Result<Json<Vec<RatingView>>, AppError> {
    let views = state
        .ratings()
        .list_by_store(StoreId::new(store_id), requester)
        .await?;
    Ok(Json(views))
}

/// `GET /ratings/store/{store_id}/stats`
#[instrument(skip(state))]
pub async fn store_stats(
    State(state): State<AppState>,
    RequireAuth(requester): RequireAuth,
    Path(store_id): Path<i32>,
) -> Result<Json<StatsView>, AppError> {
    let stats = state
        .ratings()
        .store_stats(StoreId::new(store_id), requester)
        .await?;
    Ok(Json(stats))
}

/// `GET /ratings/user/{user_id}`
#[instrument(skip(state))]
pub async fn list_by_user(
    State(state): State<AppState>,
    RequireAuth(requester): RequireAuth,
    Path(user_id): Path<i32>,
) -> Result<Json<Vec<RatingView>>, AppError> {
    let views = state
        .ratings()
        .list_by_user(UserId::new(user_id), requester)
        .await?;
    Ok(Json(views))
}

/// `GET /ratings/user/{user_id}/store/{store_id}`
#[instrument(skip(state))]
pub async fn for_user_and_store(
    State(state): State<AppState>,
    RequireAuth(_requester): RequireAuth,
    Path((user_id, store_id)): Path<(i32, i32)>,
) -> Result<Json<Option<RatingView>>, AppError> {
    let view = state
        .ratings()
        .for_user_and_store(UserId::new(user_id), StoreId::new(store_id))
        .await?;
    Ok(Json(view))
}

/// `GET /ratings/my-ratings`
#[instrument(skip(state), fields(user_id = %requester.id))]
pub async fn my_ratings(
    State(state): State<AppState>,
    RequireAuth(requester): RequireAuth,
) -> Result<Json<Vec<RatingView>>, AppError> {
    let views = state
        .ratings()
        .list_by_user(requester.id, requester)
        .await?;
    Ok(Json(views))
}

/// `GET /ratings/my-rating/store/{store_id}`
#[instrument(skip(state), fields(user_id = %requester.id))]
pub async fn my_store_rating(
    State(state): State<AppState>,
    RequireAuth(requester): RequireAuth,
    Path(store_id): Path<i32>,
) -> Result<Json<Option<RatingView>>, AppError> {
    let view = state
        .ratings()
        .for_user_and_store(requester.id, StoreId::new(store_id))
        .await?;
    Ok(Json(view))
}
