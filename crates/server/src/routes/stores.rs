//! Store route handlers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use tracing::instrument;

use rately_core::{Email, StoreId, UserId};

use crate::error::AppError;
use crate::middleware::{OptionalAuth, RequireAuth};
use crate::models::views::{
    DashboardView, PagedPublicStores, PagedStores, PlatformStats, StoreDetailView, StoreView,
};
use crate::models::{NewStore, StorePatch, StoreQuery};
use crate::state::AppState;

/// Maximum accepted store name length.
const MAX_NAME_LEN: usize = 60;
/// Maximum accepted address length.
const MAX_ADDRESS_LEN: usize = 400;

/// Body for creating a store.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateStoreRequest {
    pub name: String,
    pub email: String,
    pub address: Option<String>,
    pub owner_id: i32,
}

/// Body for updating a store. Absent fields are left untouched.
#[derive(Debug, Deserialize)]
pub struct UpdateStoreRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

fn parse_name(name: String) -> Result<String, AppError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(AppError::InvalidArgument(
            "store name must not be empty".to_string(),
        ));
    }
    if name.len() > MAX_NAME_LEN {
        return Err(AppError::InvalidArgument(format!(
            "store name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(name)
}

fn parse_email(email: &str) -> Result<Email, AppError> {
    Email::parse(email).map_err(|e| AppError::InvalidArgument(e.to_string()))
}

fn parse_address(address: Option<String>) -> Result<Option<String>, AppError> {
    if let Some(address) = &address
        && address.len() > MAX_ADDRESS_LEN
    {
        return Err(AppError::InvalidArgument(format!(
            "address must be at most {MAX_ADDRESS_LEN} characters"
        )));
    }
    Ok(address)
}

/// `POST /stores`
#[instrument(skip(state, body), fields(user_id = %requester.id))]
pub async fn create(
    State(state): State<AppState>,
    RequireAuth(requester): RequireAuth,
    Json(body): Json<CreateStoreRequest>,
) -> Result<impl IntoResponse, AppError> {
    let new_store = NewStore {
        name: parse_name(body.name)?,
        email: parse_email(&body.email)?,
        address: parse_address(body.address)?,
        owner_id: UserId::new(body.owner_id),
    };
    let view = state.stores().create(requester, new_store).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /stores`
#[instrument(skip(state))]
pub async fn list(
    State(state): State<AppState>,
    RequireAuth(requester): RequireAuth,
    Query(query): Query<StoreQuery>,
) -> Result<Json<PagedStores>, AppError> {
    Ok(Json(state.stores().list(requester, &query).await?))
}

/// `GET /stores/public`
#[instrument(skip(state, viewer))]
pub async fn list_public(
    State(state): State<AppState>,
    OptionalAuth(viewer): OptionalAuth,
    Query(query): Query<StoreQuery>,
) -> Result<Json<PagedPublicStores>, AppError> {
    let viewer_id = viewer.map(|requester| requester.id);
    Ok(Json(state.stores().list_public(&query, viewer_id).await?))
}

/// `GET /stores/{id}`
#[instrument(skip(state))]
pub async fn get_by_id(
    State(state): State<AppState>,
    RequireAuth(requester): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<StoreDetailView>, AppError> {
    let view = state
        .stores()
        .get_by_id(requester, StoreId::new(id))
        .await?;
    Ok(Json(view))
}

/// `PATCH /stores/{id}`
#[instrument(skip(state, body), fields(user_id = %requester.id))]
pub async fn update(
    State(state): State<AppState>,
    RequireAuth(requester): RequireAuth,
    Path(id): Path<i32>,
    Json(body): Json<UpdateStoreRequest>,
) -> Result<Json<StoreView>, AppError> {
    let patch = StorePatch {
        name: body.name.map(parse_name).transpose()?,
        email: body.email.as_deref().map(parse_email).transpose()?,
        address: parse_address(body.address)?,
    };
    let view = state
        .stores()
        .update(requester, StoreId::new(id), patch)
        .await?;
    Ok(Json(view))
}

/// `DELETE /stores/{id}`
#[instrument(skip(state), fields(user_id = %requester.id))]
pub async fn delete(
    State(state): State<AppState>,
    RequireAuth(requester): RequireAuth,
    Path(id): Path<i32>,
) -> Result<Json<serde_json::Value>, AppError> {
    state.stores().delete(requester, StoreId::new(id)).await?;
    Ok(Json(
        serde_json::json!({ "message": "store and owner deleted successfully" }),
    ))
}

/// `GET /stores/dashboard/my-store`
#[instrument(skip(state), fields(user_id = %requester.id))]
pub async fn dashboard(
    State(state): State<AppState>,
    RequireAuth(requester): RequireAuth,
) -> Result<Json<DashboardView>, AppError> {
    Ok(Json(state.stores().dashboard(requester).await?))
}

/// `GET /stores/stats/overview`
#[instrument(skip(state))]
pub async fn platform_stats(
    State(state): State<AppState>,
    RequireAuth(requester): RequireAuth,
) -> Result<Json<PlatformStats>, AppError> {
    Ok(Json(state.dashboard().platform_stats(requester).await?))
}
