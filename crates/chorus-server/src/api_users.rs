//! Bot owner endpoints.

use crate::api::{with_conn, ApiError};
use crate::AppState;
use axum::{extract::Path, http::StatusCode, Extension, Json};
use chorus_types::{Tier, User, UserBotCount};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    pub user_id: String,
    #[serde(default)]
    pub tier: Option<Tier>,
}

#[derive(Debug, Deserialize)]
pub struct SetTierRequest {
    pub tier: Tier,
}

/// Handler for `POST /user`.
pub async fn create_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let user = with_conn(&state, move |conn| {
        Ok(chorus_store::create_user(conn, &req.user_id, req.tier)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Handler for `GET /user/{user_id}`.
pub async fn get_user_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let user = with_conn(&state, move |conn| Ok(chorus_store::get_user(conn, &user_id)?)).await?;
    Ok(Json(user))
}

/// Handler for `GET /user/{user_id}/bot-count`.
pub async fn get_user_bot_count_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserBotCount>, ApiError> {
    let count = with_conn(&state, move |conn| {
        Ok(chorus_store::get_user_bot_count(conn, &user_id)?)
    })
    .await?;
    Ok(Json(count))
}

/// Handler for `PUT /user/{user_id}/tier`.
pub async fn set_user_tier_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(req): Json<SetTierRequest>,
) -> Result<Json<User>, ApiError> {
    let user = with_conn(&state, move |conn| {
        Ok(chorus_store::set_user_tier(conn, &user_id, req.tier)?)
    })
    .await?;
    tracing::info!(user_id = %user.user_id, tier = ?user.tier, "tier updated");
    Ok(Json(user))
}
