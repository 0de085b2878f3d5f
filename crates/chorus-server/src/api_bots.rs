//! Bot configuration endpoints.

use crate::api::{with_conn, ApiError};
use crate::AppState;
use axum::{extract::Path, http::StatusCode, Extension, Json};
use chorus_store::StoreError;
use chorus_types::{Bot, BotKey, BotUpdate, ChannelBot, NewBot, Tier, VoiceAssignment};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Request body for `PUT /bot-voice`.
#[derive(Debug, Deserialize)]
pub struct BotVoiceRequest {
    pub server_id: String,
    pub name: String,
    pub provider_voice_id: String,
    #[serde(default)]
    pub custom: bool,
}

/// Response for the bulk delete endpoints.
#[derive(Debug, Serialize)]
pub struct DeletedBotsResponse {
    pub deleted: usize,
    pub bots: Vec<Bot>,
}

impl From<Vec<Bot>> for DeletedBotsResponse {
    fn from(bots: Vec<Bot>) -> Self {
        Self {
            deleted: bots.len(),
            bots,
        }
    }
}

/// Tier of an owner; owners that are not yet registered count as free.
fn owner_tier(conn: &Connection, owner_id: &str) -> Result<Tier, ApiError> {
    match chorus_store::get_user(conn, owner_id) {
        Ok(user) => Ok(user.effective_tier()),
        Err(StoreError::NotFound(_)) => Ok(Tier::default()),
        Err(e) => Err(e.into()),
    }
}

fn owner_bot_count(conn: &Connection, owner_id: &str) -> Result<u32, ApiError> {
    match chorus_store::get_user_bot_count(conn, owner_id) {
        Ok(count) => Ok(count.bot_count),
        Err(StoreError::NotFound(_)) => Ok(0),
        Err(e) => Err(e.into()),
    }
}

/// Handler for `POST /bot-config`.
pub async fn create_bot_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(new): Json<NewBot>,
) -> Result<(StatusCode, Json<Bot>), ApiError> {
    let bot = with_conn(&state, move |conn| {
        let key = BotKey::new(new.server_id.clone(), new.name.clone());
        if chorus_store::find_bot(conn, &key)?.is_some() {
            return Err(ApiError::Conflict(format!(
                "bot '{}' already exists on server {}",
                key.name, key.server_id
            )));
        }
        let tier = owner_tier(conn, &new.owner_id)?;
        let count = owner_bot_count(conn, &new.owner_id)?;
        if !tier.allows_another_bot(count) {
            tracing::info!(owner_id = %new.owner_id, %tier, count, "bot quota reached");
            return Err(ApiError::Forbidden(format!(
                "bot limit reached for {} tier",
                tier
            )));
        }
        if new.custom_voice && !tier.limits().custom_voice {
            return Err(ApiError::Forbidden(format!(
                "custom voices are not available on the {} tier",
                tier
            )));
        }
        Ok(chorus_store::create_bot(conn, &new)?)
    })
    .await?;

    tracing::info!(bot_id = bot.id, server_id = %bot.server_id, name = %bot.name, "bot created");
    Ok((StatusCode::CREATED, Json(bot)))
}

/// Handler for `GET /bot-config/{server_id}/{name}`.
pub async fn get_bot_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((server_id, name)): Path<(String, String)>,
) -> Result<Json<Bot>, ApiError> {
    let key = BotKey::new(server_id, name);
    let bot = with_conn(&state, move |conn| Ok(chorus_store::get_bot(conn, &key)?)).await?;
    Ok(Json(bot))
}

/// Handler for `PUT /bot-config/{server_id}/{name}`.
pub async fn update_bot_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((server_id, name)): Path<(String, String)>,
    Json(update): Json<BotUpdate>,
) -> Result<Json<Bot>, ApiError> {
    let key = BotKey::new(server_id, name);
    let bot = with_conn(&state, move |conn| {
        Ok(chorus_store::update_bot(conn, &key, &update)?)
    })
    .await?;
    Ok(Json(bot))
}

/// Handler for `DELETE /bot-config/{server_id}/{name}`.
pub async fn delete_bot_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((server_id, name)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let key = BotKey::new(server_id, name);
    let message = format!("bot {} not found in server {}", key.name, key.server_id);
    let deleted = with_conn(&state, move |conn| Ok(chorus_store::delete_bot(conn, &key)?)).await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(message))
    }
}

/// Handler for `GET /bot-config/list/{owner_id}/{server_id}`.
pub async fn list_owner_bots_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((owner_id, server_id)): Path<(String, String)>,
) -> Result<Json<Vec<Bot>>, ApiError> {
    let bots = with_conn(&state, move |conn| {
        Ok(chorus_store::list_owner_bots(conn, &owner_id, &server_id)?)
    })
    .await?;
    Ok(Json(bots))
}

/// Handler for `GET /bot-config/channel/{server_id}/{channel_id}`.
pub async fn channel_bots_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((server_id, channel_id)): Path<(String, String)>,
) -> Result<Json<Vec<ChannelBot>>, ApiError> {
    let bots = with_conn(&state, move |conn| {
        Ok(chorus_store::resolve_bots_by_channel(
            conn,
            &server_id,
            &channel_id,
        )?)
    })
    .await?;
    Ok(Json(bots))
}

/// Handler for `DELETE /bot-config/owner/{owner_id}`.
///
/// Removes every bot the owner has and the owner record itself.
pub async fn delete_owner_bots_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(owner_id): Path<String>,
) -> Result<Json<DeletedBotsResponse>, ApiError> {
    let bots = with_conn(&state, move |conn| {
        Ok(chorus_store::delete_bots_by_owner(conn, &owner_id, None)?)
    })
    .await?;
    Ok(Json(bots.into()))
}

/// Handler for `DELETE /bot-config/owner/{owner_id}/server/{server_id}`.
pub async fn delete_owner_server_bots_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((owner_id, server_id)): Path<(String, String)>,
) -> Result<Json<DeletedBotsResponse>, ApiError> {
    let bots = with_conn(&state, move |conn| {
        Ok(chorus_store::delete_bots_by_owner(
            conn,
            &owner_id,
            Some(&server_id),
        )?)
    })
    .await?;
    Ok(Json(bots.into()))
}

/// Handler for `DELETE /bot-config/server/{server_id}`.
pub async fn delete_server_bots_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(server_id): Path<String>,
) -> Result<Json<DeletedBotsResponse>, ApiError> {
    let bots = with_conn(&state, move |conn| {
        Ok(chorus_store::delete_bots_by_server(conn, &server_id)?)
    })
    .await?;
    tracing::info!(count = bots.len(), "server bots deleted");
    Ok(Json(bots.into()))
}

/// Handler for `PUT /bot-voice`.
///
/// Assigning a cloned voice requires a tier that allows custom voices.
pub async fn update_bot_voice_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(req): Json<BotVoiceRequest>,
) -> Result<Json<Bot>, ApiError> {
    let bot = with_conn(&state, move |conn| {
        let key = BotKey::new(req.server_id, req.name);
        if req.custom {
            let bot = chorus_store::get_bot(conn, &key)?;
            let tier = owner_tier(conn, &bot.owner_id)?;
            if !tier.limits().custom_voice {
                return Err(ApiError::Forbidden(format!(
                    "custom voices are not available on the {} tier",
                    tier
                )));
            }
        }
        let assignment = VoiceAssignment {
            provider_voice_id: req.provider_voice_id,
            custom: req.custom,
        };
        Ok(chorus_store::update_bot_voice(conn, &key, &assignment)?)
    })
    .await?;
    Ok(Json(bot))
}
