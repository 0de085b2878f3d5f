//! Webhook binding endpoints.

use crate::api::{with_conn, ApiError};
use crate::AppState;
use axum::{extract::Path, http::StatusCode, Extension, Json};
use chorus_types::{BotWebhookLink, NewWebhook, PruneResult, ServerPruneResult, WebhookBinding};
use std::sync::Arc;

/// Handler for `POST /webhook-config`.
pub async fn create_webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(new): Json<NewWebhook>,
) -> Result<(StatusCode, Json<WebhookBinding>), ApiError> {
    let binding = with_conn(&state, move |conn| {
        Ok(chorus_store::create_webhook(conn, &new)?)
    })
    .await?;
    tracing::info!(
        server_id = %binding.server_id,
        channel_id = %binding.channel_id,
        "webhook binding created"
    );
    Ok((StatusCode::CREATED, Json(binding)))
}

/// Handler for `PUT /webhook-config/update`.
pub async fn update_webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(new): Json<NewWebhook>,
) -> Result<Json<WebhookBinding>, ApiError> {
    let binding = with_conn(&state, move |conn| {
        Ok(chorus_store::update_webhook(conn, &new)?)
    })
    .await?;
    Ok(Json(binding))
}

/// Handler for `GET /webhook-config/{server_id}/{channel_id}`.
pub async fn get_webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((server_id, channel_id)): Path<(String, String)>,
) -> Result<Json<WebhookBinding>, ApiError> {
    let binding = with_conn(&state, move |conn| {
        Ok(chorus_store::get_webhook(conn, &server_id, &channel_id)?)
    })
    .await?;
    Ok(Json(binding))
}

/// Handler for `DELETE /webhook-config/{server_id}/{channel_id}`.
///
/// A binding still linked to a bot is refused with 409.
pub async fn delete_webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((server_id, channel_id)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let message = format!("no webhook bound to channel {}", channel_id);
    let deleted = with_conn(&state, move |conn| {
        Ok(chorus_store::delete_webhook(conn, &server_id, &channel_id)?)
    })
    .await?;

    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(message))
    }
}

/// Handler for `GET /webhook-config/server/{server_id}`.
pub async fn list_server_webhooks_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(server_id): Path<String>,
) -> Result<Json<Vec<WebhookBinding>>, ApiError> {
    let bindings = with_conn(&state, move |conn| {
        Ok(chorus_store::list_server_webhooks(conn, &server_id)?)
    })
    .await?;
    Ok(Json(bindings))
}

/// Handler for `DELETE /webhook-config/prune/{server_id}/{channel_id}`.
///
/// Deletes the binding only if no bot uses it. Calling it again is a no-op.
pub async fn prune_webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((server_id, channel_id)): Path<(String, String)>,
) -> Result<Json<PruneResult>, ApiError> {
    let result = with_conn(&state, move |conn| {
        Ok(chorus_store::prune_webhook(conn, &server_id, &channel_id)?)
    })
    .await?;
    Ok(Json(result))
}

/// Handler for `DELETE /webhook-config/prune-server/{server_id}`.
pub async fn prune_server_webhooks_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path(server_id): Path<String>,
) -> Result<Json<ServerPruneResult>, ApiError> {
    let result = with_conn(&state, move |conn| {
        Ok(chorus_store::prune_server_webhooks(conn, &server_id)?)
    })
    .await?;
    tracing::info!(count = result.webhook_ids.len(), "unused webhook bindings pruned");
    Ok(Json(result))
}

/// Handler for `POST /bot-webhook`.
pub async fn link_bot_webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    Json(link): Json<BotWebhookLink>,
) -> Result<(StatusCode, Json<BotWebhookLink>), ApiError> {
    let link = with_conn(&state, move |conn| {
        Ok(chorus_store::link_bot_webhook(conn, &link)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(link)))
}

/// Handler for `DELETE /bot-webhook/{bot_id}/{webhook_id}`.
pub async fn unlink_bot_webhook_handler(
    Extension(state): Extension<Arc<AppState>>,
    Path((bot_id, webhook_id)): Path<(i64, i64)>,
) -> Result<StatusCode, ApiError> {
    let link = BotWebhookLink { bot_id, webhook_id };
    let removed = with_conn(&state, move |conn| {
        Ok(chorus_store::unlink_bot_webhook(conn, &link)?)
    })
    .await?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::NotFound(format!(
            "bot {} is not linked to webhook {}",
            bot_id, webhook_id
        )))
    }
}
