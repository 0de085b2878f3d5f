//! HTTP server for Chorus.
//!
//! Exposes the bot, webhook and owner configuration store, thin passthroughs
//! to the speech and language providers, and the `/turn` endpoint that runs
//! one full voice conversation turn.

pub mod api;
pub mod api_bots;
pub mod api_turn;
pub mod api_users;
pub mod api_voice;
pub mod api_webhooks;
pub mod config;

use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post, put},
    Extension, Json, Router,
};
use chorus_db::DbPool;
use chorus_pipeline::{PipelineConfig, SqliteBotDirectory, TurnPipeline};
use chorus_voice::{Responder, Synthesizer, Transcriber, MAX_AUDIO_BYTES};
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Request bodies may carry one audio clip plus its metadata.
const MAX_REQUEST_BODY_BYTES: usize = MAX_AUDIO_BYTES + 1024 * 1024;

/// Application state shared across request handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: DbPool,
    pub transcriber: Arc<dyn Transcriber>,
    pub responder: Arc<dyn Responder>,
    pub synthesizer: Arc<dyn Synthesizer>,
    /// Turn pipeline wired to the adapters above and to `pool`.
    pub pipeline: TurnPipeline,
}

impl AppState {
    pub fn new(
        pool: DbPool,
        transcriber: Arc<dyn Transcriber>,
        responder: Arc<dyn Responder>,
        synthesizer: Arc<dyn Synthesizer>,
        pipeline_config: PipelineConfig,
    ) -> Self {
        let pipeline = TurnPipeline::new(
            transcriber.clone(),
            responder.clone(),
            synthesizer.clone(),
            Arc::new(SqliteBotDirectory::new(pool.clone())),
            pipeline_config,
        );
        Self {
            pool,
            transcriber,
            responder,
            synthesizer,
            pipeline,
        }
    }
}

/// Health check handler.
async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Builds the application router.
pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        // Bots
        .route("/bot-config", post(api_bots::create_bot_handler))
        .route(
            "/bot-config/{server_id}/{name}",
            get(api_bots::get_bot_handler)
                .put(api_bots::update_bot_handler)
                .delete(api_bots::delete_bot_handler),
        )
        .route(
            "/bot-config/list/{owner_id}/{server_id}",
            get(api_bots::list_owner_bots_handler),
        )
        .route(
            "/bot-config/channel/{server_id}/{channel_id}",
            get(api_bots::channel_bots_handler),
        )
        .route(
            "/bot-config/owner/{owner_id}",
            delete(api_bots::delete_owner_bots_handler),
        )
        .route(
            "/bot-config/owner/{owner_id}/server/{server_id}",
            delete(api_bots::delete_owner_server_bots_handler),
        )
        .route(
            "/bot-config/server/{server_id}",
            delete(api_bots::delete_server_bots_handler),
        )
        .route("/bot-voice", put(api_bots::update_bot_voice_handler))
        // Webhooks
        .route("/webhook-config", post(api_webhooks::create_webhook_handler))
        .route(
            "/webhook-config/update",
            put(api_webhooks::update_webhook_handler),
        )
        .route(
            "/webhook-config/server/{server_id}",
            get(api_webhooks::list_server_webhooks_handler),
        )
        .route(
            "/webhook-config/prune/{server_id}/{channel_id}",
            delete(api_webhooks::prune_webhook_handler),
        )
        .route(
            "/webhook-config/prune-server/{server_id}",
            delete(api_webhooks::prune_server_webhooks_handler),
        )
        .route(
            "/webhook-config/{server_id}/{channel_id}",
            get(api_webhooks::get_webhook_handler).delete(api_webhooks::delete_webhook_handler),
        )
        .route("/bot-webhook", post(api_webhooks::link_bot_webhook_handler))
        .route(
            "/bot-webhook/{bot_id}/{webhook_id}",
            delete(api_webhooks::unlink_bot_webhook_handler),
        )
        // Owners
        .route("/user", post(api_users::create_user_handler))
        .route("/user/{user_id}", get(api_users::get_user_handler))
        .route(
            "/user/{user_id}/bot-count",
            get(api_users::get_user_bot_count_handler),
        )
        .route("/user/{user_id}/tier", put(api_users::set_user_tier_handler))
        // Providers
        .route("/transcribe-audio", post(api_voice::transcribe_handler))
        .route("/text-to-speech", post(api_voice::text_to_speech_handler))
        .route("/generate", post(api_voice::generate_handler))
        .route("/turn", post(api_turn::turn_handler))
        .layer(DefaultBodyLimit::max(MAX_REQUEST_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(Extension(Arc::new(state)))
}
