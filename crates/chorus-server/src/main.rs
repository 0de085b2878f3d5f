//! Chorus server binary.
//!
//! Loads configuration, opens the store, connects the provider clients and
//! serves the HTTP API until SIGTERM/SIGINT.

use chorus_server::{app, config, AppState};
use chorus_voice::{ElevenLabsSynthesizer, GoogleTranscriber, OpenAiResponder};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

fn resolve_config_path() -> (Option<String>, &'static str) {
    if let Some(path) = std::env::args()
        .nth(1)
        .filter(|value| !value.trim().is_empty())
    {
        return (Some(path), "cli-arg");
    }

    if let Ok(path) = std::env::var("CHORUS_CONFIG_PATH") {
        if !path.trim().is_empty() {
            return (Some(path), "env-var");
        }
    }

    (None, "default")
}

#[tokio::main]
async fn main() {
    let (resolved_config_path, config_source) = resolve_config_path();
    let selected_config_path = resolved_config_path.as_deref().or(Some("config.toml"));

    let config = config::load_config(selected_config_path)
        .expect("failed to load configuration; the server cannot start without valid config");

    let filter =
        EnvFilter::try_new(&config.logging.level).unwrap_or_else(|_| EnvFilter::new("info"));

    if config.logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    tracing::info!(
        source = config_source,
        path = selected_config_path.unwrap_or("<none>"),
        "resolved startup configuration path"
    );
    tracing::debug!(
        transcriber = ?config.transcriber,
        responder = ?config.responder,
        synthesizer = ?config.synthesizer,
        "provider configuration"
    );

    for (provider, key) in [
        ("transcriber", &config.transcriber.api_key),
        ("responder", &config.responder.api_key),
        ("synthesizer", &config.synthesizer.api_key),
    ] {
        if key.is_empty() {
            tracing::warn!(provider, "API key not configured; requests to it will fail");
        }
    }

    let pool = chorus_db::open_store(&config.database.path, config.database.runtime_settings())
        .expect("failed to open database; check database.path in config");

    let transcriber = GoogleTranscriber::new(config.transcriber.clone())
        .expect("failed to build transcriber client");
    let responder =
        OpenAiResponder::new(config.responder.clone()).expect("failed to build responder client");
    let synthesizer = ElevenLabsSynthesizer::new(config.synthesizer.clone())
        .expect("failed to build synthesizer client");

    let state = AppState::new(
        pool,
        Arc::new(transcriber),
        Arc::new(responder),
        Arc::new(synthesizer),
        config.pipeline.clone(),
    );

    let app = app(state);
    let addr = SocketAddr::new(config.server.host, config.server.port);

    tracing::info!(%addr, "starting chorus server");

    let listener = TcpListener::bind(addr)
        .await
        .expect("failed to bind to address; is another process using this port?");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    tracing::info!("chorus server shut down");
}

/// Waits for a SIGINT (Ctrl+C) or SIGTERM signal for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { tracing::info!("received SIGINT, initiating graceful shutdown"); }
        () = terminate => { tracing::info!("received SIGTERM, initiating graceful shutdown"); }
    }
}
