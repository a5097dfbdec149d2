//! Segment publisher: serves the stream directory over HTTP.

use crate::config::Config;
use crate::curator::ContentSet;
use crate::pipeline::PipelineState;
use anyhow::{Context, Result};
use axum::{
    body::Body,
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde_json::json;
use signal_av::OutputProfile;
use signal_common::paths::MANIFEST_FILE;
use std::future::Future;
use std::net::SocketAddr;
use std::path::PathBuf;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tower_http::{
    services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};

pub const SERVICE_NAME: &str = "Midnight Signal Broadcast Engine";

const ALLOW_ORIGIN: &str = "*";
const ALLOW_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";
const ALLOW_HEADERS: &str = "Origin, X-Requested-With, Content-Type, Accept, Range";
const EXPOSE_HEADERS: &str = "Content-Length, Content-Range";

/// Shared publisher context
#[derive(Clone)]
pub struct PublisherContext {
    pub stream_dir: PathBuf,
    pub content_dir: PathBuf,
    /// e.g. `854x480 @ 192k`
    pub stream_quality: String,
    /// Seconds of media the manifest window spans; segments are cacheable
    /// for that long.
    pub window_secs: u64,
    pub pipeline: watch::Receiver<PipelineState>,
}

impl PublisherContext {
    pub fn from_config(config: &Config, pipeline: watch::Receiver<PipelineState>) -> Self {
        Self {
            stream_dir: config.paths.stream_dir.clone(),
            content_dir: config.paths.content_dir.clone(),
            stream_quality: OutputProfile::broadcast().quality_label(),
            window_secs: u64::from(config.transcode.segment_seconds)
                * u64::from(config.transcode.window_size),
            pipeline,
        }
    }

    pub fn stream_url(&self) -> String {
        format!("/stream/{MANIFEST_FILE}")
    }
}

/// Create the Axum router with all routes
pub fn create_router(ctx: PublisherContext) -> Router {
    let stream_files = ServeDir::new(&ctx.stream_dir);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .nest_service("/stream", stream_files)
        .fallback(not_found)
        .layer(middleware::from_fn_with_state(ctx.clone(), cache_headers))
        .layer(middleware::from_fn(preflight))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static(ALLOW_ORIGIN),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_EXPOSE_HEADERS,
            HeaderValue::from_static(EXPOSE_HEADERS),
        ))
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

/// Answer every preflight with an empty 200, whatever the path.
async fn preflight(request: Request, next: Next) -> Response {
    if request.method() == Method::OPTIONS {
        return StatusCode::OK.into_response();
    }
    next.run(request).await
}

/// The manifest changes every segment and must never be cached; segments
/// are immutable for as long as the window lists them.
async fn cache_headers(
    State(ctx): State<PublisherContext>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let mut response = next.run(request).await;
    if !response.status().is_success() {
        return response;
    }

    let value = if path.ends_with(".m3u8") {
        Some("no-cache, no-store".to_string())
    } else if path.ends_with(".ts") {
        Some(format!("public, max-age={}", ctx.window_secs))
    } else {
        None
    };
    if let Some(value) = value.and_then(|v| HeaderValue::from_str(&v).ok()) {
        response.headers_mut().insert(header::CACHE_CONTROL, value);
    }
    response
}

async fn health_check(State(ctx): State<PublisherContext>) -> impl IntoResponse {
    let ready = ctx.stream_dir.is_dir();
    let pipeline = *ctx.pipeline.borrow();

    Json(json!({
        "status": if ready { "ok" } else { "starting" },
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        "pipeline": pipeline,
        "publishing": ready && pipeline == PipelineState::Publishing,
    }))
}

async fn root(State(ctx): State<PublisherContext>) -> impl IntoResponse {
    let stream_files = match signal_av::transcode::list_artifacts(&ctx.stream_dir) {
        Ok(files) => files,
        Err(e) => {
            tracing::warn!("Failed to list {:?}: {}", ctx.stream_dir, e);
            Vec::new()
        }
    };
    let videos = ContentSet::scan(&ctx.content_dir);

    Json(json!({
        "service": SERVICE_NAME,
        "status": "running",
        "streamQuality": ctx.stream_quality,
        "videosInPlaylist": videos.len(),
        "streamFiles": stream_files,
        "streamUrl": ctx.stream_url(),
    }))
}

async fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Body::empty()).into_response()
}

/// Bind the listener for `config.server`.
pub async fn bind(config: &Config) -> Result<TcpListener> {
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server address")?;
    TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))
}

/// Serve until `shutdown` resolves.
pub async fn serve(
    listener: TcpListener,
    ctx: PublisherContext,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<()> {
    let app = create_router(ctx.clone());

    if let Ok(addr) = listener.local_addr() {
        tracing::info!("HLS stream server listening on {}", addr);
    }
    tracing::info!("Stream quality: {}", ctx.stream_quality);
    tracing::info!("Stream available at {}", ctx.stream_url());

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Publish an existing stream directory without running the pipeline.
pub async fn start_server(config: Config) -> Result<()> {
    let (_state_tx, state_rx) = watch::channel(PipelineState::Publishing);
    let ctx = PublisherContext::from_config(&config, state_rx);
    let listener = bind(&config).await?;
    serve(listener, ctx, shutdown_signal()).await
}

pub async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => {}
            Err(e) => {
                tracing::error!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received");
}
