//! # Authorization Gate HTTP Server
//!
//! Exposes the request gate over HTTP so a backend written in any stack can
//! ask whether a request may proceed.
//!
//! ## Endpoints
//!
//! - `POST /v1/authorize` - Gate a request
//! - `GET /health` - Health check
//! - `GET /metrics` - Prometheus metrics (separate listener)
//!
//! ## Configuration
//!
//! Environment variables:
//! - `PORT` - HTTP server port (default: 8080)
//! - `METRICS_PORT` - Metrics server port (default: 9090)
//! - `AUTHZ_CONFIG` - TOML file with gate settings, roles, resources, actors
//!   and records
//! - `RUST_LOG` - Log level (default: info)

use anyhow::Context;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    serve, Router,
};
use backoffice_authz::{
    session::{InMemoryActorStore, MemorySession, TaskLocale},
    ActorId, AuthzConfig, DefaultFormatter, GateOutcome, GateTarget, MessageFormatter,
    RequestGate, RequestInfo, SessionStore,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{error, info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Shared application state
#[derive(Clone)]
struct AppState {
    gate: Arc<RequestGate>,
    formatter: DefaultFormatter,
    start_time: std::time::Instant,
}

/// Gate request; the session is represented by its identity token
#[derive(Debug, Deserialize)]
struct AuthorizeRequest {
    #[serde(default)]
    actor_id: Option<ActorId>,

    path: String,

    #[serde(default)]
    uri: String,

    #[serde(default)]
    referer: Option<String>,

    #[serde(flatten)]
    target: GateTarget,
}

#[derive(Debug, Serialize)]
struct AuthorizeResponse {
    allowed: bool,
    outcome: GateOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    /// Locale resolved for this request's actor
    #[serde(skip_serializing_if = "Option::is_none")]
    locale: Option<String>,
    /// The caller must drop its session
    session_cleared: bool,
    request_id: String,
}

/// Health check response
#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    uptime_seconds: u64,
    version: String,
    timestamp: String,
}

/// Metrics response (Prometheus format)
struct MetricsResponse {
    metrics: String,
}

impl IntoResponse for MetricsResponse {
    fn into_response(self) -> Response {
        (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4")],
            self.metrics,
        )
            .into_response()
    }
}

/// POST /v1/authorize - Gate a request
async fn authorize(
    State(state): State<AppState>,
    Json(req): Json<AuthorizeRequest>,
) -> Json<AuthorizeResponse> {
    let request_id = uuid::Uuid::new_v4().to_string();
    info!(
        "Authorize [{}]: actor={:?}, action={}, resource={}",
        request_id, req.actor_id, req.target.action, req.target.resource
    );

    let mut session = match req.actor_id {
        Some(id) => MemorySession::signed_in(id),
        None => MemorySession::new(),
    };

    let request = RequestInfo {
        path: req.path,
        uri: req.uri,
        referer: req.referer,
    };

    let (outcome, locale) =
        TaskLocale::scope(state.gate.enforce(&mut session, &request, &req.target)).await;

    let message = outcome
        .denial()
        .map(|denial| state.formatter.format(denial.key, &denial.params));

    Json(AuthorizeResponse {
        allowed: outcome.actor().is_some(),
        session_cleared: req.actor_id.is_some() && session.actor_id().is_none(),
        outcome,
        message,
        locale,
        request_id,
    })
}

/// GET /health - Health check endpoint
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        version: backoffice_authz::VERSION.to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// GET /metrics - Prometheus metrics endpoint
async fn metrics(State(state): State<AppState>) -> MetricsResponse {
    let uptime = state.start_time.elapsed().as_secs();

    let metrics = format!(
        "# HELP gate_uptime_seconds Server uptime in seconds\n\
         # TYPE gate_uptime_seconds gauge\n\
         gate_uptime_seconds {}\n\
         \n{}",
        uptime,
        state.gate.metrics().export_prometheus().await
    );

    MetricsResponse { metrics }
}

/// Create the HTTP router with all endpoints
fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let trace = TraceLayer::new_for_http()
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    Router::new()
        .route("/v1/authorize", post(authorize))
        .route("/health", get(health_check))
        .layer(ServiceBuilder::new().layer(trace).layer(cors))
        .with_state(state)
}

/// Create the metrics router
fn create_metrics_router(state: AppState) -> Router {
    Router::new()
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Graceful shutdown handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received SIGTERM signal");
        }
    }

    info!("Starting graceful shutdown");
}

fn env_port(name: &str, default: u16) -> u16 {
    std::env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn load_config() -> anyhow::Result<AuthzConfig> {
    match std::env::var("AUTHZ_CONFIG") {
        Ok(path) => {
            info!("Loading configuration from {}", path);
            AuthzConfig::from_file(&path).with_context(|| format!("loading {}", path))
        }
        Err(_) => {
            info!("AUTHZ_CONFIG not set, using defaults");
            Ok(AuthzConfig::from_toml_str("")?)
        }
    }
}

/// Main server entrypoint
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Authorization Gate Server v{}", backoffice_authz::VERSION);

    let port = env_port("PORT", 8080);
    let metrics_port = env_port("METRICS_PORT", 9090);

    let config = load_config()?;
    let table = config.capability_table()?;
    let registry = config.resource_registry()?;
    let actors = InMemoryActorStore::with_actors(config.actors.clone());
    let records = config.record_store()?;

    info!("Configuration:");
    info!("  Port: {}", port);
    info!("  Metrics Port: {}", metrics_port);
    info!("  Roles: {}", table.roles().count());
    info!("  Resources: {}", registry.len());
    info!("  Seed actors: {}", actors.len());
    info!("  Seed records: {}", records.len());

    let gate = RequestGate::new(
        config.gate,
        table,
        Arc::new(registry),
        Arc::new(actors),
        Arc::new(records),
        Arc::new(TaskLocale),
    );

    let state = AppState {
        gate: Arc::new(gate),
        formatter: DefaultFormatter,
        start_time: std::time::Instant::now(),
    };

    let app = create_router(state.clone());
    let addr = SocketAddr::from(([0, 0, 0, 0], port));

    let metrics_app = create_metrics_router(state);
    let metrics_addr = SocketAddr::from(([0, 0, 0, 0], metrics_port));

    info!("Starting HTTP server on {}", addr);
    info!("Starting metrics server on {}", metrics_addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding HTTP server to {}", addr))?;
    let metrics_listener = tokio::net::TcpListener::bind(metrics_addr)
        .await
        .with_context(|| format!("binding metrics server to {}", metrics_addr))?;

    let server = serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    let metrics_server = serve(metrics_listener, metrics_app.into_make_service())
        .with_graceful_shutdown(shutdown_signal());

    tokio::try_join!(
        async {
            server.await.map_err(|e| {
                error!("HTTP server error: {}", e);
                e
            })
        },
        async {
            metrics_server.await.map_err(|e| {
                error!("Metrics server error: {}", e);
                e
            })
        }
    )?;

    info!("Servers shut down gracefully");
    Ok(())
}
