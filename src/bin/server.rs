use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use anyhow::{Context, Result};
use axum::{
    Form, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pincode_lookup::controller::INVALID_POSTAL_CODE_MESSAGE;
use pincode_lookup::{
    ClientConfig, Geocoder, LookupController, LookupError, View, ZippopotamClient, project,
    render_page,
};

/// Server configuration
struct ServerConfig {
    port: u16,
}

impl ServerConfig {
    fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(3000),
        }
    }
}

/// Application state shared across all requests
#[derive(Clone)]
struct AppState {
    geocoder: Arc<dyn Geocoder>,
    /// The single browser session served by `/`
    session: Arc<Mutex<LookupController>>,
    metrics: Arc<Metrics>,
}

/// Server metrics
struct Metrics {
    total_lookups: AtomicU64,
    lookups_in_flight: AtomicU64,
    start_time: Instant,
}

/// RAII guard for tracking in-flight lookups
struct LookupGuard<'a>(&'a AtomicU64);

impl<'a> LookupGuard<'a> {
    fn start(metrics: &'a Metrics) -> Self {
        metrics.total_lookups.fetch_add(1, Ordering::Relaxed);
        metrics.lookups_in_flight.fetch_add(1, Ordering::Relaxed);
        Self(&metrics.lookups_in_flight)
    }
}

impl<'a> Drop for LookupGuard<'a> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing/logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "server=info,pincode_lookup=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();

    let client = ZippopotamClient::with_config(ClientConfig::from_env())
        .context("Failed to initialize lookup client")?;

    let app = build_app(Arc::new(client));

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server shut down gracefully");
    Ok(())
}

/// Build the Axum application with routes and middleware
fn build_app(geocoder: Arc<dyn Geocoder>) -> Router {
    let metrics = Arc::new(Metrics {
        total_lookups: AtomicU64::new(0),
        lookups_in_flight: AtomicU64::new(0),
        start_time: Instant::now(),
    });

    let state = AppState {
        geocoder,
        session: Arc::new(Mutex::new(LookupController::new())),
        metrics,
    };

    Router::new()
        .route("/health", get(health_check))
        // Session page
        .route("/", get(show_page))
        .route("/lookup", post(submit_lookup))
        .route("/clear", post(clear_session))
        // API routes
        .route("/api/state", get(get_state))
        .route("/api/lookup/:postal_code", get(lookup_once))
        .route("/api/metrics", get(get_metrics))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn show_page(State(state): State<AppState>) -> Html<String> {
    let view = project(&*state.session.lock().await);
    Html(render_page(&view).into_string())
}

#[derive(Deserialize)]
struct LookupForm {
    #[serde(default)]
    postal_code: String,
}

/// Update the session query and look it up.
///
/// The session lock is released while the request is in flight; a response
/// overtaken by a newer submit is discarded by the controller.
async fn submit_lookup(
    State(state): State<AppState>,
    Form(form): Form<LookupForm>,
) -> Html<String> {
    let pending = {
        let mut session = state.session.lock().await;
        session.update_query(form.postal_code);
        session.begin_submit()
    };

    if let Ok(pending) = pending {
        let _guard = LookupGuard::start(&state.metrics);
        let outcome = state.geocoder.lookup(&pending.postal_code).await;
        let _ = state.session.lock().await.finish_submit(pending, outcome);
    }

    show_page(State(state)).await
}

async fn clear_session(State(state): State<AppState>) -> Html<String> {
    state.session.lock().await.clear();
    show_page(State(state)).await
}

async fn get_state(State(state): State<AppState>) -> Json<View> {
    Json(project(&*state.session.lock().await))
}

/// Stateless lookup with its own throwaway session
async fn lookup_once(
    State(state): State<AppState>,
    Path(postal_code): Path<String>,
) -> Result<Json<LookupResponse>, ApiError> {
    let _guard = LookupGuard::start(&state.metrics);

    let mut controller = LookupController::new();
    controller.update_query(postal_code);

    controller
        .submit(&state.geocoder)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(LookupResponse {
        success: true,
        data: project(&controller),
    }))
}

#[derive(Serialize)]
struct LookupResponse {
    success: bool,
    data: View,
}

async fn get_metrics(State(state): State<AppState>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        total_lookups: state.metrics.total_lookups.load(Ordering::Relaxed),
        lookups_in_flight: state.metrics.lookups_in_flight.load(Ordering::Relaxed),
        uptime_seconds: state.metrics.start_time.elapsed().as_secs(),
    })
}

#[derive(Serialize)]
struct MetricsResponse {
    total_lookups: u64,
    lookups_in_flight: u64,
    uptime_seconds: u64,
}

/// API error types
#[derive(Debug)]
enum ApiError {
    BadRequest(String),
    NotFound(String),
    Upstream(String),
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        match err {
            LookupError::Validation => ApiError::BadRequest(LookupError::Validation.to_string()),
            LookupError::Lookup(msg) if msg == INVALID_POSTAL_CODE_MESSAGE => {
                ApiError::NotFound(msg)
            }
            LookupError::Lookup(msg) => ApiError::Upstream(msg),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
        };

        let body = Json(serde_json::json!({
            "success": false,
            "error": message
        }));

        (status, body).into_response()
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, shutting down gracefully...");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, shutting down gracefully...");
        }
    }
}
