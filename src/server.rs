//! HTTP surface for the station map.
//!
//! Exposes the map view state as JSON using Axum:
//! - GeoJSON of the current markers
//! - the viewport after the last fit/highlight
//! - marker clusters at any zoom
//!
//! Station data is pulled on demand through `POST /refresh`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};
use serde::Deserialize;
use tokio::sync::Mutex;

use stationmap::client::StationSource;
use stationmap::config::MapConfig;
use stationmap::errors::StationMapError;
use stationmap::models::{FeatureCollection, Station};
use stationmap::renderer::HeadlessRenderer;
use stationmap::view::{StationMapView, SyncStats};

/// Container the server's map view is attached to.
const CONTAINER: &str = "map-container";

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub host: String,
    pub source: StationSource,
    pub map: MapConfig,
    /// Surface size used for bounds fitting
    pub width: f64,
    pub height: f64,
}

type SharedView = Arc<Mutex<StationMapView<HeadlessRenderer>>>;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The map view; requests are serialized by the lock
    view: SharedView,
    /// Where `/refresh` loads stations from
    source: StationSource,
}

/// Create the Axum router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/markers", get(markers_handler))
        .route("/viewport", get(viewport_handler))
        .route("/clusters", get(clusters_handler))
        .route("/refresh", post(refresh_handler))
        .route("/stations/{id}/highlight", post(highlight_handler))
        .with_state(state)
}

/// Build an initialized view on a headless surface.
fn build_view(config: &ServerConfig) -> Result<StationMapView<HeadlessRenderer>, StationMapError> {
    let renderer = HeadlessRenderer::new().with_container(CONTAINER, config.width, config.height);
    let mut view = StationMapView::new(renderer, config.map.clone());
    view.initialize(CONTAINER, &[])?;
    Ok(view)
}

/// Apply the startup station load. An unreachable source still lets the
/// server come up empty.
fn initial_sync(
    view: &mut StationMapView<HeadlessRenderer>,
    loaded: Result<Vec<Station>, StationMapError>,
) -> Result<Option<SyncStats>, StationMapError> {
    match loaded {
        Ok(stations) => {
            let stats = view.sync_stations(&stations)?;
            tracing::info!("initial station load: {:?}", stats);
            Ok(Some(stats))
        }
        Err(e) => {
            tracing::warn!("initial station load failed: {}", e);
            Ok(None)
        }
    }
}

/// Start the web server.
pub async fn run_server(config: ServerConfig) -> anyhow::Result<()> {
    let mut view = build_view(&config)?;

    let source = config.source.clone();
    let loaded = tokio::task::spawn_blocking(move || source.load()).await?;
    initial_sync(&mut view, loaded)?;

    let state = AppState {
        view: Arc::new(Mutex::new(view)),
        source: config.source.clone(),
    };
    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("📍 stationmap serving at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Route Handlers
// ============================================================================

/// Health check endpoint.
async fn health_handler() -> &'static str {
    "OK"
}

/// Current markers as GeoJSON.
async fn markers_handler(State(state): State<AppState>) -> Json<FeatureCollection> {
    let view = state.view.lock().await;
    Json(view.snapshots().into_iter().collect())
}

/// Current viewport.
async fn viewport_handler(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.view.lock().await;
    match view.viewport() {
        Some(viewport) => Json(viewport.clone()).into_response(),
        None => (StatusCode::SERVICE_UNAVAILABLE, "map not initialized").into_response(),
    }
}

#[derive(Debug, Deserialize)]
struct ClusterQuery {
    /// Zoom to cluster at; defaults to the viewport's
    zoom: Option<u8>,
}

/// Marker clusters.
async fn clusters_handler(
    State(state): State<AppState>,
    Query(query): Query<ClusterQuery>,
) -> impl IntoResponse {
    let view = state.view.lock().await;
    let clusters = match query.zoom {
        Some(zoom) => view.clusters_at(view.config().clamp_zoom(zoom)),
        None => view.clusters(),
    };
    Json(clusters)
}

/// Reload stations from the source and resync the markers.
async fn refresh_handler(State(state): State<AppState>) -> impl IntoResponse {
    let source = state.source.clone();
    let stations = match tokio::task::spawn_blocking(move || source.load()).await {
        Ok(Ok(stations)) => stations,
        Ok(Err(e)) => {
            tracing::warn!("station refresh failed: {}", e);
            return (StatusCode::BAD_GATEWAY, e.to_string()).into_response();
        }
        Err(e) => {
            tracing::error!("refresh task failed: {}", e);
            return (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response();
        }
    };

    let mut view = state.view.lock().await;
    match view.sync_stations(&stations) {
        Ok(stats) => {
            tracing::info!("refreshed stations: {:?}", stats);
            Json(stats).into_response()
        }
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, e.to_string()).into_response(),
    }
}

/// Highlight a station: open its popup and center the viewport on it.
async fn highlight_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let mut view = state.view.lock().await;
    if view.highlight_marker(&id) {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
