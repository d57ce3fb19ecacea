use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use solrank_core::domain::snapshot::{RankedRow, Snapshot};
use solrank_core::storage::HistoryStore;
use solrank_core::time::day_key::parse_day;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = solrank_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let store = match solrank_core::storage::open_history_store(&settings).await {
        Ok(store) => {
            tracing::info!(store = store.store_name(), "history store ready");
            Some(store)
        }
        Err(e) => {
            sentry_anyhow::capture_anyhow(&e);
            tracing::error!(error = %e, "history store unavailable; starting API in degraded mode");
            None
        }
    };

    let app = router(AppState { store });

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(3000);
    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], port));

    tracing::info!(%addr, "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/rankings/latest", get(get_latest_ranking))
        .route("/rankings/:day", get(get_ranking_by_day))
        .route("/rankings/:day/:name", get(get_row_by_day_and_name))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Clone)]
struct AppState {
    store: Option<Arc<dyn HistoryStore>>,
}

impl AppState {
    fn store(&self) -> Result<&dyn HistoryStore, StatusCode> {
        self.store.as_deref().ok_or(StatusCode::SERVICE_UNAVAILABLE)
    }
}

fn internal_error(e: anyhow::Error) -> StatusCode {
    sentry_anyhow::capture_anyhow(&e);
    tracing::error!(error = %format!("{e:#}"), "history read failed");
    StatusCode::INTERNAL_SERVER_ERROR
}

async fn get_latest_ranking(State(state): State<AppState>) -> Result<Json<Snapshot>, StatusCode> {
    let snapshot = state
        .store()?
        .read_latest()
        .await
        .map_err(internal_error)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(snapshot))
}

async fn get_ranking_by_day(
    State(state): State<AppState>,
    Path(day): Path<String>,
) -> Result<Json<Snapshot>, StatusCode> {
    let day = parse_day(&day).map_err(|_| StatusCode::BAD_REQUEST)?;

    let snapshot = state
        .store()?
        .read_day(day)
        .await
        .map_err(internal_error)?
        .ok_or(StatusCode::NOT_FOUND)?;

    Ok(Json(snapshot))
}

async fn get_row_by_day_and_name(
    State(state): State<AppState>,
    Path((day, name)): Path<(String, String)>,
) -> Result<Json<RankedRow>, StatusCode> {
    let day = parse_day(&day).map_err(|_| StatusCode::BAD_REQUEST)?;

    let snapshot = state
        .store()?
        .read_day(day)
        .await
        .map_err(internal_error)?
        .ok_or(StatusCode::NOT_FOUND)?;

    let row = snapshot.row(&name).cloned().ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(row))
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &solrank_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
