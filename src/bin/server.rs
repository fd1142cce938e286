use axum::{
    extract::{Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use snow_chart::{render_page, Dashboard, DashboardView, Settings, SnowChartError};

#[derive(Clone)]
struct AppState {
    dashboard: Arc<Dashboard>,
}

#[derive(Debug, Deserialize)]
struct RangeParams {
    #[serde(default)]
    days: String,
}

#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

#[derive(Debug, Serialize)]
struct StatsResponse {
    cache: CacheStatsDto,
}

#[derive(Debug, Serialize)]
struct CacheStatsDto {
    total_entries: u64,
    total_hits: u64,
    avg_hit_count: f64,
    oldest_entry: Option<String>,
    newest_entry: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snow_chart_server=debug,snow_chart=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let secrets_path = Settings::resolve_path(None);
    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse::<u16>().ok())
        .unwrap_or(8501);

    tracing::info!("🚀 Starting Snow Chart server");
    tracing::info!("🔑 Secrets: {}", secrets_path.display());
    tracing::info!("🔌 Port: {}", port);

    let settings = Settings::load(&secrets_path)?;
    tracing::info!("⏱️ Cache TTL: {}s", settings.cache.ttl_secs);

    let dashboard = Dashboard::from_settings(&settings).await?;

    let state = AppState {
        dashboard: Arc::new(dashboard),
    };

    // Build router
    let app = Router::new()
        .route("/", get(page_handler))
        .route("/health", get(health_handler))
        .route("/v1/usage", get(usage_handler))
        .route("/v1/sql", get(sql_handler))
        .route("/v1/stats", get(stats_handler))
        .layer(CorsLayer::permissive())
        .with_state(state);

    // Start server
    let addr = format!("{}:{}", bind_addr, port);
    tracing::info!("❄️ Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: snow_chart::VERSION.to_string(),
    })
}

// Browsers get the error inside the page, not a JSON body
async fn page_handler(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Response {
    match state.dashboard.handle(&params.days).await {
        Ok(view) => Html(render_page(&view)).into_response(),
        Err(err) => {
            let status = status_for(&err);
            tracing::error!("❌ Page error: {} - {}", status, err);
            let view = DashboardView::failed(&params.days, err.to_string());
            (status, Html(render_page(&view))).into_response()
        }
    }
}

async fn usage_handler(
    State(state): State<AppState>,
    Query(params): Query<RangeParams>,
) -> Result<Json<DashboardView>, AppError> {
    tracing::debug!("Usage request: {:?}", params);
    Ok(Json(state.dashboard.handle(&params.days).await?))
}

async fn sql_handler(Query(params): Query<RangeParams>) -> Result<Response, AppError> {
    let sql = Dashboard::sql_for(&params.days)?.ok_or_else(|| {
        SnowChartError::InvalidDayRange(String::new())
    })?;
    Ok(([(header::CONTENT_TYPE, "text/plain; charset=utf-8")], sql).into_response())
}

async fn stats_handler(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let cache_stats = state.dashboard.cache_stats().await?;

    Ok(Json(StatsResponse {
        cache: CacheStatsDto {
            total_entries: cache_stats.total_entries,
            total_hits: cache_stats.total_hits,
            avg_hit_count: cache_stats.avg_hit_count,
            oldest_entry: cache_stats.oldest_entry.map(|t| t.to_rfc3339()),
            newest_entry: cache_stats.newest_entry.map(|t| t.to_rfc3339()),
        },
    }))
}

// Error handling
struct AppError(SnowChartError);

fn status_for(err: &SnowChartError) -> StatusCode {
    match err {
        SnowChartError::InvalidDayRange(_) => StatusCode::BAD_REQUEST,
        SnowChartError::Connection(_) => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = status_for(&self.0);
        let message = self.0.to_string();

        tracing::error!("❌ Error: {} - {}", status, message);

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<SnowChartError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
