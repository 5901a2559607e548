use std::error::Error as StdError;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Request, State};
use axum::http::{header::HeaderName, HeaderValue, Method, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use sqlx::postgres::PgPool;
use tokio::sync::Mutex;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::Instrument;
use utoipa::{OpenApi, ToSchema};
use utoipa_swagger_ui::SwaggerUi;
use uuid::Uuid;

use crate::card::ArticleCard;
use crate::config::AppConfig;
use crate::crawler::StopReason;
use crate::db::{self, StoredArticle};
use crate::stats::Stats;
use crate::worker::{self, CrawlSummary, JobError};

pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub struct AppState {
    pub pool: PgPool,
    pub config: AppConfig,
    /// Held for the duration of a crawl job.
    pub crawl_lock: Mutex<()>,
}

impl AppState {
    pub fn new(pool: PgPool, config: AppConfig) -> Self {
        Self {
            pool,
            config,
            crawl_lock: Mutex::new(()),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// RFC 3339
    pub time: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ArticleList {
    pub total: usize,
    pub articles: Vec<StoredArticle>,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}

/// `error: cause: cause ...`
fn error_chain(err: &dyn StdError) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}

impl From<JobError> for ApiError {
    fn from(err: JobError) -> Self {
        let status = match err {
            JobError::Prerequisite(_) => StatusCode::BAD_REQUEST,
            JobError::InProgress => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: error_chain(&err),
        }
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(ErrorResponse { error: self.message })).into_response()
    }
}

#[utoipa::path(
    get,
    path = "/health",
    responses((status = 200, description = "Service is up", body = HealthResponse)),
    tag = "system"
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "up".to_string(),
        time: chrono::Utc::now().to_rfc3339(),
    })
}

#[utoipa::path(
    post,
    path = "/api/crawler/start",
    responses(
        (status = 200, description = "Crawl finished and articles were saved", body = CrawlSummary),
        (status = 400, description = "Cookie file is missing", body = ErrorResponse),
        (status = 409, description = "Another crawl is running", body = ErrorResponse),
        (status = 500, description = "Crawl or storage failed", body = ErrorResponse)
    ),
    tag = "crawler"
)]
pub async fn start_crawl(State(state): State<Arc<AppState>>) -> Result<Json<CrawlSummary>, ApiError> {
    let started = Instant::now();
    tracing::info!("crawl requested");

    match worker::run_crawl_job(state).await {
        Ok(summary) => Ok(Json(summary)),
        Err(e) => {
            tracing::error!(error = %error_chain(&e), duration_ms = elapsed_ms(started), "crawl failed");
            Err(e.into())
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/articles",
    responses(
        (status = 200, description = "Stored articles, newest first", body = ArticleList),
        (status = 500, description = "Database error", body = ErrorResponse)
    ),
    tag = "articles"
)]
pub async fn list_articles(State(state): State<Arc<AppState>>) -> Result<Json<ArticleList>, ApiError> {
    let articles = db::list_articles(&state.pool).await?;
    Ok(Json(ArticleList {
        total: articles.len(),
        articles,
    }))
}

/// Tags each request with an id, reusing the caller's `X-Request-ID` when
/// present, and echoes it back.
pub async fn request_id(req: Request, next: Next) -> Response {
    let id = req
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let span = tracing::info_span!(
        "request",
        request_id = %id,
        method = %req.method(),
        path = %req.uri().path(),
    );

    let mut response = next.run(req).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&id) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }
    response
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(REQUEST_ID_HEADER)]);

    if allowed_origins.is_empty() {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    layer.allow_origin(AllowOrigin::list(origins))
}

#[derive(OpenApi)]
#[openapi(
    paths(health, start_crawl, list_articles),
    components(schemas(
        HealthResponse,
        ErrorResponse,
        ArticleList,
        CrawlSummary,
        StoredArticle,
        ArticleCard,
        Stats,
        StopReason
    )),
    tags(
        (name = "system", description = "Service health"),
        (name = "crawler", description = "Feed crawl"),
        (name = "articles", description = "Stored articles")
    )
)]
pub struct ApiDoc;

pub fn router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.allowed_origins);

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/health", get(health))
        .route("/api/crawler/start", post(start_crawl))
        .route("/api/articles", get(list_articles))
        .layer(cors)
        .layer(middleware::from_fn(request_id))
        .with_state(state)
}
