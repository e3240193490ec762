//! Accountservices opens bank accounts and serves their details and balance.
#![forbid(unsafe_code)]

pub mod account;
pub mod config;
mod database;
pub mod error;
mod middleware;
mod router;
pub mod telemetry;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::http::{HeaderName, Method, StatusCode, header};
use axum::routing::get;
use axum::{Router, middleware as AxumMiddleware};
pub use error::ServerError;
use tower::ServiceBuilder;
use tower_http::LatencyUnit;
use tower_http::cors::{Any, CorsLayer};
use tower_http::sensitive_headers::SetSensitiveHeadersLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{
    DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer,
};

use account::{
    AccountRepository, AccountService, MemoryAccountRepository,
    PgAccountRepository,
};

/// MUST NEVER be used in production.
#[cfg(test)]
pub async fn make_request(
    api_key: Option<&str>,
    app: Router,
    method: Method,
    path: &str,
    body: String,
) -> axum::http::Response<axum::body::Body> {
    use axum::extract::Request;
    use tower::util::ServiceExt;

    let mut request = Request::builder()
        .method(method)
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(key) = api_key {
        request = request.header(middleware::API_KEY_HEADER, key);
    }

    app.oneshot(request.body(axum::body::Body::from(body)).unwrap())
        .await
        .unwrap()
}

/// State sharing between routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Configuration>,
    pub accounts: AccountService,
}

/// Create router.
pub fn app(state: AppState) -> Router {
    let api_key = HeaderName::from_static(middleware::API_KEY_HEADER);

    let middleware = ServiceBuilder::new()
        // Remove sensitive headers from trace.
        .layer(SetSensitiveHeadersLayer::new([api_key.clone(), header::COOKIE]))
        // Add high level tracing/logging to all requests.
        .layer(
            TraceLayer::new_for_http()
                .on_body_chunk(|chunk: &Bytes, latency: Duration, _span: &tracing::Span| {
                    tracing::trace!(size_bytes = chunk.len(), latency = ?latency, "sending body chunk")
                })
                .make_span_with(DefaultMakeSpan::new().include_headers(true).level(tracing::Level::INFO))
                .on_request(DefaultOnRequest::new())
                .on_response(DefaultOnResponse::new().include_headers(true).latency_unit(LatencyUnit::Micros)),
        )
        // Set a timeout.
        .layer(TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, Duration::from_secs(10)))
        // Add CORS preflight support.
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
                .allow_headers(Any)
                .vary([api_key]),
        );

    Router::new()
        // `GET /status.json` goes to `status`.
        .route("/status.json", get(router::status::status))
        // `GET /v3/api-docs` goes to `docs`.
        .route("/v3/api-docs", get(router::docs::handler))
        .nest("/api/v1/accounts", router::accounts::router())
        .route_layer(AxumMiddleware::from_fn(telemetry::track))
        .layer(AxumMiddleware::from_fn_with_state(
            state.clone(),
            middleware::require_api_key,
        ))
        .layer(middleware)
        .with_state(state)
}

/// Initialize the application state.
pub async fn initialize_state() -> Result<AppState, Box<dyn std::error::Error>>
{
    // read configuration file. let it in memory.
    let path = std::env::var("CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_default();
    let config = config::Configuration::default().path(path).read();

    if config.api_key.is_empty() {
        return Err(
            "missing `api_key` entry on `config.yaml` file or `API_KEY` environnement variable".into(),
        );
    }

    let repo: Arc<dyn AccountRepository> = match config.postgres {
        Some(ref postgres) => {
            Arc::new(PgAccountRepository::new(database::connect(postgres).await?))
        },
        None => {
            tracing::warn!(
                "missing `postgres` entry on `config.yaml` file, accounts are kept in memory"
            );
            Arc::new(MemoryAccountRepository::new())
        },
    };

    let accounts = AccountService::new(repo)
        .max_number_attempts(config.accounts.max_number_attempts);

    Ok(AppState { config, accounts })
}
