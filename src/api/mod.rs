use anyhow::Result;
use axum::{
    extract::{RawQuery, State},
    http::{header, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::{error::FetchError, marketplace::MarketplaceClient};

#[derive(Clone)]
pub struct AppState {
    pub marketplace: MarketplaceClient,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

/// Forwards the caller's query string untouched to the listing endpoint.
/// The bearer credential is attached server-side and never echoed back.
async fn collections_proxy(State(state): State<AppState>, RawQuery(query): RawQuery) -> Response {
    match state.marketplace.raw_listing(query.as_deref()).await {
        Ok(body) => Json(body).into_response(),
        Err(err) => {
            if err.is_configuration() {
                tracing::error!(error = %err, "collections proxy is misconfigured");
            } else {
                tracing::warn!(error = %err, "collections proxy failed");
            }
            error_response(StatusCode::INTERNAL_SERVER_ERROR, proxy_error_message(&err))
        }
    }
}

async fn method_not_allowed() -> Response {
    error_response(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed".to_string())
}

fn proxy_error_message(err: &FetchError) -> String {
    match err {
        FetchError::Status { status, .. } => format!("HTTP error! status: {status}"),
        other => other.to_string(),
    }
}

fn error_response(status: StatusCode, error: String) -> Response {
    (status, Json(ErrorResponse { error })).into_response()
}

pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health))
        .route(
            "/api/magiceden/collections",
            get(collections_proxy).fallback(method_not_allowed),
        )
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_http_server(addr: &str, state: AppState) -> Result<()> {
    let app = app_router(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("HTTP server listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
