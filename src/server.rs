//! HTTP API
//!
//! Serves `GET /api/athleteInfo?aid=<athlete id>` for the pass form. Every
//! response body is JSON: `{"name": ...}` on success, `{"error": ...}` on
//! failure.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, COOKIE, USER_AGENT},
        HeaderMap, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::data::ClientHints;
use crate::resolver::{AthleteNameResolver, ResolveError};

/// Route of the athlete lookup endpoint
pub const ATHLETE_INFO_PATH: &str = "/api/athleteInfo";

/// Browser cache lifetime for successful lookups
const SUCCESS_CACHE_CONTROL: &str = "max-age=3600";

/// Query parameter carrying the athlete ID
const AID_PARAM: &str = "aid";

/// Builds the application router
pub fn router(resolver: AthleteNameResolver) -> Router {
    Router::new()
        .route(ATHLETE_INFO_PATH, get(athlete_info))
        .with_state(Arc::new(resolver))
        .layer(TraceLayer::new_for_http())
}

/// Binds `addr` and serves the API until Ctrl-C
pub async fn serve(addr: SocketAddr, resolver: AthleteNameResolver) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(resolver))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

async fn athlete_info(
    State(resolver): State<Arc<AthleteNameResolver>>,
    Query(params): Query<Vec<(String, String)>>,
    headers: HeaderMap,
) -> Response {
    let aid = first_param(&params, AID_PARAM).unwrap_or_default();
    let hints = client_hints(&headers);

    match resolver.resolve(aid, &hints).await {
        Ok(resolved) => (
            [
                (CONTENT_TYPE, "application/json"),
                (CACHE_CONTROL, SUCCESS_CACHE_CONTROL),
            ],
            resolved.payload,
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// First value of a repeated query parameter
fn first_param<'a>(params: &'a [(String, String)], name: &str) -> Option<&'a str> {
    params
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.as_str())
}

fn error_response(err: &ResolveError) -> Response {
    let status = StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
    (status, Json(serde_json::json!({ "error": err.to_string() }))).into_response()
}

/// Collects the caller's identifying headers
fn client_hints(headers: &HeaderMap) -> ClientHints {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    let real_ip = header("x-real-ip").or_else(|| {
        header("x-forwarded-for").and_then(|list| {
            list.split(',')
                .next()
                .map(str::trim)
                .filter(|ip| !ip.is_empty())
                .map(str::to_string)
        })
    });

    ClientHints {
        user_agent: header(USER_AGENT.as_str()),
        real_ip,
        cookie: header(COOKIE.as_str()),
    }
}
