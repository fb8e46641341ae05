use axum::extract::{ConnectInfo, Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{routing::get, Router};
use std::net::SocketAddr;

use crate::resolver::Outcome;
use crate::state::AppState;

/// Build the axum Router: one lookup route, everything else default-deny.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/{key}", get(lookup))
        .fallback(deny)
        .with_state(state)
}

/// GET /{key} — the single metadata lookup endpoint. The peer address comes
/// from ConnectInfo, so the server must be started with
/// `into_make_service_with_connect_info::<SocketAddr>()`.
async fn lookup(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Response {
    let outcome = state.resolver.resolve(&key, peer.ip(), &headers).await;
    let status = status_of(&outcome);
    tracing::debug!(key, peer = %peer.ip(), status = %status, "lookup");
    match outcome {
        Outcome::Success(body) => (StatusCode::OK, body).into_response(),
        _ => status.into_response(),
    }
}

fn status_of(outcome: &Outcome) -> StatusCode {
    match outcome {
        Outcome::Success(_) => StatusCode::OK,
        Outcome::Forbidden => StatusCode::FORBIDDEN,
        Outcome::NotFound => StatusCode::NOT_FOUND,
        Outcome::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// `GET /` and anything not matching the single-segment key route: 403,
/// empty body.
async fn deny() -> StatusCode {
    StatusCode::FORBIDDEN
}
