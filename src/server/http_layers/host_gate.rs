//! Refuses the admin pages to anyone but the host

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::Request,
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use super::super::access_gate::is_admin_path;
use super::super::api_error::ApiError;
use super::super::state::GuardedAccessGate;

pub async fn host_only_admin(
    State(access_gate): State<GuardedAccessGate>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if is_admin_path(request.uri().path()) && !access_gate.is_host(peer.ip()) {
        warn!(
            "Refused {} to non-host client {}",
            request.uri().path(),
            peer.ip()
        );
        return ApiError::AccessDenied.into_response();
    }
    next.run(request).await
}
