use anyhow::{Context, Result};
use std::{net::SocketAddr, time::Duration};

use tracing::{debug, error, info};

use crate::inventory::{
    unix_timestamp_secs, CellNumber, ChangesPage, InventorySnapshot, NewTool, SyncOutcome,
    SyncPayload, ToolRecord,
};
use tower_http::services::ServeDir;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, Query, State},
    http::StatusCode,
    middleware,
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::api_error::ApiError;
use super::{cors, host_only_admin, log_requests, no_cache, state::*, ServerConfig};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub version: &'static str,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Serialize)]
struct PingResponse {
    status: &'static str,
    timestamp: f64,
}

#[derive(Serialize)]
struct AddedResponse {
    status: &'static str,
    id: String,
}

#[derive(Serialize)]
struct SyncedResponse {
    status: &'static str,
    #[serde(flatten)]
    outcome: SyncOutcome,
}

#[derive(Serialize)]
struct FullDataResponse {
    #[serde(flatten)]
    snapshot: InventorySnapshot,
    is_host: bool,
    server_ip: String,
}

#[derive(Deserialize, Debug)]
struct DeleteParams {
    cell: Option<String>,
    machine: Option<String>,
}

#[derive(Deserialize, Debug)]
struct ChangesParams {
    since: Option<String>,
}

fn parse_json_body<T: serde::de::DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|err| ApiError::BadRequest(format!("{}", err)))
}

async fn home(State(state): State<ServerState>) -> Json<ServerStats> {
    Json(ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn ping() -> Json<PingResponse> {
    Json(PingResponse {
        status: "ok",
        timestamp: unix_timestamp_secs(),
    })
}

async fn list_tools(State(store): State<GuardedOccupancyStore>) -> Json<Vec<ToolRecord>> {
    Json(store.list())
}

async fn add_tool(
    State(store): State<GuardedOccupancyStore>,
    body: Bytes,
) -> Result<Json<AddedResponse>, ApiError> {
    let new_tool: NewTool = parse_json_body(&body)?;
    let id = store.add(new_tool)?;
    Ok(Json(AddedResponse {
        status: "added",
        id,
    }))
}

async fn delete_tool(
    State(store): State<GuardedOccupancyStore>,
    Query(params): Query<DeleteParams>,
) -> Result<StatusCode, ApiError> {
    let (cell, machine) = match (params.cell, params.machine) {
        (Some(cell), Some(machine)) if !cell.is_empty() && !machine.is_empty() => (cell, machine),
        _ => {
            return Err(ApiError::BadRequest(
                "cell and machine are required".to_string(),
            ))
        }
    };

    let removed = store.delete(&machine, &CellNumber::new(cell));
    debug!("Delete request removed {} record(s)", removed);
    Ok(StatusCode::OK)
}

async fn get_changes(
    State(store): State<GuardedOccupancyStore>,
    Query(params): Query<ChangesParams>,
) -> Result<Json<ChangesPage>, ApiError> {
    let since = match params.since.as_deref() {
        None | Some("") => 0.0,
        Some(raw) => match raw.parse::<f64>() {
            Ok(since) if since.is_finite() => since,
            _ => {
                return Err(ApiError::BadRequest(format!(
                    "since must be a number, got {:?}",
                    raw
                )))
            }
        },
    };
    Ok(Json(store.changes_since(since)))
}

async fn get_full_data(
    State(state): State<ServerState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
) -> Json<FullDataResponse> {
    Json(FullDataResponse {
        snapshot: state.store.full_data(),
        is_host: state.access_gate.is_host(peer.ip()),
        server_ip: state.access_gate.server_ip().to_string(),
    })
}

async fn post_sync(
    State(store): State<GuardedOccupancyStore>,
    body: Bytes,
) -> Result<Json<SyncedResponse>, ApiError> {
    let payload: SyncPayload = parse_json_body(&body)?;
    let outcome = store.sync(payload);
    Ok(Json(SyncedResponse {
        status: "synced",
        outcome,
    }))
}

pub fn make_app(
    config: ServerConfig,
    store: GuardedOccupancyStore,
    access_gate: GuardedAccessGate,
) -> Router {
    let state = ServerState::new(config.clone(), store, access_gate);

    let api_routes: Router = Router::new()
        .route("/tools", get(list_tools).post(add_tool))
        .route("/full-data", get(get_full_data))
        .route("/changes", get(get_changes))
        .route("/delete", get(delete_tool))
        .route("/sync", axum::routing::post(post_sync))
        .route("/ping", get(ping))
        .layer(middleware::from_fn(no_cache))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    home_router
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.access_gate.clone(),
            host_only_admin,
        ))
        .layer(middleware::from_fn_with_state(state, log_requests))
        .layer(middleware::from_fn(cors))
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!("Could not listen for Ctrl+C, running until killed: {}", err);
        std::future::pending::<()>().await;
    }
    info!("Shutting down...");
}

pub async fn run_server(
    config: ServerConfig,
    store: GuardedOccupancyStore,
    access_gate: GuardedAccessGate,
) -> Result<()> {
    let address = SocketAddr::new(config.bind_address, config.port);
    let app = make_app(config, store.clone(), access_gate);

    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Could not bind to {}", address))?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    if store.persist_snapshot() {
        info!("Inventory saved");
    }
    Ok(())
}
