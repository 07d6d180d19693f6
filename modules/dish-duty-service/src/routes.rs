//! Axum route handlers for the dish duty RPC API.

use crate::store::Store;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use dish_duty_types::*;
use std::sync::Arc;
use std::time::Instant;

pub struct AppState {
    pub store: Arc<Store>,
    pub start_time: Instant,
    pub history_limit: usize,
}

// POST /rpc/users/register
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> (StatusCode, Json<RpcResponse<bool>>) {
    match state.store.register(req.user_id, &req.name) {
        Ok(newly_registered) => (StatusCode::OK, Json(RpcResponse::ok(newly_registered))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RpcResponse::err(e.to_string())),
        ),
    }
}

// GET /rpc/users
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<RpcResponse<Vec<User>>>) {
    (StatusCode::OK, Json(RpcResponse::ok(state.store.users())))
}

// POST /rpc/history/log
pub async fn log_action(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LogActionRequest>,
) -> (StatusCode, Json<RpcResponse<LogResult>>) {
    match state.store.log_action(req.user_id) {
        Ok(result) => (StatusCode::OK, Json(RpcResponse::ok(result))),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(RpcResponse::err(e.to_string())),
        ),
    }
}

// POST /rpc/history/recent
pub async fn recent_history(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RecentHistoryRequest>,
) -> (StatusCode, Json<RpcResponse<Vec<HistoryLine>>>) {
    let lines = state.store.recent_history(req.effective_limit());
    (StatusCode::OK, Json(RpcResponse::ok(lines)))
}

// GET /rpc/stats
pub async fn stats(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<RpcResponse<StoreStats>>) {
    (StatusCode::OK, Json(RpcResponse::ok(state.store.stats())))
}

// GET /rpc/status
pub async fn status(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<RpcResponse<ServiceStatus>>) {
    let stats = state.store.stats();
    (
        StatusCode::OK,
        Json(RpcResponse::ok(ServiceStatus {
            running: true,
            uptime_secs: state.start_time.elapsed().as_secs(),
            total_users: stats.total_users,
            total_entries: stats.total_entries,
        })),
    )
}

// GET /rpc/backup/export
pub async fn backup_export(
    State(state): State<Arc<AppState>>,
) -> (StatusCode, Json<RpcResponse<Snapshot>>) {
    (StatusCode::OK, Json(RpcResponse::ok(state.store.snapshot())))
}
