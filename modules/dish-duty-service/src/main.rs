//! Dish Duty Service — standalone binary tracking who washed the dishes each day.
//!
//! Hosts both an RPC API for the chat adapter and a dashboard UI.
//! Default: http://127.0.0.1:9104/

mod clock;
mod config;
mod dashboard;
mod error;
mod routes;
mod store;

use config::ServiceConfig;
use routes::AppState;
use std::sync::Arc;
use std::time::Instant;

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::init();

    let config = ServiceConfig::from_env();

    log::info!("Opening snapshot at: {}", config.data_path);
    let store = match store::Store::open(&config.data_path, Arc::new(clock::UtcClock)) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            log::error!("Cannot open a durable store at {}: {}", config.data_path, e);
            std::process::exit(1);
        }
    };

    let state = Arc::new(AppState {
        store,
        start_time: Instant::now(),
        history_limit: config.history_limit,
    });

    let cors = tower_http::cors::CorsLayer::permissive();

    let app = axum::Router::new()
        .route("/", axum::routing::get(dashboard::dashboard))
        .route("/rpc/users", axum::routing::get(routes::list_users))
        .route("/rpc/users/register", axum::routing::post(routes::register))
        .route("/rpc/history/log", axum::routing::post(routes::log_action))
        .route("/rpc/history/recent", axum::routing::post(routes::recent_history))
        .route("/rpc/stats", axum::routing::get(routes::stats))
        .route("/rpc/status", axum::routing::get(routes::status))
        .route("/rpc/backup/export", axum::routing::get(routes::backup_export))
        .with_state(state)
        .layer(cors);

    let addr = format!("127.0.0.1:{}", config.port);
    log::info!("Dish Duty Service listening on http://{}", addr);

    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        log::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
