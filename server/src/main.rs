mod config;
mod db;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::services::store::{MemoryRoomStore, PgRoomStore, RoomStore};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = config::Config::from_env();

    let store: Arc<dyn RoomStore> = match &config.database_url {
        Some(url) => {
            let pool = db::init_pool(url, config.db_max_connections)
                .await
                .expect("database init failed");
            Arc::new(PgRoomStore::new(pool))
        }
        None => {
            tracing::warn!("DATABASE_URL not set; rooms and messages are kept in memory only");
            Arc::new(MemoryRoomStore::new())
        }
    };

    let state = state::AppState::new(store, config.client_channel_capacity);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port))
        .await
        .expect("failed to bind");

    tracing::info!(port = config.port, "whiteboard server listening");
    axum::serve(listener, app).await.expect("server failed");
}
