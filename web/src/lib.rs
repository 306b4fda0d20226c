//! HTTP layer: binds `sse` clients to axum requests and serves them.

use axum::http::{header, HeaderValue, Method};
use log::*;
use service::AppState;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

mod controller;
pub mod error;
mod router;
pub mod sse;
pub mod transport;

pub use router::define_routes;

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let server_url = format!(
        "{}:{}",
        app_state.config.interface(),
        app_state.config.port
    );
    let listener = TcpListener::bind(&server_url).await?;

    let allowed_origins: Vec<HeaderValue> = app_state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin {origin}");
                None
            }
        })
        .collect();

    let cors_layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_credentials(true)
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE, header::CACHE_CONTROL])
        .allow_origin(allowed_origins);

    let shutdown = app_state.shutdown.clone();
    let app = define_routes(app_state).layer(cors_layer);

    info!("Server starting... listening for connections on http://{server_url}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Failed to listen for shutdown signal: {e}");
                // Keep serving until the token is cancelled some other way.
                shutdown.cancelled().await;
            }
            info!("Shutting down, closing open event streams");
            shutdown.cancel();
        })
        .await
}
