use crate::controller::{event_stream_controller, health_check_controller};
use axum::{
    routing::{get, post},
    Router,
};
use service::AppState;

pub fn define_routes(app_state: AppState) -> Router {
    Router::new()
        .merge(event_stream_routes(app_state))
        .merge(health_routes())
}

fn event_stream_routes(app_state: AppState) -> Router {
    Router::new()
        // GET /events?topic=<topic>
        .route("/events", get(event_stream_controller::subscribe))
        .route("/events/{topic}", post(event_stream_controller::publish))
        .with_state(app_state)
}

fn health_routes() -> Router {
    Router::new().route("/health", get(health_check_controller::health_check))
}
