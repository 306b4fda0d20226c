use chrono::Utc;
use log::*;
use service::{config::Config, logging::Logger, AppState};
use sse::message::Message;
use tokio::time::{interval, MissedTickBehavior};

const TIME_EVENT: &str = "time";

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = Config::new();
    if let Err(e) = Logger::init_logger(&config) {
        eprintln!("Failed to start logger: {e}");
    }

    info!("Starting up event stream server...");

    let app_state = AppState::new(config);
    tokio::spawn(broadcast_time(app_state.clone()));

    web::init_server(app_state).await
}

/// Sends the current time to every open stream on each tick until shutdown.
async fn broadcast_time(app_state: AppState) {
    let mut ticker = interval(app_state.config.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = app_state.shutdown.cancelled() => break,
        }

        let now = Utc::now();
        let message = Message::named(TIME_EVENT)
            .data(now.to_rfc3339())
            .id(now.timestamp_millis().to_string());
        let delivered = app_state.registry.broadcast(message).await;
        trace!("Broadcast time to {delivered} stream(s)");
    }

    debug!("Clock broadcaster stopped");
}
