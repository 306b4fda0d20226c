use crate::error::Result;
use crate::sse::handler;
use axum::extract::{Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use log::*;
use serde::{Deserialize, Serialize};
use service::AppState;
use sse::message::Message;
use sse::registry::BROADCAST_TOPIC;

#[derive(Debug, Default, Deserialize)]
pub struct SubscribeParams {
    /// Topic to listen on; every stream also receives broadcasts.
    pub topic: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct PublishParams {
    #[serde(default)]
    pub event: String,
    #[serde(default)]
    pub data: String,
    #[serde(default)]
    pub id: String,
    /// Reconnection delay hint in milliseconds
    pub retry: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct PublishResponse {
    pub delivered: usize,
}

impl From<PublishParams> for Message {
    fn from(params: PublishParams) -> Self {
        let mut message = Message::new()
            .event(params.event)
            .data(params.data)
            .id(params.id);
        if let Some(retry) = params.retry {
            message = message.retry(std::time::Duration::from_millis(retry));
        }
        message
    }
}

/// GET an event stream for a topic
///
/// The stream stays open until the browser disconnects or the server shuts down.
pub async fn subscribe(
    State(app_state): State<AppState>,
    Query(params): Query<SubscribeParams>,
) -> Result<Response> {
    let topic = params
        .topic
        .unwrap_or_else(|| BROADCAST_TOPIC.to_string());
    debug!("Opening event stream for topic {topic}");

    let registry = app_state.registry.clone();
    handler::serve(&app_state, |client| async move {
        registry.register(topic, client);
    })
    .await
}

/// POST a message to every stream subscribed to a topic
pub async fn publish(
    State(app_state): State<AppState>,
    Path(topic): Path<String>,
    Json(params): Json<PublishParams>,
) -> impl IntoResponse {
    let delivered = app_state
        .registry
        .send_to_topic(&topic, Message::from(params))
        .await;
    debug!("Published to topic {topic}: {delivered} stream(s)");

    Json(PublishResponse { delivered })
}
