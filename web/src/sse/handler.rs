use crate::error::Result;
use crate::transport::BodyTransport;
use axum::response::{IntoResponse, Response};
use log::*;
use service::AppState;
use sse::client::{Client, StreamOptions};
use std::future::Future;
use tokio_util::sync::CancellationToken;

/// Turns the current request into an event stream.
///
/// A client bound to the response body is handed to `handler`. Once `handler`
/// returns, the client's write loop starts on its own task and runs until the
/// browser goes away, the server shuts down, or the configured stream timeout
/// elapses.
///
/// `handler` must not wait on its own sends: nothing is written before it
/// returns. Spawn a task or register the client somewhere instead.
pub async fn serve<F, Fut>(app_state: &AppState, handler: F) -> Result<Response>
where
    F: FnOnce(Client) -> Fut,
    Fut: Future<Output = ()>,
{
    serve_with(
        app_state.config.stream_options(),
        app_state.shutdown.child_token(),
        handler,
    )
    .await
}

/// Like [`serve`], with explicit stream options and cancellation.
pub async fn serve_with<F, Fut>(
    options: StreamOptions,
    cancel: CancellationToken,
    handler: F,
) -> Result<Response>
where
    F: FnOnce(Client) -> Fut,
    Fut: Future<Output = ()>,
{
    let (transport, body) = BodyTransport::channel();
    let (client, writer) = Client::init(transport, options)?;
    let headers = writer.transport().headers().clone();

    handler(client).await;

    debug!("Starting event stream writer");
    tokio::spawn(writer.run(cancel));

    Ok((headers, body).into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{header, StatusCode};
    use futures::StreamExt;
    use sse::message::Message;
    use std::time::Duration;
    use tokio::time::timeout;

    const WAIT: Duration = Duration::from_secs(5);

    #[tokio::test]
    async fn test_handler_receives_client_before_stream_starts() {
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();
        let cancel = CancellationToken::new();

        let response = serve_with(StreamOptions::new(), cancel.clone(), |client| async move {
            let _ = seen_tx.send(client);
        })
        .await
        .unwrap();

        let client = seen_rx.await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        assert_eq!(response.headers()[header::CACHE_CONTROL], "no-cache");
        assert_eq!(response.headers()[header::CONNECTION], "keep-alive");

        let mut frames = response.into_body().into_data_stream();
        let sender = tokio::spawn(async move {
            client.send(Message::named("time").data("12:00")).await
        });

        assert_eq!(&frames.next().await.unwrap().unwrap()[..], b"event: open\n\n");
        assert_eq!(
            &frames.next().await.unwrap().unwrap()[..],
            b"event: time\ndata: 12:00\n\n"
        );
        sender.await.unwrap().unwrap();

        cancel.cancel();
        assert_eq!(&frames.next().await.unwrap().unwrap()[..], b"event: close\n\n");
        assert!(timeout(WAIT, frames.next()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_dropped_response_closes_client() {
        let (seen_tx, seen_rx) = tokio::sync::oneshot::channel();

        let response = serve_with(
            StreamOptions::new(),
            CancellationToken::new(),
            |client| async move {
                let _ = seen_tx.send(client);
            },
        )
        .await
        .unwrap();
        let client = seen_rx.await.unwrap();

        drop(response);

        timeout(WAIT, client.done().wait()).await.unwrap();
        assert!(client
            .send(Message::named("late"))
            .await
            .unwrap_err()
            .is_client_closed());
    }
}
