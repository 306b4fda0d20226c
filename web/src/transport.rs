use async_stream::stream;
use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use sse::transport::{Capabilities, Transport};
use std::convert::Infallible;
use std::io;
use tokio::sync::mpsc;

/// Streams an axum response body.
///
/// Every write becomes one body frame, which hyper sends out as soon as it is
/// polled. The peer counts as gone once hyper drops the body.
pub struct BodyTransport {
    tx: mpsc::Sender<Bytes>,
    headers: HeaderMap,
}

impl BodyTransport {
    /// Creates the transport together with the body it feeds.
    pub fn channel() -> (Self, Body) {
        let (tx, mut rx) = mpsc::channel::<Bytes>(1);

        let body = Body::from_stream(stream! {
            while let Some(chunk) = rx.recv().await {
                yield Ok::<_, Infallible>(chunk);
            }
        });

        let transport = Self {
            tx,
            headers: HeaderMap::new(),
        };
        (transport, body)
    }

    /// Headers to send with the response.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }
}

#[async_trait]
impl Transport for BodyTransport {
    fn capabilities(&self) -> Capabilities {
        Capabilities::streaming()
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        self.headers.insert(name, value);
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        self.tx
            .send(Bytes::copy_from_slice(buf))
            .await
            .map_err(|_| io::Error::new(io::ErrorKind::BrokenPipe, "response body dropped"))
    }

    // Frames are not buffered on this side of the channel.
    async fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }

    async fn closed(&self) {
        self.tx.closed().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_writes_arrive_as_body_frames() {
        let (mut transport, body) = BodyTransport::channel();
        let mut frames = body.into_data_stream();

        let writer = tokio::spawn(async move {
            transport.write(b"event: open\n\n").await.unwrap();
            transport.flush().await.unwrap();
            transport
        });

        let frame = frames.next().await.unwrap().unwrap();
        assert_eq!(&frame[..], b"event: open\n\n");
        writer.await.unwrap();
    }

    #[tokio::test]
    async fn test_dropping_body_reports_peer_gone() {
        let (mut transport, body) = BodyTransport::channel();

        drop(body);
        transport.closed().await;

        assert_eq!(
            transport.write(b"late").await.unwrap_err().kind(),
            io::ErrorKind::BrokenPipe
        );
    }

    #[test]
    fn test_headers_are_collected_for_the_response() {
        let (mut transport, _body) = BodyTransport::channel();

        transport.set_header(
            axum::http::header::CACHE_CONTROL,
            HeaderValue::from_static("no-cache"),
        );

        assert_eq!(transport.headers()["cache-control"], "no-cache");
    }
}
