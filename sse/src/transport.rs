use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue};
use std::io;

/// What a connection can do beyond accepting bytes.
///
/// Checked once when a client is initialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Bytes can be pushed to the peer immediately after every write.
    pub flush: bool,
    /// The connection reports when the peer goes away.
    pub close_notify: bool,
}

impl Capabilities {
    pub const fn streaming() -> Self {
        Self {
            flush: true,
            close_notify: true,
        }
    }
}

/// The outbound half of one HTTP response, as seen by a streaming client.
///
/// Implementations are written to by exactly one write loop.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    fn capabilities(&self) -> Capabilities;

    /// Sets a response header. Only called before the first write.
    fn set_header(&mut self, name: HeaderName, value: HeaderValue);

    async fn write(&mut self, buf: &[u8]) -> io::Result<()>;

    async fn flush(&mut self) -> io::Result<()>;

    /// Resolves once the peer has disconnected. Must be cancel safe.
    async fn closed(&self);
}
