//! In-memory transport for exercising clients without a network.

use crate::transport::{Capabilities, Transport};
use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;

#[derive(Debug, Default)]
struct Recorded {
    headers: HeaderMap,
    writes: Vec<String>,
    flushes: usize,
    headers_after_write: bool,
}

/// Records every header, write and flush. Cloning shares the recording, so a
/// test keeps one clone and hands the other to the client.
#[derive(Debug, Clone)]
pub struct MockTransport {
    capabilities: Capabilities,
    recorded: Arc<Mutex<Recorded>>,
    disconnect: CancellationToken,
    fail_after: Option<usize>,
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTransport {
    pub fn new() -> Self {
        Self::with_capabilities(Capabilities::streaming())
    }

    pub fn with_capabilities(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            recorded: Arc::new(Mutex::new(Recorded::default())),
            disconnect: CancellationToken::new(),
            fail_after: None,
        }
    }

    /// Every write after the first `writes` fails with a broken pipe.
    pub fn failing_after(mut self, writes: usize) -> Self {
        self.fail_after = Some(writes);
        self
    }

    /// Simulates the peer going away.
    pub fn disconnect(&self) {
        self.disconnect.cancel();
    }

    /// Everything written so far, concatenated.
    pub fn output(&self) -> String {
        self.recorded().writes.concat()
    }

    /// Each write as it arrived.
    pub fn writes(&self) -> Vec<String> {
        self.recorded().writes.clone()
    }

    pub fn flushes(&self) -> usize {
        self.recorded().flushes
    }

    pub fn header(&self, name: &str) -> Option<String> {
        self.recorded()
            .headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    }

    /// True if a header was set once the body had started.
    pub fn headers_after_write(&self) -> bool {
        self.recorded().headers_after_write
    }

    fn recorded(&self) -> MutexGuard<'_, Recorded> {
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Transport for MockTransport {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn set_header(&mut self, name: HeaderName, value: HeaderValue) {
        let mut recorded = self.recorded();
        if !recorded.writes.is_empty() {
            recorded.headers_after_write = true;
        }
        recorded.headers.insert(name, value);
    }

    async fn write(&mut self, buf: &[u8]) -> io::Result<()> {
        let mut recorded = self.recorded();
        if self.disconnect.is_cancelled()
            || self.fail_after.is_some_and(|n| recorded.writes.len() >= n)
        {
            return Err(io::Error::new(
                io::ErrorKind::BrokenPipe,
                "mock peer disconnected",
            ));
        }
        recorded
            .writes
            .push(String::from_utf8_lossy(buf).into_owned());
        Ok(())
    }

    async fn flush(&mut self) -> io::Result<()> {
        self.recorded().flushes += 1;
        Ok(())
    }

    async fn closed(&self) {
        self.disconnect.cancelled().await
    }
}
