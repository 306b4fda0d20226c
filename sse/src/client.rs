//! One Server-Sent Events connection.
//!
//! [`Client::init`] binds a transport and returns two halves: a cloneable
//! [`Client`] handle that producers call [`Client::send`] on, and the
//! [`Writer`] that owns the connection. [`Writer::run`] must be driven on its
//! own task; it is the only code that ever writes to the transport.

use crate::error::{self, Error, TransportErrorKind};
use crate::message::{Comment, Event, Message};
use crate::transport::Transport;
use axum::http::{header, HeaderValue};
use log::*;
use std::fmt;
use std::future::pending;
use std::io;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval_at, sleep_until, Instant, Interval};
use tokio_util::sync::CancellationToken;

const OPEN_EVENT: &str = "open";
const CLOSE_EVENT: &str = "close";
const KEEP_ALIVE_TEXT: &str = "keep-alive";

/// Lifecycle of a client. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Initialized,
    Running,
    Closed,
}

/// Why a write loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    PeerDisconnected,
    Cancelled,
    Closed,
    TimedOut,
    TransportFault,
}

impl fmt::Display for CloseReason {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CloseReason::PeerDisconnected => write!(f, "peer disconnected"),
            CloseReason::Cancelled => write!(f, "cancelled"),
            CloseReason::Closed => write!(f, "closed"),
            CloseReason::TimedOut => write!(f, "timed out"),
            CloseReason::TransportFault => write!(f, "transport fault"),
        }
    }
}

/// Optional behaviour of a write loop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamOptions {
    /// Maximum lifetime of the stream.
    pub timeout: Option<Duration>,
    /// Interval of idle keep-alive comments.
    pub keep_alive: Option<Duration>,
    /// Reconnection hint sent with the open event.
    pub retry: Option<Duration>,
}

impl StreamOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn keep_alive(mut self, interval: Duration) -> Self {
        self.keep_alive = Some(interval);
        self
    }

    pub fn retry(mut self, retry: Duration) -> Self {
        self.retry = Some(retry);
        self
    }
}

/// An event on its way to the write loop. The loop acknowledges it once dequeued.
struct Handoff {
    event: Box<dyn Event>,
    accepted: oneshot::Sender<()>,
}

struct Shared {
    state: watch::Sender<State>,
    shutdown: CancellationToken,
}

impl Shared {
    /// Moves to `Closed`. Returns false if the client was already closed.
    fn mark_closed(&self) -> bool {
        self.state.send_if_modified(|state| {
            if *state == State::Closed {
                false
            } else {
                *state = State::Closed;
                true
            }
        })
    }
}

/// Producer handle for one event stream connection.
#[derive(Clone)]
pub struct Client {
    events: mpsc::Sender<Handoff>,
    shared: Arc<Shared>,
}

/// Owns the connection of a [`Client`] and writes its events.
pub struct Writer<T: Transport> {
    transport: T,
    events: mpsc::Receiver<Handoff>,
    shared: Arc<Shared>,
    options: StreamOptions,
}

/// Observes the termination of a client.
#[derive(Clone)]
pub struct Done {
    state: watch::Receiver<State>,
}

impl Client {
    /// Binds a client to `transport`.
    ///
    /// Fails if the transport cannot flush each write or cannot report a peer
    /// disconnect. Otherwise sets the event stream headers before any body is
    /// written.
    pub fn init<T: Transport>(
        mut transport: T,
        options: StreamOptions,
    ) -> Result<(Client, Writer<T>), Error> {
        let capabilities = transport.capabilities();
        if !capabilities.flush {
            return Err(error::unsupported_transport(TransportErrorKind::Flush));
        }
        if !capabilities.close_notify {
            return Err(error::unsupported_transport(
                TransportErrorKind::CloseNotify,
            ));
        }

        transport.set_header(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/event-stream"),
        );
        transport.set_header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        transport.set_header(header::CONNECTION, HeaderValue::from_static("keep-alive"));

        let (tx, rx) = mpsc::channel(1);
        let (state, _) = watch::channel(State::Initialized);
        let shared = Arc::new(Shared {
            state,
            shutdown: CancellationToken::new(),
        });

        let client = Client {
            events: tx,
            shared: Arc::clone(&shared),
        };
        let writer = Writer {
            transport,
            events: rx,
            shared,
            options,
        };
        Ok((client, writer))
    }

    /// Hands `event` to the write loop.
    ///
    /// Waits until the loop has taken the event, or fails with `ClientClosed`
    /// once the client has terminated. An accepted event is always written
    /// unless the transport faults.
    pub async fn send(&self, event: impl Event) -> Result<(), Error> {
        let done = self.done();
        if done.is_done() {
            return Err(error::client_closed());
        }

        let (accepted, acknowledged) = oneshot::channel();
        let handoff = Handoff {
            event: Box::new(event),
            accepted,
        };

        tokio::select! {
            sent = self.events.send(handoff) => {
                sent.map_err(|_| error::client_closed())?;
            }
            _ = done.wait() => return Err(error::client_closed()),
        }

        acknowledged.await.map_err(|_| error::client_closed())
    }

    /// A handle that becomes set, permanently, when the write loop exits.
    pub fn done(&self) -> Done {
        Done {
            state: self.shared.state.subscribe(),
        }
    }

    pub fn state(&self) -> State {
        *self.shared.state.borrow()
    }

    /// Asks the write loop to stop and waits until it has exited.
    pub async fn close(&self) {
        self.shared.shutdown.cancel();
        self.done().wait().await;
    }
}

impl Done {
    pub fn is_done(&self) -> bool {
        *self.state.borrow() == State::Closed
    }

    pub async fn wait(&self) {
        let mut state = self.state.clone();
        // The sender lives as long as any client handle, so an error only
        // means nothing is left to wait for.
        let _ = state.wait_for(|state| *state == State::Closed).await;
    }
}

impl<T: Transport> Writer<T> {
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Streams events until the peer disconnects, `cancel` fires, the client
    /// is closed, or the configured timeout elapses.
    ///
    /// Writes an `open` event first and a `close` event last.
    pub async fn run(mut self, cancel: CancellationToken) -> CloseReason {
        self.shared.state.send_replace(State::Running);
        info!("Event stream opened");

        let mut open = Message::named(OPEN_EVENT);
        if let Some(retry) = self.options.retry {
            open = open.retry(retry);
        }

        let reason = match self.write_block(open.render()).await {
            Ok(()) => self.event_loop(&cancel).await,
            Err(e) => {
                warn!("Failed to write open event: {e}");
                CloseReason::TransportFault
            }
        };

        // Refuse new handoffs and release anyone parked in the slot.
        self.events.close();
        while self.events.try_recv().is_ok() {}

        if reason != CloseReason::TransportFault {
            if let Err(e) = self.write_block(Message::named(CLOSE_EVENT).render()).await {
                debug!("Failed to write close event after {reason}: {e}");
            }
        }

        self.shared.mark_closed();
        info!("Event stream closed: {reason}");
        reason
    }

    async fn event_loop(&mut self, cancel: &CancellationToken) -> CloseReason {
        let deadline = self.options.timeout.map(|timeout| Instant::now() + timeout);
        let timed_out = async move {
            match deadline {
                Some(deadline) => sleep_until(deadline).await,
                None => pending().await,
            }
        };
        tokio::pin!(timed_out);

        let mut keep_alive = self
            .options
            .keep_alive
            .filter(|period| !period.is_zero())
            .map(|period| interval_at(Instant::now() + period, period));

        let shutdown = self.shared.shutdown.clone();

        loop {
            tokio::select! {
                Some(handoff) = self.events.recv() => {
                    // The sender may have given up; the event is still ours to write.
                    let _ = handoff.accepted.send(());
                    debug!("Streaming event");
                    let block = handoff.event.render();
                    if let Err(e) = self.write_block(block).await {
                        warn!("Failed to write event, closing stream: {e}");
                        return CloseReason::TransportFault;
                    }
                    if let Some(keep_alive) = keep_alive.as_mut() {
                        keep_alive.reset();
                    }
                }
                _ = self.transport.closed() => return CloseReason::PeerDisconnected,
                _ = cancel.cancelled() => return CloseReason::Cancelled,
                _ = shutdown.cancelled() => return CloseReason::Closed,
                _ = &mut timed_out => return CloseReason::TimedOut,
                _ = tick(&mut keep_alive) => {
                    if let Err(e) = self.write_block(Comment::new(KEEP_ALIVE_TEXT).render()).await {
                        warn!("Failed to write keep-alive, closing stream: {e}");
                        return CloseReason::TransportFault;
                    }
                }
            }
        }
    }

    /// Writes one rendered block and flushes it straight away.
    async fn write_block(&mut self, block: String) -> io::Result<()> {
        self.transport.write(block.as_bytes()).await?;
        self.transport.flush().await
    }
}

impl<T: Transport> Drop for Writer<T> {
    fn drop(&mut self) {
        if self.shared.mark_closed() {
            debug!("Event stream writer dropped before it ran");
        }
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(interval) => {
            interval.tick().await;
        }
        None => pending().await,
    }
}
