//! Server-Sent Events (SSE) infrastructure for long-lived event streams.
//!
//! This crate turns one outbound HTTP response into a push channel a browser
//! `EventSource` can listen on.
//!
//! # Architecture
//!
//! - **Single writer per connection**: [`client::Writer::run`] is the only code
//!   that writes to a connection. Producers talk to it through
//!   [`client::Client::send`], which hands events over one at a time.
//! - **Synchronous backpressure**: `send` waits until the write loop has taken
//!   the event. A stalled connection slows its producers down instead of
//!   buffering without bound.
//! - **One terminal transition**: a stream ends on peer disconnect, an external
//!   cancellation token, an explicit close, an optional timeout, or a failed
//!   write, whichever happens first. A `close` event is written and every
//!   observer of [`client::Client::done`] sees the client as closed from then on.
//! - **Capability check up front**: transports declare whether they can flush
//!   per write and report disconnects; clients refuse to start otherwise.
//!
//! # Wire format
//!
//! ```text
//! event: time
//! data: 12:00
//! data: 12:01
//! id: 7
//! retry: 3000
//!
//! ```
//!
//! Empty fields are left out; comments (`: keep-alive`) are ignored by the
//! browser.
//!
//! # Example
//!
//! ```rust,ignore
//! use sse::client::{Client, StreamOptions};
//! use sse::message::Message;
//!
//! let (client, writer) = Client::init(transport, StreamOptions::new())?;
//! tokio::spawn(writer.run(cancel));
//!
//! client.send(Message::named("time").data("12:00")).await?;
//! ```
//!
//! # Modules
//!
//! - `client`: Client/Writer pair, lifecycle state and the write loop
//! - `message`: the `Event` trait with `Message` and `Comment`
//! - `transport`: the capabilities a connection has to offer
//! - `registry`: topic-indexed set of live clients for fan-out
//! - `error`: error kinds raised by clients

pub mod client;
pub mod error;
pub mod message;
pub mod registry;
pub mod transport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use client::Client;
pub use registry::Registry;
