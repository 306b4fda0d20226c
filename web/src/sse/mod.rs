//! Event stream HTTP plumbing for the web layer.
//!
//! The core client, message and registry types live in the `sse` crate; this
//! module only binds them to axum requests.

pub mod handler;
