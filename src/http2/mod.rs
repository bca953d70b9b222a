//! HTTP/2 subsystem.
//!
//! # Data Flow
//! ```text
//! h2 server connection (frame codec, flow-control windows)
//!     → connection.rs (accept streams, forward bodies, write frames)
//!     → stream.rs (per-stream state, resolve, execute)
//!     → Frame::Headers + Frame::Data back to connection.rs
//! ```
//!
//! # Design Decisions
//! - All per-request state is keyed by stream identifier
//! - Handlers run on the connection task; streams on one connection are
//!   serialized through it
//! - Stream resets discard state; connection errors end the connection

pub mod connection;
pub mod stream;

pub use stream::{Frame, RequestHead, StreamMachine, StreamState};
