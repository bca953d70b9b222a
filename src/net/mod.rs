//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limiter, rate limiter)
//!     → connection.rs (connection ID, span, idle watchdog)
//!     → negotiate.rs (ALPN id or cleartext preface → Protocol)
//!     → HTTP/1.1 chain or HTTP/2 stream machine
//! ```
//!
//! # Design Decisions
//! - Admission happens before negotiation so refused load costs no parsing
//! - Each connection runs on its own task
//! - Idle, shutdown and transport faults all end the connection the same way

pub mod connection;
pub mod idle;
pub mod listener;
pub mod negotiate;

pub use connection::{serve_cleartext, serve_protocol, ConnectionId};
pub use listener::{Admission, Listener};
pub use negotiate::Protocol;
