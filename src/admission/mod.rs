//! Admission control subsystem.
//!
//! # Data Flow
//! ```text
//! TCP accept
//!     → connection_limit.rs (open-connection cap, permit held for the connection)
//!     → rate_limit.rs (token bucket on accepted connections)
//!     → protocol negotiation
//! ```
//!
//! # Design Decisions
//! - Both gates run before any protocol byte is read
//! - Rejection is immediate: the socket is dropped, nothing is queued
//! - Each gate marks its own rejection meter

pub mod connection_limit;
pub mod rate_limit;

pub use connection_limit::{ConnectionLimiter, ConnectionPermit};
pub use rate_limit::RateLimiter;
