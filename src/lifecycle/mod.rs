//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (server.rs):
//!     Config → Server::new → route registration → listen_and_serve
//!
//! Shutdown (shutdown.rs):
//!     Ctrl-C or Server::shutdown → stop accepting → close connections
//! ```

pub mod shutdown;

pub use shutdown::Shutdown;
