//! Switchyard: an embeddable HTTP/1.1 and HTTP/2 server core.
//!
//! Applications register handlers by URL pattern and method; the server
//! admits connections, negotiates the protocol and dispatches each complete
//! request to the most specific matching route.
//!
//! ```no_run
//! use switchyard::{handler_fn, Response, Server, ServerConfig};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let server = Server::new(ServerConfig::default());
//! server.add_route("/hello/{name}", handler_fn(|req| {
//!     Ok(Response::ok_text(format!("hello {}", req.variable("name").unwrap_or("world"))))
//! }))?;
//! server.serve_admin()?;
//! server.listen_and_serve().await?;
//! # Ok(())
//! # }
//! ```

// Core subsystems
pub mod admission;
pub mod http;
pub mod http2;
pub mod net;
pub mod routing;

// Shell
pub mod admin;
pub mod config;
pub mod context;
pub mod error;
pub mod health;
pub mod server;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use context::ConnectionContext;
pub use error::{ServerError, TransportError};
pub use crate::http::{handler_fn, ContentType, Handler, HandlerResult, Request, Response};
pub use lifecycle::Shutdown;
pub use routing::{RouteMethod, Routes};
pub use server::Server;
