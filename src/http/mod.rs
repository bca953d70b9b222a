//! HTTP request model and the HTTP/1.1 chain.
//!
//! # Data Flow
//! ```text
//! HTTP/1.1 connection
//!     → h1.rs (hyper codec, body buffered up to the payload limit)
//!     → request.rs (materialized Request)
//!     → dispatch.rs (resolve → handler → fault conversion)
//!     → response.rs (status, content-type, exact content-length)
//!     → Send to client
//! ```
//!
//! The HTTP/2 path builds the same `Request` and reuses `dispatch`.

pub mod dispatch;
pub mod h1;
pub mod handler;
pub mod request;
pub mod response;

pub use handler::{handler_fn, Handler, HandlerResult};
pub use request::Request;
pub use response::{ContentType, Response};
