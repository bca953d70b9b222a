//! Handler capability.
//!
//! Handlers are synchronous: they run on the connection's task and the
//! connection makes no progress until they return. A handler failure is an
//! I/O-kind error and is converted to a 500 by the dispatcher.

use crate::http::request::Request;
use crate::http::response::Response;

/// Result of a handler invocation.
pub type HandlerResult = Result<Response, std::io::Error>;

/// Application code invoked for a resolved route.
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, request: &Request) -> HandlerResult;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> HandlerResult + Send + Sync + 'static,
{
    fn handle(&self, request: &Request) -> HandlerResult {
        self(request)
    }
}

/// Pin a closure to the handler signature so its argument types are inferred.
///
/// ```ignore
/// server.add_route("/ping", handler_fn(|_| Ok(Response::ok_text("PONG"))));
/// ```
pub fn handler_fn<F>(f: F) -> F
where
    F: Fn(&Request) -> HandlerResult + Send + Sync + 'static,
{
    f
}
