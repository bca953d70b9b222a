//! Resolve and execute, shared by both protocol paths.
//!
//! Routing misses become 404 and handler faults become 500 here; neither
//! reaches the connection as an error.

use crate::context::ConnectionContext;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::routing::{RouteMatch, RouteMiss};

/// Count, resolve and run `request` against the current routing snapshot.
pub fn dispatch(ctx: &ConnectionContext, request: Request) -> Response {
    ctx.meters.mark_request();
    match ctx.routes.resolve(request.path(), request.method()) {
        Ok(route) => execute(route, request),
        Err(miss) => not_found(&miss, &request),
    }
}

/// Run the resolved handler with the captured variables attached.
pub fn execute(route: RouteMatch, mut request: Request) -> Response {
    request.set_variables(route.variables);
    match route.handler.handle(&request) {
        Ok(response) => response,
        Err(error) => {
            tracing::error!(
                route = %route.pattern,
                method = %request.method(),
                request_id = %request.request_id(),
                error = %error,
                "Handler failed"
            );
            Response::internal_error()
        }
    }
}

/// 404 for a routing miss.
pub fn not_found(miss: &RouteMiss, request: &Request) -> Response {
    match miss {
        RouteMiss::NoPattern => {
            tracing::debug!(path = request.path(), "No route matches path");
        }
        RouteMiss::MethodNotRegistered { pattern } => {
            tracing::debug!(
                route = %pattern,
                method = %request.method(),
                "Route has no handler for method"
            );
        }
    }
    Response::not_found()
}
