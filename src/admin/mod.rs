//! Built-in admin routes.
//!
//! Registered through the same `Routes` API as application routes.

pub mod handlers;

use std::sync::Arc;
use std::time::Instant;

use http::Method;

use crate::admission::ConnectionLimiter;
use crate::health::HealthRegistry;
use crate::observability::metrics::MeterRegistry;
use crate::routing::{PatternError, Routes};

use self::handlers::{Health, Metrics, Ping, Status};

/// Shared state the admin handlers report on.
pub struct AdminState {
    pub started: Instant,
    pub routes: Arc<Routes>,
    pub connections: Arc<ConnectionLimiter>,
    pub health: Arc<HealthRegistry>,
    pub meters: Arc<MeterRegistry>,
}

/// Register `/admin`, `/ping`, `/health` and `/metrics` (GET).
pub fn register(routes: &Routes, state: AdminState) -> Result<(), PatternError> {
    routes.register("/ping", Method::GET, Ping)?;
    routes.register(
        "/admin",
        Method::GET,
        Status {
            started: state.started,
            routes: Arc::downgrade(&state.routes),
            connections: state.connections,
        },
    )?;
    routes.register(
        "/health",
        Method::GET,
        Health {
            registry: state.health,
        },
    )?;
    routes.register(
        "/metrics",
        Method::GET,
        Metrics {
            registry: state.meters,
        },
    )?;
    Ok(())
}
