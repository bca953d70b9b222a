use std::collections::BTreeMap;
use std::sync::{Arc, Weak};
use std::time::Instant;

use http::StatusCode;
use serde::Serialize;

use crate::admission::ConnectionLimiter;
use crate::health::{HealthRegistry, HealthStatus};
use crate::http::{Handler, HandlerResult, Request, Response};
use crate::observability::metrics::MeterRegistry;
use crate::routing::Routes;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub uptime_secs: u64,
    pub open_connections: usize,
    pub max_connections: usize,
    pub routes: Vec<String>,
}

#[derive(Serialize)]
pub struct HealthReport {
    pub healthy: bool,
    pub checks: BTreeMap<String, HealthStatus>,
}

/// `GET /ping`
pub struct Ping;

impl Handler for Ping {
    fn handle(&self, _request: &Request) -> HandlerResult {
        Ok(Response::ok_text("PONG"))
    }
}

/// `GET /admin`
///
/// Holds the routing table weakly since the table owns this handler.
pub struct Status {
    pub started: Instant,
    pub routes: Weak<Routes>,
    pub connections: Arc<ConnectionLimiter>,
}

impl Handler for Status {
    fn handle(&self, _request: &Request) -> HandlerResult {
        Response::json(
            StatusCode::OK,
            &SystemStatus {
                version: env!("CARGO_PKG_VERSION"),
                status: "operational",
                uptime_secs: self.started.elapsed().as_secs(),
                open_connections: self.connections.open_connections(),
                max_connections: self.connections.max_connections(),
                routes: self
                    .routes
                    .upgrade()
                    .map(|routes| routes.snapshot().templates())
                    .unwrap_or_default(),
            },
        )
    }
}

/// `GET /health`: 503 when any check last reported unhealthy.
pub struct Health {
    pub registry: Arc<HealthRegistry>,
}

impl Handler for Health {
    fn handle(&self, _request: &Request) -> HandlerResult {
        let checks = self.registry.results();
        let healthy = checks.values().all(|status| status.healthy);
        let status = if healthy {
            StatusCode::OK
        } else {
            StatusCode::SERVICE_UNAVAILABLE
        };
        Response::json(status, &HealthReport { healthy, checks })
    }
}

/// `GET /metrics`: meter name → count.
pub struct Metrics {
    pub registry: Arc<MeterRegistry>,
}

impl Handler for Metrics {
    fn handle(&self, _request: &Request) -> HandlerResult {
        Response::json(StatusCode::OK, &self.registry.snapshot())
    }
}
