//! Meters and exposition.
//!
//! # Responsibilities
//! - Count requests and emitted status codes
//! - Count admission rejections and idle closures
//! - Mirror every increment into the `metrics` facade for Prometheus
//!
//! # Meters
//! - `requests`: every request received, counted before routing
//! - `responseCodes.<name>`: one per configured status code
//! - `connections.rejected`: refused by the connection limiter
//! - `requests.rateLimited`: refused by the rate limiter
//! - `connections.idleClosed`: closed by the idle watchdog
//!
//! # Design Decisions
//! - Counts live in atomics so `/metrics` and tests can read them without a
//!   recorder installed
//! - Unmapped status codes are not counted (logged at debug)

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use http::StatusCode;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const REQUESTS: &str = "requests";
pub const CONNECTIONS_REJECTED: &str = "connections.rejected";
pub const REQUESTS_RATE_LIMITED: &str = "requests.rateLimited";
pub const CONNECTIONS_IDLE_CLOSED: &str = "connections.idleClosed";

/// Status codes with a configured meter.
pub const RESPONSE_CODES: &[(StatusCode, &str)] = &[
    (StatusCode::OK, "responseCodes.ok"),
    (StatusCode::CREATED, "responseCodes.created"),
    (StatusCode::NO_CONTENT, "responseCodes.noContent"),
    (StatusCode::BAD_REQUEST, "responseCodes.badRequest"),
    (StatusCode::NOT_FOUND, "responseCodes.notFound"),
    (StatusCode::PAYLOAD_TOO_LARGE, "responseCodes.payloadTooLarge"),
    (StatusCode::INTERNAL_SERVER_ERROR, "responseCodes.serverError"),
    (StatusCode::SERVICE_UNAVAILABLE, "responseCodes.serviceUnavailable"),
];

/// A named monotonically increasing counter.
#[derive(Debug)]
pub struct Meter {
    name: &'static str,
    count: AtomicU64,
}

impl Meter {
    fn new(name: &'static str) -> Self {
        Self {
            name,
            count: AtomicU64::new(0),
        }
    }

    /// Increment by one.
    pub fn mark(&self) {
        self.count.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(self.name).increment(1);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// All meters of one server, keyed by name.
#[derive(Debug, Default)]
pub struct MeterRegistry {
    meters: DashMap<&'static str, Arc<Meter>>,
}

impl MeterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the meter called `name`.
    pub fn meter(&self, name: &'static str) -> Arc<Meter> {
        self.meters
            .entry(name)
            .or_insert_with(|| Arc::new(Meter::new(name)))
            .clone()
    }

    /// Current count of `name`, zero if never created.
    pub fn count(&self, name: &str) -> u64 {
        self.meters.get(name).map(|m| m.count()).unwrap_or(0)
    }

    /// Point-in-time copy of every meter, sorted by name.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        self.meters
            .iter()
            .map(|entry| (entry.key().to_string(), entry.value().count()))
            .collect()
    }
}

/// Request and status-code meters shared by every connection of a server.
#[derive(Debug)]
pub struct ResponseMeters {
    registry: Arc<MeterRegistry>,
    requests: Arc<Meter>,
    idle_closed: Arc<Meter>,
    by_status: HashMap<StatusCode, Arc<Meter>>,
}

impl ResponseMeters {
    pub fn new(registry: Arc<MeterRegistry>) -> Self {
        let by_status = RESPONSE_CODES
            .iter()
            .map(|&(status, name)| (status, registry.meter(name)))
            .collect();

        Self {
            requests: registry.meter(REQUESTS),
            idle_closed: registry.meter(CONNECTIONS_IDLE_CLOSED),
            by_status,
            registry,
        }
    }

    pub fn mark_request(&self) {
        self.requests.mark();
    }

    pub fn mark_status(&self, status: StatusCode) {
        match self.by_status.get(&status) {
            Some(meter) => meter.mark(),
            None => tracing::debug!(status = status.as_u16(), "No meter configured for status code"),
        }
    }

    pub fn mark_idle_closed(&self) {
        self.idle_closed.mark();
    }

    pub fn registry(&self) -> &Arc<MeterRegistry> {
        &self.registry
    }
}

impl Default for ResponseMeters {
    fn default() -> Self {
        Self::new(Arc::new(MeterRegistry::new()))
    }
}

/// Install the Prometheus recorder and its scrape listener.
///
/// Must be called from within a Tokio runtime.
pub fn install_prometheus(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}
