//! Configuration schema definitions.
//!
//! All sections default, so a partial (or empty) file loads.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address, connection cap).
    pub listener: ListenerConfig,

    /// Worker pool sizing.
    pub workers: WorkerConfig,

    /// Idle timeouts.
    pub timeouts: TimeoutConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// HTTP/2 settings.
    pub http2: Http2Config,

    /// Health check scheduling.
    pub health_check: HealthCheckConfig,

    /// Built-in admin routes.
    pub admin: AdminConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrently open connections; extra connections are refused.
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_connections: 10_000,
        }
    }
}

/// Worker pool configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Runtime worker threads; 0 uses the runtime default (one per core).
    pub worker_threads: usize,

    /// Name given to worker threads.
    pub thread_name: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            thread_name: "switchyard-worker".to_string(),
        }
    }
}

/// Idle timeouts in seconds; 0 disables a threshold.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// No bytes read for this long closes the connection.
    pub reader_idle_secs: u64,

    /// No bytes written for this long closes the connection.
    pub writer_idle_secs: u64,

    /// Neither read nor write for this long closes the connection.
    pub all_idle_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            reader_idle_secs: 0,
            writer_idle_secs: 0,
            all_idle_secs: 60,
        }
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable the rate limiter.
    pub enabled: bool,

    /// Sustained admissions per second.
    pub requests_per_second: u32,

    /// Bucket capacity; 0 means equal to `requests_per_second`.
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            requests_per_second: 1_000,
            burst_size: 0,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Largest accepted request body.
    pub max_payload_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_payload_bytes: 1024 * 1024,
        }
    }
}

/// HTTP/2 settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Http2Config {
    /// Advertised SETTINGS_MAX_CONCURRENT_STREAMS.
    pub max_concurrent_streams: u32,
}

impl Default for Http2Config {
    fn default() -> Self {
        Self {
            max_concurrent_streams: 256,
        }
    }
}

/// Health check scheduling.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HealthCheckConfig {
    /// Run registered health checks periodically.
    pub enabled: bool,

    /// Delay before the first run, in seconds.
    pub initial_delay_secs: u64,

    /// Interval between runs, in seconds.
    pub interval_secs: u64,
}

impl Default for HealthCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            initial_delay_secs: 60,
            interval_secs: 60,
        }
    }
}

/// Admin route configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Register `/admin`, `/ping`, `/health` and `/metrics`.
    pub enabled: bool,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level for this crate (overridden by RUST_LOG).
    pub log_level: String,

    /// Install the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus scrape address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

fn secs(value: u64) -> Option<Duration> {
    (value > 0).then(|| Duration::from_secs(value))
}

impl TimeoutConfig {
    pub fn reader_idle(&self) -> Option<Duration> {
        secs(self.reader_idle_secs)
    }

    pub fn writer_idle(&self) -> Option<Duration> {
        secs(self.writer_idle_secs)
    }

    pub fn all_idle(&self) -> Option<Duration> {
        secs(self.all_idle_secs)
    }
}
