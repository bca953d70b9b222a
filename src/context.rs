//! State shared by every connection of one server.

use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::net::idle::IdleTimeouts;
use crate::observability::metrics::ResponseMeters;
use crate::routing::Routes;

/// Per-connection limits taken from configuration.
#[derive(Debug, Clone)]
pub struct ConnectionLimits {
    pub max_payload_bytes: usize,
    pub idle: IdleTimeouts,
    pub max_concurrent_streams: u32,
}

impl ConnectionLimits {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self {
            max_payload_bytes: config.limits.max_payload_bytes,
            idle: IdleTimeouts::from_config(&config.timeouts),
            max_concurrent_streams: config.http2.max_concurrent_streams,
        }
    }
}

impl Default for ConnectionLimits {
    fn default() -> Self {
        Self::from_config(&ServerConfig::default())
    }
}

/// Routes, meters and limits handed to each connection pipeline.
///
/// Cloning is cheap; every field is shared.
#[derive(Debug, Clone)]
pub struct ConnectionContext {
    pub routes: Arc<Routes>,
    pub meters: Arc<ResponseMeters>,
    pub limits: ConnectionLimits,
}

impl ConnectionContext {
    pub fn new(routes: Arc<Routes>, meters: Arc<ResponseMeters>, limits: ConnectionLimits) -> Self {
        Self {
            routes,
            meters,
            limits,
        }
    }

    /// Shortest enabled idle threshold, used as the watchdog tick.
    pub fn idle_tick(&self) -> Option<Duration> {
        self.limits.idle.shortest()
    }
}
