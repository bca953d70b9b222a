//! Server shell.
//!
//! # Responsibilities
//! - Own the routing table, meters, admission gates and health registry
//! - Expose the route registration API
//! - Bind the listener and spawn the accept loop
//! - Schedule health checks and coordinate shutdown
//!
//! # Design Decisions
//! - Registration is allowed before and while serving
//! - One `ConnectionContext` per server, cloned into every connection

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use crate::admin::{self, AdminState};
use crate::admission::{ConnectionLimiter, RateLimiter};
use crate::config::validation::validate_config;
use crate::config::{ConfigError, ServerConfig};
use crate::context::{ConnectionContext, ConnectionLimits};
use crate::error::ServerError;
use crate::health::{HealthCheck, HealthRegistry, HealthScheduler};
use crate::http::Handler;
use crate::lifecycle::Shutdown;
use crate::net::listener::{Admission, Listener};
use crate::observability::metrics::{
    MeterRegistry, ResponseMeters, CONNECTIONS_REJECTED, REQUESTS_RATE_LIMITED,
};
use crate::routing::{PatternError, RouteMethod, Routes};

/// An embeddable HTTP/1.1 + HTTP/2 server.
pub struct Server {
    config: ServerConfig,
    started: Instant,
    routes: Arc<Routes>,
    meters: Arc<MeterRegistry>,
    response_meters: Arc<ResponseMeters>,
    connections: Arc<ConnectionLimiter>,
    rate: Option<Arc<RateLimiter>>,
    health: Arc<HealthRegistry>,
    shutdown: Shutdown,
    local_addr: OnceLock<SocketAddr>,
}

impl Server {
    /// Create a new server with the given configuration.
    pub fn new(config: ServerConfig) -> Self {
        let meters = Arc::new(MeterRegistry::new());
        let response_meters = Arc::new(ResponseMeters::new(Arc::clone(&meters)));

        let connections = Arc::new(ConnectionLimiter::new(
            config.listener.max_connections,
            meters.meter(CONNECTIONS_REJECTED),
        ));
        let rate = config.rate_limit.enabled.then(|| {
            Arc::new(RateLimiter::new(
                config.rate_limit.requests_per_second,
                config.rate_limit.burst_size,
                meters.meter(REQUESTS_RATE_LIMITED),
            ))
        });

        Self {
            config,
            started: Instant::now(),
            routes: Arc::new(Routes::new()),
            meters,
            response_meters,
            connections,
            rate,
            health: Arc::new(HealthRegistry::new()),
            shutdown: Shutdown::new(),
            local_addr: OnceLock::new(),
        }
    }

    /// Register `handler` for every method on `pattern`.
    pub fn add_route(&self, pattern: &str, handler: impl Handler) -> Result<(), PatternError> {
        self.routes.register(pattern, RouteMethod::Any, handler)
    }

    /// Register `handler` for `method` on `pattern`.
    pub fn add_route_with_method(
        &self,
        pattern: &str,
        method: impl Into<RouteMethod>,
        handler: impl Handler,
    ) -> Result<(), PatternError> {
        self.routes.register(pattern, method, handler)
    }

    /// The routing table handle; `snapshot()` gives the current table.
    pub fn routes(&self) -> &Arc<Routes> {
        &self.routes
    }

    pub fn add_health_check(&self, name: impl Into<String>, check: impl HealthCheck) {
        self.health.register(name, check);
    }

    pub fn health(&self) -> &Arc<HealthRegistry> {
        &self.health
    }

    /// Run health checks with the configured delay and interval.
    pub fn schedule_health_checks(&self) -> JoinHandle<()> {
        let config = &self.config.health_check;
        self.schedule_health_checks_with(
            Duration::from_secs(config.initial_delay_secs),
            Duration::from_secs(config.interval_secs),
        )
    }

    /// Run health checks after `initial_delay`, then every `period`, until shutdown.
    pub fn schedule_health_checks_with(&self, initial_delay: Duration, period: Duration) -> JoinHandle<()> {
        let scheduler = HealthScheduler::new(Arc::clone(&self.health), initial_delay, period);
        tokio::spawn(scheduler.run(self.shutdown.subscribe()))
    }

    /// Register the built-in `/admin`, `/ping`, `/health` and `/metrics` routes.
    pub fn serve_admin(&self) -> Result<(), PatternError> {
        admin::register(
            &self.routes,
            AdminState {
                started: self.started,
                routes: Arc::clone(&self.routes),
                connections: Arc::clone(&self.connections),
                health: Arc::clone(&self.health),
                meters: Arc::clone(&self.meters),
            },
        )
    }

    /// Validate the configuration, bind the configured address and start
    /// accepting.
    pub async fn listen_and_serve(&self) -> Result<SocketAddr, ServerError> {
        self.ensure_not_listening()?;
        self.validate()?;
        let listener = Listener::bind(&self.config.listener.bind_address, self.admission()).await?;
        self.start(listener)
    }

    /// Start accepting on an already bound listener.
    pub async fn listen_and_serve_on(&self, listener: TcpListener) -> Result<SocketAddr, ServerError> {
        self.ensure_not_listening()?;
        self.validate()?;
        self.start(Listener::from_tcp(listener, self.admission()))
    }

    /// Bound address, once listening.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr.get().copied()
    }

    /// Stop accepting and close every connection and background task.
    pub fn shutdown(&self) {
        tracing::info!(
            open_connections = self.connections.open_connections(),
            "Server shutting down"
        );
        self.shutdown.trigger();
    }

    pub fn meters(&self) -> &Arc<MeterRegistry> {
        &self.meters
    }

    pub fn open_connections(&self) -> usize {
        self.connections.open_connections()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Context shared with every connection pipeline.
    pub fn connection_context(&self) -> ConnectionContext {
        ConnectionContext::new(
            Arc::clone(&self.routes),
            Arc::clone(&self.response_meters),
            ConnectionLimits::from_config(&self.config),
        )
    }

    fn admission(&self) -> Admission {
        Admission {
            connections: Arc::clone(&self.connections),
            rate: self.rate.clone(),
        }
    }

    fn validate(&self) -> Result<(), ServerError> {
        validate_config(&self.config).map_err(|errors| {
            tracing::error!(violations = errors.len(), "Refusing to serve with an invalid configuration");
            ServerError::Config(ConfigError::Validation(errors))
        })
    }

    fn ensure_not_listening(&self) -> Result<(), ServerError> {
        match self.local_addr.get() {
            Some(_) => Err(ServerError::AlreadyListening),
            None => Ok(()),
        }
    }

    fn start(&self, listener: Listener) -> Result<SocketAddr, ServerError> {
        let address = listener.local_addr()?;
        self.local_addr
            .set(address)
            .map_err(|_| ServerError::AlreadyListening)?;

        tokio::spawn(listener.run(self.connection_context(), self.shutdown.clone()));
        tracing::info!(address = %address, "Server listening");
        Ok(address)
    }
}

impl std::fmt::Debug for Server {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Server")
            .field("local_addr", &self.local_addr())
            .field("routes", &self.routes.snapshot().len())
            .field("open_connections", &self.open_connections())
            .finish_non_exhaustive()
    }
}
