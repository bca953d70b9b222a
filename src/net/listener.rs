//! TCP listener and accept loop.
//!
//! # Responsibilities
//! - Bind to the configured address
//! - Accept incoming TCP connections
//! - Apply admission control before any protocol work
//! - Spawn one task per admitted connection
//!
//! # Design Decisions
//! - Refused connections are dropped at once; nothing waits for a slot
//! - Accept errors are logged and the loop keeps going

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::{TcpListener, TcpStream};

use crate::admission::{ConnectionLimiter, RateLimiter};
use crate::context::ConnectionContext;
use crate::error::ServerError;
use crate::lifecycle::Shutdown;
use crate::net::connection::serve_connection;

/// Back-off after a failed accept (e.g. file descriptor exhaustion).
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// The two admission gates, in the order they are applied.
#[derive(Debug, Clone)]
pub struct Admission {
    pub connections: Arc<ConnectionLimiter>,
    pub rate: Option<Arc<RateLimiter>>,
}

/// A bound listener with its admission gates.
pub struct Listener {
    inner: TcpListener,
    admission: Admission,
}

impl Listener {
    /// Bind to `address`.
    pub async fn bind(address: &str, admission: Admission) -> Result<Self, ServerError> {
        let inner = TcpListener::bind(address)
            .await
            .map_err(|source| ServerError::Bind {
                address: address.to_string(),
                source,
            })?;
        Ok(Self::from_tcp(inner, admission))
    }

    /// Wrap an already bound listener.
    pub fn from_tcp(inner: TcpListener, admission: Admission) -> Self {
        Self { inner, admission }
    }

    /// Get the local address this listener is bound to.
    pub fn local_addr(&self) -> Result<SocketAddr, std::io::Error> {
        self.inner.local_addr()
    }

    /// Accept until `shutdown` fires.
    pub async fn run(self, ctx: ConnectionContext, shutdown: Shutdown) {
        let mut stop = shutdown.subscribe();

        if let Ok(address) = self.local_addr() {
            tracing::info!(
                address = %address,
                max_connections = self.admission.connections.max_connections(),
                "Listener accepting connections"
            );
        }

        loop {
            tokio::select! {
                accepted = self.inner.accept() => match accepted {
                    Ok((stream, peer_addr)) => self.admit(stream, peer_addr, &ctx, &shutdown),
                    Err(error) => {
                        tracing::warn!(error = %ServerError::Accept(error), "Accept failed");
                        tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    }
                },
                _ = stop.recv() => break,
            }
        }

        tracing::info!("Listener stopped");
    }

    fn admit(&self, stream: TcpStream, peer_addr: SocketAddr, ctx: &ConnectionContext, shutdown: &Shutdown) {
        let Some(permit) = self.admission.connections.try_acquire() else {
            tracing::debug!(
                peer_addr = %peer_addr,
                open = self.admission.connections.open_connections(),
                "Connection limit reached, refusing connection"
            );
            return;
        };

        if let Some(rate) = &self.admission.rate {
            if !rate.try_acquire() {
                tracing::debug!(peer_addr = %peer_addr, "Rate limit exceeded, refusing connection");
                return;
            }
        }

        if let Err(error) = stream.set_nodelay(true) {
            tracing::debug!(peer_addr = %peer_addr, error = %error, "Failed to set TCP_NODELAY");
        }

        tokio::spawn(serve_connection(
            stream,
            peer_addr,
            ctx.clone(),
            shutdown.subscribe(),
            permit,
        ));
    }
}
