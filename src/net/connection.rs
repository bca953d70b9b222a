//! Per-connection pipeline.
//!
//! # Responsibilities
//! - Generate unique connection IDs for tracing
//! - Negotiate the protocol and install its chain
//! - Close the connection on transport fault, idle timeout or shutdown
//! - Hold the admission permit for the connection's lifetime

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tracing::Instrument;

use crate::admission::ConnectionPermit;
use crate::context::ConnectionContext;
use crate::error::TransportError;
use crate::http::h1;
use crate::http2;
use crate::net::idle::{self, IdleClock, IdleIo};
use crate::net::negotiate::{self, Protocol, Rewind};

/// Global atomic counter for connection IDs.
static CONNECTION_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Unique identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Generate a new unique connection ID.
    pub fn new() -> Self {
        Self(CONNECTION_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Install the chain for an already negotiated protocol (e.g. from ALPN).
pub async fn serve_protocol<I>(
    io: I,
    protocol: Protocol,
    ctx: ConnectionContext,
    peer_addr: SocketAddr,
) -> Result<(), TransportError>
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    tracing::debug!(protocol = protocol.as_str(), "Protocol selected");
    match protocol {
        Protocol::Http1 => h1::serve(io, ctx, peer_addr).await,
        Protocol::Http2 => http2::connection::serve(io, ctx, peer_addr).await,
    }
}

/// Detect the protocol on a cleartext connection, then serve it.
pub async fn serve_cleartext<I>(mut io: I, ctx: ConnectionContext, peer_addr: SocketAddr) -> Result<(), TransportError>
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (protocol, prefix) = negotiate::detect(&mut io).await?;
    serve_protocol(Rewind::new(io, prefix), protocol, ctx, peer_addr).await
}

/// Run one accepted connection to completion.
pub async fn serve_connection(
    stream: TcpStream,
    peer_addr: SocketAddr,
    ctx: ConnectionContext,
    mut shutdown: broadcast::Receiver<()>,
    permit: ConnectionPermit,
) {
    let id = ConnectionId::new();
    let span = tracing::debug_span!("connection", connection_id = %id, peer_addr = %peer_addr);

    async move {
        let clock = Arc::new(IdleClock::new());
        let io = IdleIo::new(stream, Arc::clone(&clock));
        let idle_timeouts = ctx.limits.idle;
        let meters = Arc::clone(&ctx.meters);

        tokio::select! {
            result = serve_cleartext(io, ctx, peer_addr) => match result {
                Ok(()) => tracing::debug!("Connection closed"),
                Err(error) => tracing::warn!(error = %error, "Transport fault, connection closed"),
            },
            state = idle::watch(clock, idle_timeouts) => {
                meters.mark_idle_closed();
                tracing::debug!(state = ?state, "Idle timeout, connection closed");
            }
            _ = shutdown.recv() => tracing::debug!("Server shutting down, connection closed"),
        }

        drop(permit);
    }
    .instrument(span)
    .await
}
