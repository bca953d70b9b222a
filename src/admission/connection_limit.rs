//! Connection limiter.
//!
//! # Responsibilities
//! - Track currently open connections against a maximum
//! - Refuse, never wait, when the maximum is reached
//! - Release the slot when the connection ends for any reason

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::observability::metrics::Meter;

/// Caps concurrently open connections.
#[derive(Debug)]
pub struct ConnectionLimiter {
    max_connections: usize,
    open: AtomicUsize,
    rejected: Arc<Meter>,
}

impl ConnectionLimiter {
    pub fn new(max_connections: usize, rejected: Arc<Meter>) -> Self {
        Self {
            max_connections,
            open: AtomicUsize::new(0),
            rejected,
        }
    }

    /// Claim a slot, or `None` (and a rejection mark) when full.
    pub fn try_acquire(self: &Arc<Self>) -> Option<ConnectionPermit> {
        let mut current = self.open.load(Ordering::Relaxed);
        loop {
            if current >= self.max_connections {
                self.rejected.mark();
                return None;
            }
            match self.open.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Relaxed,
            ) {
                Ok(_) => break,
                Err(actual) => current = actual,
            }
        }
        Some(ConnectionPermit {
            limiter: Arc::clone(self),
        })
    }

    pub fn open_connections(&self) -> usize {
        self.open.load(Ordering::Relaxed)
    }

    pub fn max_connections(&self) -> usize {
        self.max_connections
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.count()
    }
}

/// A claimed connection slot; dropping it frees the slot.
#[derive(Debug)]
pub struct ConnectionPermit {
    limiter: Arc<ConnectionLimiter>,
}

impl Drop for ConnectionPermit {
    fn drop(&mut self) {
        self.limiter.open.fetch_sub(1, Ordering::AcqRel);
    }
}
