//! Connection idle detection.
//!
//! # Responsibilities
//! - Record the last read and last write on a connection
//! - Decide whether a reader, writer or all-idle threshold has elapsed
//! - Provide a watchdog future that resolves when one has
//!
//! # Design Decisions
//! - Activity is recorded by wrapping the socket, not by the codecs
//! - Thresholds of zero are disabled; with none enabled the watchdog never fires
//! - The decision is a pure function of elapsed times

use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::{Duration, Instant};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

use crate::config::TimeoutConfig;

const MIN_TICK: Duration = Duration::from_millis(10);

/// Enabled idle thresholds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdleTimeouts {
    pub reader: Option<Duration>,
    pub writer: Option<Duration>,
    pub all: Option<Duration>,
}

impl IdleTimeouts {
    pub fn from_config(config: &TimeoutConfig) -> Self {
        Self {
            reader: config.reader_idle(),
            writer: config.writer_idle(),
            all: config.all_idle(),
        }
    }

    /// Smallest enabled threshold.
    pub fn shortest(&self) -> Option<Duration> {
        [self.reader, self.writer, self.all].into_iter().flatten().min()
    }

    /// Which threshold, if any, the elapsed times exceed.
    pub fn classify(&self, since_read: Duration, since_write: Duration) -> Option<IdleState> {
        if self.reader.is_some_and(|limit| since_read >= limit) {
            return Some(IdleState::ReaderIdle);
        }
        if self.writer.is_some_and(|limit| since_write >= limit) {
            return Some(IdleState::WriterIdle);
        }
        if self.all.is_some_and(|limit| since_read.min(since_write) >= limit) {
            return Some(IdleState::AllIdle);
        }
        None
    }
}

/// Reason a connection was found idle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    ReaderIdle,
    WriterIdle,
    AllIdle,
}

/// Last-activity timestamps shared between the socket wrapper and the watchdog.
#[derive(Debug)]
pub struct IdleClock {
    origin: Instant,
    last_read_ms: AtomicU64,
    last_write_ms: AtomicU64,
}

impl IdleClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            last_read_ms: AtomicU64::new(0),
            last_write_ms: AtomicU64::new(0),
        }
    }

    fn now_ms(&self) -> u64 {
        self.origin.elapsed().as_millis() as u64
    }

    pub fn touch_read(&self) {
        self.last_read_ms.store(self.now_ms(), Ordering::Relaxed);
    }

    pub fn touch_write(&self) {
        self.last_write_ms.store(self.now_ms(), Ordering::Relaxed);
    }

    /// Time since the last read and since the last write.
    pub fn elapsed(&self) -> (Duration, Duration) {
        let now = self.now_ms();
        let since = |last: &AtomicU64| Duration::from_millis(now.saturating_sub(last.load(Ordering::Relaxed)));
        (since(&self.last_read_ms), since(&self.last_write_ms))
    }
}

impl Default for IdleClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Resolve once `timeouts` classify the connection as idle.
///
/// Never resolves when no threshold is enabled.
pub async fn watch(clock: Arc<IdleClock>, timeouts: IdleTimeouts) -> IdleState {
    let Some(shortest) = timeouts.shortest() else {
        return std::future::pending().await;
    };

    let mut ticker = tokio::time::interval((shortest / 4).max(MIN_TICK));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        let (since_read, since_write) = clock.elapsed();
        if let Some(state) = timeouts.classify(since_read, since_write) {
            return state;
        }
    }
}

/// Socket wrapper that records activity on an [`IdleClock`].
#[derive(Debug)]
pub struct IdleIo<T> {
    inner: T,
    clock: Arc<IdleClock>,
}

impl<T> IdleIo<T> {
    pub fn new(inner: T, clock: Arc<IdleClock>) -> Self {
        Self { inner, clock }
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for IdleIo<T> {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        let before = buf.filled().len();
        let polled = Pin::new(&mut self.inner).poll_read(cx, buf);
        if matches!(polled, Poll::Ready(Ok(()))) && buf.filled().len() > before {
            self.clock.touch_read();
        }
        polled
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for IdleIo<T> {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        let polled = Pin::new(&mut self.inner).poll_write(cx, buf);
        if matches!(polled, Poll::Ready(Ok(n)) if n > 0) {
            self.clock.touch_write();
        }
        polled
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let polled = Pin::new(&mut self.inner).poll_write_vectored(cx, bufs);
        if matches!(polled, Poll::Ready(Ok(n)) if n > 0) {
            self.clock.touch_write();
        }
        polled
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }
}
