//! Protocol negotiation.
//!
//! # Responsibilities
//! - Map an ALPN identifier to the pipeline to install
//! - On cleartext connections, detect the HTTP/2 connection preface
//! - Hand the peeked bytes back to the chosen codec
//!
//! # Design Decisions
//! - Decided once per connection, before any request is parsed
//! - Anything that is not the exact preface is HTTP/1.x

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::{Buf, Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, ReadBuf};

/// Client connection preface that opens every HTTP/2 connection.
pub const H2_PREFACE: &[u8] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// Pipeline selected for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Protocol {
    Http1,
    Http2,
}

impl Protocol {
    /// Protocol for a negotiated ALPN identifier, `None` if unsupported.
    pub fn from_alpn(id: &[u8]) -> Option<Self> {
        match id {
            b"h2" => Some(Protocol::Http2),
            b"http/1.1" | b"http/1.0" => Some(Protocol::Http1),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Http1 => "http/1.1",
            Protocol::Http2 => "h2",
        }
    }
}

/// Classify the bytes read so far; `None` means more bytes are needed.
fn classify(prefix: &[u8]) -> Option<Protocol> {
    if prefix.len() >= H2_PREFACE.len() {
        return Some(if prefix.starts_with(H2_PREFACE) {
            Protocol::Http2
        } else {
            Protocol::Http1
        });
    }
    if H2_PREFACE.starts_with(prefix) {
        None
    } else {
        Some(Protocol::Http1)
    }
}

/// Read just enough of a cleartext connection to choose a protocol.
///
/// Returns the protocol and the bytes consumed, which must be replayed with
/// [`Rewind`].
pub async fn detect<I>(io: &mut I) -> io::Result<(Protocol, Bytes)>
where
    I: AsyncRead + Unpin,
{
    let mut prefix = BytesMut::with_capacity(H2_PREFACE.len());
    loop {
        if let Some(protocol) = classify(&prefix) {
            return Ok((protocol, prefix.freeze()));
        }
        let wanted = H2_PREFACE.len() - prefix.len();
        let mut chunk = vec![0u8; wanted];
        let read = io.read(&mut chunk).await?;
        if read == 0 {
            // Peer closed mid-preface; let the HTTP/1 codec report it.
            return Ok((Protocol::Http1, prefix.freeze()));
        }
        prefix.extend_from_slice(&chunk[..read]);
    }
}

/// An I/O object that yields `prefix` before reading from `inner`.
#[derive(Debug)]
pub struct Rewind<T> {
    prefix: Bytes,
    inner: T,
}

impl<T> Rewind<T> {
    pub fn new(inner: T, prefix: Bytes) -> Self {
        Self { prefix, inner }
    }

    pub fn into_inner(self) -> (T, Bytes) {
        (self.inner, self.prefix)
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for Rewind<T> {
    fn poll_read(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        if !self.prefix.is_empty() {
            let n = self.prefix.len().min(buf.remaining());
            buf.put_slice(&self.prefix[..n]);
            self.prefix.advance(n);
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for Rewind<T> {
    fn poll_write(mut self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.inner).poll_write(cx, buf)
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
        Pin::new(&mut self.inner).poll_write_vectored(cx, bufs)
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }
}
