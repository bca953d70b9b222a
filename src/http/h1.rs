//! Legacy HTTP/1.1 chain: one buffered request, one response, keep-alive.

use std::convert::Infallible;
use std::net::SocketAddr;

use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::{TokioIo, TokioTimer};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::context::ConnectionContext;
use crate::error::TransportError;
use crate::http::dispatch::dispatch;
use crate::http::request::Request;
use crate::http::response::Response;

/// Serve HTTP/1.1 on `io` until the peer closes or a transport fault occurs.
pub async fn serve<I>(io: I, ctx: ConnectionContext, peer_addr: SocketAddr) -> Result<(), TransportError>
where
    I: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let service = service_fn(move |request: hyper::Request<Incoming>| {
        let ctx = ctx.clone();
        async move { Ok::<_, Infallible>(handle(&ctx, request, peer_addr).await) }
    });

    http1::Builder::new()
        .timer(TokioTimer::new())
        .keep_alive(true)
        .serve_connection(TokioIo::new(io), service)
        .await?;
    Ok(())
}

async fn handle(
    ctx: &ConnectionContext,
    request: hyper::Request<Incoming>,
    peer_addr: SocketAddr,
) -> hyper::Response<Full<Bytes>> {
    let (parts, body) = request.into_parts();

    let response = match Limited::new(body, ctx.limits.max_payload_bytes).collect().await {
        Ok(collected) => {
            let request = Request::new(parts.method, parts.uri, parts.headers)
                .with_body(collected.to_bytes())
                .with_peer_addr(peer_addr);
            dispatch(ctx, request)
        }
        Err(error) if error.downcast_ref::<LengthLimitError>().is_some() => {
            ctx.meters.mark_request();
            tracing::debug!(path = parts.uri.path(), "Request body exceeds payload limit");
            Response::payload_too_large()
        }
        Err(error) => {
            ctx.meters.mark_request();
            tracing::debug!(path = parts.uri.path(), error = %error, "Failed to read request body");
            Response::bad_request()
        }
    };

    ctx.meters.mark_status(response.status());
    into_hyper(response)
}

fn into_hyper(response: Response) -> hyper::Response<Full<Bytes>> {
    let (status, headers, body) = response.into_parts();
    let mut out = hyper::Response::new(Full::new(body));
    *out.status_mut() = status;
    *out.headers_mut() = headers;
    out
}
