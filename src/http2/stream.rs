//! HTTP/2 stream state machine.
//!
//! # Responsibilities
//! - Turn HEADERS / DATA / RST_STREAM callbacks into complete requests
//! - Keep in-flight state per stream identifier
//! - Resolve, execute and translate the response into outbound frames
//! - Report flow-control bytes consumed per DATA frame
//!
//! # Stream States
//! ```text
//! HEADERS ─▶ HeaderReceived ─┬─▶ Dispatching ─▶ Completed
//!                            └─▶ AwaitingBody ─(DATA, END_STREAM)─▶ Dispatching ─▶ Completed
//! RST_STREAM: any state ─▶ discarded, handler never runs
//! ```
//!
//! # Design Decisions
//! - Sans-I/O: no sockets here, frames go in and come out
//! - A pattern miss on HEADERS completes the stream with 404 at once
//! - The routing table is consulted again when the body completes
//! - Responses are exactly one HEADERS frame and one DATA frame

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;

use bytes::{Bytes, BytesMut};
use http::header::{self, HeaderName};
use http::{HeaderMap, Method, StatusCode, Uri};

use crate::context::ConnectionContext;
use crate::http::dispatch::{execute, not_found};
use crate::http::request::Request;
use crate::http::response::Response;

/// Lifecycle of one stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    HeaderReceived,
    AwaitingBody,
    Dispatching,
    Completed,
}

/// Outbound frame produced by the machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Frame {
    Headers {
        stream_id: u32,
        status: StatusCode,
        headers: HeaderMap,
        end_of_stream: bool,
    },
    Data {
        stream_id: u32,
        payload: Bytes,
        end_of_stream: bool,
    },
}

impl Frame {
    pub fn stream_id(&self) -> u32 {
        match self {
            Frame::Headers { stream_id, .. } | Frame::Data { stream_id, .. } => *stream_id,
        }
    }
}

/// Pseudo-headers and headers of a request HEADERS frame.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
}

impl From<http::request::Parts> for RequestHead {
    fn from(parts: http::request::Parts) -> Self {
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
        }
    }
}

/// A request waiting for its body.
#[derive(Debug)]
struct InFlightRequest {
    request: Request,
    body: BytesMut,
}

/// Connection-fields that HTTP/2 forbids.
const CONNECTION_SPECIFIC: [HeaderName; 5] = [
    header::CONNECTION,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
    HeaderName::from_static("keep-alive"),
    HeaderName::from_static("proxy-connection"),
];

/// Per-connection HTTP/2 request assembler.
#[derive(Debug)]
pub struct StreamMachine {
    ctx: ConnectionContext,
    peer_addr: Option<SocketAddr>,
    in_flight: HashMap<u32, InFlightRequest>,
    outbound: VecDeque<Frame>,
}

impl StreamMachine {
    pub fn new(ctx: ConnectionContext, peer_addr: Option<SocketAddr>) -> Self {
        Self {
            ctx,
            peer_addr,
            in_flight: HashMap::new(),
            outbound: VecDeque::new(),
        }
    }

    /// HEADERS received for `stream_id`.
    ///
    /// On a stream already awaiting its body the frame carries trailers; they
    /// complete the request when they end the stream.
    pub fn on_headers(&mut self, stream_id: u32, head: RequestHead, end_of_stream: bool) -> StreamState {
        if self.in_flight.contains_key(&stream_id) {
            if !end_of_stream {
                return StreamState::AwaitingBody;
            }
            if let Some(flight) = self.in_flight.remove(&stream_id) {
                self.complete(stream_id, flight);
            }
            return StreamState::Completed;
        }

        self.ctx.meters.mark_request();
        let mut request = Request::new(head.method, head.uri, head.headers).with_stream_id(stream_id);
        if let Some(peer_addr) = self.peer_addr {
            request = request.with_peer_addr(peer_addr);
        }
        let method = request.method().clone();
        transition(stream_id, StreamState::HeaderReceived);

        let route = match self.ctx.routes.resolve(request.path(), request.method()) {
            Ok(route) => route,
            Err(miss) => {
                let response = not_found(&miss, &request);
                self.respond(stream_id, &method, response);
                return StreamState::Completed;
            }
        };

        let declared = request.content_length();
        if declared.is_some_and(|len| len > self.ctx.limits.max_payload_bytes as u64) {
            tracing::debug!(stream_id, "Declared content-length exceeds payload limit");
            self.respond(stream_id, &method, Response::payload_too_large());
            return StreamState::Completed;
        }

        if end_of_stream || declared == Some(0) {
            transition(stream_id, StreamState::Dispatching);
            let response = execute(route, request);
            self.respond(stream_id, &method, response);
            return StreamState::Completed;
        }

        let capacity = declared
            .map_or(0, |len| len as usize)
            .min(self.ctx.limits.max_payload_bytes);
        self.in_flight.insert(
            stream_id,
            InFlightRequest {
                request,
                body: BytesMut::with_capacity(capacity),
            },
        );
        transition(stream_id, StreamState::AwaitingBody);
        StreamState::AwaitingBody
    }

    /// DATA received for `stream_id`.
    ///
    /// Returns the flow-control bytes consumed: payload plus padding, whether
    /// or not the stream is still known.
    pub fn on_data(&mut self, stream_id: u32, payload: Bytes, padding: usize, end_of_stream: bool) -> usize {
        let consumed = payload.len() + padding;

        let Some(flight) = self.in_flight.get_mut(&stream_id) else {
            tracing::trace!(stream_id, bytes = consumed, "DATA for stream not awaiting a body");
            return consumed;
        };

        if flight.body.len() + payload.len() > self.ctx.limits.max_payload_bytes {
            let method = flight.request.method().clone();
            self.in_flight.remove(&stream_id);
            tracing::debug!(stream_id, "Request body exceeds payload limit");
            self.respond(stream_id, &method, Response::payload_too_large());
            return consumed;
        }

        flight.body.extend_from_slice(&payload);
        if end_of_stream {
            if let Some(flight) = self.in_flight.remove(&stream_id) {
                self.complete(stream_id, flight);
            }
        }
        consumed
    }

    /// RST_STREAM received, or the stream failed locally.
    ///
    /// Drops in-flight state and any queued frames. Returns whether the stream
    /// still had a request waiting for its body.
    pub fn on_reset(&mut self, stream_id: u32) -> bool {
        self.outbound.retain(|frame| frame.stream_id() != stream_id);
        let discarded = self.in_flight.remove(&stream_id).is_some();
        if discarded {
            tracing::debug!(stream_id, "Stream reset before its body completed");
        }
        discarded
    }

    /// Next frame to write, in emission order.
    pub fn poll_frame(&mut self) -> Option<Frame> {
        self.outbound.pop_front()
    }

    pub fn in_flight_count(&self) -> usize {
        self.in_flight.len()
    }

    pub fn is_in_flight(&self, stream_id: u32) -> bool {
        self.in_flight.contains_key(&stream_id)
    }

    fn complete(&mut self, stream_id: u32, flight: InFlightRequest) {
        let mut request = flight.request;
        request.set_body(flight.body.freeze());
        let method = request.method().clone();
        transition(stream_id, StreamState::Dispatching);

        let response = match self.ctx.routes.resolve(request.path(), request.method()) {
            Ok(route) => execute(route, request),
            Err(miss) => not_found(&miss, &request),
        };
        self.respond(stream_id, &method, response);
    }

    /// Queue the response frames. HEAD responses keep their headers,
    /// `content-length` included, but carry an empty DATA payload.
    fn respond(&mut self, stream_id: u32, method: &Method, response: Response) {
        let (status, mut headers, body) = response.into_parts();
        strip_connection_specific(&mut headers);
        let body = if *method == Method::HEAD { Bytes::new() } else { body };

        self.outbound.push_back(Frame::Headers {
            stream_id,
            status,
            headers,
            end_of_stream: false,
        });
        self.outbound.push_back(Frame::Data {
            stream_id,
            payload: body,
            end_of_stream: true,
        });

        self.ctx.meters.mark_status(status);
        transition(stream_id, StreamState::Completed);
    }
}

/// Remove the fields h2 refuses to encode. `te` may only carry `trailers`.
fn strip_connection_specific(headers: &mut HeaderMap) {
    for name in &CONNECTION_SPECIFIC {
        headers.remove(name);
    }
    let te_allowed = headers
        .get_all(header::TE)
        .iter()
        .all(|value| value.as_bytes().eq_ignore_ascii_case(b"trailers"));
    if !te_allowed {
        headers.remove(header::TE);
    }
}

fn transition(stream_id: u32, state: StreamState) {
    tracing::trace!(stream_id, state = ?state, "Stream transition");
}
