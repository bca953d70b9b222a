//! Materialized request handed to handlers.
//!
//! # Responsibilities
//! - Carry method, URI, headers and the fully buffered body
//! - Carry the path variables captured by the matched route
//! - Assign a request ID for tracing
//!
//! # Design Decisions
//! - Identical shape for HTTP/1.1 and HTTP/2 so handlers are protocol-agnostic
//! - The body is buffered before dispatch; there is no streaming request API

use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};
use uuid::Uuid;

use crate::routing::PathVariables;

/// A complete request, ready for a handler.
#[derive(Debug, Clone)]
pub struct Request {
    request_id: Uuid,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    variables: PathVariables,
    body: Bytes,
    stream_id: Option<u32>,
    peer_addr: Option<SocketAddr>,
}

impl Request {
    pub fn new(method: Method, uri: Uri, headers: HeaderMap) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            method,
            uri,
            headers,
            variables: PathVariables::new(),
            body: Bytes::new(),
            stream_id: None,
            peer_addr: None,
        }
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_variables(mut self, variables: PathVariables) -> Self {
        self.variables = variables;
        self
    }

    pub fn with_stream_id(mut self, stream_id: u32) -> Self {
        self.stream_id = Some(stream_id);
        self
    }

    pub fn with_peer_addr(mut self, peer_addr: SocketAddr) -> Self {
        self.peer_addr = Some(peer_addr);
        self
    }

    pub(crate) fn set_variables(&mut self, variables: PathVariables) {
        self.variables = variables;
    }

    pub(crate) fn set_body(&mut self, body: Bytes) {
        self.body = body;
    }

    pub fn request_id(&self) -> Uuid {
        self.request_id
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn query(&self) -> Option<&str> {
        self.uri.query()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Header value as a string; `None` if absent or not visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Variables captured by the matched route pattern.
    pub fn variables(&self) -> &PathVariables {
        &self.variables
    }

    pub fn variable(&self, name: &str) -> Option<&str> {
        self.variables.get(name).map(String::as_str)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// HTTP/2 stream identifier; `None` on HTTP/1.1.
    pub fn stream_id(&self) -> Option<u32> {
        self.stream_id
    }

    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer_addr
    }

    /// Declared `content-length`, if present and well-formed.
    pub fn content_length(&self) -> Option<u64> {
        content_length(&self.headers)
    }
}

pub(crate) fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(http::header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}
