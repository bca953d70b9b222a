//! Handler responses and the canned error responses.
//!
//! # Responsibilities
//! - Status, headers and a fully buffered body
//! - `content-type` limited to the handful of types the server emits
//! - Exact `content-length` on every response
//!
//! # Design Decisions
//! - One response maps to one HEADERS + one DATA frame on HTTP/2; there is no
//!   streaming body
//! - Error bodies are fixed plaintext strings so clients can match on them

use bytes::Bytes;
use http::header::{self, HeaderName, HeaderValue};
use http::{HeaderMap, StatusCode};
use serde::Serialize;

pub const NOT_FOUND_BODY: &str = "Endpoint not found";
pub const INTERNAL_ERROR_BODY: &str = "Error executing endpoint";
pub const PAYLOAD_TOO_LARGE_BODY: &str = "Payload too large";
pub const BAD_REQUEST_BODY: &str = "Bad request";

/// Content types the server emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentType {
    ApplicationJson,
    TextPlain,
}

impl ContentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentType::ApplicationJson => "application/json",
            ContentType::TextPlain => "text/plain",
        }
    }
}

/// A complete response produced by a handler.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl Response {
    /// Empty-bodied response with `content-length: 0`.
    pub fn new(status: StatusCode) -> Self {
        let mut response = Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        };
        response.finalize_content_length();
        response
    }

    pub fn with_body(status: StatusCode, body: impl Into<Bytes>, content_type: ContentType) -> Self {
        let mut response = Self {
            status,
            headers: HeaderMap::new(),
            body: body.into(),
        };
        response.headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(content_type.as_str()),
        );
        response.finalize_content_length();
        response
    }

    pub fn ok(body: impl Into<Bytes>, content_type: ContentType) -> Self {
        Self::with_body(StatusCode::OK, body, content_type)
    }

    pub fn ok_text(body: impl Into<Bytes>) -> Self {
        Self::ok(body, ContentType::TextPlain)
    }

    /// Serialize `value` as the JSON body.
    pub fn json<T: Serialize + ?Sized>(status: StatusCode, value: &T) -> std::io::Result<Self> {
        let body = serde_json::to_vec(value)?;
        Ok(Self::with_body(status, body, ContentType::ApplicationJson))
    }

    pub fn bad_request() -> Self {
        Self::with_body(StatusCode::BAD_REQUEST, BAD_REQUEST_BODY, ContentType::TextPlain)
    }

    pub fn not_found() -> Self {
        Self::with_body(StatusCode::NOT_FOUND, NOT_FOUND_BODY, ContentType::TextPlain)
    }

    pub fn internal_error() -> Self {
        Self::with_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            INTERNAL_ERROR_BODY,
            ContentType::TextPlain,
        )
    }

    pub fn payload_too_large() -> Self {
        Self::with_body(
            StatusCode::PAYLOAD_TOO_LARGE,
            PAYLOAD_TOO_LARGE_BODY,
            ContentType::TextPlain,
        )
    }

    /// Add or replace a header. `content-length` is owned by the response and
    /// cannot be overridden.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        if name != header::CONTENT_LENGTH {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    fn finalize_content_length(&mut self) {
        self.headers
            .insert(header::CONTENT_LENGTH, HeaderValue::from(self.body.len()));
    }

    pub fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }
}
