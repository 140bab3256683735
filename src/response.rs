//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! A [`Response`] is also where a request's errors live. Handlers attach
//! them (directly, or by returning `Err`), middleware reads and clears
//! them, and the server logs whatever is left before the response goes out.

use bytes::Bytes;
use http::header::{CONTENT_LENGTH, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use tracing::warn;

use crate::fault::Fault;
use crate::raw::RawError;

// ── ContentType ───────────────────────────────────────────────────────────────

/// Common content-type values for use with [`ResponseBuilder::bytes`].
pub enum ContentType {
    EventStream,  // text/event-stream  (SSE)
    Html,         // text/html; charset=utf-8
    Json,         // application/json
    OctetStream,  // application/octet-stream
    ProblemJson,  // application/problem+json
    Text,         // text/plain; charset=utf-8
}

impl ContentType {
    fn as_str(&self) -> &'static str {
        match self {
            Self::EventStream => "text/event-stream",
            Self::Html        => "text/html; charset=utf-8",
            Self::Json        => "application/json",
            Self::OctetStream => "application/octet-stream",
            Self::ProblemJson => "application/problem+json",
            Self::Text        => "text/plain; charset=utf-8",
        }
    }
}

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response plus the errors attached while producing it.
///
/// ```rust
/// use http::StatusCode;
/// use veil::{Fault, Response};
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// // empty 500, error attached for the presentation layer
/// Response::error(Fault::new("not found").with_status(StatusCode::NOT_FOUND));
/// ```
pub struct Response {
    pub(crate) body: Bytes,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) status: StatusCode,
    pub(crate) errors: Vec<RawError>,
}

impl Response {
    /// `200 OK` with `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK` with `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self::builder().status(code).no_body()
    }

    /// An empty `500` carrying `err`.
    ///
    /// Without an error presentation layer this is what the client sees;
    /// with one, the body and status are rebuilt from `err`.
    pub fn error(err: impl Into<RawError>) -> Self {
        Self::status(StatusCode::INTERNAL_SERVER_ERROR).with_error(err)
    }

    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.status }
    pub fn headers(&self) -> &[(String, String)] { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn set_status(&mut self, code: StatusCode) {
        self.status = code;
    }

    /// Replaces the body with `body` as `application/json`. Other headers
    /// set earlier are kept.
    pub fn set_json(&mut self, body: impl Into<Bytes>) {
        self.headers.retain(|(k, _)| {
            !k.eq_ignore_ascii_case(CONTENT_TYPE.as_str())
                && !k.eq_ignore_ascii_case(CONTENT_LENGTH.as_str())
        });
        self.headers.push((CONTENT_TYPE.as_str().to_owned(), ContentType::Json.as_str().to_owned()));
        self.body = body.into();
    }

    // ── Error slot ────────────────────────────────────────────────────────────

    pub fn attach_error(&mut self, err: impl Into<RawError>) {
        self.errors.push(err.into());
    }

    pub fn with_error(mut self, err: impl Into<RawError>) -> Self {
        self.attach_error(err);
        self
    }

    /// The most recently attached error.
    pub fn last_error(&self) -> Option<&RawError> {
        self.errors.last()
    }

    pub fn has_error(&self) -> bool {
        !self.errors.is_empty()
    }

    pub fn errors(&self) -> &[RawError] {
        &self.errors
    }

    pub fn take_errors(&mut self) -> Vec<RawError> {
        std::mem::take(&mut self.errors)
    }

    pub fn clear_errors(&mut self) {
        self.errors.clear();
    }

    /// Converts into the `http` type hyper writes to the wire. Headers that
    /// are not valid HTTP are dropped with a warning. Attached errors do
    /// not survive the conversion.
    pub(crate) fn into_inner(self) -> http::Response<Full<Bytes>> {
        let mut out = http::Response::new(Full::new(self.body));
        *out.status_mut() = self.status;

        for (name, value) in self.headers {
            match (HeaderName::try_from(name.as_str()), HeaderValue::try_from(value.as_str())) {
                (Ok(name), Ok(value)) => {
                    out.headers_mut().append(name, value);
                }
                _ => warn!(header = %name, "dropping invalid response header"),
            }
        }
        out
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`.
/// Terminated by a typed body method.
pub struct ResponseBuilder {
    headers: Vec<(String, String)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_owned(), value.to_owned()));
        self
    }

    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish(ContentType::Json.as_str(), body.into())
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        let body: String = body.into();
        self.finish(ContentType::Text.as_str(), Bytes::from(body))
    }

    /// Terminate with a typed body. Use this for HTML, binary, SSE, etc.
    pub fn bytes(self, content_type: ContentType, body: impl Into<Bytes>) -> Response {
        self.finish(content_type.as_str(), body.into())
    }

    pub fn no_body(self) -> Response {
        Response {
            body: Bytes::new(),
            headers: self.headers,
            status: self.status,
            errors: Vec::new(),
        }
    }

    fn finish(self, content_type: &str, body: Bytes) -> Response {
        let mut headers = vec![(CONTENT_TYPE.as_str().to_owned(), content_type.to_owned())];
        headers.extend(self.headers);
        Response { body, headers, status: self.status, errors: Vec::new() }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Returning `Result<T, E>` from a handler is the usual way to fail: the
/// `Err` arm becomes [`Response::error`].
///
/// ```rust
/// use http::StatusCode;
/// use veil::{Fault, Request, Response};
///
/// async fn get_user(req: Request) -> Result<Response, Fault> {
///     let id = req.param("id").ok_or_else(|| {
///         Fault::new("missing id").with_status(StatusCode::BAD_REQUEST)
///     })?;
///     Ok(Response::text(id.to_owned()))
/// }
/// ```
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

impl IntoResponse for Fault {
    fn into_response(self) -> Response { Response::error(self) }
}

impl IntoResponse for RawError {
    fn into_response(self) -> Response { Response::error(self) }
}

impl<T, E> IntoResponse for Result<T, E>
where
    T: IntoResponse,
    E: Into<RawError>,
{
    fn into_response(self) -> Response {
        match self {
            Ok(ok) => ok.into_response(),
            Err(err) => Response::error(err),
        }
    }
}
