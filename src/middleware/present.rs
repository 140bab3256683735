//! Error presentation: attached errors in, client-safe JSON out.
//!
//! [`ErrorPresenter`] runs the rest of the chain and, if the response comes
//! back carrying an error, rebuilds it as
//!
//! ```text
//! { "error": "<message>", "details": { ... } }
//! ```
//!
//! Anything that maps to `500` (every opaque error, and faults left at the
//! default status) is masked behind the configured generic message with no
//! `details`. Other faults expose their message and their named diagnostic
//! values. The configured [`ErrorLog`] always sees the unmasked version.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, error, warn};

use super::log::ErrorLog;
use super::{Middleware, Next};
use crate::fault::Fault;
use crate::handler::BoxFuture;
use crate::raw::RawError;
use crate::request::Request;
use crate::response::Response;

/// Message shown for masked errors unless configured otherwise.
pub const DEFAULT_GENERIC_MESSAGE: &str = "Internal Server Error!";

const STACK_KEY: &str = "stack";

// ── Envelope ──────────────────────────────────────────────────────────────────

/// The JSON body sent for a presented error.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(rename = "error")]
    pub message: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub details: Map<String, Value>,
}

impl Envelope {
    fn masked(generic_message: &str) -> Self {
        Self { message: generic_message.to_owned(), details: Map::new() }
    }
}

// ── PresenterConfig ───────────────────────────────────────────────────────────

/// Presentation policy, fixed at construction and shared by every request.
///
/// | Setting | Default |
/// |---|---|
/// | `debug` | `false` |
/// | `generic_message` | [`DEFAULT_GENERIC_MESSAGE`] |
/// | `log` | none |
///
/// With `debug` on, responses for non-`500` faults gain a `stack` detail.
/// Masked responses never carry one; the log sink still receives it.
#[derive(Clone)]
pub struct PresenterConfig {
    debug: bool,
    generic_message: String,
    log: Option<Arc<dyn ErrorLog>>,
}

impl PresenterConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_generic_message(mut self, message: impl Into<String>) -> Self {
        self.generic_message = message.into();
        self
    }

    pub fn with_log(self, sink: impl ErrorLog + 'static) -> Self {
        self.with_shared_log(Arc::new(sink))
    }

    /// Like [`with_log`](Self::with_log), for a sink the caller keeps a
    /// handle to.
    pub fn with_shared_log(mut self, sink: Arc<dyn ErrorLog>) -> Self {
        self.log = Some(sink);
        self
    }

    pub fn debug(&self) -> bool { self.debug }
    pub fn generic_message(&self) -> &str { &self.generic_message }
    pub fn log(&self) -> Option<&dyn ErrorLog> { self.log.as_deref() }
}

impl Default for PresenterConfig {
    fn default() -> Self {
        Self {
            debug: false,
            generic_message: DEFAULT_GENERIC_MESSAGE.to_owned(),
            log: None,
        }
    }
}

impl fmt::Debug for PresenterConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PresenterConfig")
            .field("debug", &self.debug)
            .field("generic_message", &self.generic_message)
            .field("log", &self.log.is_some())
            .finish()
    }
}

// ── ErrorPresenter ────────────────────────────────────────────────────────────

/// Middleware that turns an attached error into a JSON error response.
///
/// Responses without an attached error pass through untouched.
#[derive(Clone, Debug, Default)]
pub struct ErrorPresenter {
    config: Arc<PresenterConfig>,
}

impl ErrorPresenter {
    pub fn new(config: PresenterConfig) -> Self {
        Self { config: Arc::new(config) }
    }

    /// Default policy with a custom masking message.
    pub fn with_generic_message(message: impl Into<String>) -> Self {
        Self::new(PresenterConfig::new().with_generic_message(message))
    }

    pub fn config(&self) -> &PresenterConfig {
        &self.config
    }

    /// Decides the status and client-facing envelope for `err`. Nothing is
    /// logged; [`finalize`](Self::finalize) is what reports to the log sink.
    pub fn present(&self, err: &RawError) -> (StatusCode, Envelope) {
        let observed = self.observe(err);
        (observed.status, self.envelope(observed))
    }

    /// Rewrites `res` from its most recent error and clears the error slot.
    /// A response without errors is returned as is.
    pub fn finalize(&self, mut res: Response) -> Response {
        let Some(observed) = res.last_error().map(|err| self.observe(err)) else {
            return res;
        };

        if let Some(log) = self.config.log() {
            notify(log, &observed.message, observed.status, &observed.details);
        }

        let status = observed.status;
        let envelope = self.envelope(observed);
        let body = encode(&envelope, &self.config.generic_message);

        res.set_status(if body.is_fallback { StatusCode::INTERNAL_SERVER_ERROR } else { status });
        res.set_json(body.bytes);
        res.clear_errors();
        res
    }

    /// The unmasked view of `err`: what the log sink receives.
    fn observe(&self, err: &RawError) -> Observed {
        let mut details = err.as_fault().map(diagnostics).unwrap_or_default();
        if self.config.debug {
            if let Some(stack) = err.as_fault().and_then(Fault::stacktrace) {
                details.insert(STACK_KEY.to_owned(), Value::String(stack));
            }
        }

        Observed {
            status: err.status(),
            message: err.message().into_owned(),
            details,
        }
    }

    fn envelope(&self, observed: Observed) -> Envelope {
        let masked = observed.status == StatusCode::INTERNAL_SERVER_ERROR;
        debug!(status = observed.status.as_u16(), masked, "presenting request error");

        if masked {
            Envelope::masked(&self.config.generic_message)
        } else {
            Envelope { message: observed.message, details: observed.details }
        }
    }
}

struct Observed {
    status: StatusCode,
    message: String,
    details: Map<String, Value>,
}

struct Body {
    bytes: Vec<u8>,
    is_fallback: bool,
}

fn encode(envelope: &Envelope, generic_message: &str) -> Body {
    fallback_on_error(serde_json::to_vec(envelope), generic_message)
}

// `to_vec` on string keys and `Value`s does not fail today; the fallback
// keeps a response going out if `Envelope` ever grows a fallible field.
fn fallback_on_error(encoded: serde_json::Result<Vec<u8>>, generic_message: &str) -> Body {
    match encoded {
        Ok(bytes) => Body { bytes, is_fallback: false },
        Err(e) => {
            error!("failed to encode error envelope: {e}");
            let fallback = serde_json::json!({ "error": generic_message });
            Body { bytes: fallback.to_string().into_bytes(), is_fallback: true }
        }
    }
}

impl Middleware for ErrorPresenter {
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        let presenter = self.clone();
        Box::pin(async move {
            let res = next.run(req).await;
            presenter.finalize(res)
        })
    }
}

/// Named entries of the fault's bag, minus the bookkeeping keys.
fn diagnostics(fault: &Fault) -> Map<String, Value> {
    fault
        .values()
        .filter(|(key, _)| !key.is_reserved())
        .filter_map(|(key, value)| Some((key.as_name()?.to_owned(), value.clone())))
        .collect()
}

fn notify(log: &dyn ErrorLog, message: &str, status: StatusCode, details: &Map<String, Value>) {
    let logged = panic::catch_unwind(AssertUnwindSafe(|| log.log(message, status, details)));
    if logged.is_err() {
        warn!(status = status.as_u16(), "error log sink panicked");
    }
}
