//! Structured errors.
//!
//! A [`Fault`] is an error annotated for HTTP: it carries a status code, a
//! message, an ordered bag of diagnostic values and the stack captured when
//! it was created. Message and status live inside the bag itself, under
//! [`MESSAGE_KEY`] and [`STATUS_KEY`], so everything a handler attaches goes
//! through one place.
//!
//! ```rust
//! use http::StatusCode;
//! use veil::Fault;
//!
//! let fault = Fault::new("not found")
//!     .with_status(StatusCode::NOT_FOUND)
//!     .with_value("resource", "user:42");
//!
//! assert_eq!(fault.status(), StatusCode::NOT_FOUND);
//! assert_eq!(fault.message(), "not found");
//! ```

use std::backtrace::Backtrace;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

use http::StatusCode;
use serde_json::Value;

/// Bag key holding the plain message.
pub const MESSAGE_KEY: &str = "message";

/// Bag key holding the numeric HTTP status code.
pub const STATUS_KEY: &str = "http status code";

static STACK_CAPTURE: AtomicBool = AtomicBool::new(true);

/// Turns stack capture for new faults on or off, process-wide. On by
/// default. Capturing walks the stack on every [`Fault::new`]; services that
/// never run with debug presentation can switch it off at startup.
pub fn set_stack_capture(enabled: bool) {
    STACK_CAPTURE.store(enabled, Ordering::Relaxed);
}

pub fn stack_capture_enabled() -> bool {
    STACK_CAPTURE.load(Ordering::Relaxed)
}

// ── Key ───────────────────────────────────────────────────────────────────────

/// Key of a diagnostic value.
///
/// Most keys are names. [`Key::Id`] exists for callers that tag values with
/// numeric identifiers; such entries stay internal and are never rendered
/// to clients.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub enum Key {
    Name(Cow<'static, str>),
    Id(u64),
}

impl Key {
    /// The key as a string, or `None` for non-string keys.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Self::Name(name) => Some(&**name),
            Self::Id(_) => None,
        }
    }

    /// `true` for the two keys the bag uses for its own bookkeeping.
    pub fn is_reserved(&self) -> bool {
        matches!(self.as_name(), Some(MESSAGE_KEY | STATUS_KEY))
    }
}

impl From<&'static str> for Key {
    fn from(name: &'static str) -> Self {
        Self::Name(Cow::Borrowed(name))
    }
}

impl From<String> for Key {
    fn from(name: String) -> Self {
        Self::Name(Cow::Owned(name))
    }
}

impl From<u64> for Key {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Id(id) => write!(f, "#{id}"),
        }
    }
}

// ── Fault ─────────────────────────────────────────────────────────────────────

/// An error carrying an HTTP status, a message and diagnostic values.
///
/// New faults default to `500 Internal Server Error`. While
/// [`stack_capture_enabled`] is on, the stack is captured at construction,
/// independent of `RUST_BACKTRACE`.
pub struct Fault {
    values: Vec<(Key, Value)>,
    stack: Option<Backtrace>,
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl Fault {
    pub fn new(message: impl Into<String>) -> Self {
        Self::capturing(message, stack_capture_enabled())
    }

    fn capturing(message: impl Into<String>, capture: bool) -> Self {
        let mut fault = Self {
            values: Vec::new(),
            stack: capture.then(Backtrace::force_capture),
            source: None,
        };
        fault.set(Key::from(MESSAGE_KEY), Value::String(message.into()));
        fault.set(
            Key::from(STATUS_KEY),
            Value::from(StatusCode::INTERNAL_SERVER_ERROR.as_u16()),
        );
        fault
    }

    /// Wraps an arbitrary error. The message is taken from its `Display`
    /// output and the error itself is kept as [`source`](StdError::source).
    pub fn wrap<E>(err: E) -> Self
    where
        E: StdError + Send + Sync + 'static,
    {
        let mut fault = Self::new(err.to_string());
        fault.source = Some(Box::new(err));
        fault
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.set(Key::from(STATUS_KEY), Value::from(status.as_u16()));
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.set(Key::from(MESSAGE_KEY), Value::String(message.into()));
        self
    }

    /// Attaches a diagnostic value. Writing an existing key replaces its value
    /// in place.
    pub fn with_value(mut self, key: impl Into<Key>, value: impl Into<Value>) -> Self {
        self.set(key.into(), value.into());
        self
    }

    /// The status stored in the bag. Anything that is not a valid status
    /// code reads as `500`.
    pub fn status(&self) -> StatusCode {
        self.get(STATUS_KEY)
            .and_then(Value::as_u64)
            .and_then(|code| u16::try_from(code).ok())
            .and_then(|code| StatusCode::from_u16(code).ok())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    pub fn message(&self) -> &str {
        self.get(MESSAGE_KEY).and_then(Value::as_str).unwrap_or_default()
    }

    /// Every entry of the bag in insertion order, reserved keys included.
    pub fn values(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.values.iter().map(|(key, value)| (key, value))
    }

    /// Looks up a value by name.
    pub fn value(&self, name: &str) -> Option<&Value> {
        self.get(name)
    }

    /// The stack captured when this fault was created, if capture was on.
    pub fn stacktrace(&self) -> Option<String> {
        self.stack.as_ref().map(ToString::to_string)
    }

    fn get(&self, name: &str) -> Option<&Value> {
        self.values
            .iter()
            .find(|(key, _)| key.as_name() == Some(name))
            .map(|(_, value)| value)
    }

    fn set(&mut self, key: Key, value: Value) {
        match self.values.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.values.push((key, value)),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

// The stack is left out: it is large and rarely what a `{:?}` reader wants.
impl fmt::Debug for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fault")
            .field("status", &self.status().as_u16())
            .field("message", &self.message())
            .field("values", &self.values)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl StdError for Fault {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_fault_is_a_server_error() {
        let fault = Fault::new("db timeout");
        assert_eq!(fault.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(fault.message(), "db timeout");
        assert_eq!(fault.to_string(), "db timeout");
    }

    #[test]
    fn bag_holds_message_and_status_under_reserved_keys() {
        let fault = Fault::new("not found").with_status(StatusCode::NOT_FOUND);
        assert_eq!(fault.value(MESSAGE_KEY), Some(&Value::from("not found")));
        assert_eq!(fault.value(STATUS_KEY), Some(&Value::from(404)));

        let reserved: Vec<_> = fault.values().filter(|(k, _)| k.is_reserved()).collect();
        assert_eq!(reserved.len(), 2);
    }

    #[test]
    fn rewriting_a_key_keeps_its_position() {
        let fault = Fault::new("x")
            .with_value("a", 1)
            .with_value("b", 2)
            .with_value("a", 3);

        let named: Vec<_> = fault
            .values()
            .filter(|(k, _)| !k.is_reserved())
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        assert_eq!(
            named,
            vec![("a".to_owned(), Value::from(3)), ("b".to_owned(), Value::from(2))]
        );
    }

    #[test]
    fn garbage_status_value_reads_as_500() {
        let fault = Fault::new("x").with_value(STATUS_KEY, "teapot");
        assert_eq!(fault.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let fault = Fault::new("x").with_value(STATUS_KEY, 70_000);
        assert_eq!(fault.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[test]
    fn with_message_overrides_the_original() {
        let fault = Fault::new("first").with_message("second");
        assert_eq!(fault.message(), "second");
    }

    #[test]
    fn wrap_keeps_the_source() {
        let io = std::io::Error::other("disk on fire");
        let fault = Fault::wrap(io).with_status(StatusCode::SERVICE_UNAVAILABLE);

        assert_eq!(fault.message(), "disk on fire");
        assert_eq!(fault.status(), StatusCode::SERVICE_UNAVAILABLE);
        let source = StdError::source(&fault).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("disk on fire"));
    }

    #[test]
    fn id_keys_have_no_name() {
        let key = Key::from(7_u64);
        assert_eq!(key.as_name(), None);
        assert!(!key.is_reserved());
        assert_eq!(key.to_string(), "#7");
    }

    #[test]
    fn stacktrace_is_captured() {
        let stack = Fault::capturing("x", true).stacktrace();
        assert!(stack.is_some_and(|s| !s.is_empty()));
    }

    #[test]
    fn capture_can_be_skipped() {
        assert!(Fault::capturing("x", false).stacktrace().is_none());
    }
}
