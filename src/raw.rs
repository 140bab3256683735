//! The error a handler attaches to its response.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

use http::StatusCode;

use crate::fault::Fault;

/// An error attached to a response by a handler or middleware.
///
/// Either a [`Fault`], which knows its status and diagnostics, or any other
/// error, which only knows how to print itself and always counts as a
/// server fault.
pub enum RawError {
    Structured(Fault),
    Opaque(Box<dyn StdError + Send + Sync>),
}

impl RawError {
    /// Wraps anything boxable as an error, including `&str` and `String`.
    pub fn opaque(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self::Opaque(err.into())
    }

    /// The status this error maps to. Opaque errors are always `500`.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Structured(fault) => fault.status(),
            Self::Opaque(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn message(&self) -> Cow<'_, str> {
        match self {
            Self::Structured(fault) => Cow::Borrowed(fault.message()),
            Self::Opaque(err) => Cow::Owned(err.to_string()),
        }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, Self::Structured(_))
    }

    pub fn as_fault(&self) -> Option<&Fault> {
        match self {
            Self::Structured(fault) => Some(fault),
            Self::Opaque(_) => None,
        }
    }
}

impl From<Fault> for RawError {
    fn from(fault: Fault) -> Self {
        Self::Structured(fault)
    }
}

impl From<std::io::Error> for RawError {
    fn from(err: std::io::Error) -> Self {
        Self::opaque(err)
    }
}

impl From<serde_json::Error> for RawError {
    fn from(err: serde_json::Error) -> Self {
        Self::opaque(err)
    }
}

impl fmt::Display for RawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured(fault) => fmt::Display::fmt(fault, f),
            Self::Opaque(err) => fmt::Display::fmt(err, f),
        }
    }
}

impl fmt::Debug for RawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Structured(fault) => f.debug_tuple("Structured").field(fault).finish(),
            Self::Opaque(err) => f.debug_tuple("Opaque").field(err).finish(),
        }
    }
}
