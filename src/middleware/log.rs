//! Log sinks for observed errors.

use http::StatusCode;
use serde_json::{Map, Value};
use tracing::{error, warn};

/// Receives every error the presenter handles, before any masking.
///
/// Called synchronously on the request path, once per error. Implementors
/// that touch shared state are responsible for their own synchronization.
/// A panic inside `log` is caught and reported; it never fails the request.
///
/// Any matching closure is a sink:
///
/// ```rust
/// use http::StatusCode;
/// use serde_json::{Map, Value};
/// use veil::middleware::PresenterConfig;
///
/// let config = PresenterConfig::new().with_log(
///     |message: &str, status: StatusCode, _details: &Map<String, Value>| {
///         eprintln!("{status}: {message}");
///     },
/// );
/// ```
pub trait ErrorLog: Send + Sync {
    fn log(&self, message: &str, status: StatusCode, details: &Map<String, Value>);
}

impl<F> ErrorLog for F
where
    F: Fn(&str, StatusCode, &Map<String, Value>) + Send + Sync,
{
    fn log(&self, message: &str, status: StatusCode, details: &Map<String, Value>) {
        self(message, status, details)
    }
}

/// Writes observed errors to `tracing`: `error!` for 5xx, `warn!` otherwise.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLog;

impl ErrorLog for TracingLog {
    fn log(&self, message: &str, status: StatusCode, details: &Map<String, Value>) {
        let details = Value::Object(details.clone());
        if status.is_server_error() {
            error!(status = status.as_u16(), %details, "{message}");
        } else {
            warn!(status = status.as_u16(), %details, "{message}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tracing_test::traced_test;

    use super::*;

    #[test]
    fn closures_are_sinks() {
        let calls = AtomicUsize::new(0);
        let sink = |message: &str, status: StatusCode, details: &Map<String, Value>| {
            assert_eq!(message, "boom");
            assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
            assert!(details.is_empty());
            calls.fetch_add(1, Ordering::SeqCst);
        };

        ErrorLog::log(&sink, "boom", StatusCode::INTERNAL_SERVER_ERROR, &Map::new());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    #[traced_test]
    fn tracing_sink_splits_levels_by_status() {
        let details: Map<String, Value> = [("k".to_owned(), Value::from(1))].into_iter().collect();
        TracingLog.log("db timeout", StatusCode::INTERNAL_SERVER_ERROR, &details);
        TracingLog.log("not found", StatusCode::NOT_FOUND, &details);

        logs_assert(|lines: &[&str]| {
            let line = |needle: &str| {
                lines
                    .iter()
                    .find(|l| l.contains(needle))
                    .copied()
                    .ok_or_else(|| format!("no log line for {needle:?}"))
            };

            let server = line("db timeout")?;
            if !(server.contains("ERROR") && server.contains("status=500")) {
                return Err(format!("5xx not logged at error: {server}"));
            }
            let client = line("not found")?;
            if !(client.contains("WARN") && client.contains("status=404")) {
                return Err(format!("4xx not logged at warn: {client}"));
            }
            if !server.contains(r#"details={"k":1}"#) {
                return Err(format!("details missing: {server}"));
            }
            Ok(())
        });
    }
}
