//! Middleware layer.
//!
//! Middleware wraps the rest of the chain: it receives the [`Request`] and a
//! [`Next`] handle, decides whether and when to run the remainder, and may
//! rewrite the [`Response`] that comes back. It is the place for
//! cross-cutting concerns that act on finished responses, such as turning
//! attached errors into client-facing bodies.
//!
//! Layers run in registration order: the first one passed to
//! [`Router::layer`](crate::Router::layer) is outermost.
//!
//! ```rust
//! use veil::middleware::{self, ErrorPresenter, Next, PresenterConfig};
//! use veil::{Request, Router};
//!
//! let app = Router::new()
//!     .layer(ErrorPresenter::new(PresenterConfig::new().with_debug(false)))
//!     .layer(middleware::from_fn(|req: Request, next: Next| async move {
//!         tracing::debug!(path = req.path(), "request");
//!         next.run(req).await
//!     }));
//! ```

mod log;
mod present;

use std::future::Future;
use std::sync::Arc;

pub use self::log::{ErrorLog, TracingLog};
pub use self::present::{Envelope, ErrorPresenter, PresenterConfig, DEFAULT_GENERIC_MESSAGE};
pub use crate::handler::BoxFuture;

use crate::handler::BoxedHandler;
use crate::request::Request;
use crate::response::Response;

/// A layer around the request chain.
pub trait Middleware: Send + Sync + 'static {
    fn call(&self, req: Request, next: Next) -> BoxFuture;
}

pub(crate) type BoxedMiddleware = Arc<dyn Middleware>;

/// The remainder of the chain after the current layer.
pub struct Next {
    layers: Arc<[BoxedMiddleware]>,
    index: usize,
    endpoint: BoxedHandler,
}

impl Next {
    pub(crate) fn new(layers: Arc<[BoxedMiddleware]>, endpoint: BoxedHandler) -> Self {
        Self { layers, index: 0, endpoint }
    }

    /// Runs the remaining layers and then the endpoint.
    pub async fn run(self, req: Request) -> Response {
        let layer = self.layers.get(self.index).map(Arc::clone);
        match layer {
            Some(layer) => {
                let next = Self {
                    layers: self.layers,
                    index: self.index + 1,
                    endpoint: self.endpoint,
                };
                layer.call(req, next).await
            }
            None => self.endpoint.call(req).await,
        }
    }
}

/// Adapts an async closure into a [`Middleware`].
pub fn from_fn<F, Fut>(f: F) -> FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    FromFn(f)
}

/// Middleware built by [`from_fn`].
pub struct FromFn<F>(F);

impl<F, Fut> Middleware for FromFn<F>
where
    F: Fn(Request, Next) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn call(&self, req: Request, next: Next) -> BoxFuture {
        Box::pin((self.0)(req, next))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use http::{Method, StatusCode};

    use super::*;
    use crate::handler::Handler;

    #[tokio::test]
    async fn layers_run_outermost_first() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let tag = |name: &'static str| {
            let seen = Arc::clone(&seen);
            Arc::new(from_fn(move |req: Request, next: Next| {
                let seen = Arc::clone(&seen);
                async move {
                    seen.lock().expect("lock").push(name);
                    next.run(req).await
                }
            })) as BoxedMiddleware
        };

        let layers: Arc<[BoxedMiddleware]> = vec![tag("outer"), tag("inner")].into();
        let endpoint = (|_req: Request| async { StatusCode::ACCEPTED }).into_boxed_handler();

        let res = Next::new(layers, endpoint).run(Request::new(Method::GET, "/")).await;

        assert_eq!(res.status_code(), StatusCode::ACCEPTED);
        assert_eq!(*seen.lock().expect("lock"), vec!["outer", "inner"]);
    }

    #[tokio::test]
    async fn a_layer_can_short_circuit() {
        let gate: BoxedMiddleware = Arc::new(from_fn(|_req: Request, _next: Next| async {
            Response::status(StatusCode::UNAUTHORIZED)
        }));
        let endpoint = (|_req: Request| async { "unreachable" }).into_boxed_handler();

        let res = Next::new(vec![gate].into(), endpoint)
            .run(Request::new(Method::GET, "/"))
            .await;

        assert_eq!(res.status_code(), StatusCode::UNAUTHORIZED);
    }
}
