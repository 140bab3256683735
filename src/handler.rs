//! Handler trait and type erasure.
//!
//! Routes, the 404 fallback and the tail of every middleware chain are all
//! stored the same way: as a [`BoxedHandler`], an `Arc` around a trait
//! object that turns a [`Request`] into a boxed future of a [`Response`].
//!
//! ```text
//! async fn show(req: Request) -> Result<Response, Fault> { … }
//!        ↓ router.on(Method::GET, "/", show)
//! show.into_boxed_handler()            ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(show))            ← stored as BoxedHandler
//!        ↓ Next::run(req)              ← after every middleware layer
//! Box::pin(async { show(req).await.into_response() })
//! ```
//!
//! `into_response` is where a returned `Err` becomes an error attached to
//! the response, ready for the presentation layer.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

/// A heap-allocated, type-erased future that resolves to a [`Response`].
///
/// `Send + 'static` so tokio can move it between worker threads.
pub type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// Satisfied automatically by any function of the shape
///
/// ```text
/// async fn name(req: Request) -> impl IntoResponse
/// ```
///
/// Sealed: only the blanket impl below can satisfy it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { fut.await.into_response() })
    }
}

#[cfg(test)]
mod tests {
    use http::{Method, StatusCode};

    use super::*;
    use crate::fault::Fault;

    async fn refuse(_req: Request) -> Result<Response, Fault> {
        Err(Fault::new("nope").with_status(StatusCode::FORBIDDEN))
    }

    #[tokio::test]
    async fn err_results_arrive_as_attached_errors() {
        let handler = refuse.into_boxed_handler();
        let res = handler.call(Request::new(Method::GET, "/")).await;

        assert_eq!(res.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        let err = res.last_error().expect("error attached");
        assert_eq!(err.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn plain_values_are_converted() {
        let handler = (|_req: Request| async { "hello" }).into_boxed_handler();
        let res = handler.call(Request::new(Method::GET, "/")).await;

        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"hello");
        assert!(!res.has_error());
    }
}
