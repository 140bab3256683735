//! Radix-tree request router with a middleware stack.
//!
//! One tree per HTTP method. O(path-length) lookup. Every request, matched
//! or not, runs through the same layers, so a 404 from the fallback is
//! finalized by the same middleware as any routed response.

use std::collections::HashMap;
use std::sync::Arc;

use http::{Method, StatusCode};
use matchit::Router as MatchitRouter;

use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{BoxedMiddleware, Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
/// Each [`Router::on`] and [`Router::layer`] call returns `self` so
/// registrations chain naturally.
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    layers: Arc<[BoxedMiddleware]>,
    fallback: BoxedHandler,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            layers: Arc::from(Vec::new()),
            fallback: not_found.into_boxed_handler(),
        }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax; `req.param("name")` retrieves them.
    ///
    /// # Panics
    ///
    /// Panics if `path` is not a valid route or conflicts with one already
    /// registered for `method`.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        self.routes
            .entry(method)
            .or_default()
            .insert(path, handler.into_boxed_handler())
            .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
        self
    }

    /// Wrap every route (and the fallback) in `middleware`. The first layer
    /// added is the outermost.
    pub fn layer(mut self, middleware: impl Middleware) -> Self {
        let mut layers = self.layers.to_vec();
        layers.push(Arc::new(middleware));
        self.layers = layers.into();
        self
    }

    /// Handler for requests no route matches. Defaults to an empty `404`.
    pub fn fallback(mut self, handler: impl Handler) -> Self {
        self.fallback = handler.into_boxed_handler();
        self
    }

    /// Runs `req` through the middleware stack and the matching handler.
    pub async fn handle(&self, mut req: Request) -> Response {
        let endpoint = match self.lookup(&req.method, &req.path) {
            Some((handler, params)) => {
                req.params = params;
                handler
            }
            None => Arc::clone(&self.fallback),
        };

        Next::new(Arc::clone(&self.layers), endpoint).run(req).await
    }

    fn lookup(
        &self,
        method: &Method,
        path: &str,
    ) -> Option<(BoxedHandler, HashMap<String, String>)> {
        let tree = self.routes.get(method)?;
        let matched = tree.at(path).ok()?;
        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        Some((handler, params))
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

async fn not_found(_req: Request) -> StatusCode {
    StatusCode::NOT_FOUND
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fault::Fault;
    use crate::middleware::ErrorPresenter;

    async fn show_user(req: Request) -> Result<Response, Fault> {
        match req.param("id") {
            Some("42") => Ok(Response::text("alice")),
            Some(id) => Err(Fault::new("no such user")
                .with_status(StatusCode::NOT_FOUND)
                .with_value("id", id.to_owned())),
            None => Err(Fault::new("missing id")),
        }
    }

    fn app() -> Router {
        Router::new()
            .layer(ErrorPresenter::default())
            .on(Method::GET, "/users/{id}", show_user)
    }

    #[tokio::test]
    async fn routes_with_params() {
        let res = app().handle(Request::new(Method::GET, "/users/42")).await;
        assert_eq!(res.status_code(), StatusCode::OK);
        assert_eq!(res.body(), b"alice");
    }

    #[tokio::test]
    async fn handler_errors_are_presented() {
        let res = app().handle(Request::new(Method::GET, "/users/7")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(res.body(), br#"{"error":"no such user","details":{"id":"7"}}"#);
    }

    #[tokio::test]
    async fn unmatched_requests_hit_the_fallback() {
        let res = app().handle(Request::new(Method::POST, "/users/42")).await;
        assert_eq!(res.status_code(), StatusCode::NOT_FOUND);
        assert!(res.body().is_empty());

        let app = app().fallback(|_req: Request| async {
            Fault::new("no route").with_status(StatusCode::NOT_FOUND)
        });
        let res = app.handle(Request::new(Method::GET, "/nowhere")).await;
        assert_eq!(res.body(), br#"{"error":"no route"}"#);
    }

    #[test]
    #[should_panic(expected = "invalid route")]
    fn conflicting_routes_panic() {
        let _ = Router::new()
            .on(Method::GET, "/users/{id}", show_user)
            .on(Method::GET, "/users/{name}", show_user);
    }
}
