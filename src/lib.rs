//! # veil
//!
//! A minimal HTTP framework whose errors never leak.
//!
//! Handlers fail by attaching an error to their response, usually by
//! returning `Err`. The [`ErrorPresenter`](middleware::ErrorPresenter)
//! layer turns that error into a JSON body the client can safely see:
//!
//! - a [`Fault`] with a non-`500` status shows its message and its named
//!   diagnostic values: `{"error":"not found","details":{"resource":"user:42"}}`
//! - anything that maps to `500` shows only a generic message:
//!   `{"error":"Internal Server Error!"}`
//! - every error, masked or not, reaches the configured
//!   [`ErrorLog`](middleware::ErrorLog) in full
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use http::{Method, StatusCode};
//! use veil::middleware::{ErrorPresenter, PresenterConfig, TracingLog};
//! use veil::{Fault, Request, Response, Router, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), veil::Error> {
//!     let presenter = ErrorPresenter::new(
//!         PresenterConfig::new()
//!             .with_debug(cfg!(debug_assertions))
//!             .with_log(TracingLog),
//!     );
//!
//!     let app = Router::new()
//!         .layer(presenter)
//!         .on(Method::GET, "/users/{id}", get_user);
//!
//!     Server::bind("0.0.0.0:3000")?.serve(app).await
//! }
//!
//! async fn get_user(req: Request) -> Result<Response, Fault> {
//!     match req.param("id") {
//!         Some("42") => Ok(Response::json(r#"{"id":"42","name":"alice"}"#)),
//!         Some(id) => Err(Fault::new("not found")
//!             .with_status(StatusCode::NOT_FOUND)
//!             .with_value("resource", format!("user:{id}"))),
//!         None => Err(Fault::new("route without id")),
//!     }
//! }
//! ```

mod error;
mod fault;
mod handler;
mod raw;
mod request;
mod response;
mod router;
mod server;

pub mod middleware;

pub use error::Error;
pub use fault::{Fault, Key, MESSAGE_KEY, STATUS_KEY, set_stack_capture, stack_capture_enabled};
pub use handler::Handler;
pub use raw::RawError;
pub use request::Request;
pub use response::{ContentType, IntoResponse, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
