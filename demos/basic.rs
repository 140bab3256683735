//! Minimal veil example: JSON endpoints whose failures are presented safely.
//!
//! Run with:
//!   cargo run --example basic
//!
//! Try:
//!   curl -i http://localhost:3000/users/42    # 200
//!   curl -i http://localhost:3000/users/7     # 404 with details
//!   curl -i http://localhost:3000/report      # 500, masked
//!   curl -i -X POST http://localhost:3000/users -d ''   # 400

use http::{Method, StatusCode};
use veil::middleware::{ErrorPresenter, PresenterConfig, TracingLog};
use veil::{Fault, RawError, Request, Response, Router, Server};

#[tokio::main]
async fn main() -> Result<(), veil::Error> {
    tracing_subscriber::fmt::init();

    let presenter = ErrorPresenter::new(
        PresenterConfig::new()
            .with_debug(std::env::args().any(|a| a == "--debug"))
            .with_log(TracingLog),
    );

    let app = Router::new()
        .layer(presenter)
        .on(Method::GET,  "/users/{id}", get_user)
        .on(Method::POST, "/users",      create_user)
        .on(Method::GET,  "/report",     report);

    Server::bind("0.0.0.0:3000")?.serve(app).await
}

// GET /users/{id}
async fn get_user(req: Request) -> Result<Response, Fault> {
    let id = req.param("id").unwrap_or_default();
    if id != "42" {
        return Err(Fault::new("user not found")
            .with_status(StatusCode::NOT_FOUND)
            .with_value("resource", format!("user:{id}")));
    }
    Ok(Response::json(r#"{"id":"42","name":"alice"}"#))
}

// POST /users
async fn create_user(req: Request) -> Result<Response, Fault> {
    if req.body().is_empty() {
        return Err(Fault::new("request body is required")
            .with_status(StatusCode::BAD_REQUEST)
            .with_value("field", "body"));
    }
    Ok(Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#))
}

// GET /report: an internal failure the client never sees in detail.
async fn report(_req: Request) -> Result<Response, RawError> {
    let raw = std::fs::read_to_string("/nonexistent/report.json")?;
    Ok(Response::json(raw))
}
