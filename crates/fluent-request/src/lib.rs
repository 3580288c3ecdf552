//! Chainable HTTP request builder
//!
//! [`Request`] collects the method, URL, headers, query parameters, body and
//! an optional response check through chained calls, then sends everything in
//! a single step through a [`Transport`]. Configuration mistakes are kept on
//! the builder and reported by [`Request::send`], so a chain never has to stop
//! half way to handle errors.
//!
//! # Example
//!
//! ```no_run
//! use fluent_request::{check_200, Request};
//! use serde::Deserialize;
//!
//! #[derive(Deserialize)]
//! struct ApiResponse {
//!     message: String,
//! }
//!
//! async fn example() -> fluent_request::Result<ApiResponse> {
//!     Request::new()
//!         .get()
//!         .url("https://api.example.com/data")
//!         .query_param("page", "2")
//!         .set_header("accept", ["application/json"])
//!         .on_response_check(check_200)
//!         .send_json()
//!         .await
//! }
//! ```
//!
//! Without an injected transport, requests go through a process-wide shared
//! `reqwest::Client` (see [`default_transport`]).

mod client;
mod context;
mod error;
mod request;
mod response;
mod transport;

pub use client::{fetch, HttpClient};
pub use context::Context;
pub use error::{HttpError, Result};
pub use request::{Request, ResponseCheck};
pub use response::{check_200, check_success, Response};
pub use transport::{default_transport, Transport};
pub use tokio_util::sync::CancellationToken;
