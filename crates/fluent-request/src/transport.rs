//! Transport abstraction used to execute requests

use std::fmt::Debug;
use std::sync::Arc;

use async_trait::async_trait;
use once_cell::sync::Lazy;

use crate::error::{HttpError, Result};

static DEFAULT_TRANSPORT: Lazy<Arc<dyn Transport>> =
    Lazy::new(|| Arc::new(reqwest::Client::new()) as Arc<dyn Transport>);

/// Anything able to send one HTTP request and return one HTTP response
///
/// [`Request`](crate::Request) delegates execution to a `Transport`. Inject a
/// custom implementation with [`Request::client`](crate::Request::client) to
/// swap the network for a test double or a specially configured client.
#[async_trait]
pub trait Transport: Send + Sync + Debug {
    /// Execute the request
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response>;
}

#[async_trait]
impl Transport for reqwest::Client {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        reqwest::Client::execute(self, request)
            .await
            .map_err(HttpError::from)
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        (**self).execute(request).await
    }
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        (**self).execute(request).await
    }
}

/// Shared transport used when a request has none injected
///
/// Initialised on first use and kept for the life of the process.
pub fn default_transport() -> Arc<dyn Transport> {
    Arc::clone(&DEFAULT_TRANSPORT)
}
