//! HTTP client wrapper

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use crate::error::{HttpError, Result};
use crate::request::Request;
use crate::response::check_success;
use crate::transport::Transport;

/// `reqwest` client handing out requests bound to itself
///
/// TLS, proxies and timeouts are configured on the `reqwest::Client` passed
/// to [`from_reqwest`](Self::from_reqwest).
#[derive(Debug, Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Create a new HTTP client with default settings
    pub fn new() -> Self {
        Self {
            inner: reqwest::Client::new(),
        }
    }

    /// Create an HttpClient from a reqwest::Client
    pub fn from_reqwest(client: reqwest::Client) -> Self {
        Self { inner: client }
    }

    /// Request builder sent through this client
    pub fn request(&self) -> Request {
        Request::new().client(self.clone())
    }

    /// GET request builder for `url`
    pub fn get(&self, url: &str) -> Request {
        self.request().get().url(url)
    }

    /// POST request builder for `url`
    pub fn post(&self, url: &str) -> Request {
        self.request().post().url(url)
    }

    /// PUT request builder for `url`
    pub fn put(&self, url: &str) -> Request {
        self.request().put().url(url)
    }

    /// PATCH request builder for `url`
    pub fn patch(&self, url: &str) -> Request {
        self.request().patch().url(url)
    }

    /// DELETE request builder for `url`
    pub fn delete(&self, url: &str) -> Request {
        self.request().delete().url(url)
    }

    /// GET request, returns JSON deserialized to R
    pub async fn fetch<R: DeserializeOwned>(&self, url: &str) -> Result<R> {
        self.get(url).on_response_check(check_success).send_json().await
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn execute(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        self.inner.execute(request).await.map_err(HttpError::from)
    }
}

/// Convenience function for simple GET requests decoding a JSON body
pub async fn fetch<R: DeserializeOwned>(url: &str) -> Result<R> {
    Request::new()
        .get()
        .url(url)
        .on_response_check(check_success)
        .send_json()
        .await
}
