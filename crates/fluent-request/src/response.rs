//! HTTP response types

use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::context::Context;
use crate::error::{HttpError, Result};

/// Response returned by [`Request::send`](crate::Request::send)
///
/// Status and headers can be inspected any number of times. The body can be
/// consumed once, through [`raw`](Self::raw), [`text`](Self::text) or
/// [`parse_json`](Self::parse_json). Body reads honour the context of the
/// request that produced the response.
#[derive(Debug)]
pub struct Response {
    inner: reqwest::Response,
    context: Context,
}

impl From<reqwest::Response> for Response {
    fn from(inner: reqwest::Response) -> Self {
        Self::new(inner, Context::background())
    }
}

impl Response {
    pub(crate) fn new(inner: reqwest::Response, context: Context) -> Self {
        Self { inner, context }
    }

    /// Get the HTTP status code
    pub fn status(&self) -> StatusCode {
        self.inner.status()
    }

    /// Get the response headers
    pub fn headers(&self) -> &HeaderMap {
        self.inner.headers()
    }

    /// Check if the response status is a success (2xx)
    pub fn is_success(&self) -> bool {
        self.status().is_success()
    }

    /// Check if the response status is a client error (4xx)
    pub fn is_client_error(&self) -> bool {
        self.status().is_client_error()
    }

    /// Check if the response status is a server error (5xx)
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }

    /// Read the whole body
    pub async fn raw(self) -> Result<Vec<u8>> {
        let Self { inner, context } = self;
        context
            .run(async { inner.bytes().await.map_err(HttpError::from) })
            .await
            .map(|bytes| bytes.to_vec())
    }

    /// Read the whole body as text
    pub async fn text(self) -> Result<String> {
        let Self { inner, context } = self;
        context
            .run(async { inner.text().await.map_err(HttpError::from) })
            .await
    }

    /// Decode the body as JSON into `T`
    pub async fn parse_json<T: DeserializeOwned>(self) -> Result<T> {
        let Self { inner, context } = self;
        context
            .run(async { inner.json::<T>().await.map_err(HttpError::from) })
            .await
    }

    /// Unwrap the underlying `reqwest::Response`
    pub fn into_inner(self) -> reqwest::Response {
        self.inner
    }
}

/// Response check accepting only `200 OK`
///
/// Any other status yields [`HttpError::Status`] carrying the status code and
/// its canonical reason.
pub fn check_200(response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if status != StatusCode::OK {
        return Err(status_error(status));
    }
    Ok(())
}

/// Response check accepting any 2xx status
pub fn check_success(response: &reqwest::Response) -> Result<()> {
    let status = response.status();
    if !status.is_success() {
        return Err(status_error(status));
    }
    Ok(())
}

fn status_error(status: StatusCode) -> HttpError {
    HttpError::Status {
        status: status.as_u16(),
        message: status
            .canonical_reason()
            .unwrap_or("Unknown Status")
            .to_string(),
    }
}
