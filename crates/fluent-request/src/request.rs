//! Chainable HTTP request builder

use std::sync::Arc;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::{Body, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, instrument, trace, warn};
use url::Url;

use crate::context::Context;
use crate::error::{HttpError, Result};
use crate::response::Response;
use crate::transport::{default_transport, Transport};

/// Callback deciding whether a response counts as a success
pub type ResponseCheck = Box<dyn Fn(&reqwest::Response) -> Result<()> + Send + Sync>;

/// HTTP request builder
///
/// Every configuration method consumes and returns the builder so calls can be
/// chained in any order. A step that fails does not return an error; it
/// records one on the builder, and [`send`](Self::send) returns it without
/// touching the network. When several steps fail, the last failure is kept.
///
/// ```no_run
/// use fluent_request::{check_200, Request};
///
/// # async fn example() -> fluent_request::Result<()> {
/// let response = Request::new()
///     .post()
///     .url("http://localhost:8080/test")
///     .json(&serde_json::json!({ "a": 1 }))
///     .on_response_check(check_200)
///     .send()
///     .await?;
/// let body = response.raw().await?;
/// # let _ = body;
/// # Ok(())
/// # }
/// ```
pub struct Request {
    method: Method,
    url: Option<Url>,
    headers: HeaderMap,
    body: Option<Body>,
    error: Option<HttpError>,
    client: Option<Arc<dyn Transport>>,
    check: Option<ResponseCheck>,
    context: Context,
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Request")
            .field("method", &self.method)
            .field("url", &self.url.as_ref().map(Url::as_str))
            .field("headers", &self.headers)
            .field("error", &self.error)
            .field("client", &self.client)
            .field("has_check", &self.check.is_some())
            .finish_non_exhaustive()
    }
}

impl Default for Request {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for Request {
    /// Independent copy of the request configuration
    ///
    /// The response check is not carried over. A streaming body cannot be
    /// duplicated, so the copy is left without one.
    fn clone(&self) -> Self {
        let body = self.body.as_ref().and_then(|body| match body.as_bytes() {
            Some(bytes) => Some(Body::from(bytes.to_vec())),
            None => {
                debug!("streaming body is not carried over to the cloned request");
                None
            }
        });

        Self {
            method: self.method.clone(),
            url: self.url.clone(),
            headers: self.headers.clone(),
            body,
            error: self.error.clone(),
            client: self.client.clone(),
            check: None,
            context: self.context.clone(),
        }
    }
}

impl Request {
    /// Create an empty `GET` request with no URL
    pub fn new() -> Self {
        Self {
            method: Method::GET,
            url: None,
            headers: HeaderMap::new(),
            body: None,
            error: None,
            client: None,
            check: None,
            context: Context::background(),
        }
    }

    fn fail(mut self, err: HttpError) -> Self {
        debug!(error = %err, "recording deferred request error");
        self.error = Some(err);
        self
    }

    // === Method ===

    /// Set the HTTP method
    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Use `GET`
    pub fn get(self) -> Self {
        self.method(Method::GET)
    }

    /// Use `POST`
    pub fn post(self) -> Self {
        self.method(Method::POST)
    }

    /// Use `PUT`
    pub fn put(self) -> Self {
        self.method(Method::PUT)
    }

    /// Use `PATCH`
    pub fn patch(self) -> Self {
        self.method(Method::PATCH)
    }

    /// Use `DELETE`
    pub fn delete(self) -> Self {
        self.method(Method::DELETE)
    }

    /// Use `OPTIONS`
    pub fn options(self) -> Self {
        self.method(Method::OPTIONS)
    }

    // === Target ===

    /// Set the target URL
    ///
    /// A URL that does not parse is recorded as [`HttpError::InvalidUrl`] and
    /// the previous URL is kept.
    pub fn url(mut self, url: &str) -> Self {
        match Url::parse(url) {
            Ok(url) => {
                self.url = Some(url);
                self
            }
            Err(err) => self.fail(err.into()),
        }
    }

    /// Add a query parameter to the URL
    ///
    /// Requires a URL to be set already, otherwise [`HttpError::NilUrl`] is
    /// recorded. Existing parameters are kept, including ones with the same key.
    /// The whole query is re-encoded in form encoding with keys sorted; values
    /// under one key keep the order they were added in.
    pub fn query_param(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        match self.url.as_mut() {
            Some(url) => {
                let mut pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
                pairs.push((key.as_ref().to_string(), value.as_ref().to_string()));
                pairs.sort_by(|a, b| a.0.cmp(&b.0));
                url.query_pairs_mut().clear().extend_pairs(&pairs);
                self
            }
            None => self.fail(HttpError::NilUrl),
        }
    }

    // === Headers ===

    /// Set a header
    ///
    /// The first value replaces whatever was stored under `key`, every further
    /// value is appended. Passing no value records
    /// [`HttpError::MissingHeaderValues`].
    pub fn set_header<K, I, V>(mut self, key: K, values: I) -> Self
    where
        K: AsRef<str>,
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let key = key.as_ref();
        let name = match HeaderName::from_bytes(key.as_bytes()) {
            Ok(name) => name,
            Err(err) => return self.fail(HttpError::InvalidHeader(format!("{key}: {err}"))),
        };

        let mut parsed = Vec::new();
        for value in values {
            match HeaderValue::from_str(value.as_ref()) {
                Ok(value) => parsed.push(value),
                Err(err) => return self.fail(HttpError::InvalidHeader(format!("{key}: {err}"))),
            }
        }

        let mut parsed = parsed.into_iter();
        let Some(first) = parsed.next() else {
            return self.fail(HttpError::MissingHeaderValues(key.to_string()));
        };
        self.headers.insert(name.clone(), first);
        for value in parsed {
            self.headers.append(name.clone(), value);
        }
        self
    }

    /// Headers configured so far
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// URL configured so far
    pub fn current_url(&self) -> Option<&Url> {
        self.url.as_ref()
    }

    /// Method configured so far
    pub fn current_method(&self) -> &Method {
        &self.method
    }

    /// Error recorded by a failed configuration step, if any
    pub fn deferred_error(&self) -> Option<&HttpError> {
        self.error.as_ref()
    }

    // === Body ===

    /// Set the request body
    pub fn body(mut self, body: impl Into<Body>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Set the request body as JSON
    ///
    /// `content-type: application/json` is set before serializing, so it stays
    /// set even if serialization fails.
    pub fn json<T: Serialize + ?Sized>(self, body: &T) -> Self {
        let mut this = self.set_header(CONTENT_TYPE, ["application/json"]);
        match serde_json::to_vec(body) {
            Ok(bytes) => {
                this.body = Some(Body::from(bytes));
                this
            }
            Err(err) => this.fail(err.into()),
        }
    }

    /// Set the request body as form data
    pub fn form<T: Serialize + ?Sized>(self, body: &T) -> Self {
        let mut this = self.set_header(CONTENT_TYPE, ["application/x-www-form-urlencoded"]);
        match serde_urlencoded::to_string(body) {
            Ok(form) => {
                this.body = Some(Body::from(form));
                this
            }
            Err(err) => this.fail(HttpError::Serialization(err.to_string())),
        }
    }

    // === Execution settings ===

    /// Use `client` instead of the shared default transport
    pub fn client<T: Transport + 'static>(self, client: T) -> Self {
        self.client_arc(Arc::new(client))
    }

    /// Use an already shared transport
    pub fn client_arc(mut self, client: Arc<dyn Transport>) -> Self {
        self.client = Some(client);
        self
    }

    /// Validate the response before [`send`](Self::send) reports success
    ///
    /// An `Err` returned by `check` becomes the result of `send`.
    pub fn on_response_check<F>(mut self, check: F) -> Self
    where
        F: Fn(&reqwest::Response) -> Result<()> + Send + Sync + 'static,
    {
        self.check = Some(Box::new(check));
        self
    }

    /// Attach a cancellation context, replacing the current one
    pub fn context(mut self, context: Context) -> Self {
        self.context = context;
        self
    }

    /// Clone the request and bind the copy to `context`
    pub fn clone_with_context(&self, context: Context) -> Self {
        self.clone().context(context)
    }

    // === Execution ===

    /// Send the request
    ///
    /// Fails straight away with the deferred error if a configuration step
    /// failed. If the response check rejects the response, its error is
    /// returned and the response is dropped; use
    /// [`send_checked`](Self::send_checked) to keep it.
    pub async fn send(self) -> Result<Response> {
        self.send_checked().await.map_err(|(err, _)| err)
    }

    /// Send the request, keeping a rejected response next to the error
    ///
    /// The response is only `Some` when the response check rejected it.
    #[instrument(
        skip(self),
        fields(method = %self.method, url = self.url.as_ref().map(Url::as_str))
    )]
    pub async fn send_checked(
        self,
    ) -> std::result::Result<Response, (HttpError, Option<Response>)> {
        let Self {
            method,
            url,
            headers,
            body,
            error,
            client,
            check,
            context,
        } = self;

        if let Some(err) = error {
            debug!(error = %err, "request not sent, configuration failed");
            return Err((err, None));
        }

        let Some(url) = url else {
            return Err((HttpError::NilUrl, None));
        };
        let mut request = reqwest::Request::new(method, url);
        *request.headers_mut() = headers;
        *request.body_mut() = body;

        let client = client.unwrap_or_else(default_transport);
        let response = match context.run(client.execute(request)).await {
            Ok(response) => response,
            Err(err) => return Err((err, None)),
        };
        trace!(status = %response.status(), "received response");

        if let Some(check) = check {
            if let Err(err) = check(&response) {
                warn!(status = %response.status(), error = %err, "response rejected by check");
                return Err((err, Some(Response::new(response, context))));
            }
        }

        Ok(Response::new(response, context))
    }

    /// Send the request and decode the JSON body into `R`
    ///
    /// When the response check rejects the response, the returned error is
    /// [`HttpError::WithContent`] carrying the response body, or the error hit
    /// while reading it.
    pub async fn send_json<R: DeserializeOwned>(self) -> Result<R> {
        match self.send_checked().await {
            Ok(response) => response.parse_json().await,
            Err((err, Some(response))) => {
                let content = match response.text().await {
                    Ok(text) => text,
                    Err(read_err) => read_err.to_string(),
                };
                Err(HttpError::WithContent {
                    source: Box::new(err),
                    content,
                })
            }
            Err((err, None)) => Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use serde::ser::Error as _;
    use serde::Serializer;

    use super::*;

    struct Unserializable;

    impl Serialize for Unserializable {
        fn serialize<S: Serializer>(
            &self,
            _serializer: S,
        ) -> std::result::Result<S::Ok, S::Error> {
            Err(S::Error::custom("cannot serialize"))
        }
    }

    fn header_values(request: &Request, key: &str) -> Vec<String> {
        request
            .headers()
            .get_all(key)
            .iter()
            .map(|v| v.to_str().expect("ASCII header").to_string())
            .collect()
    }

    #[test]
    fn test_new_defaults() {
        let request = Request::new();
        assert_eq!(request.current_method(), Method::GET);
        assert!(request.current_url().is_none());
        assert!(request.headers().is_empty());
        assert!(request.deferred_error().is_none());
    }

    #[test]
    fn test_method_selection() {
        assert_eq!(Request::new().post().current_method(), Method::POST);
        assert_eq!(Request::new().put().current_method(), Method::PUT);
        assert_eq!(Request::new().patch().current_method(), Method::PATCH);
        assert_eq!(Request::new().delete().current_method(), Method::DELETE);
        assert_eq!(Request::new().options().current_method(), Method::OPTIONS);
        assert_eq!(Request::new().post().get().current_method(), Method::GET);
    }

    #[test]
    fn test_url_parses() {
        let request = Request::new().url("http://example.com/path?x=1");
        let url = request.current_url().expect("URL should be set");
        assert_eq!(url.path(), "/path");
        assert_eq!(url.query(), Some("x=1"));
    }

    #[test]
    fn test_invalid_url_is_deferred() {
        let request = Request::new().url("http://example.com/").url("::not a url::");
        assert!(matches!(
            request.deferred_error(),
            Some(HttpError::InvalidUrl(_))
        ));
        assert_eq!(
            request.current_url().map(Url::as_str),
            Some("http://example.com/")
        );
    }

    // === Headers ===

    #[test]
    fn test_set_header_first_value_replaces() {
        let request = Request::new()
            .set_header("x-tag", ["a", "b"])
            .set_header("x-tag", ["c"]);
        assert_eq!(header_values(&request, "x-tag"), vec!["c"]);
    }

    #[test]
    fn test_set_header_extra_values_append() {
        let request = Request::new().set_header("x-tag", ["a", "b", "c"]);
        assert_eq!(header_values(&request, "x-tag"), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_set_header_keeps_other_keys() {
        let request = Request::new()
            .set_header("x-one", ["1"])
            .set_header("x-two", ["2"]);
        assert_eq!(header_values(&request, "x-one"), vec!["1"]);
        assert_eq!(header_values(&request, "x-two"), vec!["2"]);
    }

    #[test]
    fn test_set_header_without_values() {
        let request = Request::new().set_header("x-token", Vec::<String>::new());
        assert_eq!(
            request.deferred_error(),
            Some(&HttpError::MissingHeaderValues("x-token".to_string()))
        );
        assert!(request
            .deferred_error()
            .map(|e| e.to_string().contains("x-token"))
            .unwrap_or(false));
    }

    #[test]
    fn test_set_header_invalid_name() {
        let request = Request::new().set_header("bad header", ["v"]);
        assert!(matches!(
            request.deferred_error(),
            Some(HttpError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_set_header_invalid_value() {
        let request = Request::new().set_header("x-tag", ["line\nbreak"]);
        assert!(matches!(
            request.deferred_error(),
            Some(HttpError::InvalidHeader(_))
        ));
    }

    #[test]
    fn test_set_header_invalid_value_keeps_previous() {
        let request = Request::new()
            .set_header("x-tag", ["keep"])
            .set_header("x-tag", ["ok", "bad\nvalue"]);
        assert!(matches!(
            request.deferred_error(),
            Some(HttpError::InvalidHeader(_))
        ));
        let values: Vec<_> = request.headers().get_all("x-tag").iter().collect();
        assert_eq!(values, vec!["keep"]);
    }

    // === Query ===

    #[test]
    fn test_query_param_without_url() {
        let request = Request::new().query_param("a", "1");
        assert_eq!(request.deferred_error(), Some(&HttpError::NilUrl));
        assert!(request.current_url().is_none());
    }

    #[test]
    fn test_query_param_appends() {
        let request = Request::new()
            .url("http://example.com/search?q=rust")
            .query_param("q", "async")
            .query_param("page", "2 of 3");
        let url = request.current_url().expect("URL should be set");
        assert_eq!(url.query(), Some("page=2+of+3&q=rust&q=async"));
        assert!(request.deferred_error().is_none());
    }

    #[test]
    fn test_query_param_reencodes_existing_query() {
        let request = Request::new()
            .url("http://x/?b=1&a=a%20b")
            .query_param("c", "3");
        let url = request.current_url().expect("URL should be set");
        assert_eq!(url.query(), Some("a=a+b&b=1&c=3"));
    }

    #[test]
    fn test_last_failure_wins() {
        let request = Request::new()
            .set_header("x-token", Vec::<&str>::new())
            .query_param("a", "1");
        assert_eq!(request.deferred_error(), Some(&HttpError::NilUrl));
    }

    #[test]
    fn test_success_does_not_clear_error() {
        let request = Request::new()
            .query_param("a", "1")
            .url("http://example.com/");
        assert_eq!(request.deferred_error(), Some(&HttpError::NilUrl));
    }

    // === Body ===

    #[test]
    fn test_json_sets_content_type_and_body() {
        let request = Request::new().json(&serde_json::json!({ "a": 1 }));
        assert_eq!(header_values(&request, "content-type"), vec!["application/json"]);
        let body = request
            .body
            .as_ref()
            .and_then(Body::as_bytes)
            .expect("Buffered body");
        assert_eq!(body, br#"{"a":1}"#);
    }

    #[test]
    fn test_json_failure_is_deferred() {
        let request = Request::new().json(&Unserializable);
        assert!(matches!(
            request.deferred_error(),
            Some(HttpError::Serialization(_))
        ));
        assert_eq!(header_values(&request, "content-type"), vec!["application/json"]);
        assert!(request.body.is_none());
    }

    #[test]
    fn test_form_body() {
        let mut form = HashMap::new();
        form.insert("name", "fluent request");
        let request = Request::new().form(&form);
        assert_eq!(
            header_values(&request, "content-type"),
            vec!["application/x-www-form-urlencoded"]
        );
        let body = request
            .body
            .as_ref()
            .and_then(Body::as_bytes)
            .expect("Buffered body");
        assert_eq!(body, b"name=fluent+request");
    }

    #[test]
    fn test_raw_body_is_stored() {
        let request = Request::new().body("plain text");
        let body = request
            .body
            .as_ref()
            .and_then(Body::as_bytes)
            .expect("Buffered body");
        assert_eq!(body, b"plain text");
    }

    // === Clone ===

    #[test]
    fn test_clone_headers_are_independent() {
        let original = Request::new().set_header("x-tag", ["before"]);
        let clone = original.clone();
        let original = original.set_header("x-tag", ["after"]);
        assert_eq!(header_values(&clone, "x-tag"), vec!["before"]);
        assert_eq!(header_values(&original, "x-tag"), vec!["after"]);

        let clone = clone.set_header("x-tag", ["changed"]);
        assert_eq!(header_values(&original, "x-tag"), vec!["after"]);
        assert_eq!(header_values(&clone, "x-tag"), vec!["changed"]);
    }

    #[test]
    fn test_clone_carries_configuration() {
        let original = Request::new()
            .put()
            .url("http://example.com/item")
            .body("payload")
            .query_param("a", "1");
        let clone = original.clone();
        assert_eq!(clone.current_method(), Method::PUT);
        assert_eq!(
            clone.current_url().map(Url::as_str),
            Some("http://example.com/item?a=1")
        );
        assert_eq!(clone.body.as_ref().and_then(Body::as_bytes), Some(&b"payload"[..]));
    }

    #[test]
    fn test_clone_carries_deferred_error() {
        let original = Request::new().query_param("a", "1");
        let clone = original.clone();
        assert_eq!(clone.deferred_error(), Some(&HttpError::NilUrl));
    }

    #[test]
    fn test_clone_drops_response_check() {
        let original = Request::new().on_response_check(crate::check_200);
        let clone = original.clone();
        assert!(original.check.is_some());
        assert!(clone.check.is_none());
    }

    #[test]
    fn test_clone_with_context_rebinds() {
        let original = Request::new();
        let context = Context::background();
        let clone = original.clone_with_context(context.clone());
        context.cancel();
        assert!(clone.context.is_cancelled());
        assert!(!original.context.is_cancelled());
    }

    // === Send ===

    #[tokio::test]
    async fn test_send_without_url() {
        let result = Request::new().send().await;
        assert!(matches!(result, Err(HttpError::NilUrl)));
    }

    #[tokio::test]
    async fn test_send_returns_deferred_error() {
        let result = Request::new()
            .url("http://127.0.0.1:9/")
            .set_header("x-token", Vec::<&str>::new())
            .send()
            .await;
        assert_eq!(
            result.err(),
            Some(HttpError::MissingHeaderValues("x-token".to_string()))
        );
    }
}
