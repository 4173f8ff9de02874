//! The request/response pipeline.
//!
//! [`Fetcher`] is the main entry point. Use [`FetcherBuilder`] to configure
//! and create one.

use crate::{
    body::Encoded,
    config::{FetcherConfig, DEFAULT_ERROR_THRESHOLD},
    logger::{Logger, TracingLogger},
    Body, Error, QueryParams, RequestOptions, Response, Result,
};
use http::{
    header::{ACCEPT_ENCODING, ACCEPT_LANGUAGE, CONTENT_TYPE},
    HeaderMap, HeaderName, HeaderValue, Method, StatusCode,
};
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use url::Url;

/// An HTTP request helper bound to one base endpoint.
///
/// A fetcher adds its default headers to every request, encodes query
/// parameters and bodies, counts responses, and logs each exchange through
/// its [`Logger`]. HTTP error statuses are returned as normal responses.
///
/// Cloning is cheap; clones share the sequence counter.
///
/// # Examples
///
/// ```no_run
/// use fetcher::{Body, Fetcher, QueryParams};
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct Page { items: Vec<String> }
///
/// # async fn example() -> Result<(), fetcher::Error> {
/// let fetcher = Fetcher::builder()
///     .base_url("https://api.example.com")?
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
///
/// let query = QueryParams::new().with("page", 2).with("cursor", None::<String>);
/// let page = fetcher.get::<Page>("/items", Some(&query), None).await?;
/// println!("{} items (status {})", page.data.items.len(), page.status);
///
/// let created = fetcher
///     .post::<serde_json::Value>("/items", None, Some(Body::json(&["a", "b"])?), None)
///     .await?;
/// println!("request #{}: {:?}", created.sequence, created.data);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Fetcher {
    inner: Arc<FetcherInner>,
}

struct FetcherInner {
    http_client: reqwest::Client,
    base_url: String,
    default_headers: HeaderMap,
    logger: Arc<dyn Logger>,
    error_threshold: u16,
    timeout: Option<Duration>,
    sequence: AtomicU64,
}

impl std::fmt::Debug for Fetcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Fetcher")
            .field("base_url", &self.inner.base_url)
            .field("default_headers", &self.inner.default_headers)
            .field("error_threshold", &self.inner.error_threshold)
            .field("sequence", &self.sequence())
            .finish_non_exhaustive()
    }
}

impl Fetcher {
    /// Creates a new `FetcherBuilder`.
    pub fn builder() -> FetcherBuilder {
        FetcherBuilder::new()
    }

    /// The configured base endpoint. May be empty.
    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Number of requests that have received a response so far.
    pub fn sequence(&self) -> u64 {
        self.inner.sequence.load(Ordering::SeqCst)
    }

    /// Status at or above which responses are logged at error level.
    pub fn error_threshold(&self) -> u16 {
        self.inner.error_threshold
    }

    /// Runs one request through the pipeline.
    ///
    /// Every verb method delegates here. Bodies passed with `GET` or `HEAD`
    /// are dropped.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidUrl`] if the resolved URL does not parse.
    /// - [`Error::Serialization`] if the body cannot be encoded.
    /// - [`Error::Transport`], [`Error::Timeout`] or [`Error::Cancelled`]
    ///   without a status if no response was obtained. The sequence counter
    ///   is unchanged.
    /// - [`Error::Body`], [`Error::Decode`] or [`Error::Cancelled`] with a
    ///   status if the response body could not be read or decoded into `T`.
    ///   The response has been counted.
    ///
    /// HTTP error statuses are not errors.
    pub async fn fetch<T>(
        &self,
        method: Method,
        path: &str,
        query: Option<&QueryParams>,
        body: Option<Body>,
        options: Option<RequestOptions>,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        let options = options.unwrap_or_default();

        let mut url = self.resolve_url(path)?;
        let mut headers = self.merge_headers(options.headers);
        if let Some(query) = query {
            query.append_to(&mut url);
        }

        if !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let body = if method == Method::GET || method == Method::HEAD {
            None
        } else {
            body
        };
        let logged_body = body.as_ref().map(Body::describe).unwrap_or(Value::Null);
        let content_type = headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let encoded = body.map(|b| b.encode(&content_type)).transpose()?;

        // Some backends misbehave on a wildcard or missing language.
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en"));
        headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

        self.inner.logger.debug(&json!({
            "event": "request",
            "request": format!("{} {}", method, path),
            "query": query.map(QueryParams::to_log_value).unwrap_or(Value::Null),
            "body": logged_body,
        }));

        let mut request = self.inner.http_client.request(method.clone(), url.clone());
        if let Some(timeout) = options.timeout.or(self.inner.timeout) {
            request = request.timeout(timeout);
        }
        request = match encoded {
            Some(Encoded::Multipart(form)) => {
                // The multipart boundary must come from the form itself.
                headers.remove(CONTENT_TYPE);
                request.headers(headers).multipart(form)
            }
            Some(Encoded::Body(body)) => request.headers(headers).body(body),
            None => request.headers(headers),
        };

        tracing::debug!(method = %method, url = %url, "Executing HTTP request");

        let start_time = Instant::now();
        let response = cancellable(options.cancel.as_ref(), None, request.send())
            .await?
            .map_err(Error::from)?;
        let sequence = self.inner.sequence.fetch_add(1, Ordering::SeqCst) + 1;

        let status = response.status();
        let headers = response.headers().clone();
        let final_url = response.url().clone();

        let bytes = cancellable(options.cancel.as_ref(), Some(status), response.bytes())
            .await?
            .map_err(|source| Error::Body { status, source })?;
        let latency = start_time.elapsed();

        tracing::debug!(
            status = status.as_u16(),
            sequence = sequence,
            latency_ms = latency.as_millis(),
            "Received HTTP response"
        );

        let raw_body = String::from_utf8_lossy(&bytes).into_owned();
        // An unparseable body is still a counted response: log its raw text.
        let (logged_data, data) = match decode_body(&method, status, &headers, &raw_body) {
            Ok(decoded) => {
                let data = T::deserialize(&decoded).map_err(|e| {
                    tracing::error!(
                        error = %e,
                        status = status.as_u16(),
                        "Response does not match the requested type"
                    );
                    Error::Decode {
                        raw_response: raw_body.clone(),
                        serde_error: e.to_string(),
                        status,
                    }
                });
                (decoded, data)
            }
            Err(e) => (Value::String(raw_body.clone()), Err(e)),
        };

        let entry = json!({
            "event": "response",
            "request": format!("{} {}", method, final_url),
            "headers": headers_to_json(&headers),
            "status": status.as_u16(),
            "data": logged_data,
        });
        if status.as_u16() >= self.inner.error_threshold {
            self.inner.logger.error(&entry);
        } else {
            self.inner.logger.debug(&entry);
        }

        let data = data?;

        Ok(Response::new(
            data, raw_body, status, headers, final_url, sequence, latency,
        ))
    }

    /// Makes a GET request.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use fetcher::Fetcher;
    ///
    /// # async fn example() -> Result<(), fetcher::Error> {
    /// let fetcher = Fetcher::builder()
    ///     .base_url("https://api.example.com")?
    ///     .build()?;
    ///
    /// let hello = fetcher.get::<String>("/hello", None, None).await?;
    /// assert_eq!(hello.data, "Hello World!");
    /// # Ok(())
    /// # }
    /// ```
    pub async fn get<T>(
        &self,
        path: &str,
        query: Option<&QueryParams>,
        options: Option<RequestOptions>,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.fetch(Method::GET, path, query, None, options).await
    }

    /// Makes a HEAD request. The decoded data is always an empty string.
    pub async fn head<T>(
        &self,
        path: &str,
        query: Option<&QueryParams>,
        options: Option<RequestOptions>,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.fetch(Method::HEAD, path, query, None, options).await
    }

    /// Makes a POST request.
    pub async fn post<T>(
        &self,
        path: &str,
        query: Option<&QueryParams>,
        body: Option<Body>,
        options: Option<RequestOptions>,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.fetch(Method::POST, path, query, body, options).await
    }

    /// Makes a PUT request.
    pub async fn put<T>(
        &self,
        path: &str,
        query: Option<&QueryParams>,
        body: Option<Body>,
        options: Option<RequestOptions>,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.fetch(Method::PUT, path, query, body, options).await
    }

    /// Makes a PATCH request.
    pub async fn patch<T>(
        &self,
        path: &str,
        query: Option<&QueryParams>,
        body: Option<Body>,
        options: Option<RequestOptions>,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.fetch(Method::PATCH, path, query, body, options).await
    }

    /// Makes a DELETE request.
    pub async fn delete<T>(
        &self,
        path: &str,
        query: Option<&QueryParams>,
        body: Option<Body>,
        options: Option<RequestOptions>,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.fetch(Method::DELETE, path, query, body, options).await
    }

    /// Makes a WebDAV REPORT request.
    pub async fn report<T>(
        &self,
        path: &str,
        query: Option<&QueryParams>,
        body: Option<Body>,
        options: Option<RequestOptions>,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.fetch(extension_method("REPORT")?, path, query, body, options)
            .await
    }

    /// Makes a WebDAV PROPFIND request.
    pub async fn propfind<T>(
        &self,
        path: &str,
        query: Option<&QueryParams>,
        body: Option<Body>,
        options: Option<RequestOptions>,
    ) -> Result<Response<T>>
    where
        T: DeserializeOwned,
    {
        self.fetch(extension_method("PROPFIND")?, path, query, body, options)
            .await
    }

    /// Uses absolute paths verbatim and prefixes everything else with the
    /// base endpoint.
    fn resolve_url(&self, path: &str) -> Result<Url> {
        if has_scheme(path) {
            Ok(Url::parse(path)?)
        } else {
            Ok(Url::parse(&format!("{}{}", self.inner.base_url, path))?)
        }
    }

    /// Per-call headers win; defaults fill in the names they lack.
    fn merge_headers(&self, mut headers: HeaderMap) -> HeaderMap {
        for name in self.inner.default_headers.keys() {
            if headers.contains_key(name) {
                continue;
            }
            for value in self.inner.default_headers.get_all(name) {
                headers.append(name.clone(), value.clone());
            }
        }
        headers
    }
}

/// Awaits `fut` unless `token` fires first. `status` is the response
/// status when a response has already arrived.
async fn cancellable<F>(
    token: Option<&CancellationToken>,
    status: Option<StatusCode>,
    fut: F,
) -> Result<F::Output>
where
    F: Future,
{
    match token {
        Some(token) => tokio::select! {
            biased;
            _ = token.cancelled() => Err(Error::Cancelled { status }),
            output = fut => Ok(output),
        },
        None => Ok(fut.await),
    }
}

fn extension_method(name: &str) -> Result<Method> {
    Method::from_bytes(name.as_bytes())
        .map_err(|e| Error::Configuration(format!("Invalid method {}: {}", name, e)))
}

fn has_scheme(path: &str) -> bool {
    let Some((scheme, _)) = path.split_once("://") else {
        return false;
    };
    let mut chars = scheme.chars();
    chars.next().is_some_and(|c| c.is_ascii_alphabetic())
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
}

fn is_json_content_type(headers: &HeaderMap) -> bool {
    let Some(content_type) = headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

fn decode_body(
    method: &Method,
    status: StatusCode,
    headers: &HeaderMap,
    raw_body: &str,
) -> Result<Value> {
    if status == StatusCode::NO_CONTENT || *method == Method::HEAD {
        return Ok(Value::String(String::new()));
    }
    if !is_json_content_type(headers) {
        return Ok(Value::String(raw_body.to_string()));
    }
    serde_json::from_str(raw_body).map_err(|e| {
        tracing::error!(
            error = %e,
            raw_response = %raw_body,
            "Failed to parse JSON response"
        );
        Error::Decode {
            raw_response: raw_body.to_string(),
            serde_error: e.to_string(),
            status,
        }
    })
}

fn headers_to_json(headers: &HeaderMap) -> Value {
    let mut map = serde_json::Map::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(", ");
        map.insert(name.as_str().to_string(), Value::String(joined));
    }
    Value::Object(map)
}

/// Builder for configuring and creating a [`Fetcher`].
///
/// # Examples
///
/// ```no_run
/// use fetcher::{logger::NoopLogger, FetcherBuilder};
/// use std::sync::Arc;
///
/// # fn example() -> Result<(), fetcher::Error> {
/// let fetcher = FetcherBuilder::new()
///     .base_url("https://api.example.com")?
///     .default_header("Authorization", "Bearer token")?
///     .error_threshold(500)
///     .logger(Arc::new(NoopLogger))
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct FetcherBuilder {
    base_url: String,
    default_headers: HeaderMap,
    logger: Option<Arc<dyn Logger>>,
    error_threshold: u16,
    timeout: Option<Duration>,
    http_client: Option<reqwest::Client>,
}

impl FetcherBuilder {
    /// Creates a new `FetcherBuilder` with default settings: empty base
    /// endpoint, no default headers, [`TracingLogger`], threshold 400.
    pub fn new() -> Self {
        Self {
            base_url: String::new(),
            default_headers: HeaderMap::new(),
            logger: None,
            error_threshold: DEFAULT_ERROR_THRESHOLD,
            timeout: None,
            http_client: None,
        }
    }

    /// Creates a builder from a [`FetcherConfig`].
    ///
    /// # Errors
    ///
    /// Returns an error if the base URL or a header is invalid.
    pub fn from_config(config: FetcherConfig) -> Result<Self> {
        let timeout = config.timeout();
        let mut builder = Self::new()
            .base_url(config.base_url)?
            .error_threshold(config.error_threshold);
        for (name, value) in &config.default_headers {
            builder = builder.default_header(name, value)?;
        }
        builder.timeout = timeout;
        Ok(builder)
    }

    /// Sets the base endpoint that relative paths are appended to.
    ///
    /// The path is concatenated as-is, so a base of `https://host/api` and
    /// a path of `/users` yield `https://host/api/users`.
    ///
    /// # Errors
    ///
    /// Returns an error if a non-empty URL does not parse.
    pub fn base_url(mut self, url: impl Into<String>) -> Result<Self> {
        let url = url.into();
        if !url.is_empty() {
            Url::parse(&url)?;
        }
        self.base_url = url;
        Ok(self)
    }

    /// Adds a default header that will be included in all requests.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Adds all of `headers` to the default header set.
    pub fn default_headers(mut self, headers: HeaderMap) -> Self {
        self.default_headers.extend(headers);
        self
    }

    /// Sets the logger that receives request and response entries.
    pub fn logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Responses with a status at or above `threshold` are logged at error
    /// level, all others at debug level.
    pub fn error_threshold(mut self, threshold: u16) -> Self {
        self.error_threshold = threshold;
        self
    }

    /// Sets a timeout for requests that do not pass their own.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Uses an existing `reqwest::Client` as the transport.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Builds the configured `Fetcher`.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn build(self) -> Result<Fetcher> {
        let http_client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder().build().map_err(|e| {
                Error::Configuration(format!("Failed to build HTTP client: {}", e))
            })?,
        };

        let logger = self
            .logger
            .unwrap_or_else(|| Arc::new(TracingLogger) as Arc<dyn Logger>);

        Ok(Fetcher {
            inner: Arc::new(FetcherInner {
                http_client,
                base_url: self.base_url,
                default_headers: self.default_headers,
                logger,
                error_threshold: self.error_threshold,
                timeout: self.timeout,
                sequence: AtomicU64::new(0),
            }),
        })
    }
}

impl Default for FetcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}
