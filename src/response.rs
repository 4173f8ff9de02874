//! Response wrapper that keeps the decoded data next to the HTTP details.

use http::{HeaderMap, StatusCode};
use std::time::Duration;
use url::Url;

/// A decoded HTTP response.
///
/// Any status that reached the fetcher, including 4xx and 5xx, comes back
/// as a `Response`. Check [`status`](Self::status) or
/// [`is_success`](Self::is_success) for strict handling.
///
/// # Examples
///
/// ```no_run
/// use fetcher::Fetcher;
/// use serde::Deserialize;
///
/// #[derive(Deserialize)]
/// struct User {
///     id: u64,
///     name: String,
/// }
///
/// # async fn example() -> Result<(), fetcher::Error> {
/// let fetcher = Fetcher::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// let response = fetcher.get::<User>("/users/123", None, None).await?;
///
/// println!("User: {}", response.data.name);
/// println!("Status: {}", response.status);
/// println!("Request #{} took {:?}", response.sequence, response.latency);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    /// The decoded response data.
    pub data: T,

    /// The response body as text. Empty for 204 and HEAD responses.
    pub raw_body: String,

    /// The HTTP status code of the response.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// The final URL of the response.
    pub url: Url,

    /// The fetcher's sequence number after this response was received.
    pub sequence: u64,

    /// Time from sending the request until the body was read.
    pub latency: Duration,
}

impl<T> Response<T> {
    /// Creates a new `Response`.
    pub fn new(
        data: T,
        raw_body: String,
        status: StatusCode,
        headers: HeaderMap,
        url: Url,
        sequence: u64,
        latency: Duration,
    ) -> Self {
        Self {
            data,
            raw_body,
            status,
            headers,
            url,
            sequence,
            latency,
        }
    }

    /// Maps the response data to a different type using the provided function.
    ///
    /// # Examples
    ///
    /// ```
    /// # use fetcher::Response;
    /// # use http::{HeaderMap, StatusCode};
    /// # use std::time::Duration;
    /// let response = Response::new(
    ///     "42".to_string(),
    ///     "42".to_string(),
    ///     StatusCode::OK,
    ///     HeaderMap::new(),
    ///     url::Url::parse("http://localhost/answer").unwrap(),
    ///     1,
    ///     Duration::from_millis(5),
    /// );
    ///
    /// let parsed = response.map(|s| s.parse::<u32>().unwrap());
    /// assert_eq!(parsed.data, 42);
    /// ```
    pub fn map<U, F>(self, f: F) -> Response<U>
    where
        F: FnOnce(T) -> U,
    {
        Response {
            data: f(self.data),
            raw_body: self.raw_body,
            status: self.status,
            headers: self.headers,
            url: self.url,
            sequence: self.sequence,
            latency: self.latency,
        }
    }

    /// Returns `true` for 2xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}

impl<T> AsRef<T> for Response<T> {
    fn as_ref(&self) -> &T {
        &self.data
    }
}

impl<T> std::ops::Deref for Response<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.data
    }
}
