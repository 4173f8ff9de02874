//! Per-call request options.

use http::{HeaderMap, HeaderName, HeaderValue};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Overrides applied to a single request.
///
/// Headers given here win over the fetcher's default headers. The timeout
/// and cancellation token are handed to the transport for this call only.
///
/// # Examples
///
/// ```
/// use fetcher::RequestOptions;
/// use std::time::Duration;
///
/// # fn example() -> Result<(), fetcher::Error> {
/// let options = RequestOptions::new()
///     .with_header("Content-Type", "text/plain")?
///     .with_timeout(Duration::from_secs(5));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Headers for this request.
    pub headers: HeaderMap,

    /// Transport timeout for this request.
    pub timeout: Option<Duration>,

    /// Cancels the request while it waits for the response or its body.
    pub cancel: Option<CancellationToken>,
}

impl RequestOptions {
    /// Creates empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a header to the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn with_header(
        mut self,
        name: impl AsRef<str>,
        value: impl AsRef<str>,
    ) -> Result<Self, crate::Error> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| crate::Error::Configuration(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| crate::Error::Configuration(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// Replaces the request headers.
    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Sets the transport timeout for this request.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Attaches a cancellation token.
    pub fn with_cancel(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}
