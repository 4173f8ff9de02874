//! Error types for fetcher calls.
//!
//! HTTP error statuses are not errors here: a 404 or a 500 comes back as a
//! normal [`Response`](crate::Response). The variants below cover failures
//! where no usable response exists, or where the response could not be
//! decoded.

use http::StatusCode;

/// The main error type for fetcher calls.
///
/// # Examples
///
/// ```no_run
/// use fetcher::{Error, Fetcher};
///
/// # async fn example() -> Result<(), Error> {
/// let fetcher = Fetcher::builder()
///     .base_url("https://api.example.com")?
///     .build()?;
///
/// match fetcher.get::<serde_json::Value>("/endpoint", None, None).await {
///     Ok(response) if response.status.is_success() => println!("{:?}", response.data),
///     Ok(response) => eprintln!("HTTP {}: {:?}", response.status, response.data),
///     Err(Error::Decode { raw_response, serde_error, .. }) => {
///         eprintln!("Undecodable body {}: {}", raw_response, serde_error);
///     }
///     Err(e) if e.is_transport() => eprintln!("No response: {}", e),
///     Err(e) => eprintln!("Other error: {}", e),
/// }
/// # Ok(())
/// # }
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The request never produced a response (connection refused, DNS
    /// failure, TLS failure, ...).
    #[error("Transport error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The per-call timeout elapsed before a response arrived.
    #[error("Request timed out")]
    Timeout,

    /// The per-call cancellation token fired.
    ///
    /// `status` is `None` when no response had arrived yet, and holds the
    /// response status when the token fired while the body was being read.
    #[error("Request cancelled")]
    Cancelled {
        /// The HTTP status code, if a response had already arrived
        status: Option<StatusCode>,
    },

    /// A response arrived but its body could not be read.
    #[error("Failed to read response body (status {status}): {source}")]
    Body {
        /// The HTTP status code
        status: StatusCode,
        /// The underlying read error
        #[source]
        source: reqwest::Error,
    },

    /// The response body could not be decoded into the requested type.
    ///
    /// Raised when a JSON content type carries invalid JSON, or when the
    /// decoded value does not deserialize into `T`.
    #[error("Failed to decode response (status {status}): {serde_error}")]
    Decode {
        /// The raw response body
        raw_response: String,
        /// The serde error message
        serde_error: String,
        /// The HTTP status code
        status: StatusCode,
    },

    /// The request body could not be serialized.
    #[error("Failed to serialize request body: {0}")]
    Serialization(String),

    /// Invalid configuration was provided (bad header name or value, bad
    /// client settings).
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The resolved request URL did not parse.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Timeout
        } else {
            Error::Transport(e)
        }
    }
}

impl Error {
    /// Returns `true` if the call failed before any HTTP response was obtained.
    ///
    /// # Examples
    ///
    /// ```
    /// use fetcher::Error;
    /// use http::StatusCode;
    ///
    /// assert!(Error::Timeout.is_transport());
    /// assert!(Error::Cancelled { status: None }.is_transport());
    /// assert!(!Error::Cancelled { status: Some(StatusCode::OK) }.is_transport());
    /// assert!(!Error::Configuration("bad".into()).is_transport());
    /// ```
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Transport(_) | Error::Timeout | Error::Cancelled { status: None }
        )
    }

    /// Returns the HTTP status code if a response was received.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::Body { status, .. } => Some(*status),
            Error::Cancelled { status } => *status,
            Error::Decode { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Returns the raw response body if this error carries one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::Decode { raw_response, .. } => Some(raw_response),
            _ => None,
        }
    }
}

/// A specialized `Result` type for fetcher calls.
pub type Result<T> = std::result::Result<T, Error>;
