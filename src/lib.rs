//! # Fetcher - a minimal HTTP request helper
//!
//! Fetcher wraps `reqwest` with default headers, typed query parameters,
//! body-type negotiation, a response sequence counter, and pluggable
//! exchange logging. HTTP error statuses come back as ordinary responses;
//! only transport and decode failures are errors.
//!
//! ## Quick Start
//!
//! ```no_run
//! use fetcher::{Body, Fetcher, QueryParams, RequestOptions};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize)]
//! struct CreateUser {
//!     name: String,
//! }
//!
//! #[derive(Deserialize)]
//! struct User {
//!     id: u64,
//!     name: String,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), fetcher::Error> {
//!     let fetcher = Fetcher::builder()
//!         .base_url("https://api.example.com")?
//!         .default_header("User-Agent", "my-app/1.0")?
//!         .build()?;
//!
//!     // GET with query parameters; absent values are dropped
//!     let query = QueryParams::new()
//!         .with("active", true)
//!         .with("team", None::<String>);
//!     let users = fetcher.get::<Vec<User>>("/users", Some(&query), None).await?;
//!     println!("{} users", users.data.len());
//!
//!     // POST a JSON body
//!     let body = Body::json(&CreateUser { name: "Alice".to_string() })?;
//!     let created = fetcher.post::<User>("/users", None, Some(body), None).await?;
//!     if created.is_success() {
//!         println!("Created user {} ({})", created.data.id, created.data.name);
//!     }
//!
//!     // POST raw text with a per-call Content-Type
//!     let options = RequestOptions::new().with_header("Content-Type", "text/plain")?;
//!     let echoed = fetcher
//!         .post::<String>("/upload", None, Some(Body::from("hello world!")), Some(options))
//!         .await?;
//!     println!("server saw {} bytes", echoed.data);
//!
//!     println!("{} requests answered", fetcher.sequence());
//!     Ok(())
//! }
//! ```
//!
//! ## Pipeline
//!
//! Each call resolves the URL against the base endpoint, merges per-call
//! headers over the defaults, appends the query string, defaults the
//! Content-Type to `application/json`, encodes the body, forces
//! `Accept-Language: en` and `Accept-Encoding: gzip`, and sends the
//! request. The response body is decoded as JSON when the response says
//! so, as text otherwise, and as an empty string for `204 No Content`.
//!
//! ## Logging
//!
//! Every call logs a `debug` entry before sending and one entry after the
//! response is decoded: `error` when the status is at or above the
//! fetcher's error threshold (400 by default), `debug` otherwise. Entries
//! go to a [`logger::Logger`]; the default forwards them to `tracing`.
//!
//! ```no_run
//! use fetcher::{logger::{Level, MemoryLogger}, Fetcher};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), fetcher::Error> {
//! let logger = Arc::new(MemoryLogger::new(Level::Error));
//! let fetcher = Fetcher::builder()
//!     .base_url("https://api.example.com")?
//!     .logger(logger.clone())
//!     .build()?;
//!
//! let _ = fetcher.get::<String>("/missing", None, None).await?;
//! assert_eq!(logger.count(Level::Error), 1);
//! # Ok(())
//! # }
//! ```

mod body;
mod config;
mod error;
mod fetcher;
pub mod logger;
mod options;
mod query;
mod response;

pub use body::Body;
pub use config::{FetcherConfig, DEFAULT_ERROR_THRESHOLD};
pub use error::{Error, Result};
pub use fetcher::{Fetcher, FetcherBuilder};
pub use options::RequestOptions;
pub use query::{QueryParams, QueryValue};
pub use response::Response;
