#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! HTTP execution core for the Honeycomb API client.
//!
//! A hyper-based client with:
//! - Automatic TLS via rustls (HTTPS only by default)
//! - Connection pooling
//! - Per-attempt timeouts and an optional total deadline across retries
//! - Automatic retries with exponential backoff, honoring `Retry-After`
//! - Cooperative cancellation between attempts
//! - User-Agent header injection
//! - Transparent response decompression (gzip, brotli, deflate)
//!
//! One *logical operation* submitted through [`RequestBuilder::send`] may
//! issue several *physical attempts*; attempts are strictly sequential and
//! the retry schedule is governed by [`RetryConfig`]. With the default
//! configuration the worst-case wall clock for one operation is
//! `(request_timeout + backoff delay) * (max_retries + 1)`; callers sizing
//! an outer deadline should use [`HttpClientBuilder::total_timeout`].
//!
//! # Example
//!
//! ```ignore
//! use hny_transport::HttpClient;
//! use std::time::Duration;
//!
//! let client = HttpClient::builder()
//!     .timeout(Duration::from_secs(10))
//!     .user_agent("my-app/1.0")
//!     .build()?;
//!
//! let data: MyData = client
//!     .get("https://api.honeycomb.io/1/datasets")
//!     .header("x-honeycomb-team", key)
//!     .send()
//!     .await?
//!     .json()
//!     .await?;
//! ```
//!
//! `send()` returns `Ok(HttpResponse)` for every HTTP status once retries
//! are exhausted; only transport, timeout, deadline and cancellation
//! failures surface as `Err`. Status classification is the caller's
//! concern (see `hny-client`).

mod builder;
mod client;
mod config;
mod error;
mod layers;
mod request;
mod response;
mod tls;

pub use builder::HttpClientBuilder;
pub use client::HttpClient;
pub use config::{
    ExponentialBackoff, HttpClientConfig, RetryConfig, RetryTrigger, TlsRootConfig,
    TransportSecurity, DEFAULT_USER_AGENT,
};
pub use error::{HttpError, InvalidUriKind};
pub use layers::{RetryLayer, RetryService, UserAgentLayer, UserAgentService};
pub use request::RequestBuilder;
pub use response::{parse_retry_after, HttpResponse, ResponseBody};
