//! Blocking facade over the async client.
//!
//! There is exactly one implementation of retry, classification and the
//! resource surface — the async one. This module only swaps the wait
//! primitive: a private current-thread runtime drives the same futures and
//! the caller's thread sleeps instead of suspending.

use http::Method;
use serde_json::Value;

use crate::client::{Client, ClientBuilder, ConfigError};
use crate::error::ApiError;

/// Blocking twin of [`Client`] for synchronous scripts and tools.
///
/// ```ignore
/// let client = BlockingClient::build(
///     Client::builder().api_key(std::env::var("HONEYCOMB_API_KEY")?),
/// )?;
///
/// let datasets = client.run(client.inner().datasets().list())?;
/// ```
///
/// Do not use from inside an async runtime; the embedded `block_on` would
/// panic. Async callers should hold a [`Client`] directly.
pub struct BlockingClient {
    inner: Client,
    runtime: tokio::runtime::Runtime,
}

impl BlockingClient {
    /// Finalize a [`ClientBuilder`] into a blocking client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for configuration failures, or a transport
    /// error wrapped in [`ConfigError::Transport`] when the runtime cannot
    /// start.
    pub fn build(builder: ClientBuilder) -> Result<Self, ConfigError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;

        // The transport's buffer worker must be spawned inside a runtime
        // context, so construction happens on the private runtime.
        let inner = runtime.block_on(async { builder.build() })?;

        Ok(Self { inner, runtime })
    }

    /// The async client this facade drives.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.inner
    }

    /// Drive any future of the async surface to completion.
    pub fn run<T>(&self, fut: impl Future<Output = T>) -> T {
        self.runtime.block_on(fut)
    }

    /// Blocking version of [`Client::execute`].
    ///
    /// # Errors
    ///
    /// Returns the same classified [`ApiError`] as the async version.
    pub fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: Option<&[(String, String)]>,
    ) -> Result<Value, ApiError> {
        self.runtime
            .block_on(self.inner.execute(method, path, body, headers))
    }
}
