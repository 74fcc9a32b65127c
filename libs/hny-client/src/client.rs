//! Client construction and the request execution boundary.
//!
//! [`Client`] owns the transport stack, the credentials and the base URL.
//! One call to [`Client::execute`] is one *logical operation*; retries,
//! backoff and rate-limit waits happen inside the transport and are
//! invisible here. Every non-success outcome is classified — there is no
//! "return null on failure" path.

use bytes::Bytes;
use http::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use url::Url;

use hny_transport::{HttpClient, HttpClientBuilder, HttpError, RetryConfig, TransportSecurity};

use crate::auth::Credentials;
use crate::error::{classify_response, ApiError};
use crate::resources::{
    auth_meta::AuthMeta, boards::Boards, burn_alerts::BurnAlerts, columns::Columns,
    datasets::Datasets, derived_columns::DerivedColumns, markers::Markers, queries::Queries,
    recipients::Recipients, slos::Slos, triggers::Triggers,
};

/// Production API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.honeycomb.io";

/// Default User-Agent for this client.
pub const DEFAULT_USER_AGENT: &str = concat!("hny-client/", env!("CARGO_PKG_VERSION"));

/// Configuration failure raised while building a [`Client`].
///
/// Always eager: a misconfigured client is rejected at construction, never
/// on the first request.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum ConfigError {
    /// No credentials were supplied
    #[error("credentials are required")]
    MissingCredentials,

    /// Credentials are empty or not header-safe
    #[error("invalid credentials: {reason}")]
    InvalidCredentials { reason: String },

    /// Base URL did not parse
    #[error("invalid base URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// Transport stack construction failed (TLS, retry config, user agent)
    #[error("transport setup failed: {0}")]
    Transport(#[from] HttpError),

    /// The blocking facade could not start its private runtime
    #[error("failed to start blocking runtime: {0}")]
    Runtime(#[from] std::io::Error),
}

/// Builder for [`Client`].
///
/// ```ignore
/// let client = Client::builder()
///     .api_key(std::env::var("HONEYCOMB_API_KEY")?)
///     .timeout(Duration::from_secs(10))
///     .max_retries(5)
///     .build()?;
/// ```
#[must_use = "a ClientBuilder does nothing until .build() is called"]
pub struct ClientBuilder {
    credentials: Option<Credentials>,
    base_url: String,
    user_agent: String,
    timeout: Duration,
    total_timeout: Option<Duration>,
    retry: Option<RetryConfig>,
    transport: TransportSecurity,
}

impl ClientBuilder {
    fn new() -> Self {
        Self {
            credentials: None,
            base_url: DEFAULT_BASE_URL.to_owned(),
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            timeout: Duration::from_secs(30),
            total_timeout: None,
            retry: Some(RetryConfig::default()),
            transport: TransportSecurity::TlsOnly,
        }
    }

    /// Authenticate with a plain API key (`X-Honeycomb-Team`).
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::ApiKey(key.into()));
        self
    }

    /// Authenticate with a management key/secret pair
    /// (`Authorization: Bearer key:secret`).
    pub fn management_key(mut self, key: impl Into<String>, secret: impl Into<String>) -> Self {
        self.credentials = Some(Credentials::management(key, secret));
        self
    }

    /// Full credential value, for callers that already hold one.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Override the API endpoint (self-hosted proxies, mock servers).
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// User-Agent header value
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Per-attempt timeout (default: 30s)
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Total deadline across all attempts of one operation
    pub fn total_timeout(mut self, timeout: Duration) -> Self {
        self.total_timeout = Some(timeout);
        self
    }

    /// Replace the whole retry policy; `None` disables retries.
    pub fn retry(mut self, retry: Option<RetryConfig>) -> Self {
        self.retry = retry;
        self
    }

    /// Maximum retries after the initial attempt
    pub fn max_retries(mut self, max_retries: usize) -> Self {
        self.retry.get_or_insert_default().max_retries = max_retries;
        self
    }

    /// Initial backoff delay
    pub fn initial_backoff(mut self, initial: Duration) -> Self {
        self.retry.get_or_insert_default().backoff.initial = initial;
        self
    }

    /// Maximum backoff delay
    pub fn max_backoff(mut self, max: Duration) -> Self {
        self.retry.get_or_insert_default().backoff.max = max;
        self
    }

    /// Backoff growth factor
    pub fn backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.retry.get_or_insert_default().backoff.multiplier = multiplier;
        self
    }

    /// Replace the set of retryable status codes
    pub fn retry_statuses(mut self, statuses: impl IntoIterator<Item = u16>) -> Self {
        self.retry.get_or_insert_default().retry_statuses = statuses.into_iter().collect();
        self
    }

    /// Transport security mode; insecure HTTP is for mock-server tests only.
    pub fn transport(mut self, transport: TransportSecurity) -> Self {
        self.transport = transport;
        self
    }

    /// Validate the configuration and build the client.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] for missing/empty credentials, an unparseable
    /// base URL, or a transport stack that fails to initialize.
    pub fn build(self) -> Result<Client, ConfigError> {
        let credentials = self.credentials.ok_or(ConfigError::MissingCredentials)?;
        credentials.validate()?;

        let base_url = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidBaseUrl {
            url: self.base_url.clone(),
            reason: e.to_string(),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidBaseUrl {
                url: self.base_url,
                reason: "URL cannot serve as a base".to_owned(),
            });
        }

        let mut http = HttpClientBuilder::new()
            .timeout(self.timeout)
            .user_agent(self.user_agent)
            .retry(self.retry)
            .transport(self.transport);
        if let Some(total) = self.total_timeout {
            http = http.total_timeout(total);
        }
        let http = http.build()?;

        Ok(Client {
            http,
            base_url,
            credentials,
        })
    }
}

/// Typed async client for the API.
///
/// Cheap to clone; clones share one connection pool. Concurrent logical
/// operations are independent — no ordering between them is promised.
#[derive(Clone)]
pub struct Client {
    http: HttpClient,
    base_url: Url,
    credentials: Credentials,
}

impl Client {
    /// Start building a client
    #[must_use]
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The configured base URL
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    // === Resource accessors ===

    /// Dataset CRUD
    #[must_use]
    pub fn datasets(&self) -> Datasets<'_> {
        Datasets::new(self)
    }

    /// Column CRUD (per dataset)
    #[must_use]
    pub fn columns(&self) -> Columns<'_> {
        Columns::new(self)
    }

    /// Derived column CRUD (per dataset)
    #[must_use]
    pub fn derived_columns(&self) -> DerivedColumns<'_> {
        DerivedColumns::new(self)
    }

    /// Saved queries and query results
    #[must_use]
    pub fn queries(&self) -> Queries<'_> {
        Queries::new(self)
    }

    /// Trigger CRUD
    #[must_use]
    pub fn triggers(&self) -> Triggers<'_> {
        Triggers::new(self)
    }

    /// Board CRUD
    #[must_use]
    pub fn boards(&self) -> Boards<'_> {
        Boards::new(self)
    }

    /// Marker CRUD (per dataset)
    #[must_use]
    pub fn markers(&self) -> Markers<'_> {
        Markers::new(self)
    }

    /// SLO CRUD (per dataset)
    #[must_use]
    pub fn slos(&self) -> Slos<'_> {
        Slos::new(self)
    }

    /// Burn alert CRUD (per SLO)
    #[must_use]
    pub fn burn_alerts(&self) -> BurnAlerts<'_> {
        BurnAlerts::new(self)
    }

    /// Notification recipient CRUD
    #[must_use]
    pub fn recipients(&self) -> Recipients<'_> {
        Recipients::new(self)
    }

    /// Introspection of the authenticated key
    #[must_use]
    pub fn auth(&self) -> AuthMeta<'_> {
        AuthMeta::new(self)
    }

    // === Execution boundary ===

    /// Execute one logical operation and return the parsed JSON body.
    ///
    /// `path` is joined onto the base URL (`"/1/datasets"`). A 204 or empty
    /// body yields `Value::Null`. Retries are transparent; the caller sees
    /// either the final body or one classified [`ApiError`].
    ///
    /// # Errors
    ///
    /// Returns the classified error for any terminal non-2xx response or
    /// transport-level failure.
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        headers: Option<&[(String, String)]>,
    ) -> Result<Value, ApiError> {
        let bytes = self
            .send(method, path, body.map(to_body).transpose()?, headers, None)
            .await?;
        parse_json_or_null(&bytes)
    }

    /// [`execute`](Self::execute) with a cancellation token.
    ///
    /// Cancellation is observed between attempts: once cancelled, no further
    /// attempt starts and the operation fails with [`ApiError::Cancelled`].
    ///
    /// # Errors
    ///
    /// As [`execute`](Self::execute), plus [`ApiError::Cancelled`].
    pub async fn execute_cancellable(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        cancel: CancellationToken,
    ) -> Result<Value, ApiError> {
        let bytes = self
            .send(method, path, body.map(to_body).transpose()?, None, Some(cancel))
            .await?;
        parse_json_or_null(&bytes)
    }

    // === Typed helpers used by the resource modules ===

    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let bytes = self.send(Method::GET, path, None, None, None).await?;
        decode(&bytes)
    }

    pub(crate) async fn post_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let bytes = self
            .send(Method::POST, path, Some(serialize_body(body)?), None, None)
            .await?;
        decode(&bytes)
    }

    pub(crate) async fn put_json<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ApiError> {
        let bytes = self
            .send(Method::PUT, path, Some(serialize_body(body)?), None, None)
            .await?;
        decode(&bytes)
    }

    pub(crate) async fn delete_resource(&self, path: &str) -> Result<(), ApiError> {
        self.send(Method::DELETE, path, None, None, None).await?;
        Ok(())
    }

    /// One logical operation: build, decorate, send, classify.
    ///
    /// Returns the raw success body; every other outcome is an `ApiError`.
    async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Bytes>,
        headers: Option<&[(String, String)]>,
        cancel: Option<CancellationToken>,
    ) -> Result<Bytes, ApiError> {
        let url = self.endpoint(path)?;

        let mut request = self
            .http
            .request(method, url.as_str())
            .typed_headers(self.credentials.header_pairs());

        if let Some(extra) = headers {
            for (name, value) in extra {
                request = request.header(name, value);
            }
        }
        if let Some(body) = body {
            request = request
                .header("content-type", "application/json")
                .body_bytes(body);
        }
        if let Some(token) = cancel {
            request = request.cancel_token(token);
        }

        let response = request.send().await.map_err(ApiError::from)?;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = read_terminal_body(response).await?;

        if status.is_success() {
            Ok(bytes)
        } else {
            Err(classify_response(status, &headers, &bytes))
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base_url
            .join(path)
            .map_err(|e| ApiError::InvalidRequest {
                message: format!("invalid request path '{path}': {e}"),
            })
    }
}

/// Read the final response body; a failed read on an error response must not
/// mask the classification, so it degrades to an empty body.
async fn read_terminal_body(response: hny_transport::HttpResponse) -> Result<Bytes, ApiError> {
    let success = response.status().is_success();
    match response.bytes().await {
        Ok(bytes) => Ok(bytes),
        Err(_) if !success => Ok(Bytes::new()),
        Err(e) => Err(ApiError::from(e)),
    }
}

fn to_body(value: &Value) -> Result<Bytes, ApiError> {
    serialize_body(value)
}

fn serialize_body<B: Serialize + ?Sized>(body: &B) -> Result<Bytes, ApiError> {
    serde_json::to_vec(body)
        .map(Bytes::from)
        .map_err(|e| ApiError::InvalidRequest {
            message: format!("failed to serialize request body: {e}"),
        })
}

fn decode<T: DeserializeOwned>(bytes: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(bytes).map_err(|e| ApiError::InvalidResponse {
        message: e.to_string(),
    })
}

fn parse_json_or_null(bytes: &Bytes) -> Result<Value, ApiError> {
    if bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(bytes).map_err(|e| ApiError::InvalidResponse {
        message: e.to_string(),
    })
}
