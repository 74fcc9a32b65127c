use std::collections::HashSet;
use std::time::Duration;

/// Default User-Agent string for outgoing requests
pub const DEFAULT_USER_AGENT: &str = concat!("hny-transport/", env!("CARGO_PKG_VERSION"));

/// Statuses retried by default: rate limiting plus transient server failures.
const DEFAULT_RETRY_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Default drain limit for response bodies before retry (64 KiB)
pub const DEFAULT_RETRY_RESPONSE_DRAIN_LIMIT: usize = 64 * 1024;

/// Condition observed on one physical attempt, as seen by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum RetryTrigger {
    /// Transport-level failure (connection refused, DNS failure, reset, ...)
    TransportError,
    /// The attempt's own timeout elapsed
    Timeout,
    /// A response arrived with this status code
    Status(u16),
    /// Failure that is never retryable (deadline exceeded, cancelled,
    /// malformed request, dead buffer worker)
    NonRetryable,
}

/// Exponential backoff schedule for retries.
///
/// The delay before retry `n` (0-based) is
/// `min(initial * multiplier^n, max)`, optionally with 0-25% jitter on top.
/// Jitter is off by default so the schedule is deterministic; enable it for
/// high-fanout workloads that would otherwise retry in lockstep.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    /// Initial backoff duration (default: 1s)
    pub initial: Duration,

    /// Maximum backoff duration (default: 30s)
    pub max: Duration,

    /// Growth factor per attempt (default: 2.0)
    pub multiplier: f64,

    /// Add 0-25% random jitter to each delay (default: false)
    pub jitter: bool,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(30),
            multiplier: 2.0,
            jitter: false,
        }
    }
}

impl ExponentialBackoff {
    /// Backoff with custom initial and max durations
    #[must_use]
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            initial,
            max,
            ..Default::default()
        }
    }

    /// Fast backoff for tests (1ms initial, 100ms max, no jitter)
    #[must_use]
    pub fn fast() -> Self {
        Self {
            initial: Duration::from_millis(1),
            max: Duration::from_millis(100),
            multiplier: 2.0,
            jitter: false,
        }
    }
}

/// Retry policy configuration.
///
/// An attempt is retried when its [`RetryTrigger`] is accepted by
/// [`should_retry`](Self::should_retry) and the retry budget
/// (`max_retries`) is not exhausted. Statuses are matched against
/// `retry_statuses`; transport errors and timeouts are gated by their own
/// flags. The upstream service defines retryability per status, so there is
/// no per-method carve-out here — configure the set instead.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the initial attempt (0 = no retries,
    /// default: 3). Total attempts = 1 (initial) + `max_retries`.
    pub max_retries: usize,

    /// Backoff schedule between attempts
    pub backoff: ExponentialBackoff,

    /// Status codes that trigger a retry.
    /// Default: `{429, 500, 502, 503, 504}`.
    pub retry_statuses: HashSet<u16>,

    /// Retry transport-level failures (default: true)
    pub retry_on_transport: bool,

    /// Retry per-attempt timeouts (default: true)
    pub retry_on_timeout: bool,

    /// If true, ignore the `Retry-After` response header and always use the
    /// backoff schedule. If false (default), a server-provided hint takes
    /// precedence — the server knows when capacity returns.
    pub ignore_retry_after: bool,

    /// Maximum bytes to drain from a response body before retrying on a
    /// status code. Draining allows connection reuse; bodies over the limit
    /// abandon the connection instead. Default: 64 KiB.
    pub retry_response_drain_limit: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff: ExponentialBackoff::default(),
            retry_statuses: HashSet::from(DEFAULT_RETRY_STATUSES),
            retry_on_transport: true,
            retry_on_timeout: true,
            ignore_retry_after: false,
            retry_response_drain_limit: DEFAULT_RETRY_RESPONSE_DRAIN_LIMIT,
        }
    }
}

impl RetryConfig {
    /// Config with no retries
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Whether the given trigger should cause a retry.
    #[must_use]
    pub fn should_retry(&self, trigger: RetryTrigger) -> bool {
        match trigger {
            RetryTrigger::Status(status) => self.retry_statuses.contains(&status),
            RetryTrigger::TransportError => self.retry_on_transport,
            RetryTrigger::Timeout => self.retry_on_timeout,
            RetryTrigger::NonRetryable => false,
        }
    }

    /// Check structural invariants (`initial <= max`, `multiplier > 1.0`).
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated invariant.
    pub fn validate(&self) -> Result<(), String> {
        if self.backoff.initial > self.backoff.max {
            return Err(format!(
                "backoff initial ({:?}) must not exceed max ({:?})",
                self.backoff.initial, self.backoff.max
            ));
        }
        if !self.backoff.multiplier.is_finite() || self.backoff.multiplier <= 1.0 {
            return Err(format!(
                "backoff multiplier ({}) must be finite and greater than 1.0",
                self.backoff.multiplier
            ));
        }
        Ok(())
    }
}

/// TLS root certificate configuration
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TlsRootConfig {
    /// Use Mozilla's root certificates (webpki-roots, no OS dependency)
    #[default]
    WebPki,
    /// Use OS native root certificate store
    Native,
}

/// Transport security configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[non_exhaustive]
pub enum TransportSecurity {
    /// Require TLS for all connections (HTTPS only) - default and recommended
    #[default]
    TlsOnly,
    /// Allow insecure HTTP connections (for testing with mock servers only)
    AllowInsecureHttp,
}

/// Overall HTTP client configuration
#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Per-request timeout (default: 30 seconds).
    ///
    /// Applies to each individual attempt; every retry gets its own timeout.
    pub request_timeout: Duration,

    /// Total deadline spanning all retry attempts (default: None).
    ///
    /// When set, the whole logical operation — attempts plus backoff sleeps —
    /// must finish within this duration or the request fails with
    /// [`HttpError::DeadlineExceeded`](crate::HttpError::DeadlineExceeded).
    pub total_timeout: Option<Duration>,

    /// Maximum response body size in bytes (default: 10 MB)
    pub max_body_size: usize,

    /// User-Agent header value
    pub user_agent: String,

    /// Retry policy; `None` disables retries entirely
    pub retry: Option<RetryConfig>,

    /// Transport security mode (default: `TlsOnly`)
    pub transport: TransportSecurity,

    /// TLS root certificate strategy (default: `WebPki`)
    pub tls_roots: TlsRootConfig,

    /// Buffer capacity for concurrent request handling (default: 1024).
    ///
    /// The client multiplexes concurrent callers through an internal channel;
    /// this caps how many requests can be queued at once.
    pub buffer_capacity: usize,

    /// Timeout for idle pooled connections (default: 90 seconds)
    pub pool_idle_timeout: Option<Duration>,

    /// Maximum idle connections kept per host (default: 32)
    pub pool_max_idle_per_host: usize,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(30),
            total_timeout: None,
            max_body_size: 10 * 1024 * 1024,
            user_agent: DEFAULT_USER_AGENT.to_owned(),
            retry: Some(RetryConfig::default()),
            transport: TransportSecurity::TlsOnly,
            tls_roots: TlsRootConfig::default(),
            buffer_capacity: 1024,
            pool_idle_timeout: Some(Duration::from_secs(90)),
            pool_max_idle_per_host: 32,
        }
    }
}

impl HttpClientConfig {
    /// Minimal configuration (no retry, small bodies, short timeout)
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_body_size: 1024 * 1024,
            retry: None,
            buffer_capacity: 256,
            pool_idle_timeout: Some(Duration::from_secs(30)),
            pool_max_idle_per_host: 8,
            ..Default::default()
        }
    }

    /// Configuration for testing with mock servers (allows insecure HTTP,
    /// no retries). Never use in production.
    #[must_use]
    pub fn for_testing() -> Self {
        Self {
            request_timeout: Duration::from_secs(10),
            max_body_size: 1024 * 1024,
            retry: None,
            transport: TransportSecurity::AllowInsecureHttp,
            buffer_capacity: 256,
            pool_idle_timeout: Some(Duration::from_secs(10)),
            pool_max_idle_per_host: 4,
            ..Default::default()
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn test_retry_config_defaults() {
        let config = RetryConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.backoff.initial, Duration::from_secs(1));
        assert_eq!(config.backoff.max, Duration::from_secs(30));
        assert!((config.backoff.multiplier - 2.0).abs() < f64::EPSILON);
        assert!(!config.backoff.jitter);
        for status in [429, 500, 502, 503, 504] {
            assert!(config.retry_statuses.contains(&status));
        }
        assert_eq!(config.retry_statuses.len(), 5);
        assert!(!config.ignore_retry_after);
    }

    #[test]
    fn test_should_retry_by_status() {
        let config = RetryConfig::default();
        assert!(config.should_retry(RetryTrigger::Status(429)));
        assert!(config.should_retry(RetryTrigger::Status(503)));
        assert!(!config.should_retry(RetryTrigger::Status(400)));
        assert!(!config.should_retry(RetryTrigger::Status(404)));
        assert!(!config.should_retry(RetryTrigger::Status(422)));
    }

    #[test]
    fn test_should_retry_transport_and_timeout_flags() {
        let config = RetryConfig::default();
        assert!(config.should_retry(RetryTrigger::TransportError));
        assert!(config.should_retry(RetryTrigger::Timeout));
        assert!(!config.should_retry(RetryTrigger::NonRetryable));

        let config = RetryConfig {
            retry_on_transport: false,
            retry_on_timeout: false,
            ..RetryConfig::default()
        };
        assert!(!config.should_retry(RetryTrigger::TransportError));
        assert!(!config.should_retry(RetryTrigger::Timeout));
    }

    #[test]
    fn test_validate_rejects_inverted_backoff() {
        let config = RetryConfig {
            backoff: ExponentialBackoff {
                initial: Duration::from_secs(60),
                max: Duration::from_secs(30),
                ..ExponentialBackoff::default()
            },
            ..RetryConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_multiplier() {
        for multiplier in [1.0, 0.5, f64::NAN, f64::INFINITY] {
            let config = RetryConfig {
                backoff: ExponentialBackoff {
                    multiplier,
                    ..ExponentialBackoff::default()
                },
                ..RetryConfig::default()
            };
            assert!(config.validate().is_err(), "multiplier {multiplier} accepted");
        }
    }

    #[test]
    fn test_http_client_config_defaults() {
        let config = HttpClientConfig::default();
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.total_timeout.is_none());
        assert_eq!(config.max_body_size, 10 * 1024 * 1024);
        assert_eq!(config.user_agent, DEFAULT_USER_AGENT);
        assert!(config.retry.is_some());
        assert_eq!(config.transport, TransportSecurity::TlsOnly);
    }

    #[test]
    fn test_http_client_config_for_testing() {
        let config = HttpClientConfig::for_testing();
        assert_eq!(config.transport, TransportSecurity::AllowInsecureHttp);
        assert!(config.retry.is_none());
    }
}
