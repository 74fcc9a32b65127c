use crate::config::{ExponentialBackoff, RetryConfig, RetryTrigger};
use crate::error::HttpError;
use crate::response::{parse_retry_after, ResponseBody};
use bytes::Bytes;
use http::{Request, Response};
use http_body_util::{BodyExt, Full};
use rand::Rng;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tower::{Layer, Service, ServiceExt};

/// Request extension carrying a caller-supplied cancellation token.
///
/// Checked at the top of the retry loop: a cancelled operation never issues
/// another attempt. In-flight network I/O is not interrupted.
#[derive(Clone)]
pub(crate) struct CancelToken(pub(crate) CancellationToken);

/// Tower layer that owns the attempt loop for one logical operation.
///
/// Retries on `Err(HttpError)` (transport, timeout) and on `Ok(Response)`
/// whose status is in the configured retryable set. Between attempts it
/// sleeps per the backoff schedule, preferring a server-provided
/// `Retry-After` hint for status-triggered retries.
#[derive(Clone)]
pub struct RetryLayer {
    config: RetryConfig,
    total_timeout: Option<Duration>,
}

impl RetryLayer {
    /// Create a `RetryLayer` with the given configuration
    #[must_use]
    pub fn new(config: RetryConfig) -> Self {
        Self {
            config,
            total_timeout: None,
        }
    }

    /// Create a `RetryLayer` with a total deadline across all attempts
    #[must_use]
    pub fn with_total_timeout(config: RetryConfig, total_timeout: Option<Duration>) -> Self {
        Self {
            config,
            total_timeout,
        }
    }
}

impl<S> Layer<S> for RetryLayer {
    type Service = RetryService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RetryService {
            inner,
            config: self.config.clone(),
            total_timeout: self.total_timeout,
        }
    }
}

/// Service implementing the retry loop.
///
/// After retries exhaust, the final response is returned as `Ok` whatever
/// its status — callers classify terminal statuses themselves. Only
/// transport-level failures, the total deadline and cancellation surface as
/// `Err`.
#[derive(Clone)]
pub struct RetryService<S> {
    inner: S,
    config: RetryConfig,
    total_timeout: Option<Duration>,
}

impl<S> Service<Request<Full<Bytes>>> for RetryService<S>
where
    S: Service<Request<Full<Bytes>>, Response = Response<ResponseBody>, Error = HttpError>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = S::Response;
    type Error = HttpError;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Full<Bytes>>) -> Self::Future {
        // Swap so we consume the instance that was poll_ready'd, leaving a
        // fresh clone for the next poll_ready cycle.
        let clone = self.inner.clone();
        let inner = std::mem::replace(&mut self.inner, clone);
        let config = self.config.clone();
        let total_timeout = self.total_timeout;

        let (parts, body_bytes) = req.into_parts();

        // Version and extensions must survive the Parts clone on retries.
        let http_version = parts.version;
        let extensions = parts.extensions.clone();
        let cancel = parts.extensions.get::<CancelToken>().map(|c| c.0.clone());

        let parts = std::sync::Arc::new(parts);

        Box::pin(async move {
            let method = parts.method.clone();
            let url_host = parts
                .uri
                .authority()
                .map(ToString::to_string)
                .unwrap_or_else(|| "unknown".to_owned());

            let deadline_info = total_timeout.map(|t| (tokio::time::Instant::now() + t, t));

            let mut attempt = 0usize;
            loop {
                if let Some(token) = &cancel
                    && token.is_cancelled()
                {
                    return Err(HttpError::Cancelled);
                }

                if let Some((deadline, timeout_duration)) = deadline_info
                    && tokio::time::Instant::now() >= deadline
                {
                    return Err(HttpError::DeadlineExceeded(timeout_duration));
                }

                let mut req = Request::from_parts((*parts).clone(), body_bytes.clone());
                *req.version_mut() = http_version;
                *req.extensions_mut() = extensions.clone();

                let mut svc = inner.clone();
                svc.ready().await?;

                match svc.call(req).await {
                    Ok(resp) => {
                        let status_code = resp.status().as_u16();
                        let trigger = RetryTrigger::Status(status_code);

                        if attempt < config.max_retries && config.should_retry(trigger) {
                            let retry_after = parse_retry_after(resp.headers());
                            let backoff_duration = if config.ignore_retry_after {
                                calculate_backoff(&config.backoff, attempt)
                            } else {
                                retry_after
                                    .unwrap_or_else(|| calculate_backoff(&config.backoff, attempt))
                            };

                            // Drain so the pooled connection can be reused;
                            // a failed drain just costs the connection.
                            let drain_limit = config.retry_response_drain_limit;
                            if let Err(e) = drain_response_body(resp, drain_limit).await {
                                tracing::debug!(
                                    error = %e,
                                    "failed to drain response body before retry"
                                );
                            }

                            let Some(effective_backoff) =
                                clamp_to_deadline(backoff_duration, deadline_info)
                            else {
                                let timeout_duration =
                                    deadline_info.map(|(_, t)| t).unwrap_or_default();
                                return Err(HttpError::DeadlineExceeded(timeout_duration));
                            };

                            tracing::debug!(
                                retry = attempt + 1,
                                max_retries = config.max_retries,
                                status = status_code,
                                method = %method,
                                host = %url_host,
                                backoff_ms = effective_backoff.as_millis(),
                                retry_after_used =
                                    retry_after.is_some() && !config.ignore_retry_after,
                                "retrying request after status code"
                            );
                            tokio::time::sleep(effective_backoff).await;
                            attempt += 1;
                            continue;
                        }

                        // Not retryable, or budget spent: hand the response up.
                        return Ok(resp);
                    }
                    Err(err) => {
                        let trigger = error_trigger(&err);
                        if attempt >= config.max_retries || !config.should_retry(trigger) {
                            return Err(err);
                        }

                        let backoff_duration = calculate_backoff(&config.backoff, attempt);
                        let Some(effective_backoff) =
                            clamp_to_deadline(backoff_duration, deadline_info)
                        else {
                            let timeout_duration =
                                deadline_info.map(|(_, t)| t).unwrap_or_default();
                            return Err(HttpError::DeadlineExceeded(timeout_duration));
                        };

                        tracing::debug!(
                            retry = attempt + 1,
                            max_retries = config.max_retries,
                            error = %err,
                            method = %method,
                            host = %url_host,
                            backoff_ms = effective_backoff.as_millis(),
                            "retrying request after error"
                        );
                        tokio::time::sleep(effective_backoff).await;
                        attempt += 1;
                    }
                }
            }
        })
    }
}

/// Clamp a backoff to the remaining deadline budget.
///
/// Returns `None` when the deadline has already passed.
fn clamp_to_deadline(
    backoff: Duration,
    deadline_info: Option<(tokio::time::Instant, Duration)>,
) -> Option<Duration> {
    match deadline_info {
        Some((deadline, _)) => {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            if remaining.is_zero() {
                None
            } else {
                Some(backoff.min(remaining))
            }
        }
        None => Some(backoff),
    }
}

/// Drain up to `limit` bytes of the response body so the connection can be
/// reused for the retry. Stops early on bodies over the limit.
async fn drain_response_body(
    response: Response<ResponseBody>,
    limit: usize,
) -> Result<(), HttpError> {
    let (_parts, body) = response.into_parts();
    let mut body = std::pin::pin!(body);
    let mut drained = 0usize;

    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(HttpError::Transport)?;
        if let Some(chunk) = frame.data_ref() {
            drained += chunk.len();
            if drained >= limit {
                break;
            }
        }
    }

    Ok(())
}

/// Classify an error for retry purposes
fn error_trigger(err: &HttpError) -> RetryTrigger {
    match err {
        HttpError::Transport(_) => RetryTrigger::TransportError,
        HttpError::Timeout(_) => RetryTrigger::Timeout,
        // DeadlineExceeded, Cancelled, ServiceClosed and build errors never retry
        _ => RetryTrigger::NonRetryable,
    }
}

/// Delay before retry `attempt` (0-based): `min(initial * multiplier^n, max)`.
///
/// Inputs are sanitized (NaN, infinity, negatives) so this never panics.
#[must_use]
pub fn calculate_backoff(backoff: &ExponentialBackoff, attempt: usize) -> Duration {
    // Anything past a day is unreasonable for a retry delay.
    const MAX_BACKOFF_SECS: f64 = 86400.0;

    let attempt_i32 = i32::try_from(attempt).unwrap_or(i32::MAX);

    let multiplier = if backoff.multiplier.is_finite() && backoff.multiplier >= 0.0 {
        backoff.multiplier
    } else {
        1.0
    };

    let initial_secs = backoff.initial.as_secs_f64();
    let initial_secs = if initial_secs.is_finite() && initial_secs >= 0.0 {
        initial_secs
    } else {
        0.0
    };

    let max_secs = backoff.max.as_secs_f64();
    let max_secs = if max_secs.is_finite() && max_secs >= 0.0 {
        max_secs.min(MAX_BACKOFF_SECS)
    } else {
        MAX_BACKOFF_SECS
    };

    let base = initial_secs * multiplier.powi(attempt_i32);
    let clamped = if base.is_finite() {
        base.min(max_secs).max(0.0)
    } else {
        max_secs
    };
    let duration = Duration::from_secs_f64(clamped);

    let duration = if backoff.jitter {
        let mut rng = rand::rng();
        let jitter_factor = rng.random_range(0.0..=0.25);
        duration + duration.mul_f64(jitter_factor)
    } else {
        duration
    };

    duration.min(Duration::from_secs_f64(max_secs))
}
