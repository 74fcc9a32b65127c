//! Tower middleware for the HTTP client stack.
//!
//! - [`RetryLayer`] owns the attempt loop: backoff, `Retry-After` hints,
//!   total deadline and cancellation checks.
//! - [`UserAgentLayer`] injects the configured User-Agent when absent.

mod retry;
mod user_agent;

pub use retry::{RetryLayer, RetryService};
pub(crate) use retry::CancelToken;
pub use user_agent::{UserAgentLayer, UserAgentService};
