#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Typed async client for the Honeycomb API.
//!
//! Resources (datasets, triggers, SLOs, boards, queries, ...) are exposed as
//! typed CRUD operations over HTTP, with retry/backoff, rate-limit-aware
//! delays and structured error classification handled underneath. The
//! transport lives in `hny-transport`; query specifications come from
//! `hny-query` (re-exported here for convenience).
//!
//! # Example
//!
//! ```ignore
//! use hny_client::{Client, Filter, QueryBuilder};
//! use hny_client::resources::triggers::{NewTrigger, Threshold, ThresholdOp};
//!
//! let client = Client::builder()
//!     .api_key(std::env::var("HONEYCOMB_API_KEY")?)
//!     .build()?;
//!
//! let query = QueryBuilder::new()
//!     .count()
//!     .filter(Filter::gte("status_code", 500))
//!     .time_range(900)
//!     .build_for_trigger()?;
//!
//! let trigger = client
//!     .triggers()
//!     .create(
//!         "prod",
//!         &NewTrigger::new("5xx spike", query, Threshold::new(ThresholdOp::Gt, 100.0))
//!             .frequency(300),
//!     )
//!     .await?;
//! println!("created trigger {}", trigger.id);
//! ```
//!
//! # Errors
//!
//! Every terminal failure is one [`ApiError`]; callers match on the variant
//! to decide remediation (`NotFound` → create-then-retry, `RateLimit` →
//! surfaced `retry_after`, `Validation` → field-level details). Local
//! precondition failures never reach the network.

#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]

mod auth;
pub mod blocking;
mod client;
mod error;
pub mod registry;
pub mod resources;

// Client surface
pub use auth::Credentials;
pub use client::{Client, ClientBuilder, ConfigError, DEFAULT_BASE_URL};

// Error types
pub use error::{classify_response, ApiError, FieldViolation};

// Registry
pub use registry::{OperationDef, OperationRegistry};

// Blocking facade
pub use blocking::BlockingClient;

// Query construction (re-exported from hny-query for convenience)
pub use hny_query::{
    BuildError, CalcOp, Calculation, Filter, FilterOp, QueryBuilder, QuerySpec, TriggerQuerySpec,
};

// Builder-or-spec union used by query-accepting endpoints
pub use resources::queries::QuerySource;

// Transport knobs callers commonly reach for
pub use hny_transport::{ExponentialBackoff, RetryConfig, TransportSecurity};
