#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Query specification builder for the Honeycomb Query Data API.
//!
//! This crate is pure data: it accumulates calculations, filters, grouping,
//! ordering and a time window into a validated [`QuerySpec`], serializable to
//! the JSON shape the upstream API expects. Nothing here performs I/O;
//! validation failures surface as [`BuildError`] before a request is ever
//! built.
//!
//! # Example
//!
//! ```
//! use hny_query::{Filter, QueryBuilder};
//!
//! let spec = QueryBuilder::new()
//!     .avg("duration_ms")
//!     .filter(Filter::gte("status_code", 500))
//!     .breakdown("service.name")
//!     .time_range(3600)
//!     .build()?;
//!
//! let json = serde_json::to_value(&spec)?;
//! assert_eq!(json["time_range"], 3600);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Trigger queries are a narrower shape (exactly one calculation, bounded
//! time range, no absolute window); [`QueryBuilder::build_for_trigger`]
//! returns the distinct [`TriggerQuerySpec`] type so trigger endpoints can
//! only be handed a spec that already passed those checks.

mod builder;
mod calc;
mod errors;
mod filter;
mod spec;

pub use builder::QueryBuilder;
pub use calc::{CalcOp, Calculation};
pub use errors::BuildError;
pub use filter::{Filter, FilterOp};
pub use spec::{
    FilterCombination, Having, HavingOp, Order, QuerySpec, SortDir, TriggerQuerySpec,
    DEFAULT_TIME_RANGE, MAX_LIMIT, TRIGGER_MAX_TIME_RANGE,
};
