use thiserror::Error;

use crate::calc::CalcOp;
use crate::filter::FilterOp;

/// Validation failure raised when finalizing a query specification.
///
/// These are purely local precondition violations: no network request is
/// attempted and no partial specification escapes the builder.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum BuildError {
    /// A calculation op that aggregates over a column was given none.
    #[error("missing column for operation {op}")]
    MissingColumn { op: CalcOp },

    /// An existence filter was given a comparison value.
    #[error("filter {op} on column '{column}' must not carry a value")]
    UnexpectedValue { column: String, op: FilterOp },

    /// A comparison filter was built without a value.
    #[error("filter {op} on column '{column}' requires a value")]
    MissingValue { column: String, op: FilterOp },

    /// An in/not-in filter was given an empty or non-list value.
    #[error("filter {op} on column '{column}' requires a non-empty list of values")]
    InvalidValueList { column: String, op: FilterOp },

    /// Result limit outside the accepted range.
    #[error("limit must be between 1 and {max}, got {got}")]
    InvalidLimit { got: u64, max: u64 },

    /// Granularity outside the range the API accepts for the time window.
    #[error("granularity {got} must be between time_range/1000 and time_range/10 ({min}..={max})")]
    InvalidGranularity { got: u64, min: u64, max: u64 },

    /// Absolute window with start not before end.
    #[error("start_time {start} must be before end_time {end}")]
    InvalidAbsoluteWindow { start: i64, end: i64 },

    /// Both a relative time range and an absolute window were set.
    #[error("time_range cannot be combined with both start_time and end_time")]
    ConflictingTimeWindow,

    /// An order clause references a calculation or breakdown not in the spec.
    #[error("order on {target} does not match any calculation or breakdown")]
    OrderTargetMissing { target: String },

    /// A having clause references a calculation not in the spec.
    #[error("having on {op} does not match any calculation")]
    HavingTargetMissing { op: CalcOp },

    /// Trigger specs carry exactly one calculation.
    #[error("exactly one calculation required, got {got}")]
    TriggerCalculationCount { got: usize },

    /// Trigger time range over the API ceiling.
    #[error("time_range {got} exceeds the trigger maximum of {max} seconds")]
    TriggerTimeRangeTooLong { got: u64, max: u64 },

    /// Absolute windows are not allowed on trigger queries.
    #[error("trigger queries cannot use an absolute start/end window")]
    TriggerAbsoluteTime,

    /// Calculation op the trigger endpoint rejects.
    #[error("trigger queries cannot use the {op} operation")]
    TriggerUnsupportedCalculation { op: CalcOp },

    /// Spec field the trigger endpoint rejects.
    #[error("trigger queries cannot set {field}")]
    TriggerUnsupportedField { field: &'static str },
}
