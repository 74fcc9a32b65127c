use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::calc::{CalcOp, Calculation};
use crate::filter::Filter;

/// Time window applied when a builder sets no explicit window (2 hours).
pub const DEFAULT_TIME_RANGE: u64 = 7200;

/// Largest accepted result limit.
pub const MAX_LIMIT: u64 = 1000;

/// Upstream ceiling on a trigger query's time range (1 hour).
pub const TRIGGER_MAX_TIME_RANGE: u64 = 3600;

/// How multiple filters combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterCombination {
    #[serde(rename = "AND")]
    And,
    #[serde(rename = "OR")]
    Or,
}

/// Sort direction of an order clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDir {
    #[serde(rename = "ascending")]
    Ascending,
    #[serde(rename = "descending")]
    Descending,
}

/// One order clause: either over a calculation or over a breakdown column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub op: Option<CalcOp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub order: SortDir,
}

impl Order {
    /// Order by a calculation already present in the spec.
    #[must_use]
    pub fn by_calculation(calc: &Calculation, dir: SortDir) -> Self {
        Self {
            op: Some(calc.op),
            column: calc.column.clone(),
            order: dir,
        }
    }

    /// Order by a breakdown column.
    pub fn by_column(column: impl Into<String>, dir: SortDir) -> Self {
        Self {
            op: None,
            column: Some(column.into()),
            order: dir,
        }
    }
}

/// Comparison operator of a post-aggregation (having) clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HavingOp {
    #[serde(rename = "=")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Gte,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Lte,
}

/// Post-aggregation filter over a calculation's result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Having {
    pub calculate_op: CalcOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
    pub op: HavingOp,
    pub value: Value,
}

impl Having {
    /// A having clause over the given calculation's result.
    pub fn new(calc: &Calculation, op: HavingOp, value: impl Into<Value>) -> Self {
        Self {
            calculate_op: calc.op,
            column: calc.column.clone(),
            op,
            value: value.into(),
        }
    }
}

/// A validated, frozen query specification.
///
/// Produced by [`QueryBuilder::build`](crate::QueryBuilder::build); serializes
/// to the JSON body the Query Data API consumes. Field order and list order
/// are preserved from the builder — the first calculation drives the default
/// sort upstream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpec {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_range: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<u64>,
    pub calculations: Vec<Calculation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub filters: Vec<Filter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_combination: Option<FilterCombination>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub breakdowns: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub orders: Vec<Order>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub havings: Vec<Having>,
}

/// A query specification narrowed to what the trigger endpoint accepts.
///
/// Only [`QueryBuilder::build_for_trigger`](crate::QueryBuilder::build_for_trigger)
/// constructs this type, so holding one proves the trigger constraints
/// (single calculation, bounded relative window, no orders/havings/limit)
/// were checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TriggerQuerySpec(pub(crate) QuerySpec);

impl TriggerQuerySpec {
    /// The underlying spec, for serialization or inspection.
    #[must_use]
    pub fn as_spec(&self) -> &QuerySpec {
        &self.0
    }

    /// The single calculation the trigger evaluates.
    #[must_use]
    pub fn calculation(&self) -> &Calculation {
        // Invariant: build_for_trigger only constructs specs with exactly one.
        &self.0.calculations[0]
    }

    /// The relative evaluation window in seconds.
    #[must_use]
    pub fn time_range(&self) -> u64 {
        self.0.time_range.unwrap_or(DEFAULT_TIME_RANGE)
    }
}

impl From<TriggerQuerySpec> for QuerySpec {
    fn from(spec: TriggerQuerySpec) -> Self {
        spec.0
    }
}
