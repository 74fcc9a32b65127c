use std::fmt;

use serde::{Deserialize, Serialize};

/// Aggregate operation of a query calculation.
///
/// Serialized exactly as the upstream API spells them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalcOp {
    #[serde(rename = "COUNT")]
    Count,
    #[serde(rename = "CONCURRENCY")]
    Concurrency,
    #[serde(rename = "SUM")]
    Sum,
    #[serde(rename = "AVG")]
    Avg,
    #[serde(rename = "COUNT_DISTINCT")]
    CountDistinct,
    #[serde(rename = "MAX")]
    Max,
    #[serde(rename = "MIN")]
    Min,
    #[serde(rename = "P001")]
    P001,
    #[serde(rename = "P01")]
    P01,
    #[serde(rename = "P05")]
    P05,
    #[serde(rename = "P10")]
    P10,
    #[serde(rename = "P25")]
    P25,
    #[serde(rename = "P50")]
    P50,
    #[serde(rename = "P75")]
    P75,
    #[serde(rename = "P90")]
    P90,
    #[serde(rename = "P95")]
    P95,
    #[serde(rename = "P99")]
    P99,
    #[serde(rename = "P999")]
    P999,
    #[serde(rename = "HEATMAP")]
    Heatmap,
    #[serde(rename = "RATE_AVG")]
    RateAvg,
    #[serde(rename = "RATE_SUM")]
    RateSum,
    #[serde(rename = "RATE_MAX")]
    RateMax,
}

impl CalcOp {
    /// Whether this operation aggregates over a column.
    ///
    /// `COUNT` and `CONCURRENCY` operate on events, not column values.
    #[must_use]
    pub fn requires_column(self) -> bool {
        !matches!(self, Self::Count | Self::Concurrency)
    }

    /// Upstream wire name of the operation.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Count => "COUNT",
            Self::Concurrency => "CONCURRENCY",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::CountDistinct => "COUNT_DISTINCT",
            Self::Max => "MAX",
            Self::Min => "MIN",
            Self::P001 => "P001",
            Self::P01 => "P01",
            Self::P05 => "P05",
            Self::P10 => "P10",
            Self::P25 => "P25",
            Self::P50 => "P50",
            Self::P75 => "P75",
            Self::P90 => "P90",
            Self::P95 => "P95",
            Self::P99 => "P99",
            Self::P999 => "P999",
            Self::Heatmap => "HEATMAP",
            Self::RateAvg => "RATE_AVG",
            Self::RateSum => "RATE_SUM",
            Self::RateMax => "RATE_MAX",
        }
    }
}

impl fmt::Display for CalcOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One calculation of a query: an aggregate op plus the column it runs over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calculation {
    pub op: CalcOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<String>,
}

impl Calculation {
    /// A calculation over a column.
    pub fn new(op: CalcOp, column: impl Into<String>) -> Self {
        Self {
            op,
            column: Some(column.into()),
        }
    }

    /// An event count; carries no column.
    #[must_use]
    pub fn count() -> Self {
        Self {
            op: CalcOp::Count,
            column: None,
        }
    }

    /// Concurrent-span estimate; carries no column.
    #[must_use]
    pub fn concurrency() -> Self {
        Self {
            op: CalcOp::Concurrency,
            column: None,
        }
    }
}
