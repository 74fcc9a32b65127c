use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Comparison operator of a query filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterOp {
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
    #[serde(rename = "starts-with")]
    StartsWith,
    #[serde(rename = "does-not-start-with")]
    DoesNotStartWith,
    #[serde(rename = "ends-with")]
    EndsWith,
    #[serde(rename = "does-not-end-with")]
    DoesNotEndWith,
    #[serde(rename = "contains")]
    Contains,
    #[serde(rename = "does-not-contain")]
    DoesNotContain,
    #[serde(rename = "exists")]
    Exists,
    #[serde(rename = "does-not-exist")]
    DoesNotExist,
    #[serde(rename = "in")]
    In,
    #[serde(rename = "not-in")]
    NotIn,
}

impl FilterOp {
    /// Whether this operator compares against a value.
    ///
    /// Pure existence checks carry no value; everything else requires one.
    #[must_use]
    pub fn takes_value(self) -> bool {
        !matches!(self, Self::Exists | Self::DoesNotExist)
    }

    /// Whether this operator compares against a list of values.
    #[must_use]
    pub fn takes_list(self) -> bool {
        matches!(self, Self::In | Self::NotIn)
    }

    /// Upstream wire name of the operator.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::Gt => ">",
            Self::Gte => ">=",
            Self::Lt => "<",
            Self::Lte => "<=",
            Self::StartsWith => "starts-with",
            Self::DoesNotStartWith => "does-not-start-with",
            Self::EndsWith => "ends-with",
            Self::DoesNotEndWith => "does-not-end-with",
            Self::Contains => "contains",
            Self::DoesNotContain => "does-not-contain",
            Self::Exists => "exists",
            Self::DoesNotExist => "does-not-exist",
            Self::In => "in",
            Self::NotIn => "not-in",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One filter clause: column, operator, optional comparison value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl Filter {
    /// A filter with an explicit operator and value.
    pub fn new(column: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Self {
            column: column.into(),
            op,
            value: Some(value.into()),
        }
    }

    fn valueless(column: impl Into<String>, op: FilterOp) -> Self {
        Self {
            column: column.into(),
            op,
            value: None,
        }
    }

    pub fn eq(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Eq, value)
    }

    pub fn ne(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Ne, value)
    }

    pub fn gt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Gt, value)
    }

    pub fn gte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Gte, value)
    }

    pub fn lt(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Lt, value)
    }

    pub fn lte(column: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::new(column, FilterOp::Lte, value)
    }

    pub fn starts_with(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, FilterOp::StartsWith, value.into())
    }

    pub fn does_not_start_with(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, FilterOp::DoesNotStartWith, value.into())
    }

    pub fn ends_with(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, FilterOp::EndsWith, value.into())
    }

    pub fn does_not_end_with(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, FilterOp::DoesNotEndWith, value.into())
    }

    pub fn contains(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, FilterOp::Contains, value.into())
    }

    pub fn does_not_contain(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(column, FilterOp::DoesNotContain, value.into())
    }

    /// Matches events where the column is present, whatever its value.
    pub fn exists(column: impl Into<String>) -> Self {
        Self::valueless(column, FilterOp::Exists)
    }

    /// Matches events where the column is absent.
    pub fn does_not_exist(column: impl Into<String>) -> Self {
        Self::valueless(column, FilterOp::DoesNotExist)
    }

    pub fn is_in<V: Into<Value>>(column: impl Into<String>, values: Vec<V>) -> Self {
        let list: Vec<Value> = values.into_iter().map(Into::into).collect();
        Self::new(column, FilterOp::In, Value::Array(list))
    }

    pub fn not_in<V: Into<Value>>(column: impl Into<String>, values: Vec<V>) -> Self {
        let list: Vec<Value> = values.into_iter().map(Into::into).collect();
        Self::new(column, FilterOp::NotIn, Value::Array(list))
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn existence_ops_take_no_value() {
        assert!(!FilterOp::Exists.takes_value());
        assert!(!FilterOp::DoesNotExist.takes_value());
        assert!(FilterOp::Eq.takes_value());
        assert!(FilterOp::In.takes_value());
    }

    #[test]
    fn serializes_symbolic_ops() {
        let f = Filter::gte("status_code", 500);
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json, json!({"column": "status_code", "op": ">=", "value": 500}));
    }

    #[test]
    fn exists_omits_value_field() {
        let json = serde_json::to_value(Filter::exists("error")).unwrap();
        assert_eq!(json, json!({"column": "error", "op": "exists"}));
    }

    #[test]
    fn in_collects_list_value() {
        let f = Filter::is_in("service.name", vec!["api", "worker"]);
        let json = serde_json::to_value(&f).unwrap();
        assert_eq!(json["op"], "in");
        assert_eq!(json["value"], json!(["api", "worker"]));
    }
}
