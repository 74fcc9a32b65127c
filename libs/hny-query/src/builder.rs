use crate::calc::{CalcOp, Calculation};
use crate::errors::BuildError;
use crate::filter::Filter;
use crate::spec::{
    FilterCombination, Having, HavingOp, Order, QuerySpec, SortDir, TriggerQuerySpec,
    DEFAULT_TIME_RANGE, MAX_LIMIT, TRIGGER_MAX_TIME_RANGE,
};

/// Fluent accumulator for [`QuerySpec`] values.
///
/// Chained setters record state without validating; all invariants are
/// checked when [`build`](Self::build) or
/// [`build_for_trigger`](Self::build_for_trigger) runs. Building borrows the
/// builder, so the same builder can be finalized repeatedly and both ways —
/// useful when one query definition backs both a board and a trigger.
#[derive(Debug, Clone, Default)]
#[must_use = "a QueryBuilder does nothing until .build() is called"]
pub struct QueryBuilder {
    time_range: Option<u64>,
    start_time: Option<i64>,
    end_time: Option<i64>,
    granularity: Option<u64>,
    calculations: Vec<Calculation>,
    filters: Vec<Filter>,
    filter_combination: Option<FilterCombination>,
    breakdowns: Vec<String>,
    orders: Vec<Order>,
    limit: Option<u64>,
    havings: Vec<Having>,
}

impl QueryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // === Calculations ===

    /// Append an arbitrary calculation.
    pub fn calculation(mut self, calc: Calculation) -> Self {
        self.calculations.push(calc);
        self
    }

    pub fn count(self) -> Self {
        self.calculation(Calculation::count())
    }

    pub fn concurrency(self) -> Self {
        self.calculation(Calculation::concurrency())
    }

    pub fn sum(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::Sum, column))
    }

    pub fn avg(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::Avg, column))
    }

    pub fn count_distinct(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::CountDistinct, column))
    }

    pub fn max(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::Max, column))
    }

    pub fn min(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::Min, column))
    }

    pub fn p001(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::P001, column))
    }

    pub fn p01(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::P01, column))
    }

    pub fn p05(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::P05, column))
    }

    pub fn p10(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::P10, column))
    }

    pub fn p25(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::P25, column))
    }

    pub fn p50(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::P50, column))
    }

    pub fn p75(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::P75, column))
    }

    pub fn p90(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::P90, column))
    }

    pub fn p95(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::P95, column))
    }

    pub fn p99(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::P99, column))
    }

    pub fn p999(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::P999, column))
    }

    pub fn heatmap(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::Heatmap, column))
    }

    pub fn rate_avg(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::RateAvg, column))
    }

    pub fn rate_sum(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::RateSum, column))
    }

    pub fn rate_max(self, column: impl Into<String>) -> Self {
        self.calculation(Calculation::new(CalcOp::RateMax, column))
    }

    // === Filters ===

    /// Append a filter clause; combine with [`Filter`]'s per-operator
    /// constructors (`Filter::eq`, `Filter::exists`, ...).
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    /// Set how multiple filters combine. Defaults to AND when more than one
    /// filter is present and nothing was set.
    pub fn filter_combination(mut self, combination: FilterCombination) -> Self {
        self.filter_combination = Some(combination);
        self
    }

    // === Grouping, ordering, limits ===

    /// Group results by a column.
    pub fn breakdown(mut self, column: impl Into<String>) -> Self {
        self.breakdowns.push(column.into());
        self
    }

    /// Append an order clause; it must reference a calculation or breakdown
    /// already in the spec by the time `build` runs.
    pub fn order(mut self, order: Order) -> Self {
        self.orders.push(order);
        self
    }

    /// Sort by a calculation's result.
    pub fn order_by_calculation(self, calc: &Calculation, dir: SortDir) -> Self {
        self.order(Order::by_calculation(calc, dir))
    }

    /// Cap the number of result groups (1..=1000).
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Append a post-aggregation filter.
    pub fn having(mut self, having: Having) -> Self {
        self.havings.push(having);
        self
    }

    /// Convenience for a having over a calculation already in the spec.
    pub fn having_on(self, calc: &Calculation, op: HavingOp, value: impl Into<serde_json::Value>) -> Self {
        self.having(Having::new(calc, op, value))
    }

    // === Time window ===

    /// Relative window: the last `seconds` seconds.
    pub fn time_range(mut self, seconds: u64) -> Self {
        self.time_range = Some(seconds);
        self
    }

    /// Absolute window as Unix-epoch seconds.
    pub fn absolute_window(mut self, start_time: i64, end_time: i64) -> Self {
        self.start_time = Some(start_time);
        self.end_time = Some(end_time);
        self
    }

    /// Bucket width in seconds for time-series results.
    pub fn granularity(mut self, seconds: u64) -> Self {
        self.granularity = Some(seconds);
        self
    }

    // === Finalization ===

    /// Validate and freeze the accumulated state into a [`QuerySpec`].
    ///
    /// Building is non-destructive: the same unmodified builder always
    /// produces value-equal specs.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] when a calculation is missing its column, a
    /// filter carries the wrong value shape, the limit/granularity/time
    /// window is out of range, or an order/having references a calculation
    /// that is not part of the spec.
    pub fn build(&self) -> Result<QuerySpec, BuildError> {
        for calc in &self.calculations {
            let has_column = calc.column.as_deref().is_some_and(|c| !c.is_empty());
            if calc.op.requires_column() && !has_column {
                return Err(BuildError::MissingColumn { op: calc.op });
            }
        }

        for filter in &self.filters {
            if filter.op.takes_value() {
                match &filter.value {
                    None => {
                        return Err(BuildError::MissingValue {
                            column: filter.column.clone(),
                            op: filter.op,
                        });
                    }
                    Some(value) if filter.op.takes_list() => {
                        let non_empty_list =
                            value.as_array().is_some_and(|list| !list.is_empty());
                        if !non_empty_list {
                            return Err(BuildError::InvalidValueList {
                                column: filter.column.clone(),
                                op: filter.op,
                            });
                        }
                    }
                    Some(_) => {}
                }
            } else if filter.value.is_some() {
                return Err(BuildError::UnexpectedValue {
                    column: filter.column.clone(),
                    op: filter.op,
                });
            }
        }

        if let Some(limit) = self.limit
            && !(1..=MAX_LIMIT).contains(&limit)
        {
            return Err(BuildError::InvalidLimit {
                got: limit,
                max: MAX_LIMIT,
            });
        }

        let (time_range, start_time, end_time) = self.validated_window()?;

        if let Some(granularity) = self.granularity {
            // Upstream accepts between 1000 and 10 buckets over the window.
            let window = effective_window_seconds(time_range, start_time, end_time);
            let min = window / 1000;
            let max = window / 10;
            if granularity < min || granularity > max {
                return Err(BuildError::InvalidGranularity {
                    got: granularity,
                    min,
                    max,
                });
            }
        }

        for order in &self.orders {
            if !self.order_target_exists(order) {
                let target = order
                    .op
                    .map(|op| op.as_str().to_owned())
                    .or_else(|| order.column.clone())
                    .unwrap_or_else(|| "<empty>".to_owned());
                return Err(BuildError::OrderTargetMissing { target });
            }
        }

        for having in &self.havings {
            let matched = self
                .calculations
                .iter()
                .any(|c| c.op == having.calculate_op && c.column == having.column);
            if !matched {
                return Err(BuildError::HavingTargetMissing {
                    op: having.calculate_op,
                });
            }
        }

        let filter_combination = match self.filter_combination {
            Some(c) => Some(c),
            None if self.filters.len() > 1 => Some(FilterCombination::And),
            None => None,
        };

        Ok(QuerySpec {
            time_range,
            start_time,
            end_time,
            granularity: self.granularity,
            calculations: self.calculations.clone(),
            filters: self.filters.clone(),
            filter_combination,
            breakdowns: self.breakdowns.clone(),
            orders: self.orders.clone(),
            limit: self.limit,
            havings: self.havings.clone(),
        })
    }

    /// Validate and freeze as a trigger query.
    ///
    /// On top of everything [`build`](Self::build) checks, trigger queries
    /// must carry exactly one calculation (and not HEATMAP/CONCURRENCY),
    /// stay within a one-hour relative window, and set no absolute window,
    /// orders, havings or limit — the upstream API rejects all of these, so
    /// failing here saves the round trip.
    ///
    /// # Errors
    ///
    /// Returns [`BuildError`] for any generic violation plus the trigger
    /// constraints above.
    pub fn build_for_trigger(&self) -> Result<TriggerQuerySpec, BuildError> {
        let spec = self.build()?;

        if spec.calculations.len() != 1 {
            return Err(BuildError::TriggerCalculationCount {
                got: spec.calculations.len(),
            });
        }
        let op = spec.calculations[0].op;
        if matches!(op, CalcOp::Heatmap | CalcOp::Concurrency) {
            return Err(BuildError::TriggerUnsupportedCalculation { op });
        }

        if spec.start_time.is_some() || spec.end_time.is_some() {
            return Err(BuildError::TriggerAbsoluteTime);
        }
        let time_range = spec.time_range.unwrap_or(DEFAULT_TIME_RANGE);
        if time_range > TRIGGER_MAX_TIME_RANGE {
            return Err(BuildError::TriggerTimeRangeTooLong {
                got: time_range,
                max: TRIGGER_MAX_TIME_RANGE,
            });
        }

        if !spec.orders.is_empty() {
            return Err(BuildError::TriggerUnsupportedField { field: "orders" });
        }
        if !spec.havings.is_empty() {
            return Err(BuildError::TriggerUnsupportedField { field: "havings" });
        }
        if spec.limit.is_some() {
            return Err(BuildError::TriggerUnsupportedField { field: "limit" });
        }

        Ok(TriggerQuerySpec(spec))
    }

    fn validated_window(&self) -> Result<(Option<u64>, Option<i64>, Option<i64>), BuildError> {
        match (self.time_range, self.start_time, self.end_time) {
            (Some(_), Some(_), Some(_)) => Err(BuildError::ConflictingTimeWindow),
            (_, Some(start), Some(end)) if start >= end => {
                Err(BuildError::InvalidAbsoluteWindow { start, end })
            }
            (None, None, None) => Ok((Some(DEFAULT_TIME_RANGE), None, None)),
            (time_range, start, end) => Ok((time_range, start, end)),
        }
    }

    fn order_target_exists(&self, order: &Order) -> bool {
        match order.op {
            Some(op) => self
                .calculations
                .iter()
                .any(|c| c.op == op && c.column == order.column),
            None => order
                .column
                .as_deref()
                .is_some_and(|col| self.breakdowns.iter().any(|b| b == col)),
        }
    }
}

/// Window length in seconds used for granularity bounds.
fn effective_window_seconds(
    time_range: Option<u64>,
    start_time: Option<i64>,
    end_time: Option<i64>,
) -> u64 {
    if let (Some(start), Some(end)) = (start_time, end_time) {
        end.saturating_sub(start).max(0).unsigned_abs()
    } else {
        time_range.unwrap_or(DEFAULT_TIME_RANGE)
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;
    use crate::filter::FilterOp;
    use serde_json::json;

    #[test]
    fn build_is_idempotent() {
        let builder = QueryBuilder::new()
            .count()
            .filter(Filter::gte("status_code", 500))
            .breakdown("service.name")
            .time_range(900);

        let first = builder.build().unwrap();
        let second = builder.build().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn default_window_applied_when_unset() {
        let spec = QueryBuilder::new().count().build().unwrap();
        assert_eq!(spec.time_range, Some(DEFAULT_TIME_RANGE));
    }

    #[test]
    fn missing_column_is_rejected() {
        let err = QueryBuilder::new()
            .calculation(Calculation {
                op: CalcOp::Avg,
                column: None,
            })
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::MissingColumn { op: CalcOp::Avg });
        assert_eq!(err.to_string(), "missing column for operation AVG");
    }

    #[test]
    fn empty_column_counts_as_missing() {
        let err = QueryBuilder::new().sum("").build().unwrap_err();
        assert_eq!(err, BuildError::MissingColumn { op: CalcOp::Sum });
    }

    #[test]
    fn exists_with_value_is_rejected() {
        let err = QueryBuilder::new()
            .count()
            .filter(Filter {
                column: "error".to_owned(),
                op: FilterOp::Exists,
                value: Some(json!(true)),
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::UnexpectedValue { .. }));
    }

    #[test]
    fn comparison_without_value_is_rejected() {
        let err = QueryBuilder::new()
            .count()
            .filter(Filter {
                column: "status_code".to_owned(),
                op: FilterOp::Gt,
                value: None,
            })
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::MissingValue { .. }));
    }

    #[test]
    fn empty_in_list_is_rejected() {
        let err = QueryBuilder::new()
            .count()
            .filter(Filter::is_in::<&str>("service.name", vec![]))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidValueList { .. }));
    }

    #[test]
    fn filter_combination_defaults_to_and_for_multiple_filters() {
        let spec = QueryBuilder::new()
            .count()
            .filter(Filter::exists("error"))
            .filter(Filter::gte("duration_ms", 100))
            .build()
            .unwrap();
        assert_eq!(spec.filter_combination, Some(FilterCombination::And));

        let single = QueryBuilder::new()
            .count()
            .filter(Filter::exists("error"))
            .build()
            .unwrap();
        assert_eq!(single.filter_combination, None);
    }

    #[test]
    fn explicit_or_combination_is_kept() {
        let spec = QueryBuilder::new()
            .count()
            .filter(Filter::exists("error"))
            .filter(Filter::gte("duration_ms", 100))
            .filter_combination(FilterCombination::Or)
            .build()
            .unwrap();
        assert_eq!(spec.filter_combination, Some(FilterCombination::Or));
    }

    #[test]
    fn limit_bounds_are_enforced() {
        assert!(matches!(
            QueryBuilder::new().count().limit(0).build(),
            Err(BuildError::InvalidLimit { got: 0, .. })
        ));
        assert!(matches!(
            QueryBuilder::new().count().limit(1001).build(),
            Err(BuildError::InvalidLimit { got: 1001, .. })
        ));
        assert!(QueryBuilder::new().count().limit(1000).build().is_ok());
    }

    #[test]
    fn granularity_bounds_follow_the_window() {
        // 3600s window: granularity must be within [3, 360].
        let ok = QueryBuilder::new()
            .count()
            .time_range(3600)
            .granularity(60)
            .build();
        assert!(ok.is_ok());

        let err = QueryBuilder::new()
            .count()
            .time_range(3600)
            .granularity(1000)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidGranularity { got: 1000, .. }));
    }

    #[test]
    fn conflicting_window_is_rejected() {
        let err = QueryBuilder::new()
            .count()
            .time_range(900)
            .absolute_window(1_700_000_000, 1_700_003_600)
            .build()
            .unwrap_err();
        assert_eq!(err, BuildError::ConflictingTimeWindow);
    }

    #[test]
    fn inverted_absolute_window_is_rejected() {
        let err = QueryBuilder::new()
            .count()
            .absolute_window(1_700_003_600, 1_700_000_000)
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::InvalidAbsoluteWindow { .. }));
    }

    #[test]
    fn order_must_reference_spec_member() {
        let avg = Calculation::new(CalcOp::Avg, "duration_ms");

        let err = QueryBuilder::new()
            .count()
            .order(Order::by_calculation(&avg, SortDir::Descending))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::OrderTargetMissing { .. }));

        let ok = QueryBuilder::new()
            .avg("duration_ms")
            .order(Order::by_calculation(&avg, SortDir::Descending))
            .build();
        assert!(ok.is_ok());

        let by_breakdown = QueryBuilder::new()
            .count()
            .breakdown("service.name")
            .order(Order::by_column("service.name", SortDir::Ascending))
            .build();
        assert!(by_breakdown.is_ok());
    }

    #[test]
    fn having_must_reference_calculation() {
        let p99 = Calculation::new(CalcOp::P99, "duration_ms");
        let err = QueryBuilder::new()
            .count()
            .having(Having::new(&p99, HavingOp::Gt, 250))
            .build()
            .unwrap_err();
        assert!(matches!(err, BuildError::HavingTargetMissing { .. }));

        let ok = QueryBuilder::new()
            .p99("duration_ms")
            .having(Having::new(&p99, HavingOp::Gt, 250))
            .build();
        assert!(ok.is_ok());
    }

    #[test]
    fn trigger_spec_happy_path() {
        let spec = QueryBuilder::new()
            .count()
            .filter(Filter::gte("status_code", 500))
            .time_range(900)
            .build_for_trigger()
            .unwrap();
        assert_eq!(spec.calculation().op, CalcOp::Count);
        assert_eq!(spec.time_range(), 900);
    }

    #[test]
    fn trigger_rejects_multiple_calculations() {
        let builder = QueryBuilder::new().count().avg("duration_ms").time_range(900);

        let err = builder.build_for_trigger().unwrap_err();
        assert_eq!(err, BuildError::TriggerCalculationCount { got: 2 });
        assert_eq!(err.to_string(), "exactly one calculation required, got 2");

        // The same builder is fine as a plain query.
        assert!(builder.build().is_ok());
    }

    #[test]
    fn trigger_rejects_long_window() {
        let builder = QueryBuilder::new().count().time_range(7200);
        let err = builder.build_for_trigger().unwrap_err();
        assert_eq!(
            err,
            BuildError::TriggerTimeRangeTooLong {
                got: 7200,
                max: TRIGGER_MAX_TIME_RANGE
            }
        );
        assert!(builder.build().is_ok());
    }

    #[test]
    fn trigger_rejects_absolute_window() {
        let err = QueryBuilder::new()
            .count()
            .absolute_window(1_700_000_000, 1_700_000_900)
            .build_for_trigger()
            .unwrap_err();
        assert_eq!(err, BuildError::TriggerAbsoluteTime);
    }

    #[test]
    fn trigger_rejects_heatmap_and_concurrency() {
        let err = QueryBuilder::new()
            .heatmap("duration_ms")
            .time_range(900)
            .build_for_trigger()
            .unwrap_err();
        assert!(matches!(err, BuildError::TriggerUnsupportedCalculation { .. }));

        let err = QueryBuilder::new()
            .concurrency()
            .time_range(900)
            .build_for_trigger()
            .unwrap_err();
        assert!(matches!(err, BuildError::TriggerUnsupportedCalculation { .. }));
    }

    #[test]
    fn trigger_rejects_orders_havings_and_limit() {
        let count = Calculation::count();

        let err = QueryBuilder::new()
            .count()
            .time_range(900)
            .order(Order::by_calculation(&count, SortDir::Descending))
            .build_for_trigger()
            .unwrap_err();
        assert_eq!(err, BuildError::TriggerUnsupportedField { field: "orders" });

        let err = QueryBuilder::new()
            .count()
            .time_range(900)
            .having(Having::new(&count, HavingOp::Gt, 10))
            .build_for_trigger()
            .unwrap_err();
        assert_eq!(err, BuildError::TriggerUnsupportedField { field: "havings" });

        let err = QueryBuilder::new()
            .count()
            .time_range(900)
            .limit(10)
            .build_for_trigger()
            .unwrap_err();
        assert_eq!(err, BuildError::TriggerUnsupportedField { field: "limit" });
    }

    #[test]
    fn spec_serializes_in_upstream_shape() {
        let spec = QueryBuilder::new()
            .avg("duration_ms")
            .filter(Filter::eq("service.name", "api"))
            .breakdown("endpoint")
            .time_range(3600)
            .limit(100)
            .build()
            .unwrap();

        let json = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            json,
            json!({
                "time_range": 3600,
                "calculations": [{"op": "AVG", "column": "duration_ms"}],
                "filters": [{"column": "service.name", "op": "=", "value": "api"}],
                "breakdowns": ["endpoint"],
                "limit": 100,
            })
        );
    }
}
