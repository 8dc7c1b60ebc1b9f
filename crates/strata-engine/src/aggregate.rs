//! Aggregation over filtered rows.

use std::collections::BTreeMap;
use std::fmt;

use strata_common::error::{StrataError, StrataResult};
use strata_common::types::Value;

use crate::query::{filter_rows, QueryDescriptor};
use crate::schema::Schema;
use crate::state::DatabaseState;

/// Aggregate function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunc {
    /// Number of rows.
    Count,
    /// Total of numeric values.
    Sum,
    /// Mean of numeric values.
    Avg,
    /// Smallest numeric value.
    Min,
    /// Largest numeric value.
    Max,
}

impl fmt::Display for AggregateFunc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AggregateFunc::Count => "count",
            AggregateFunc::Sum => "sum",
            AggregateFunc::Avg => "avg",
            AggregateFunc::Min => "min",
            AggregateFunc::Max => "max",
        };
        f.write_str(name)
    }
}

/// One requested aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Aggregation {
    /// The function.
    pub func: AggregateFunc,
    /// Target column; required for everything but `Count`.
    pub column: Option<String>,
}

impl Aggregation {
    /// Counts rows.
    pub fn count() -> Self {
        Self {
            func: AggregateFunc::Count,
            column: None,
        }
    }

    /// Sums a column.
    pub fn sum(column: impl Into<String>) -> Self {
        Self::over(AggregateFunc::Sum, column)
    }

    /// Averages a column.
    pub fn avg(column: impl Into<String>) -> Self {
        Self::over(AggregateFunc::Avg, column)
    }

    /// Minimum of a column.
    pub fn min(column: impl Into<String>) -> Self {
        Self::over(AggregateFunc::Min, column)
    }

    /// Maximum of a column.
    pub fn max(column: impl Into<String>) -> Self {
        Self::over(AggregateFunc::Max, column)
    }

    fn over(func: AggregateFunc, column: impl Into<String>) -> Self {
        Self {
            func,
            column: Some(column.into()),
        }
    }
}

/// Running state of one aggregation.
#[derive(Debug, Clone)]
struct Accumulator {
    state: AccumulatorState,
}

#[derive(Debug, Clone)]
enum AccumulatorState {
    Count(usize),
    Sum(f64),
    Avg { sum: f64, count: usize },
    Min(Option<f64>),
    Max(Option<f64>),
}

impl Accumulator {
    fn new(func: AggregateFunc) -> Self {
        let state = match func {
            AggregateFunc::Count => AccumulatorState::Count(0),
            AggregateFunc::Sum => AccumulatorState::Sum(0.0),
            AggregateFunc::Avg => AccumulatorState::Avg { sum: 0.0, count: 0 },
            AggregateFunc::Min => AccumulatorState::Min(None),
            AggregateFunc::Max => AccumulatorState::Max(None),
        };
        Self { state }
    }

    /// Feeds one row's value. Non-numeric values are skipped except by
    /// `Count`, which counts rows.
    fn accumulate(&mut self, value: Option<&Value>) {
        if let AccumulatorState::Count(count) = &mut self.state {
            *count += 1;
            return;
        }
        let Some(v) = value.and_then(Value::as_f64) else {
            return;
        };

        match &mut self.state {
            AccumulatorState::Count(_) => {}
            AccumulatorState::Sum(sum) => *sum += v,
            AccumulatorState::Avg { sum, count } => {
                *sum += v;
                *count += 1;
            }
            AccumulatorState::Min(min) => *min = Some(min.map_or(v, |m| m.min(v))),
            AccumulatorState::Max(max) => *max = Some(max.map_or(v, |m| m.max(v))),
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn result(&self) -> Option<f64> {
        match &self.state {
            AccumulatorState::Count(count) => Some(*count as f64),
            AccumulatorState::Sum(sum) => Some(*sum),
            AccumulatorState::Avg { sum, count } => {
                if *count == 0 {
                    None
                } else {
                    Some(*sum / *count as f64)
                }
            }
            AccumulatorState::Min(min) => *min,
            AccumulatorState::Max(max) => *max,
        }
    }
}

/// Computes aggregations over the rows a query would filter.
///
/// Only the descriptor's table, filter and `with_deleted` flag are used.
/// Returns one entry per output key; `None` stands for null (the average,
/// minimum or maximum of no numbers). The sum of no numbers is `0`.
pub fn aggregate(
    state: &DatabaseState,
    schema: &Schema,
    descriptor: &QueryDescriptor,
    aggregations: &[(String, Aggregation)],
) -> StrataResult<BTreeMap<String, Option<f64>>> {
    let mut accumulators = Vec::with_capacity(aggregations.len());
    for (key, agg) in aggregations {
        if agg.func != AggregateFunc::Count && agg.column.is_none() {
            return Err(StrataError::AggregationColumnMissing {
                aggregation: agg.func.to_string(),
            });
        }
        accumulators.push((key, agg.column.as_deref(), Accumulator::new(agg.func)));
    }

    let rows = filter_rows(
        state,
        schema,
        &descriptor.table,
        descriptor.filter.as_ref(),
        descriptor.with_deleted,
    );

    for row in &rows {
        for (_, column, acc) in &mut accumulators {
            acc.accumulate(column.and_then(|c| row.get(c)));
        }
    }

    Ok(accumulators
        .into_iter()
        .map(|(key, _, acc)| (key.clone(), acc.result()))
        .collect())
}
