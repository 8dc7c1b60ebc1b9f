//! Record predicates.

use std::fmt;
use std::sync::Arc;

use strata_common::types::Record;

/// A shareable predicate over records.
#[derive(Clone)]
pub struct Filter(Arc<dyn Fn(&Record) -> bool + Send + Sync>);

impl Filter {
    /// Wraps a closure.
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Record) -> bool + Send + Sync + 'static,
    {
        Self(Arc::new(predicate))
    }

    /// Matches every record.
    pub fn all() -> Self {
        Self::new(|_| true)
    }

    /// Matches records holding every column of `partial` with an equal
    /// value. An empty partial record matches everything.
    pub fn matching(partial: Record) -> Self {
        Self::new(move |record| {
            partial
                .iter()
                .all(|(column, value)| record.get(column) == Some(value))
        })
    }

    /// Evaluates the predicate.
    pub fn test(&self, record: &Record) -> bool {
        (self.0)(record)
    }

    /// Matches records accepted by both filters.
    #[must_use]
    pub fn and(self, other: Filter) -> Self {
        Self::new(move |record| self.test(record) && other.test(record))
    }
}

impl Default for Filter {
    fn default() -> Self {
        Self::all()
    }
}

impl fmt::Debug for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Filter(..)")
    }
}
