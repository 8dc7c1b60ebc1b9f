//! Records: open maps from column name to value.

use std::collections::BTreeMap;

use super::Value;

/// A single table row. Columns not present in the map are unset, which is
/// distinct from being set to [`Value::Null`].
pub type Record = BTreeMap<String, Value>;

/// Convenience operations on [`Record`].
pub trait RecordExt {
    /// Returns true if the column is unset or null.
    fn is_null_or_unset(&self, column: &str) -> bool;

    /// Returns a copy with every column of `patch` written over this record.
    #[must_use]
    fn merged(&self, patch: &Record) -> Record;

    /// Converts the record into a JSON object.
    fn to_json(&self) -> serde_json::Value;
}

impl RecordExt for Record {
    fn is_null_or_unset(&self, column: &str) -> bool {
        self.get(column).map_or(true, Value::is_null)
    }

    fn merged(&self, patch: &Record) -> Record {
        let mut out = self.clone();
        for (column, value) in patch {
            out.insert(column.clone(), value.clone());
        }
        out
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

/// Builds a [`Record`] from `column => value` pairs.
///
/// ```rust
/// use strata_common::{record, Value};
///
/// let r = record! { "name" => "Alice", "age" => 30 };
/// assert_eq!(r.get("age"), Some(&Value::Number(30.0)));
/// ```
#[macro_export]
macro_rules! record {
    () => {
        $crate::types::Record::new()
    };
    ($($column:expr => $value:expr),+ $(,)?) => {{
        let mut record = $crate::types::Record::new();
        $(
            record.insert(::std::string::String::from($column), $crate::types::Value::from($value));
        )+
        record
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_null_or_unset() {
        let r = record! { "a" => Value::Null, "b" => 1 };
        assert!(r.is_null_or_unset("a"));
        assert!(r.is_null_or_unset("missing"));
        assert!(!r.is_null_or_unset("b"));
    }

    #[test]
    fn test_merged() {
        let base = record! { "name" => "Alice", "age" => 30 };
        let patch = record! { "age" => 31, "city" => "Paris" };
        let out = base.merged(&patch);
        assert_eq!(out.get("name"), Some(&Value::string("Alice")));
        assert_eq!(out.get("age"), Some(&Value::number(31)));
        assert_eq!(out.get("city"), Some(&Value::string("Paris")));
        assert_eq!(base.get("age"), Some(&Value::number(30)));
    }

    #[test]
    fn test_to_json() {
        let r = record! { "id" => 1, "name" => "x" };
        assert_eq!(r.to_json(), serde_json::json!({ "id": 1, "name": "x" }));
    }
}
