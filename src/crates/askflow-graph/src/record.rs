//! Materialized query rows.
//!
//! A [`Record`] is one fully-decoded result row: ordered columns plus their
//! values. The gateway always materializes result sequences before handing
//! them to callers — live cursors never escape a store session.

use crate::value::GraphValue;
use std::collections::BTreeMap;

/// One materialized result row.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    columns: Vec<String>,
    values: Vec<GraphValue>,
}

impl Record {
    /// Build a record from parallel column/value lists.
    ///
    /// Callers must pass equal-length lists; the constructor truncates to the
    /// shorter side rather than panic.
    pub fn new(columns: Vec<String>, mut values: Vec<GraphValue>) -> Self {
        values.truncate(columns.len());
        let mut columns = columns;
        columns.truncate(values.len());
        Record { columns, values }
    }

    /// Build a record from `(column, value)` pairs, preserving order.
    pub fn from_pairs<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, GraphValue)>,
    {
        let (columns, values) = pairs.into_iter().unzip();
        Record { columns, values }
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Value of the named column, if present.
    pub fn get(&self, column: &str) -> Option<&GraphValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|i| &self.values[i])
    }

    /// Value of the first column, if any.
    pub fn first(&self) -> Option<&GraphValue> {
        self.values.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &GraphValue)> {
        self.columns.iter().zip(self.values.iter())
    }

    /// Single-value extraction: a one-column record extracts to that value;
    /// a record with a `value` column extracts to it; anything else extracts
    /// to the full column map.
    pub fn extract(&self) -> GraphValue {
        if self.len() == 1 {
            return self.values[0].clone();
        }
        if let Some(v) = self.get("value") {
            return v.clone();
        }
        GraphValue::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect::<BTreeMap<_, _>>(),
        )
    }
}
