//! Row-major result of a windowed read.

use crate::logical::LogicalType;
use crate::value::Value;

/// Header of one materialized column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Column {
    pub name: String,
    pub data_type: LogicalType,
}

impl Column {
    pub fn new(name: impl Into<String>, data_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered columns, ordered rows, and the dataset's total record count.
///
/// `total_record_count` describes the whole dataset, not the window, so it is
/// usually larger than `rows().len()`.
#[derive(Debug, Clone, PartialEq)]
pub struct MaterializedTable {
    columns: Vec<Column>,
    rows: Vec<Vec<Value>>,
    total_record_count: u64,
}

impl MaterializedTable {
    pub fn new(columns: Vec<Column>, rows: Vec<Vec<Value>>, total_record_count: u64) -> Self {
        debug_assert!(rows.iter().all(|r| r.len() == columns.len()));
        Self {
            columns,
            rows,
            total_record_count,
        }
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn into_parts(self) -> (Vec<Column>, Vec<Vec<Value>>, u64) {
        (self.columns, self.rows, self.total_record_count)
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn total_record_count(&self) -> u64 {
        self.total_record_count
    }

    pub fn row(&self, idx: usize) -> Option<&[Value]> {
        self.rows.get(idx).map(Vec::as_slice)
    }

    /// Exact (case-sensitive) column lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn cell(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Cell lookup by column name.
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        self.column_index(column).and_then(|col| self.cell(row, col))
    }

    /// Iterate over one column's values, top to bottom.
    pub fn column_values(&self, col: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().filter_map(move |r| r.get(col))
    }
}
