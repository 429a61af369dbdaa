//! Field catalog and projection plans.
//!
//! Name checks happen here, when a caller asks for a projection, and not when
//! the dataset is opened. A dataset whose columns collide ignoring case can be
//! opened and inspected; only projecting the colliding columns together fails.

use std::sync::Arc;

use pqv_result::{Error, Result};
use pqv_types::{Field, LogicalType, Schema, fold_name};
use rustc_hash::FxHashSet;

use crate::hint::DecodeHint;

/// Where a projected column's values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColumnSource {
    /// A top-level column of the files, by root index in the file schema.
    Data { root: usize, hint: DecodeHint },
    /// A directory-derived column, by index in the partition layout.
    Partition { index: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectedColumn {
    pub name: String,
    pub data_type: LogicalType,
    /// Ordinal of the field in the resolved schema.
    pub ordinal: usize,
    pub source: ColumnSource,
}

/// An ordered, validated selection of columns to materialize.
///
/// Column order is the caller's request order, not schema order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProjectionPlan {
    columns: Vec<ProjectedColumn>,
}

impl ProjectionPlan {
    pub(crate) fn new(columns: Vec<ProjectedColumn>) -> Self {
        Self { columns }
    }

    pub fn columns(&self) -> &[ProjectedColumn] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Root indices of the data columns to decode, sorted and deduplicated.
    pub(crate) fn data_roots(&self) -> Vec<usize> {
        let mut roots: Vec<usize> = self
            .columns
            .iter()
            .filter_map(|c| match c.source {
                ColumnSource::Data { root, .. } => Some(root),
                ColumnSource::Partition { .. } => None,
            })
            .collect();
        roots.sort_unstable();
        roots.dedup();
        roots
    }
}

/// Resolved fields of a dataset plus where each one is read from.
#[derive(Debug, Clone)]
pub struct FieldCatalog {
    schema: Arc<Schema>,
    sources: Vec<ColumnSource>,
}

impl FieldCatalog {
    pub(crate) fn new(schema: Schema, sources: Vec<ColumnSource>) -> Self {
        debug_assert_eq!(schema.len(), sources.len());
        Self {
            schema: Arc::new(schema),
            sources,
        }
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn fields(&self) -> &[Field] {
        self.schema.fields()
    }

    /// Whether a field of this type can be materialized: supported scalars,
    /// lists and maps of supported scalars, and structs.
    pub fn is_supported(data_type: &LogicalType) -> bool {
        match data_type {
            LogicalType::Scalar(kind) => kind.is_supported(),
            LogicalType::List(item) => item.is_supported_scalar(),
            LogicalType::Map(key, value) => key.is_supported_scalar() && value.is_supported_scalar(),
            LogicalType::Struct(_) => true,
        }
    }

    /// Names of every projectable field, in schema order.
    pub fn supported_fields(&self) -> Vec<&str> {
        self.schema
            .fields()
            .iter()
            .filter(|f| Self::is_supported(f.data_type()))
            .map(Field::name)
            .collect()
    }

    /// Resolve a requested name: an exact match wins, otherwise the name must
    /// match exactly one field ignoring case.
    pub fn resolve_name(&self, name: &str) -> Result<usize> {
        if let Some(idx) = self.schema.index_of(name) {
            return Ok(idx);
        }
        match self.schema.indices_of_ci(name).as_slice() {
            [idx] => Ok(*idx),
            [] => Err(Error::unsupported_selection(format!("unknown field '{name}'"))),
            _ => Err(Error::unsupported_selection(format!(
                "field name '{name}' is ambiguous"
            ))),
        }
    }

    /// Validate `requested` and build a plan in the requested order.
    pub fn project<S: AsRef<str>>(&self, requested: &[S]) -> Result<ProjectionPlan> {
        if requested.is_empty() {
            return Err(Error::unsupported_selection("no fields were requested"));
        }

        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut columns = Vec::with_capacity(requested.len());
        for name in requested {
            let name = name.as_ref();
            if !seen.insert(fold_name(name)) {
                return Err(Error::DuplicateProjectedColumn(name.to_string()));
            }
            let idx = self.resolve_name(name)?;
            let field = &self.schema.fields()[idx];
            if !Self::is_supported(field.data_type()) {
                return Err(Error::unsupported_selection(format!(
                    "field '{}' has unsupported type {}",
                    field.name(),
                    field.data_type()
                )));
            }
            columns.push(ProjectedColumn {
                name: field.name().to_string(),
                data_type: field.data_type().clone(),
                ordinal: field.ordinal(),
                source: self.sources[idx],
            });
        }
        Ok(ProjectionPlan::new(columns))
    }

    /// Plan over every supported field, in schema order.
    pub fn project_all(&self) -> Result<ProjectionPlan> {
        self.project(self.supported_fields().as_slice())
    }
}
