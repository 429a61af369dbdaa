//! Resolved field lists.
//!
//! A [`Schema`] may contain names that collide ignoring case; such datasets
//! still open and can be inspected. Only projecting the colliding names
//! together is rejected, and that check lives with the projection logic.

use std::fmt;

use rustc_hash::FxHashMap;

use crate::logical::LogicalType;

/// Where a field's values come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldOrigin {
    /// Stored in the row data of the files.
    Data,
    /// Derived from a `key=value` directory segment; constant per file.
    Partition,
}

/// A resolved field. Names keep their case; comparisons that need to ignore
/// case go through [`Field::folded_name`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Field {
    name: String,
    data_type: LogicalType,
    nullable: bool,
    ordinal: usize,
    origin: FieldOrigin,
}

impl Field {
    pub fn new(
        name: impl Into<String>,
        data_type: LogicalType,
        nullable: bool,
        ordinal: usize,
        origin: FieldOrigin,
    ) -> Self {
        Self {
            name: name.into(),
            data_type,
            nullable,
            ordinal,
            origin,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &LogicalType {
        &self.data_type
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// Position of the field in the resolved schema.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn origin(&self) -> FieldOrigin {
        self.origin
    }

    pub fn is_partition(&self) -> bool {
        self.origin == FieldOrigin::Partition
    }

    /// Case-folded key used for case-insensitive comparisons.
    pub fn folded_name(&self) -> String {
        fold_name(&self.name)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.data_type)?;
        if !self.nullable {
            f.write_str(" not null")?;
        }
        if self.is_partition() {
            f.write_str(" (partition)")?;
        }
        Ok(())
    }
}

/// Case-folded form of a column name.
pub fn fold_name(name: &str) -> String {
    name.to_lowercase()
}

/// Ordered sequence of resolved fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    fields: Vec<Field>,
}

impl Schema {
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn field(&self, idx: usize) -> Option<&Field> {
        self.fields.get(idx)
    }

    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(Field::name)
    }

    /// Exact (case-sensitive) lookup.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.name() == name)
    }

    /// Case-insensitive lookup. Returns every matching index, in schema order.
    pub fn indices_of_ci(&self, name: &str) -> Vec<usize> {
        let folded = fold_name(name);
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.folded_name() == folded)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Groups of fields whose names collide ignoring case.
    pub fn case_collisions(&self) -> Vec<Vec<&str>> {
        let mut groups: FxHashMap<String, Vec<&str>> = FxHashMap::default();
        let mut order = Vec::new();
        for field in &self.fields {
            let key = field.folded_name();
            if !groups.contains_key(&key) {
                order.push(key.clone());
            }
            groups.entry(key).or_default().push(field.name());
        }
        order
            .into_iter()
            .filter_map(|key| groups.remove(&key))
            .filter(|names| names.len() > 1)
            .collect()
    }

    /// Append a field, assigning it the next ordinal.
    pub fn push(
        &mut self,
        name: impl Into<String>,
        data_type: LogicalType,
        nullable: bool,
        origin: FieldOrigin,
    ) {
        let ordinal = self.fields.len();
        self.fields
            .push(Field::new(name, data_type, nullable, ordinal, origin));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logical::ScalarKind;

    fn sample() -> Schema {
        let mut schema = Schema::default();
        schema.push("Id", ScalarKind::Int64.into(), false, FieldOrigin::Data);
        schema.push("name", ScalarKind::Utf8.into(), true, FieldOrigin::Data);
        schema.push("NAME", ScalarKind::Utf8.into(), true, FieldOrigin::Data);
        schema.push("year", ScalarKind::Int64.into(), true, FieldOrigin::Partition);
        schema
    }

    #[test]
    fn ordinals_follow_insertion() {
        let schema = sample();
        let ordinals: Vec<_> = schema.fields().iter().map(Field::ordinal).collect();
        assert_eq!(ordinals, vec![0, 1, 2, 3]);
    }

    #[test]
    fn case_insensitive_lookup_finds_all_matches() {
        let schema = sample();
        assert_eq!(schema.indices_of_ci("Name"), vec![1, 2]);
        assert_eq!(schema.index_of("NAME"), Some(2));
        assert_eq!(schema.index_of("Name"), None);
    }

    #[test]
    fn collisions_are_reported_but_allowed() {
        let schema = sample();
        assert_eq!(schema.case_collisions(), vec![vec!["name", "NAME"]]);
        assert_eq!(schema.len(), 4);
    }

    #[test]
    fn display_marks_partition_fields() {
        let schema = sample();
        assert_eq!(schema.fields()[0].to_string(), "Id: int64 not null");
        assert_eq!(schema.fields()[3].to_string(), "year: int64 (partition)");
    }
}
