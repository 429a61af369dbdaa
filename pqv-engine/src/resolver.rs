//! Dataset resolution: discover the files behind a path, check that they share
//! one physical schema and derive the unified field list.

use std::fs;
use std::path::{Path, PathBuf};

use arrow::datatypes::DataType;
use parquet::schema::types::{Type, TypePtr};
use pqv_result::{Error, Result, SkippedFile};
use pqv_types::{FieldOrigin, Schema};

use crate::catalog::{ColumnSource, FieldCatalog};
use crate::coercion::logical_type_for;
use crate::hint::{DecodeHint, derive_hints};
use crate::options::EngineOptions;
use crate::partition::{PartitionColumn, PartitionLayout};
use crate::source::{self, SourceFile};

/// A top-level column stored in the files.
#[derive(Debug, Clone, PartialEq)]
pub struct DataColumn {
    pub name: String,
    pub arrow_type: DataType,
    pub nullable: bool,
    pub hint: DecodeHint,
}

/// An opened dataset's immutable metadata, shared by every clone of a handle.
#[derive(Debug)]
pub struct Dataset {
    root: PathBuf,
    is_directory: bool,
    files: Vec<SourceFile>,
    data_columns: Vec<DataColumn>,
    partition_columns: Vec<PartitionColumn>,
    skipped: Vec<SkippedFile>,
    record_count: u64,
}

impl Dataset {
    /// The path the dataset was opened from.
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// Readable files in discovery order.
    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn data_columns(&self) -> &[DataColumn] {
        &self.data_columns
    }

    pub fn partition_columns(&self) -> &[PartitionColumn] {
        &self.partition_columns
    }

    pub fn skipped(&self) -> &[SkippedFile] {
        &self.skipped
    }

    /// Sum of the row counts of every readable file.
    pub fn record_count(&self) -> u64 {
        self.record_count
    }

    pub fn row_group_count(&self) -> usize {
        self.files.iter().map(SourceFile::row_group_count).sum()
    }

    /// Catalog of the dataset's fields as they decode under the given datetime
    /// flag: data columns in file order, then partition columns.
    pub fn catalog(&self, fix_malformed_datetime: bool) -> FieldCatalog {
        let mut schema = Schema::default();
        let mut sources = Vec::with_capacity(self.data_columns.len() + self.partition_columns.len());
        for (root, col) in self.data_columns.iter().enumerate() {
            let hint = col.hint.effective(fix_malformed_datetime);
            schema.push(
                col.name.clone(),
                logical_type_for(&col.arrow_type, hint),
                col.nullable,
                FieldOrigin::Data,
            );
            sources.push(ColumnSource::Data { root, hint });
        }
        for (index, col) in self.partition_columns.iter().enumerate() {
            schema.push(
                col.name.clone(),
                col.kind.clone().into(),
                true,
                FieldOrigin::Partition,
            );
            sources.push(ColumnSource::Partition { index });
        }
        FieldCatalog::new(schema, sources)
    }
}

fn root_fields(ty: &Type) -> &[TypePtr] {
    match ty {
        Type::GroupType { fields, .. } => fields,
        Type::PrimitiveType { .. } => &[],
    }
}

/// Describe the first difference between two root schemas.
fn describe_difference(reference: &Type, other: &Type) -> String {
    let a = root_fields(reference);
    let b = root_fields(other);
    for idx in 0..a.len().max(b.len()) {
        match (a.get(idx), b.get(idx)) {
            (Some(x), Some(y)) if x != y => {
                return if x.name() == y.name() {
                    format!("column '{}' has a different type", x.name())
                } else {
                    format!("column {idx} is '{}' instead of '{}'", y.name(), x.name())
                };
            }
            (Some(x), None) => return format!("column '{}' is missing", x.name()),
            (None, Some(y)) => return format!("unexpected column '{}'", y.name()),
            _ => {}
        }
    }
    "schema metadata differs".to_string()
}

/// Resolve `path` (a file or a directory) into a [`Dataset`].
pub fn resolve(path: &Path, options: &EngineOptions) -> Result<Dataset> {
    let is_directory = fs::metadata(path)?.is_dir();
    let root = path.to_path_buf();
    let (candidates, mut skipped) = if is_directory {
        let found = source::discover(path, options.recursive)?;
        (found.files, found.skipped)
    } else {
        (vec![root.clone()], Vec::new())
    };
    if candidates.is_empty() && skipped.is_empty() {
        return Err(Error::EmptyDataset(root));
    }

    let mut loaded = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        match source::load_metadata(&candidate) {
            Ok(meta) => loaded.push((candidate, meta)),
            Err(e) if !is_directory => return Err(e),
            Err(e) => {
                tracing::warn!(
                    path = %candidate.display(),
                    "skipping unreadable file: {e}"
                );
                skipped.push(SkippedFile {
                    path: candidate,
                    reason: e.to_string(),
                });
            }
        }
    }
    if loaded.is_empty() {
        return Err(Error::AllSourcesUnreadable { skipped });
    }

    let (first_path, first_meta) = &loaded[0];
    let reference = first_meta.metadata().file_metadata().schema();
    for (path, meta) in loaded.iter().skip(1) {
        let other = meta.metadata().file_metadata().schema();
        if other != reference {
            return Err(Error::SchemaConflict {
                first: first_path.clone(),
                conflicting: path.clone(),
                detail: describe_difference(reference, other),
            });
        }
    }

    let arrow_schema = first_meta.schema();
    let hints = derive_hints(
        root_fields(reference),
        arrow_schema.fields(),
        first_meta.metadata().file_metadata().key_value_metadata(),
    );
    let data_columns: Vec<DataColumn> = arrow_schema
        .fields()
        .iter()
        .enumerate()
        .map(|(idx, field)| DataColumn {
            name: field.name().clone(),
            arrow_type: field.data_type().clone(),
            nullable: field.is_nullable(),
            hint: hints.get(idx).copied().unwrap_or_default(),
        })
        .collect();

    let relative: Vec<PathBuf> = loaded
        .iter()
        .map(|(path, _)| {
            if is_directory {
                path.strip_prefix(&root).unwrap_or(path).to_path_buf()
            } else {
                PathBuf::from(path.file_name().unwrap_or(path.as_os_str()))
            }
        })
        .collect();
    let data_names: Vec<&str> = data_columns.iter().map(|c| c.name.as_str()).collect();
    let (partition_columns, partition_values) =
        PartitionLayout::infer(&root, &relative, &data_names)?.into_values();

    let files: Vec<SourceFile> = loaded
        .into_iter()
        .zip(relative)
        .enumerate()
        .map(|(idx, ((path, meta), rel))| {
            let values = partition_values.get(idx).cloned().unwrap_or_default();
            SourceFile::new(path, rel, meta, values)
        })
        .collect();
    let record_count: u64 = files.iter().map(SourceFile::row_count).sum();

    tracing::debug!(
        root = %root.display(),
        files = files.len(),
        skipped = skipped.len(),
        columns = data_columns.len(),
        partitions = partition_columns.len(),
        record_count,
        "resolved dataset"
    );

    Ok(Dataset {
        root,
        is_directory,
        files,
        data_columns,
        partition_columns,
        skipped,
        record_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use parquet::basic::Type as PhysicalType;
    use std::sync::Arc;

    fn group(fields: Vec<Type>) -> Type {
        Type::group_type_builder("schema")
            .with_fields(fields.into_iter().map(Arc::new).collect())
            .build()
            .unwrap()
    }

    fn int(name: &str, physical: PhysicalType) -> Type {
        Type::primitive_type_builder(name, physical).build().unwrap()
    }

    #[test]
    fn differences_are_described() {
        let a = group(vec![int("id", PhysicalType::INT64), int("v", PhysicalType::INT32)]);
        let retyped = group(vec![int("id", PhysicalType::INT64), int("v", PhysicalType::INT64)]);
        let renamed = group(vec![int("id", PhysicalType::INT64), int("w", PhysicalType::INT32)]);
        let shorter = group(vec![int("id", PhysicalType::INT64)]);

        assert_eq!(describe_difference(&a, &retyped), "column 'v' has a different type");
        assert_eq!(describe_difference(&a, &renamed), "column 1 is 'w' instead of 'v'");
        assert_eq!(describe_difference(&a, &shorter), "column 'v' is missing");
    }

    #[test]
    fn empty_directory_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("_SUCCESS"), b"").unwrap();
        let err = resolve(dir.path(), &EngineOptions::default()).unwrap_err();
        assert!(matches!(err, Error::EmptyDataset(_)));
    }

    #[test]
    fn unreadable_directory_files_are_all_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.parquet"), b"not parquet").unwrap();
        std::fs::write(dir.path().join("b.parquet"), b"").unwrap();
        match resolve(dir.path(), &EngineOptions::default()).unwrap_err() {
            Error::AllSourcesUnreadable { skipped } => assert_eq!(skipped.len(), 2),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn discovery_skips_are_reported() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(OsStr::from_bytes(b"x-\xfe.parquet")), b"").unwrap();
        std::fs::write(dir.path().join("a.parquet"), b"not parquet").unwrap();
        match resolve(dir.path(), &EngineOptions::default()).unwrap_err() {
            Error::AllSourcesUnreadable { skipped } => {
                assert_eq!(skipped.len(), 2);
                assert_eq!(skipped[0].reason, "file name is not valid UTF-8");
                assert_eq!(skipped[1].path, dir.path().join("a.parquet"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn unreadable_single_file_reports_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.parquet");
        std::fs::write(&path, b"not parquet").unwrap();
        assert!(matches!(
            resolve(&path, &EngineOptions::default()),
            Err(Error::Parquet(_))
        ));
    }
}
