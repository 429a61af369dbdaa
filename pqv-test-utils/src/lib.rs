//! Shared helpers for pqv tests: tracing setup and Parquet fixtures written
//! at test time, so no binary data is checked in.

use std::fs::{self, File};
use std::path::Path;
use std::sync::{Arc, Once};

use arrow::array::{ArrayRef, BooleanArray, Int64Array, StringArray};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;
use parquet::errors::Result as ParquetResult;
use parquet::file::metadata::KeyValue;
use parquet::file::properties::WriterProperties;

static INIT: Once = Once::new();

/// Initialize tracing for test binaries. Safe to call multiple times.
pub fn init_tracing_for_tests() {
    INIT.call_once(|| {
        use tracing_subscriber::filter::EnvFilter;
        use tracing_subscriber::fmt;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let _ = fmt()
            .with_env_filter(filter)
            .with_target(false)
            .with_test_writer()
            .try_init();
    });
}

/// Writer settings for a fixture file.
#[derive(Debug, Clone, Default)]
pub struct FixtureOptions {
    /// Rows per row group; `None` keeps the writer default.
    pub max_row_group_size: Option<usize>,
    pub key_value_metadata: Vec<KeyValue>,
}

impl FixtureOptions {
    pub fn with_row_group_size(mut self, rows: usize) -> Self {
        self.max_row_group_size = Some(rows);
        self
    }

    pub fn with_metadata(mut self, kv: KeyValue) -> Self {
        self.key_value_metadata.push(kv);
        self
    }

    fn properties(&self) -> WriterProperties {
        let mut builder = WriterProperties::builder();
        if let Some(rows) = self.max_row_group_size {
            builder = builder.set_max_row_group_size(rows);
        }
        if !self.key_value_metadata.is_empty() {
            builder = builder.set_key_value_metadata(Some(self.key_value_metadata.clone()));
        }
        builder.build()
    }
}

/// Write `batches` (which must share one schema) to `path`, creating parent
/// directories as needed.
pub fn write_parquet_with(
    path: &Path,
    batches: &[RecordBatch],
    options: &FixtureOptions,
) -> ParquetResult<()> {
    let Some(first) = batches.first() else {
        return Ok(());
    };
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, first.schema(), Some(options.properties()))?;
    for batch in batches {
        writer.write(batch)?;
    }
    writer.close()?;
    Ok(())
}

pub fn write_parquet(path: &Path, batch: &RecordBatch) -> ParquetResult<()> {
    write_parquet_with(path, std::slice::from_ref(batch), &FixtureOptions::default())
}

/// pandas writer metadata declaring `(column, numpy unit)` pairs as
/// `datetime` columns, e.g. `("created", "ms")`.
pub fn pandas_datetime_metadata(columns: &[(&str, &str)]) -> KeyValue {
    let columns: Vec<serde_json::Value> = columns
        .iter()
        .map(|(name, unit)| {
            serde_json::json!({
                "name": name,
                "field_name": name,
                "pandas_type": "datetime",
                "numpy_type": format!("datetime64[{unit}]"),
                "metadata": null,
            })
        })
        .collect();
    let doc = serde_json::json!({
        "index_columns": [],
        "columns": columns,
        "pandas_version": "1.5.3",
    });
    KeyValue::new("pandas".to_string(), doc.to_string())
}

/// Rows `start..start + len` of a small three-column table:
/// `id: Int64`, `name: Utf8` (`"row-<id>"`) and `flag: Boolean`, where every
/// seventh flag is null.
pub fn sequence_batch(start: i64, len: usize) -> RecordBatch {
    let ids: Vec<i64> = (start..start + len as i64).collect();
    let names: Vec<String> = ids.iter().map(|id| format!("row-{id}")).collect();
    let flags: Vec<Option<bool>> = ids
        .iter()
        .map(|id| (id % 7 != 0).then_some(id % 2 == 0))
        .collect();
    let schema = Arc::new(Schema::new(vec![
        Field::new("id", DataType::Int64, false),
        Field::new("name", DataType::Utf8, false),
        Field::new("flag", DataType::Boolean, true),
    ]));
    let columns: Vec<ArrayRef> = vec![
        Arc::new(Int64Array::from(ids)),
        Arc::new(StringArray::from(names)),
        Arc::new(BooleanArray::from(flags)),
    ];
    RecordBatch::try_new(schema, columns).unwrap_or_else(|e| panic!("sequence batch: {e}"))
}

/// `num_columns` Int64 columns named `c0000`, `c0001`, ...; the cell of row
/// `r` and column `c` holds `(first_row + r) * 10_000 + c`.
pub fn wide_batch(num_columns: usize, first_row: i64, rows: usize) -> RecordBatch {
    let fields: Vec<Field> = (0..num_columns)
        .map(|c| Field::new(format!("c{c:04}"), DataType::Int64, false))
        .collect();
    let columns: Vec<ArrayRef> = (0..num_columns)
        .map(|c| {
            let values: Vec<i64> = (0..rows as i64)
                .map(|r| (first_row + r) * 10_000 + c as i64)
                .collect();
            Arc::new(Int64Array::from(values)) as ArrayRef
        })
        .collect();
    RecordBatch::try_new(Arc::new(Schema::new(fields)), columns)
        .unwrap_or_else(|e| panic!("wide batch: {e}"))
}

/// Column names of [`wide_batch`].
pub fn wide_column_names(num_columns: usize) -> Vec<String> {
    (0..num_columns).map(|c| format!("c{c:04}")).collect()
}
