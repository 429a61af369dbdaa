//! pqv: windowed reads over Parquet datasets.
//!
//! This crate is the primary entrypoint for the pqv toolkit. It re-exports the
//! read engine and the normalized value model from the underlying `pqv-*`
//! crates, plus the text rendering used by the `pqv` binary.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use pqv::{CancellationToken, EngineHandle, RenderOptions, format_table};
//!
//! # fn main() -> pqv::Result<()> {
//! let mut handle = EngineHandle::open("warehouse/events")?;
//! let table = handle.read(&["id", "name"], 0, Some(20), &CancellationToken::new(), None)?;
//! print!("{}", format_table(&table, &RenderOptions::default()));
//! # Ok(())
//! # }
//! ```
//!
//! # Architecture
//!
//! - **Value model** (`pqv-types`): [`Value`], [`LogicalType`], [`Schema`],
//!   [`MaterializedTable`] and explicit rendering through [`RenderOptions`].
//! - **Engine** (`pqv-engine`): dataset resolution, projection, coercion,
//!   windowed and parallel materialization behind [`EngineHandle`].
//! - **Errors** (`pqv-result`): the unified [`Error`] type.

pub use pqv_engine::{
    CancellationToken, DEFAULT_BATCH_SIZE, DEFAULT_PARALLEL_COLUMN_THRESHOLD, Dataset,
    EngineHandle, EngineOptions, FieldCatalog, ProjectionPlan, ReadProgress, ReadWindow,
    SourceFile,
};
pub use pqv_result::{Error, Result, SkippedFile};
pub use pqv_types::{
    Decimal, Field, FieldOrigin, LogicalType, MaterializedTable, RenderOptions, ScalarKind,
    Schema, Value, fold_name,
};

/// Render `table` as tab-separated text: a header line of column names, then
/// one line per row. Nulls render as empty cells.
pub fn format_table(table: &MaterializedTable, render: &RenderOptions) -> String {
    let mut out = String::new();
    let header: Vec<&str> = table.columns().iter().map(|c| c.name.as_str()).collect();
    out.push_str(&header.join("\t"));
    out.push('\n');
    for row in table.rows() {
        let cells: Vec<String> = row.iter().map(|v| v.render(render)).collect();
        out.push_str(&cells.join("\t"));
        out.push('\n');
    }
    out
}

/// The footer line printed after a window, e.g. `rows 0 to 20 of 1200`.
pub fn window_summary(offset: u64, table: &MaterializedTable) -> String {
    let total = table.total_record_count();
    let start = offset.min(total);
    format!(
        "rows {start} to {} of {total}",
        start + table.num_rows() as u64
    )
}

/// One line per field: name, type and origin.
pub fn format_schema(schema: &Schema) -> String {
    let mut out = String::new();
    for field in schema.fields() {
        let origin = match field.origin() {
            FieldOrigin::Data => "data",
            FieldOrigin::Partition => "partition",
        };
        let nullable = if field.is_nullable() { "" } else { " not null" };
        out.push_str(&format!(
            "{}\t{}{nullable}\t{origin}\n",
            field.name(),
            field.data_type()
        ));
    }
    out
}
