//! Windowed row materialization.
//!
//! Row order is file discovery order, then physical row order inside each
//! file. Row groups outside the window are never decoded.

use std::fs::File;

use arrow::record_batch::RecordBatch;
use parquet::arrow::ProjectionMask;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use pqv_result::{Error, Result};
use pqv_types::{Column, MaterializedTable, Value};

use crate::cancel::{CancellationToken, ReadProgress};
use crate::catalog::{ColumnSource, ProjectionPlan};
use crate::coercion::decode_column;
use crate::resolver::Dataset;
use crate::source::SourceFile;

/// Rows `[offset, offset + count)` of a dataset. `count: None` reads to the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReadWindow {
    pub offset: u64,
    pub count: Option<u64>,
}

impl ReadWindow {
    pub fn new(offset: u64, count: Option<u64>) -> Self {
        Self { offset, count }
    }

    /// Every row of the dataset.
    pub fn all() -> Self {
        Self::default()
    }

    /// Half-open row range of this window within a dataset of `total` rows.
    pub fn bounds(&self, total: u64) -> (u64, u64) {
        let start = self.offset.min(total);
        let end = match self.count {
            Some(count) => start.saturating_add(count).min(total),
            None => total,
        };
        (start, end)
    }

    pub fn len(&self, total: u64) -> u64 {
        let (start, end) = self.bounds(total);
        end - start
    }
}

/// Per-read state shared by every file and row group.
struct ReadContext<'a> {
    plan: &'a ProjectionPlan,
    /// Sorted root indices passed to the Parquet projection mask.
    roots: Vec<usize>,
    /// For each plan column, its position in decoded batches (data columns only).
    positions: Vec<Option<usize>>,
    batch_size: usize,
    cancel: &'a CancellationToken,
    progress: Option<&'a ReadProgress>,
}

impl<'a> ReadContext<'a> {
    fn new(
        plan: &'a ProjectionPlan,
        batch_size: usize,
        cancel: &'a CancellationToken,
        progress: Option<&'a ReadProgress>,
    ) -> Self {
        let roots = plan.data_roots();
        let positions = plan
            .columns()
            .iter()
            .map(|c| match c.source {
                ColumnSource::Data { root, .. } => roots.binary_search(&root).ok(),
                ColumnSource::Partition { .. } => None,
            })
            .collect();
        Self {
            plan,
            roots,
            positions,
            batch_size: batch_size.max(1),
            cancel,
            progress,
        }
    }

    fn report(&self, rows: usize) {
        if let Some(progress) = self.progress {
            progress.add(rows as u64 * self.plan.len() as u64);
        }
    }
}

/// Materialize `window` of `plan` from the dataset's files.
///
/// `files` holds one open descriptor per entry of `dataset.files()`.
pub(crate) fn materialize(
    dataset: &Dataset,
    files: &[File],
    plan: &ProjectionPlan,
    window: ReadWindow,
    batch_size: usize,
    cancel: &CancellationToken,
    progress: Option<&ReadProgress>,
) -> Result<MaterializedTable> {
    cancel.check()?;
    if plan.is_empty() {
        return Err(Error::unsupported_selection("no fields were requested"));
    }
    if !dataset.root().exists() {
        return Err(Error::SourceVanished(dataset.root().to_path_buf()));
    }

    let total = dataset.record_count();
    let (start, end) = window.bounds(total);
    let ctx = ReadContext::new(plan, batch_size, cancel, progress);
    let columns: Vec<Column> = plan
        .columns()
        .iter()
        .map(|c| Column::new(c.name.clone(), c.data_type.clone()))
        .collect();

    let mut rows: Vec<Vec<Value>> = Vec::with_capacity((end - start).min(1 << 20) as usize);
    let mut file_start = 0u64;
    for (source, file) in dataset.files().iter().zip(files) {
        if start == end {
            break;
        }
        let file_end = file_start + source.row_count();
        if file_end <= start {
            file_start = file_end;
            continue;
        }
        if file_start >= end {
            break;
        }
        cancel.check()?;
        if !source.path().exists() {
            return Err(Error::SourceVanished(source.path().to_path_buf()));
        }
        let local_start = start.max(file_start) - file_start;
        let local_end = end.min(file_end) - file_start;
        read_file(&ctx, source, file, local_start, local_end, &mut rows)?;
        file_start = file_end;
    }

    tracing::debug!(
        start,
        end,
        columns = plan.len(),
        rows = rows.len(),
        "materialized window"
    );
    Ok(MaterializedTable::new(columns, rows, total))
}

fn read_file(
    ctx: &ReadContext<'_>,
    source: &SourceFile,
    file: &File,
    local_start: u64,
    local_end: u64,
    rows: &mut Vec<Vec<Value>>,
) -> Result<()> {
    if ctx.roots.is_empty() {
        // Only partition columns: nothing to decode.
        let n = (local_end - local_start) as usize;
        append_constant_rows(ctx, source, n, rows);
        ctx.report(n);
        return Ok(());
    }

    let mut rg_start = 0u64;
    for (rg, &rg_rows) in source.row_group_rows().iter().enumerate() {
        let rg_end = rg_start + rg_rows;
        if rg_end <= local_start {
            rg_start = rg_end;
            continue;
        }
        if rg_start >= local_end {
            break;
        }
        ctx.cancel.check()?;
        let skip = local_start.saturating_sub(rg_start);
        let take = local_end.min(rg_end) - rg_start - skip;
        tracing::trace!(
            file = %source.path().display(),
            row_group = rg,
            skip,
            take,
            "decoding row group"
        );
        read_row_group(ctx, source, file, rg, skip as usize, take as usize, rows)?;
        rg_start = rg_end;
    }
    Ok(())
}

fn read_row_group(
    ctx: &ReadContext<'_>,
    source: &SourceFile,
    file: &File,
    row_group: usize,
    skip: usize,
    take: usize,
    rows: &mut Vec<Vec<Value>>,
) -> Result<()> {
    let builder =
        ParquetRecordBatchReaderBuilder::new_with_metadata(file.try_clone()?, source.metadata().clone());
    let mask = ProjectionMask::roots(builder.parquet_schema(), ctx.roots.iter().copied());
    let reader = builder
        .with_row_groups(vec![row_group])
        .with_projection(mask)
        .with_offset(skip)
        .with_limit(take)
        .with_batch_size(ctx.batch_size)
        .build()?;

    for batch in reader {
        ctx.cancel.check()?;
        let batch = batch?;
        append_batch(ctx, source, &batch, rows)?;
        ctx.report(batch.num_rows());
    }
    Ok(())
}

fn append_batch(
    ctx: &ReadContext<'_>,
    source: &SourceFile,
    batch: &RecordBatch,
    rows: &mut Vec<Vec<Value>>,
) -> Result<()> {
    let n = batch.num_rows();
    let mut decoded = Vec::with_capacity(ctx.plan.len());
    for (col, position) in ctx.plan.columns().iter().zip(&ctx.positions) {
        let values = match (col.source, position) {
            (ColumnSource::Data { hint, .. }, Some(pos)) => decode_column(batch.column(*pos), hint)?,
            (ColumnSource::Partition { index }, _) => {
                vec![partition_value(source, index); n]
            }
            (ColumnSource::Data { root, .. }, None) => {
                return Err(Error::Internal(format!(
                    "column {root} is missing from the decoded batch"
                )));
            }
        };
        decoded.push(values.into_iter());
    }
    rows.extend((0..n).map(|_| {
        decoded
            .iter_mut()
            .map(|column| column.next().unwrap_or(Value::Null))
            .collect::<Vec<_>>()
    }));
    Ok(())
}

fn append_constant_rows(
    ctx: &ReadContext<'_>,
    source: &SourceFile,
    n: usize,
    rows: &mut Vec<Vec<Value>>,
) {
    let row: Vec<Value> = ctx
        .plan
        .columns()
        .iter()
        .map(|c| match c.source {
            ColumnSource::Partition { index } => partition_value(source, index),
            ColumnSource::Data { .. } => Value::Null,
        })
        .collect();
    rows.extend(std::iter::repeat_n(row, n));
}

fn partition_value(source: &SourceFile, index: usize) -> Value {
    source
        .partition_values()
        .get(index)
        .cloned()
        .unwrap_or(Value::Null)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_bounds_are_clamped() {
        assert_eq!(ReadWindow::new(200, Some(1)).bounds(2000), (200, 201));
        assert_eq!(ReadWindow::new(1990, Some(50)).bounds(2000), (1990, 2000));
        assert_eq!(ReadWindow::new(5000, Some(1)).bounds(2000), (2000, 2000));
        assert_eq!(ReadWindow::new(10, None).bounds(2000), (10, 2000));
        assert_eq!(ReadWindow::new(0, Some(u64::MAX)).bounds(7), (0, 7));
        assert_eq!(ReadWindow::all().len(42), 42);
        assert_eq!(ReadWindow::new(3, Some(0)).len(42), 0);
    }
}
