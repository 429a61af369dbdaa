//! Column-parallel reads for wide projections.
//!
//! The projection is split into contiguous column groups. Each group is read
//! by its own handle clone over the same window, and the partial tables are
//! joined column-wise. Rows are never split, so row `k` of every partial
//! table is the same source row.

use pqv_result::{Error, Result};
use pqv_types::MaterializedTable;
use rayon::prelude::*;

use crate::cancel::{CancellationToken, ReadProgress};
use crate::catalog::ProjectionPlan;
use crate::handle::EngineHandle;
use crate::materializer::ReadWindow;

/// Split `items` into at most `groups` contiguous, non-empty chunks whose
/// sizes differ by at most one. Earlier chunks take the remainder.
pub fn split_contiguous<T: Clone>(items: &[T], groups: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let groups = groups.clamp(1, items.len());
    let base = items.len() / groups;
    let extra = items.len() % groups;
    let mut out = Vec::with_capacity(groups);
    let mut start = 0;
    for g in 0..groups {
        let len = base + usize::from(g < extra);
        out.push(items[start..start + len].to_vec());
        start += len;
    }
    out
}

pub(crate) fn read_parallel(
    handle: &EngineHandle,
    plan: &ProjectionPlan,
    window: ReadWindow,
    workers: usize,
    cancel: &CancellationToken,
    progress: Option<&ReadProgress>,
) -> Result<MaterializedTable> {
    let groups: Vec<ProjectionPlan> = split_contiguous(plan.columns(), workers)
        .into_iter()
        .map(ProjectionPlan::new)
        .collect();
    if groups.is_empty() {
        return Err(Error::unsupported_selection("no fields were requested"));
    }
    let expected_rows = window.len(handle.record_count());

    tracing::debug!(
        columns = plan.len(),
        groups = groups.len(),
        expected_rows,
        "starting parallel read"
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(groups.len())
        .thread_name(|i| format!("pqv-read-{i}"))
        .build()
        .map_err(|e| Error::Internal(format!("failed to build worker pool: {e}")))?;

    let results: Vec<Result<MaterializedTable>> = pool.install(|| {
        groups
            .par_iter()
            .map(|group| {
                cancel.check()?;
                let mut worker = handle.try_clone(cancel)?;
                worker.read_plan_sequential(group, window, cancel, progress)
            })
            .collect()
    });

    merge_column_groups(results, expected_rows)
}

/// Join per-group tables column-wise, in group order.
///
/// Any failed group fails the whole read; cancellation wins over other
/// errors. Missing or misaligned partial results are processing failures.
pub(crate) fn merge_column_groups(
    results: Vec<Result<MaterializedTable>>,
    expected_rows: u64,
) -> Result<MaterializedTable> {
    let mut tables = Vec::with_capacity(results.len());
    let mut first_error = None;
    for result in results {
        match result {
            Ok(table) => tables.push(table),
            Err(e) if e.is_cancelled() => return Err(Error::Cancelled),
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }
    if tables.is_empty() {
        return Err(Error::ProcessingFailure(
            "parallel read produced no results".into(),
        ));
    }
    for (idx, table) in tables.iter().enumerate() {
        if table.num_rows() as u64 != expected_rows {
            return Err(Error::ProcessingFailure(format!(
                "column group {idx} produced {} rows, expected {expected_rows}",
                table.num_rows()
            )));
        }
    }

    let total = tables[0].total_record_count();
    let mut columns = Vec::new();
    let mut partial_rows = Vec::with_capacity(tables.len());
    for table in tables {
        let (cols, rows, _) = table.into_parts();
        columns.extend(cols);
        partial_rows.push(rows.into_iter());
    }
    let rows = (0..expected_rows)
        .map(|_| {
            let mut row = Vec::with_capacity(columns.len());
            for part in partial_rows.iter_mut() {
                row.extend(part.next().unwrap_or_default());
            }
            row
        })
        .collect();
    Ok(MaterializedTable::new(columns, rows, total))
}
