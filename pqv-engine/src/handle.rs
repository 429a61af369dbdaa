//! Dataset handles: open a path once, then project fields and read row
//! windows from it any number of times.
//!
//! Projections of at most [`EngineOptions::parallel_column_threshold`]
//! columns decode on the calling thread. Wider ones are split into column
//! groups, each read by a handle clone with its own file descriptors.

use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use pqv_result::{Error, Result, SkippedFile};
use pqv_types::{Field, MaterializedTable, Schema};

use crate::cancel::{CancellationToken, ReadProgress};
use crate::catalog::{FieldCatalog, ProjectionPlan};
use crate::materializer::{ReadWindow, materialize};
use crate::options::EngineOptions;
use crate::parallel::read_parallel;
use crate::resolver::{Dataset, resolve};
use crate::source::{SourceFile, open_descriptor};

/// An opened dataset.
///
/// The resolved [`Dataset`] is shared by reference between a handle and its
/// clones. File descriptors are not: every handle opens its own, so clones can
/// read concurrently while one handle reads sequentially (`read` takes
/// `&mut self`).
///
/// # Example
///
/// ```rust,no_run
/// use pqv_engine::{CancellationToken, EngineHandle};
///
/// # fn main() -> pqv_result::Result<()> {
/// let mut handle = EngineHandle::open("data/trips")?;
/// let cancel = CancellationToken::new();
/// let table = handle.read(&["trip_id", "year"], 200, Some(50), &cancel, None)?;
/// println!("{} of {} rows", table.num_rows(), table.total_record_count());
/// handle.close();
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct EngineHandle {
    dataset: Arc<Dataset>,
    files: Vec<File>,
    options: EngineOptions,
    catalog: FieldCatalog,
}

impl EngineHandle {
    /// Open a file or directory with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_options(path, EngineOptions::default())
    }

    pub fn open_with_options(path: impl AsRef<Path>, options: EngineOptions) -> Result<Self> {
        let dataset = resolve(path.as_ref(), &options)?;
        Self::attach(Arc::new(dataset), options)
    }

    fn attach(dataset: Arc<Dataset>, options: EngineOptions) -> Result<Self> {
        let files = dataset
            .files()
            .iter()
            .map(|source| open_descriptor(source.path()))
            .collect::<Result<Vec<_>>>()?;
        let catalog = dataset.catalog(options.fix_malformed_datetime);
        Ok(Self {
            dataset,
            files,
            options,
            catalog,
        })
    }

    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    pub fn schema(&self) -> &Schema {
        self.catalog.schema()
    }

    pub fn fields(&self) -> &[Field] {
        self.catalog.fields()
    }

    pub fn catalog(&self) -> &FieldCatalog {
        &self.catalog
    }

    /// Total rows across every readable file.
    pub fn record_count(&self) -> u64 {
        self.dataset.record_count()
    }

    /// Number of readable source files.
    pub fn partition_count(&self) -> usize {
        self.dataset.files().len()
    }

    /// Row groups across every readable file.
    pub fn row_group_count(&self) -> usize {
        self.dataset.row_group_count()
    }

    pub fn files(&self) -> &[SourceFile] {
        self.dataset.files()
    }

    pub fn skipped_files(&self) -> &[SkippedFile] {
        self.dataset.skipped()
    }

    /// The warning to surface when some files of a directory were skipped.
    pub fn skipped_warning(&self) -> Option<Error> {
        let skipped = self.dataset.skipped();
        (!skipped.is_empty()).then(|| Error::SomeSourcesUnreadable {
            skipped: skipped.to_vec(),
        })
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Toggle the malformed-datetime fix. The schema is re-derived; plans
    /// built before the toggle keep their decoding.
    pub fn set_fix_malformed_datetime(&mut self, enabled: bool) {
        if self.options.fix_malformed_datetime != enabled {
            self.options.fix_malformed_datetime = enabled;
            self.catalog = self.dataset.catalog(enabled);
        }
    }

    /// A handle over the same dataset with its own file descriptors.
    pub fn try_clone(&self, cancel: &CancellationToken) -> Result<Self> {
        cancel.check()?;
        let clone = Self {
            dataset: Arc::clone(&self.dataset),
            files: self
                .dataset
                .files()
                .iter()
                .map(|source| {
                    cancel.check()?;
                    open_descriptor(source.path())
                })
                .collect::<Result<Vec<_>>>()?,
            options: self.options.clone(),
            catalog: self.catalog.clone(),
        };
        Ok(clone)
    }

    pub fn project<S: AsRef<str>>(&self, fields: &[S]) -> Result<ProjectionPlan> {
        self.catalog.project(fields)
    }

    /// Read rows `[offset, offset + count)` of `fields`, in the requested
    /// field order. `count: None` reads to the end of the dataset.
    pub fn read<S: AsRef<str>>(
        &mut self,
        fields: &[S],
        offset: u64,
        count: Option<u64>,
        cancel: &CancellationToken,
        progress: Option<&ReadProgress>,
    ) -> Result<MaterializedTable> {
        let plan = self.project(fields)?;
        self.read_plan(&plan, ReadWindow::new(offset, count), cancel, progress)
    }

    /// Read a prepared plan. Projections wider than the configured threshold
    /// go through the parallel coordinator.
    pub fn read_plan(
        &mut self,
        plan: &ProjectionPlan,
        window: ReadWindow,
        cancel: &CancellationToken,
        progress: Option<&ReadProgress>,
    ) -> Result<MaterializedTable> {
        if plan.len() > self.options.parallel_column_threshold {
            let workers = self.options.worker_count();
            read_parallel(self, plan, window, workers, cancel, progress)
        } else {
            self.read_plan_sequential(plan, window, cancel, progress)
        }
    }

    /// Read a plan on the calling thread.
    pub fn read_plan_sequential(
        &mut self,
        plan: &ProjectionPlan,
        window: ReadWindow,
        cancel: &CancellationToken,
        progress: Option<&ReadProgress>,
    ) -> Result<MaterializedTable> {
        materialize(
            &self.dataset,
            &self.files,
            plan,
            window,
            self.options.batch_size,
            cancel,
            progress,
        )
    }

    /// Release this handle's file descriptors. Clones are unaffected.
    pub fn close(self) {
        tracing::debug!(
            root = %self.dataset.root().display(),
            files = self.files.len(),
            "closing handle"
        );
    }
}
