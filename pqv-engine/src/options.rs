use std::num::NonZeroUsize;

/// Default number of rows per decoded Arrow batch.
pub const DEFAULT_BATCH_SIZE: usize = 8192;

/// Projections wider than this many columns are read by the parallel
/// coordinator. Below it a single-threaded read is faster because of the
/// per-worker setup cost.
pub const DEFAULT_PARALLEL_COLUMN_THRESHOLD: usize = 1000;

/// Per-handle engine configuration.
///
/// Options are copied into every clone of a handle. Nothing here is read
/// from the environment.
#[derive(Debug, Clone)]
pub struct EngineOptions {
    /// Decode integer columns that a writer tagged as datetimes into
    /// timestamps. When off, those columns surface as raw `Int64` values.
    pub fix_malformed_datetime: bool,
    pub batch_size: usize,
    pub parallel_column_threshold: usize,
    /// Upper bound on parallel workers. `None` uses the available parallelism.
    pub max_workers: Option<usize>,
    /// Descend into subdirectories when discovering files.
    pub recursive: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            fix_malformed_datetime: true,
            batch_size: DEFAULT_BATCH_SIZE,
            parallel_column_threshold: DEFAULT_PARALLEL_COLUMN_THRESHOLD,
            max_workers: None,
            recursive: true,
        }
    }
}

impl EngineOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_fix_malformed_datetime(mut self, enabled: bool) -> Self {
        self.fix_malformed_datetime = enabled;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_parallel_column_threshold(mut self, threshold: usize) -> Self {
        self.parallel_column_threshold = threshold;
        self
    }

    pub fn with_max_workers(mut self, workers: Option<usize>) -> Self {
        self.max_workers = workers;
        self
    }

    pub fn with_recursive(mut self, recursive: bool) -> Self {
        self.recursive = recursive;
        self
    }

    /// Worker count for the parallel coordinator; always at least one.
    pub fn worker_count(&self) -> usize {
        self.max_workers
            .unwrap_or_else(|| {
                std::thread::available_parallelism()
                    .map(NonZeroUsize::get)
                    .unwrap_or(1)
            })
            .max(1)
    }
}
