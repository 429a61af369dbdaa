//! Cooperative cancellation and best-effort progress reporting.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use pqv_result::{Error, Result};

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }

    /// Returns [`Error::Cancelled`] once [`cancel`](Self::cancel) was called.
    #[inline]
    pub fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}

type ProgressListener = Arc<dyn Fn(u64) + Send + Sync>;

/// Counter of decoded cells (rows times projected columns).
///
/// Writers never wait on readers; the value is a snapshot and may lag.
#[derive(Clone, Default)]
pub struct ReadProgress {
    cells: Arc<AtomicU64>,
    listener: Option<ProgressListener>,
}

impl fmt::Debug for ReadProgress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadProgress")
            .field("cells", &self.cells_decoded())
            .field("listener", &self.listener.is_some())
            .finish()
    }
}

impl ReadProgress {
    pub fn new() -> Self {
        Self::default()
    }

    /// A counter that also calls `listener` with the running total after
    /// every update. The listener runs on the decoding thread, possibly
    /// several at once under a parallel read.
    pub fn with_listener<F>(listener: F) -> Self
    where
        F: Fn(u64) + Send + Sync + 'static,
    {
        Self {
            cells: Arc::default(),
            listener: Some(Arc::new(listener)),
        }
    }

    #[inline]
    pub fn add(&self, cells: u64) {
        let total = self.cells.fetch_add(cells, Ordering::Relaxed) + cells;
        if let Some(listener) = &self.listener {
            listener(total);
        }
    }

    pub fn cells_decoded(&self) -> u64 {
        self.cells.load(Ordering::Relaxed)
    }

    pub fn reset(&self) {
        self.cells.store(0, Ordering::Relaxed);
    }
}
