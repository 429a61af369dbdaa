//! Source file discovery and per-file footer metadata.

use std::ffi::OsStr;
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use parquet::arrow::arrow_reader::{ArrowReaderMetadata, ArrowReaderOptions};
use pqv_result::{Error, Result, SkippedFile};
use pqv_types::Value;
use walkdir::{DirEntry, WalkDir};

/// File extensions treated as data files, compared case-insensitively.
const DATA_EXTENSIONS: [&str; 2] = ["parquet", "parq"];

/// Whether a directory entry name denotes a data file.
///
/// Hidden files and files starting with `_` (`_SUCCESS`, `_metadata`,
/// `_common_metadata`) are writer bookkeeping, not data.
pub(crate) fn is_data_file_name(name: &str) -> bool {
    !name.starts_with('.') && !name.starts_with('_') && has_data_extension(OsStr::new(name))
}

/// Data files found under a directory root, plus the entries the walk could
/// not use.
#[derive(Debug, Default)]
pub(crate) struct Discovery {
    /// Data files ordered by path relative to the root.
    pub files: Vec<PathBuf>,
    pub skipped: Vec<SkippedFile>,
}

fn has_data_extension(name: &OsStr) -> bool {
    Path::new(name).extension().is_some_and(|ext| {
        DATA_EXTENSIONS
            .iter()
            .any(|known| ext.eq_ignore_ascii_case(known))
    })
}

/// Whether the walk descends into or yields this entry. Hidden and
/// bookkeeping directories (`_temporary`, `.git`) hold no data; the root is
/// always entered whatever its name.
fn is_walkable(entry: &DirEntry) -> bool {
    if entry.depth() == 0 || !entry.file_type().is_dir() {
        return true;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| !name.starts_with('.') && !name.starts_with('_'))
}

/// Enumerate the data files under `root`, ordered by path relative to `root`.
///
/// An unreadable root is an error. Entries below it that cannot be read, and
/// data files whose names are not UTF-8, are reported in
/// [`Discovery::skipped`].
pub(crate) fn discover(root: &Path, recursive: bool) -> Result<Discovery> {
    let mut found = Discovery::default();
    let walker = WalkDir::new(root)
        .max_depth(if recursive { usize::MAX } else { 1 })
        .sort_by_file_name()
        .into_iter()
        .filter_entry(is_walkable);
    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => return Err(Error::Io(e.into())),
            Err(e) => {
                let path = e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf);
                tracing::warn!(path = %path.display(), "skipping unreadable entry: {e}");
                found.skipped.push(SkippedFile {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        if entry.file_type().is_dir() {
            continue;
        }
        let name = entry.file_name();
        match name.to_str() {
            Some(name) => {
                if is_data_file_name(name) {
                    found.files.push(entry.into_path());
                }
            }
            None if has_data_extension(name) => {
                tracing::warn!(path = %entry.path().display(), "skipping file with non UTF-8 name");
                found.skipped.push(SkippedFile {
                    path: entry.into_path(),
                    reason: "file name is not valid UTF-8".to_string(),
                });
            }
            None => {}
        }
    }
    tracing::debug!(
        root = %root.display(),
        files = found.files.len(),
        skipped = found.skipped.len(),
        recursive,
        "discovered data files"
    );
    Ok(found)
}

/// Read the footer of one file.
pub(crate) fn load_metadata(path: &Path) -> Result<ArrowReaderMetadata> {
    let file = File::open(path)?;
    Ok(ArrowReaderMetadata::load(&file, ArrowReaderOptions::new())?)
}

/// Open a read descriptor. A missing file is reported as vanished.
pub(crate) fn open_descriptor(path: &Path) -> Result<File> {
    File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => Error::SourceVanished(path.to_path_buf()),
        _ => Error::Io(e),
    })
}

/// One readable file of a dataset, with the metadata needed to plan windowed
/// reads without touching the file again.
#[derive(Debug, Clone)]
pub struct SourceFile {
    path: PathBuf,
    relative_path: PathBuf,
    metadata: ArrowReaderMetadata,
    row_count: u64,
    row_group_rows: Vec<u64>,
    partition_values: Vec<Value>,
}

impl SourceFile {
    pub(crate) fn new(
        path: PathBuf,
        relative_path: PathBuf,
        metadata: ArrowReaderMetadata,
        partition_values: Vec<Value>,
    ) -> Self {
        let parquet_meta = metadata.metadata();
        let row_group_rows: Vec<u64> = parquet_meta
            .row_groups()
            .iter()
            .map(|rg| rg.num_rows().max(0) as u64)
            .collect();
        let row_count = parquet_meta.file_metadata().num_rows().max(0) as u64;
        Self {
            path,
            relative_path,
            metadata,
            row_count,
            row_group_rows,
            partition_values,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path relative to the dataset root; the file name for single-file datasets.
    pub fn relative_path(&self) -> &Path {
        &self.relative_path
    }

    pub fn row_count(&self) -> u64 {
        self.row_count
    }

    pub fn row_group_count(&self) -> usize {
        self.row_group_rows.len()
    }

    pub fn row_group_rows(&self) -> &[u64] {
        &self.row_group_rows
    }

    /// Constant partition values of this file, in partition-column order.
    pub fn partition_values(&self) -> &[Value] {
        &self.partition_values
    }

    pub(crate) fn metadata(&self) -> &ArrowReaderMetadata {
        &self.metadata
    }
}
