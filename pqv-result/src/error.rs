use std::path::PathBuf;
use std::{fmt, io};
use thiserror::Error;

/// A source file that was discovered but could not be opened or decoded while
/// resolving a directory dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFile {
    pub path: PathBuf,
    pub reason: String,
}

impl fmt::Display for SkippedFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.path.display(), self.reason)
    }
}

fn join_skipped(skipped: &[SkippedFile]) -> String {
    skipped
        .iter()
        .map(|s| s.path.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Unified error type for all pqv operations.
///
/// Each variant corresponds to one failure mode of opening, projecting or
/// reading a dataset. Wrapped library errors keep their source so nothing
/// from the decode layer is swallowed.
///
/// # Thread Safety
///
/// `Error` is `Send + Sync`; worker threads of the parallel reader hand their
/// errors back to the coordinating thread unchanged.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O error while opening or reading a source file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Arrow error while assembling or converting decoded arrays.
    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    /// Error raised by the Parquet decoder (footer, page or column chunk).
    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    /// The files of a directory dataset do not share one physical schema.
    ///
    /// Resolution stops at the first mismatch; no partial dataset is built.
    #[error("Multiple schemas found in directory.")]
    SchemaConflict {
        /// File whose schema became the reference.
        first: PathBuf,
        /// First file whose schema differs from the reference.
        conflicting: PathBuf,
        /// What differs.
        detail: String,
    },

    /// Every discovered file failed to open or decode.
    #[error("None of the {} file(s) in the dataset could be read: {}", .skipped.len(), join_skipped(.skipped))]
    AllSourcesUnreadable { skipped: Vec<SkippedFile> },

    /// A strict subset of the discovered files failed to open or decode.
    ///
    /// Opening still succeeds; the handle reports this value so callers can
    /// surface it as a warning.
    #[error("{} file(s) were skipped because they could not be read: {}", .skipped.len(), join_skipped(.skipped))]
    SomeSourcesUnreadable { skipped: Vec<SkippedFile> },

    /// A directory contained no eligible data files.
    #[error("No parquet files found in {}", .0.display())]
    EmptyDataset(PathBuf),

    /// The dataset root or one of its files no longer exists at read time.
    ///
    /// Only the failing read is affected; the handle stays usable.
    #[error("The specified file/folder no longer exists: {}", .0.display())]
    SourceVanished(PathBuf),

    /// Two requested columns have names that are equal ignoring case.
    #[error(
        "Duplicate column '{0}' detected. Column names are case insensitive and must be unique."
    )]
    DuplicateProjectedColumn(String),

    /// The requested field set is empty, names unknown fields, or names a
    /// field whose type cannot be materialized.
    #[error("Unsupported field selection: {0}")]
    UnsupportedFieldSelection(String),

    /// Cooperative cancellation was observed.
    #[error("The operation was cancelled")]
    Cancelled,

    /// An internal invariant of the read pipeline was violated.
    ///
    /// This is a defect, not a recoverable state; the message is meant to be
    /// shown to the user verbatim so it can be reported.
    #[error(
        "Something went wrong while processing this file. If the issue persists please open a bug ticket: {0}"
    )]
    ProcessingFailure(String),

    /// Invalid user input or API parameter.
    #[error("Invalid argument: {0}")]
    InvalidArgumentError(String),

    /// Internal error indicating a bug or unexpected state.
    #[error("An internal operation failed: {0}")]
    Internal(String),
}

impl Error {
    /// Whether this error reports cancellation rather than a failure.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    /// Create an internal error from any displayable error.
    #[inline]
    pub fn internal<E: fmt::Display>(err: E) -> Self {
        Error::Internal(err.to_string())
    }

    /// Create an unsupported-field-selection error from any displayable message.
    #[inline]
    pub fn unsupported_selection<E: fmt::Display>(msg: E) -> Self {
        Error::UnsupportedFieldSelection(msg.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_column_message_names_column() {
        let err = Error::DuplicateProjectedColumn("TransPlan_NORMAL_v2".into());
        assert_eq!(
            err.to_string(),
            "Duplicate column 'TransPlan_NORMAL_v2' detected. Column names are case insensitive and must be unique."
        );
    }

    #[test]
    fn schema_conflict_message() {
        let err = Error::SchemaConflict {
            first: PathBuf::from("a.parquet"),
            conflicting: PathBuf::from("b.parquet"),
            detail: "column count".into(),
        };
        assert_eq!(err.to_string(), "Multiple schemas found in directory.");
    }

    #[test]
    fn skipped_lists_paths() {
        let err = Error::SomeSourcesUnreadable {
            skipped: vec![SkippedFile {
                path: PathBuf::from("bad.parquet"),
                reason: "not a parquet file".into(),
            }],
        };
        let msg = err.to_string();
        assert!(msg.starts_with("1 file(s)"));
        assert!(msg.contains("bad.parquet"));
    }

    #[test]
    fn cancellation_is_not_failure() {
        assert!(Error::Cancelled.is_cancelled());
        assert!(!Error::Internal("x".into()).is_cancelled());
    }

    #[test]
    fn error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
