//! Error types and result definitions for the pqv workspace.
//!
//! Every pqv crate returns [`Result<T>`], whose error variant is the single
//! [`Error`] enum defined here. Errors propagate with `?` across crate
//! boundaries; callers that need to react to a specific failure (for example
//! surfacing skipped files as a warning, or telling cancellation apart from a
//! real failure) match on the variant.
//!
//! # Error Categories
//!
//! - **Dataset shape** ([`Error::SchemaConflict`], [`Error::EmptyDataset`]):
//!   the files under a directory cannot be presented as one table
//! - **Source availability** ([`Error::AllSourcesUnreadable`],
//!   [`Error::SomeSourcesUnreadable`], [`Error::SourceVanished`])
//! - **Projection** ([`Error::DuplicateProjectedColumn`],
//!   [`Error::UnsupportedFieldSelection`])
//! - **Control flow** ([`Error::Cancelled`])
//! - **Wrapped library errors** ([`Error::Io`], [`Error::Arrow`], [`Error::Parquet`])
//! - **Defects** ([`Error::ProcessingFailure`], [`Error::Internal`])

pub mod error;
pub mod result;

pub use error::{Error, SkippedFile};
pub use result::Result;
