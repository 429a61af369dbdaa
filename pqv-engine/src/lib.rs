//! Read engine for Parquet datasets.
//!
//! A dataset is a single Parquet file or a directory of schema-identical
//! Parquet files, optionally laid out in Hive-style `key=value` partition
//! directories. The engine turns it into a typed, windowable table of
//! normalized [`pqv_types::Value`]s.
//!
//! # Architecture
//!
//! - **Resolution** ([`resolve`], [`Dataset`]): discovers files, checks that
//!   every file shares one physical schema, records unreadable files, derives
//!   partition columns and per-column [`DecodeHint`]s. The result is immutable
//!   and shared by every clone of a handle.
//! - **Projection** ([`FieldCatalog`], [`ProjectionPlan`]): validates a
//!   requested field list (case-insensitive uniqueness, supported types) and
//!   fixes the column order.
//! - **Coercion** ([`coercion`]): maps decoded Arrow arrays to normalized
//!   values, including list, map and struct cells.
//! - **Materialization**: reads only the row groups that overlap the
//!   requested window and assembles rows in file discovery order.
//! - **Parallel reads**: projections wider than
//!   [`EngineOptions::parallel_column_threshold`] are split into column groups,
//!   each read by its own handle clone, and joined back column-wise.
//!
//! Physical decoding (pages, compression, encodings) is delegated to the
//! `parquet` crate.
//!
//! # Usage Example
//!
//! ```rust,no_run
//! use pqv_engine::{CancellationToken, EngineHandle, EngineOptions, ReadProgress};
//! use pqv_types::RenderOptions;
//!
//! # fn main() -> pqv_result::Result<()> {
//! let options = EngineOptions::default().with_fix_malformed_datetime(false);
//! let mut handle = EngineHandle::open_with_options("warehouse/events", options)?;
//! if let Some(warning) = handle.skipped_warning() {
//!     eprintln!("{warning}");
//! }
//!
//! let fields = handle.catalog().supported_fields().iter().map(|s| s.to_string()).collect::<Vec<_>>();
//! let cancel = CancellationToken::new();
//! let progress = ReadProgress::new();
//! let table = handle.read(&fields, 0, Some(100), &cancel, Some(&progress))?;
//!
//! let render = RenderOptions::default();
//! for row in table.rows() {
//!     let cells: Vec<String> = row.iter().map(|v| v.render(&render)).collect();
//!     println!("{}", cells.join("\t"));
//! }
//! # Ok(())
//! # }
//! ```

mod cancel;
mod catalog;
pub mod coercion;
mod handle;
mod hint;
mod materializer;
mod nested;
mod options;
mod parallel;
mod partition;
mod resolver;
mod source;

pub use cancel::{CancellationToken, ReadProgress};
pub use catalog::{ColumnSource, FieldCatalog, ProjectedColumn, ProjectionPlan};
pub use handle::EngineHandle;
pub use hint::{ByteOrder, DecodeHint, PANDAS_METADATA_KEY};
pub use materializer::ReadWindow;
pub use options::{DEFAULT_BATCH_SIZE, DEFAULT_PARALLEL_COLUMN_THRESHOLD, EngineOptions};
pub use parallel::split_contiguous;
pub use partition::{HIVE_DEFAULT_PARTITION, PartitionColumn};
pub use resolver::{DataColumn, Dataset, resolve};
pub use source::SourceFile;
