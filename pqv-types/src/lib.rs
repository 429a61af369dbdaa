//! Normalized value model for pqv.
//!
//! The engine hides the physical type system of the files it reads behind the
//! types in this crate:
//!
//! - [`Value`]: a tagged cell value. Scalars, nested [`ListValue`],
//!   [`MapValue`] and [`StructValue`] cells, and the single canonical
//!   [`Value::Null`] marker.
//! - [`LogicalType`] / [`ScalarKind`]: the semantic type of a field or column.
//! - [`Field`] / [`Schema`]: the resolved, ordered field list of a dataset.
//! - [`MaterializedTable`]: the row-major result of a windowed read.
//!
//! Rendering is explicit: [`RenderOptions`] carries the date format and is
//! passed into [`Value::render`]; no value type stores formatting state.

pub mod decimal;
pub mod logical;
pub mod render;
pub mod schema;
pub mod table;
pub mod value;

pub use decimal::Decimal;
pub use logical::{LogicalType, ScalarKind};
pub use render::{DEFAULT_DATE_FORMAT, RenderOptions};
pub use schema::{Field, FieldOrigin, Schema, fold_name};
pub use table::{Column, MaterializedTable};
pub use value::{ListValue, MAX_TIMESTAMP, MIN_TIMESTAMP, MapValue, StructValue, Value};
