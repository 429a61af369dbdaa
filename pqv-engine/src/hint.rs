//! Per-column decode hints decided once when a dataset is resolved.
//!
//! Some writers store values whose physical type hides what they mean. The
//! hints below are derived from footer metadata only; no value is inspected,
//! so a column decodes the same way for every row.

use arrow::datatypes::{DataType, Field as ArrowField, Fields, TimeUnit};
use parquet::basic::{LogicalType as ParquetLogicalType, Type as PhysicalType};
use parquet::file::metadata::KeyValue;
use parquet::schema::types::{Type, TypePtr};
use rustc_hash::FxHashMap;
use serde::Deserialize;

/// Key of the writer metadata entry pandas attaches to a file.
pub const PANDAS_METADATA_KEY: &str = "pandas";

/// Byte order of a 16-byte identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// RFC 4122 order, used by columns annotated as `UUID`.
    BigEndian,
    /// GUID order: the first three groups are little-endian. Used for
    /// unannotated 16-byte columns.
    MixedEndian,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DecodeHint {
    #[default]
    None,
    /// Plain INT64 that the writer declared as a datetime in `unit` since the epoch.
    MalformedDateTime(TimeUnit),
    /// Integer-backed DECIMAL with scale 0; decodes as the plain integer of
    /// the physical width (32 or 64 bits).
    IntegralDecimal { bits: u8 },
    /// Fixed 16-byte identifier.
    Identifier(ByteOrder),
}

impl DecodeHint {
    /// The hint as it applies under the handle's datetime flag.
    pub fn effective(self, fix_malformed_datetime: bool) -> Self {
        match self {
            DecodeHint::MalformedDateTime(_) if !fix_malformed_datetime => DecodeHint::None,
            other => other,
        }
    }

    /// Hint used for children of nested columns, which carry no per-field
    /// metadata of their own: 16-byte values use the GUID convention.
    pub fn for_nested_child(data_type: &DataType) -> Self {
        match data_type {
            DataType::FixedSizeBinary(16) => DecodeHint::Identifier(ByteOrder::MixedEndian),
            _ => DecodeHint::None,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PandasMetadata {
    #[serde(default)]
    columns: Vec<PandasColumn>,
}

#[derive(Debug, Deserialize)]
struct PandasColumn {
    name: Option<String>,
    field_name: Option<String>,
    #[serde(default)]
    pandas_type: String,
    numpy_type: Option<String>,
}

/// Columns that pandas metadata declares as datetimes, with their unit.
fn pandas_datetime_columns(kv: Option<&Vec<KeyValue>>) -> FxHashMap<String, TimeUnit> {
    let mut out = FxHashMap::default();
    let Some(raw) = kv
        .into_iter()
        .flatten()
        .find(|entry| entry.key == PANDAS_METADATA_KEY)
        .and_then(|entry| entry.value.as_deref())
    else {
        return out;
    };
    let meta: PandasMetadata = match serde_json::from_str(raw) {
        Ok(meta) => meta,
        Err(e) => {
            tracing::debug!("ignoring unparseable pandas metadata: {e}");
            return out;
        }
    };
    for col in meta.columns {
        if col.pandas_type != "datetime" && col.pandas_type != "datetimetz" {
            continue;
        }
        let unit = col
            .numpy_type
            .as_deref()
            .map(numpy_datetime_unit)
            .unwrap_or(TimeUnit::Nanosecond);
        if let Some(name) = col.field_name.or(col.name) {
            out.insert(name, unit);
        }
    }
    out
}

/// Unit of a numpy dtype such as `datetime64[ms]`; nanoseconds when absent.
fn numpy_datetime_unit(numpy_type: &str) -> TimeUnit {
    let unit = numpy_type
        .split_once('[')
        .map(|(_, rest)| rest.split([']', ',']).next().unwrap_or("").trim());
    match unit {
        Some("s") => TimeUnit::Second,
        Some("ms") => TimeUnit::Millisecond,
        Some("us") => TimeUnit::Microsecond,
        _ => TimeUnit::Nanosecond,
    }
}

/// Derive one hint per top-level column.
///
/// `parquet_fields` are the root fields of the Parquet schema and
/// `arrow_fields` the Arrow fields the reader derived from them; both are in
/// the same order.
pub(crate) fn derive_hints(
    parquet_fields: &[TypePtr],
    arrow_fields: &Fields,
    kv: Option<&Vec<KeyValue>>,
) -> Vec<DecodeHint> {
    let datetimes = pandas_datetime_columns(kv);
    parquet_fields
        .iter()
        .zip(arrow_fields.iter())
        .map(|(ptype, afield)| hint_for(ptype, afield, &datetimes))
        .collect()
}

fn hint_for(
    ptype: &Type,
    afield: &ArrowField,
    datetimes: &FxHashMap<String, TimeUnit>,
) -> DecodeHint {
    let Type::PrimitiveType {
        basic_info,
        physical_type,
        type_length,
        ..
    } = ptype
    else {
        return DecodeHint::None;
    };

    match (physical_type, afield.data_type()) {
        (PhysicalType::INT64, DataType::Int64) => datetimes
            .get(afield.name())
            .map_or(DecodeHint::None, |unit| {
                DecodeHint::MalformedDateTime(*unit)
            }),
        (PhysicalType::INT32, DataType::Decimal128(_, 0)) => {
            DecodeHint::IntegralDecimal { bits: 32 }
        }
        (PhysicalType::INT64, DataType::Decimal128(_, 0)) => {
            DecodeHint::IntegralDecimal { bits: 64 }
        }
        (PhysicalType::FIXED_LEN_BYTE_ARRAY, DataType::FixedSizeBinary(16)) if *type_length == 16 => {
            match basic_info.logical_type() {
                Some(ParquetLogicalType::Uuid) => DecodeHint::Identifier(ByteOrder::BigEndian),
                _ => DecodeHint::Identifier(ByteOrder::MixedEndian),
            }
        }
        _ => DecodeHint::None,
    }
}
