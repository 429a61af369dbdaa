//! Mapping from decoded Arrow arrays to normalized [`Value`]s.
//!
//! Everything here is a pure function of the array, the row index and the
//! column's [`DecodeHint`].

use arrow::array::{Array, ArrayRef, AsArray};
use arrow::compute::cast;
use arrow::datatypes::{
    DataType, Date32Type, Date64Type, Decimal128Type, Decimal256Type, DecimalType, Float16Type,
    Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type, Time32MillisecondType,
    Time32SecondType, Time64MicrosecondType, Time64NanosecondType, TimeUnit,
    TimestampMicrosecondType, TimestampMillisecondType, TimestampNanosecondType,
    TimestampSecondType, UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};
use pqv_result::{Error, Result};
use pqv_types::{
    Decimal, LogicalType, MAX_TIMESTAMP, MIN_TIMESTAMP, ScalarKind, Value,
};
use time::{OffsetDateTime, PrimitiveDateTime};
use uuid::Uuid;

use crate::hint::{ByteOrder, DecodeHint};
use crate::nested;

const NANOS_PER_DAY: i128 = 86_400_000_000_000;

pub(crate) fn unit_nanos(unit: TimeUnit) -> i128 {
    match unit {
        TimeUnit::Second => 1_000_000_000,
        TimeUnit::Millisecond => 1_000_000,
        TimeUnit::Microsecond => 1_000,
        TimeUnit::Nanosecond => 1,
    }
}

/// Timestamp for a signed count of nanoseconds since the Unix epoch,
/// clamped to [`MIN_TIMESTAMP`]..=[`MAX_TIMESTAMP`].
pub fn timestamp_from_nanos(nanos: i128) -> PrimitiveDateTime {
    let min = MIN_TIMESTAMP.assume_utc().unix_timestamp_nanos();
    let max = MAX_TIMESTAMP.assume_utc().unix_timestamp_nanos();
    if nanos <= min {
        return MIN_TIMESTAMP;
    }
    if nanos >= max {
        return MAX_TIMESTAMP;
    }
    match OffsetDateTime::from_unix_timestamp_nanos(nanos) {
        Ok(dt) => PrimitiveDateTime::new(dt.date(), dt.time()),
        Err(_) if nanos < 0 => MIN_TIMESTAMP,
        Err(_) => MAX_TIMESTAMP,
    }
}

/// Timestamp for a count of `unit`s since the Unix epoch, clamped.
pub fn timestamp_from_epoch(value: i64, unit: TimeUnit) -> PrimitiveDateTime {
    timestamp_from_nanos(value as i128 * unit_nanos(unit))
}

/// Time of day for a count of nanoseconds since midnight, clamped to one day.
pub fn time_from_nanos(nanos: i128) -> time::Time {
    let nanos = nanos.clamp(0, NANOS_PER_DAY - 1);
    time::Time::MIDNIGHT + time::Duration::nanoseconds(nanos as i64)
}

/// Semantic type of a column with the given Arrow type and hint.
pub fn logical_type_for(data_type: &DataType, hint: DecodeHint) -> LogicalType {
    let kind = match data_type {
        DataType::Null => ScalarKind::Null,
        DataType::Boolean => ScalarKind::Boolean,
        DataType::Int8 => ScalarKind::Int8,
        DataType::Int16 => ScalarKind::Int16,
        DataType::Int32 => ScalarKind::Int32,
        DataType::Int64 => match hint {
            DecodeHint::MalformedDateTime(_) => ScalarKind::Timestamp,
            _ => ScalarKind::Int64,
        },
        DataType::UInt8 => ScalarKind::UInt8,
        DataType::UInt16 => ScalarKind::UInt16,
        DataType::UInt32 => ScalarKind::UInt32,
        DataType::UInt64 => ScalarKind::UInt64,
        DataType::Float16 | DataType::Float32 => ScalarKind::Float32,
        DataType::Float64 => ScalarKind::Float64,
        DataType::Utf8 | DataType::LargeUtf8 | DataType::Utf8View => ScalarKind::Utf8,
        DataType::Binary | DataType::LargeBinary | DataType::BinaryView => ScalarKind::Binary,
        DataType::FixedSizeBinary(16) if matches!(hint, DecodeHint::Identifier(_)) => {
            ScalarKind::Uuid
        }
        DataType::FixedSizeBinary(_) => ScalarKind::Binary,
        DataType::Date32 | DataType::Date64 | DataType::Timestamp(_, _) => ScalarKind::Timestamp,
        DataType::Time32(TimeUnit::Second | TimeUnit::Millisecond)
        | DataType::Time64(TimeUnit::Microsecond | TimeUnit::Nanosecond) => ScalarKind::Time,
        DataType::Decimal128(precision, scale) => match hint {
            DecodeHint::IntegralDecimal { bits: 32 } => ScalarKind::Int32,
            DecodeHint::IntegralDecimal { .. } => ScalarKind::Int64,
            _ => ScalarKind::Decimal {
                precision: *precision,
                scale: *scale,
            },
        },
        DataType::Decimal256(precision, scale) => ScalarKind::Decimal {
            precision: *precision,
            scale: *scale,
        },
        DataType::Dictionary(_, value_type) => return logical_type_for(value_type, hint),
        DataType::List(item) | DataType::LargeList(item) | DataType::FixedSizeList(item, _) => {
            let item_type = item.data_type();
            return LogicalType::list(logical_type_for(
                item_type,
                DecodeHint::for_nested_child(item_type),
            ));
        }
        DataType::Map(entries, _) => {
            if let Some((key, value)) = nested::map_entry_types(entries.data_type()) {
                return LogicalType::map(key, value);
            }
            ScalarKind::Unsupported(data_type.to_string())
        }
        DataType::Struct(children) => {
            return LogicalType::Struct(
                children
                    .iter()
                    .filter_map(|child| {
                        let ty = logical_type_for(
                            child.data_type(),
                            DecodeHint::for_nested_child(child.data_type()),
                        );
                        nested::is_exposed_struct_child(&ty).then(|| (child.name().clone(), ty))
                    })
                    .collect(),
            );
        }
        other => ScalarKind::Unsupported(other.to_string()),
    };
    LogicalType::Scalar(kind)
}

/// Replace dictionary encoding with the plain value array.
pub(crate) fn unpack_dictionary(array: &ArrayRef) -> Result<ArrayRef> {
    match array.data_type() {
        DataType::Dictionary(_, value_type) => Ok(cast(array, value_type)?),
        _ => Ok(array.clone()),
    }
}

/// Decode a whole column into one value per row.
pub fn decode_column(array: &ArrayRef, hint: DecodeHint) -> Result<Vec<Value>> {
    let array = unpack_dictionary(array)?;
    (0..array.len())
        .map(|idx| value_at(array.as_ref(), idx, hint))
        .collect()
}

/// Decode the cell at `idx`.
pub fn value_at(array: &dyn Array, idx: usize, hint: DecodeHint) -> Result<Value> {
    if array.is_null(idx) {
        return Ok(Value::Null);
    }
    let value = match array.data_type() {
        DataType::Null => Value::Null,
        DataType::Boolean => Value::Boolean(array.as_boolean().value(idx)),
        DataType::Int8 => Value::Int8(array.as_primitive::<Int8Type>().value(idx)),
        DataType::Int16 => Value::Int16(array.as_primitive::<Int16Type>().value(idx)),
        DataType::Int32 => Value::Int32(array.as_primitive::<Int32Type>().value(idx)),
        DataType::Int64 => {
            let raw = array.as_primitive::<Int64Type>().value(idx);
            match hint {
                DecodeHint::MalformedDateTime(unit) => {
                    Value::Timestamp(timestamp_from_epoch(raw, unit))
                }
                _ => Value::Int64(raw),
            }
        }
        DataType::UInt8 => Value::UInt8(array.as_primitive::<UInt8Type>().value(idx)),
        DataType::UInt16 => Value::UInt16(array.as_primitive::<UInt16Type>().value(idx)),
        DataType::UInt32 => Value::UInt32(array.as_primitive::<UInt32Type>().value(idx)),
        DataType::UInt64 => Value::UInt64(array.as_primitive::<UInt64Type>().value(idx)),
        DataType::Float16 => {
            Value::Float32(array.as_primitive::<Float16Type>().value(idx).to_f32())
        }
        DataType::Float32 => Value::Float32(array.as_primitive::<Float32Type>().value(idx)),
        DataType::Float64 => Value::Float64(array.as_primitive::<Float64Type>().value(idx)),
        DataType::Utf8 => Value::Utf8(array.as_string::<i32>().value(idx).to_string()),
        DataType::LargeUtf8 => Value::Utf8(array.as_string::<i64>().value(idx).to_string()),
        DataType::Utf8View => Value::Utf8(array.as_string_view().value(idx).to_string()),
        DataType::Binary => Value::Binary(array.as_binary::<i32>().value(idx).to_vec()),
        DataType::LargeBinary => Value::Binary(array.as_binary::<i64>().value(idx).to_vec()),
        DataType::BinaryView => Value::Binary(array.as_binary_view().value(idx).to_vec()),
        DataType::FixedSizeBinary(_) => {
            let bytes = array.as_fixed_size_binary().value(idx);
            match hint {
                DecodeHint::Identifier(order) => identifier(bytes, order)?,
                _ => Value::Binary(bytes.to_vec()),
            }
        }
        DataType::Date32 => {
            let days = array.as_primitive::<Date32Type>().value(idx);
            Value::Timestamp(timestamp_from_nanos(days as i128 * NANOS_PER_DAY))
        }
        DataType::Date64 => {
            let millis = array.as_primitive::<Date64Type>().value(idx);
            Value::Timestamp(timestamp_from_epoch(millis, TimeUnit::Millisecond))
        }
        DataType::Timestamp(unit, _) => {
            let raw = match unit {
                TimeUnit::Second => array.as_primitive::<TimestampSecondType>().value(idx),
                TimeUnit::Millisecond => {
                    array.as_primitive::<TimestampMillisecondType>().value(idx)
                }
                TimeUnit::Microsecond => {
                    array.as_primitive::<TimestampMicrosecondType>().value(idx)
                }
                TimeUnit::Nanosecond => array.as_primitive::<TimestampNanosecondType>().value(idx),
            };
            Value::Timestamp(timestamp_from_epoch(raw, *unit))
        }
        DataType::Time32(TimeUnit::Second) => {
            let secs = array.as_primitive::<Time32SecondType>().value(idx);
            Value::Time(time_from_nanos(secs as i128 * unit_nanos(TimeUnit::Second)))
        }
        DataType::Time32(TimeUnit::Millisecond) => {
            let millis = array.as_primitive::<Time32MillisecondType>().value(idx);
            Value::Time(time_from_nanos(
                millis as i128 * unit_nanos(TimeUnit::Millisecond),
            ))
        }
        DataType::Time64(TimeUnit::Microsecond) => {
            let micros = array.as_primitive::<Time64MicrosecondType>().value(idx);
            Value::Time(time_from_nanos(
                micros as i128 * unit_nanos(TimeUnit::Microsecond),
            ))
        }
        DataType::Time64(TimeUnit::Nanosecond) => {
            let nanos = array.as_primitive::<Time64NanosecondType>().value(idx);
            Value::Time(time_from_nanos(nanos as i128))
        }
        DataType::Decimal128(precision, scale) => {
            let mantissa = array.as_primitive::<Decimal128Type>().value(idx);
            decimal128(mantissa, *precision, *scale, hint)
        }
        DataType::Decimal256(precision, scale) => {
            let raw = array.as_primitive::<Decimal256Type>().value(idx);
            match raw.to_i128() {
                Some(mantissa) => Value::Decimal(Decimal::new(mantissa, *precision, *scale)),
                // Wider than 128 bits: keep the exact digits as text.
                None => Value::Utf8(Decimal256Type::format_decimal(raw, *precision, *scale)),
            }
        }
        DataType::Dictionary(_, value_type) => {
            let unpacked = cast(&array.slice(idx, 1), value_type)?;
            return value_at(unpacked.as_ref(), 0, hint);
        }
        DataType::List(_) | DataType::LargeList(_) | DataType::FixedSizeList(_, _) => {
            nested::list_at(array, idx)?
        }
        DataType::Map(_, _) => nested::map_at(array, idx)?,
        DataType::Struct(_) => nested::struct_at(array, idx)?,
        other => {
            return Err(Error::Internal(format!(
                "no normalized representation for type {other}"
            )));
        }
    };
    Ok(value)
}

fn decimal128(mantissa: i128, precision: u8, scale: i8, hint: DecodeHint) -> Value {
    match hint {
        DecodeHint::IntegralDecimal { bits: 32 } => {
            if let Ok(v) = i32::try_from(mantissa) {
                return Value::Int32(v);
            }
        }
        DecodeHint::IntegralDecimal { .. } => {
            if let Ok(v) = i64::try_from(mantissa) {
                return Value::Int64(v);
            }
        }
        _ => {}
    }
    Value::Decimal(Decimal::new(mantissa, precision, scale))
}

fn identifier(bytes: &[u8], order: ByteOrder) -> Result<Value> {
    let id = match order {
        ByteOrder::BigEndian => Uuid::from_slice(bytes),
        ByteOrder::MixedEndian => Uuid::from_slice_le(bytes),
    }
    .map_err(|e| Error::Internal(format!("invalid identifier bytes: {e}")))?;
    Ok(Value::Uuid(id))
}
