//! List, map and struct cells.
//!
//! Exposure policy for nested data:
//!
//! - lists keep every entry in order, interior nulls included; a null list
//!   cell is [`Value::Null`]
//! - maps surface only the first entry of a cell; a null or empty map cell is
//!   [`Value::Null`]
//! - structs expose only children that are supported scalars or lists of
//!   supported scalars; other children are absent from both the field type
//!   and the values. A null struct cell is [`Value::Null`], never an empty
//!   struct.
//! - 16-byte children always use the GUID byte order, since nested fields
//!   carry no annotation the resolver inspects

use arrow::array::{Array, AsArray};
use arrow::datatypes::DataType;
use pqv_result::{Error, Result};
use pqv_types::{ListValue, LogicalType, MapValue, StructValue, Value};

use crate::coercion::{logical_type_for, value_at};
use crate::hint::DecodeHint;

/// Whether a struct child of this type is exposed.
pub(crate) fn is_exposed_struct_child(ty: &LogicalType) -> bool {
    match ty {
        LogicalType::Scalar(kind) => kind.is_supported(),
        LogicalType::List(item) => item.is_supported_scalar(),
        _ => false,
    }
}

/// Key and value types of a map's entries struct.
pub(crate) fn map_entry_types(entries: &DataType) -> Option<(LogicalType, LogicalType)> {
    let DataType::Struct(fields) = entries else {
        return None;
    };
    if fields.len() != 2 {
        return None;
    }
    let key = fields[0].data_type();
    let value = fields[1].data_type();
    Some((
        logical_type_for(key, DecodeHint::for_nested_child(key)),
        logical_type_for(value, DecodeHint::for_nested_child(value)),
    ))
}

pub(crate) fn list_at(array: &dyn Array, idx: usize) -> Result<Value> {
    let (items, item_field) = match array.data_type() {
        DataType::List(field) => (array.as_list::<i32>().value(idx), field),
        DataType::LargeList(field) => (array.as_list::<i64>().value(idx), field),
        DataType::FixedSizeList(field, _) => (array.as_fixed_size_list().value(idx), field),
        other => return Err(Error::Internal(format!("expected a list array, got {other}"))),
    };
    let hint = DecodeHint::for_nested_child(item_field.data_type());
    let item_type = logical_type_for(item_field.data_type(), hint);
    let values = (0..items.len())
        .map(|i| value_at(items.as_ref(), i, hint))
        .collect::<Result<Vec<_>>>()?;
    Ok(Value::List(ListValue::new(item_type, values)))
}

pub(crate) fn map_at(array: &dyn Array, idx: usize) -> Result<Value> {
    let DataType::Map(entries_field, _) = array.data_type() else {
        return Err(Error::Internal(format!(
            "expected a map array, got {}",
            array.data_type()
        )));
    };
    let (key_type, value_type) = map_entry_types(entries_field.data_type()).ok_or_else(|| {
        Error::Internal(format!("malformed map entries type {}", entries_field.data_type()))
    })?;

    let entries = array.as_map().value(idx);
    if entries.is_empty() {
        return Ok(Value::Null);
    }
    // TODO: surface every entry once MapValue can hold more than one pair.
    let keys = entries.column(0);
    let values = entries.column(1);
    let key = value_at(keys.as_ref(), 0, DecodeHint::for_nested_child(keys.data_type()))?;
    let value = value_at(
        values.as_ref(),
        0,
        DecodeHint::for_nested_child(values.data_type()),
    )?;
    Ok(Value::Map(MapValue::new(key_type, value_type, key, value)))
}

pub(crate) fn struct_at(array: &dyn Array, idx: usize) -> Result<Value> {
    let DataType::Struct(fields) = array.data_type() else {
        return Err(Error::Internal(format!(
            "expected a struct array, got {}",
            array.data_type()
        )));
    };
    let columns = array.as_struct().columns();
    let mut out = Vec::with_capacity(fields.len());
    for (field, column) in fields.iter().zip(columns) {
        let hint = DecodeHint::for_nested_child(field.data_type());
        if !is_exposed_struct_child(&logical_type_for(field.data_type(), hint)) {
            continue;
        }
        out.push((field.name().clone(), value_at(column.as_ref(), idx, hint)?));
    }
    Ok(Value::Struct(StructValue::new(out)))
}
