//! Normalized cell values.
//!
//! A [`Value`] is what every decoded cell becomes, whatever its physical
//! storage type. Nested cells own their decoded children and are immutable
//! once built.

use time::PrimitiveDateTime;
use time::macros::datetime;
use uuid::Uuid;

use crate::decimal::Decimal;
use crate::logical::{LogicalType, ScalarKind};

/// Earliest representable timestamp. Older values clamp to this.
pub const MIN_TIMESTAMP: PrimitiveDateTime = datetime!(0001-01-01 0:00);

/// Latest representable timestamp. Later values clamp to this.
pub const MAX_TIMESTAMP: PrimitiveDateTime = datetime!(9999-12-31 23:59:59.999999999);

/// A decoded cell.
///
/// Booleans are tri-state through [`Value::Null`]: a stored null never
/// collapses into `Boolean(false)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// The canonical null marker, whatever the declared type.
    Null,
    Boolean(bool),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Float32(f32),
    Float64(f64),
    Decimal(Decimal),
    Utf8(String),
    Binary(Vec<u8>),
    /// Wall-clock timestamp (UTC), clamped to [`MIN_TIMESTAMP`]..=[`MAX_TIMESTAMP`].
    Timestamp(PrimitiveDateTime),
    Time(time::Time),
    Uuid(Uuid),
    List(ListValue),
    Map(MapValue),
    Struct(StructValue),
}

impl Value {
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The semantic type of this value; `None` for [`Value::Null`].
    pub fn logical_type(&self) -> Option<LogicalType> {
        let kind = match self {
            Value::Null => return None,
            Value::Boolean(_) => ScalarKind::Boolean,
            Value::Int8(_) => ScalarKind::Int8,
            Value::Int16(_) => ScalarKind::Int16,
            Value::Int32(_) => ScalarKind::Int32,
            Value::Int64(_) => ScalarKind::Int64,
            Value::UInt8(_) => ScalarKind::UInt8,
            Value::UInt16(_) => ScalarKind::UInt16,
            Value::UInt32(_) => ScalarKind::UInt32,
            Value::UInt64(_) => ScalarKind::UInt64,
            Value::Float32(_) => ScalarKind::Float32,
            Value::Float64(_) => ScalarKind::Float64,
            Value::Decimal(d) => ScalarKind::Decimal {
                precision: d.precision(),
                scale: d.scale(),
            },
            Value::Utf8(_) => ScalarKind::Utf8,
            Value::Binary(_) => ScalarKind::Binary,
            Value::Timestamp(_) => ScalarKind::Timestamp,
            Value::Time(_) => ScalarKind::Time,
            Value::Uuid(_) => ScalarKind::Uuid,
            Value::List(list) => return Some(LogicalType::list(list.item_type().clone())),
            Value::Map(map) => {
                return Some(LogicalType::map(
                    map.key_type().clone(),
                    map.value_type().clone(),
                ));
            }
            Value::Struct(s) => {
                return Some(LogicalType::Struct(
                    s.fields()
                        .iter()
                        .filter_map(|(name, v)| v.logical_type().map(|t| (name.clone(), t)))
                        .collect(),
                ));
            }
        };
        Some(LogicalType::Scalar(kind))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Utf8(s) => Some(s),
            _ => None,
        }
    }

    /// Widen any integer variant to `i128`.
    pub fn as_i128(&self) -> Option<i128> {
        match self {
            Value::Int8(v) => Some(*v as i128),
            Value::Int16(v) => Some(*v as i128),
            Value::Int32(v) => Some(*v as i128),
            Value::Int64(v) => Some(*v as i128),
            Value::UInt8(v) => Some(*v as i128),
            Value::UInt16(v) => Some(*v as i128),
            Value::UInt32(v) => Some(*v as i128),
            Value::UInt64(v) => Some(*v as i128),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float32(v) => Some(*v as f64),
            Value::Float64(v) => Some(*v),
            Value::Decimal(d) => Some(d.to_f64()),
            other => other.as_i128().map(|v| v as f64),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<PrimitiveDateTime> {
        match self {
            Value::Timestamp(ts) => Some(*ts),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&ListValue> {
        match self {
            Value::List(list) => Some(list),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&MapValue> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructValue> {
        match self {
            Value::Struct(s) => Some(s),
            _ => None,
        }
    }
}

macro_rules! impl_from_for_value {
    ($variant:ident, $t:ty) => {
        impl From<$t> for Value {
            fn from(v: $t) -> Self {
                Value::$variant(v)
            }
        }
    };
}

impl_from_for_value!(Boolean, bool);
impl_from_for_value!(Int8, i8);
impl_from_for_value!(Int16, i16);
impl_from_for_value!(Int32, i32);
impl_from_for_value!(Int64, i64);
impl_from_for_value!(UInt8, u8);
impl_from_for_value!(UInt16, u16);
impl_from_for_value!(UInt32, u32);
impl_from_for_value!(UInt64, u64);
impl_from_for_value!(Float32, f32);
impl_from_for_value!(Float64, f64);
impl_from_for_value!(Decimal, Decimal);
impl_from_for_value!(Utf8, String);
impl_from_for_value!(Timestamp, PrimitiveDateTime);
impl_from_for_value!(Uuid, Uuid);

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Utf8(v.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One list cell: an ordered sequence whose entries may be [`Value::Null`].
#[derive(Debug, Clone, PartialEq)]
pub struct ListValue {
    item_type: LogicalType,
    values: Vec<Value>,
}

impl ListValue {
    pub fn new(item_type: LogicalType, values: Vec<Value>) -> Self {
        Self { item_type, values }
    }

    pub fn item_type(&self) -> &LogicalType {
        &self.item_type
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, idx: usize) -> Option<&Value> {
        self.values.get(idx)
    }
}

/// One decoded map entry.
#[derive(Debug, Clone, PartialEq)]
pub struct MapValue {
    key_type: LogicalType,
    value_type: LogicalType,
    key: Box<Value>,
    value: Box<Value>,
}

impl MapValue {
    pub fn new(key_type: LogicalType, value_type: LogicalType, key: Value, value: Value) -> Self {
        Self {
            key_type,
            value_type,
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    pub fn key_type(&self) -> &LogicalType {
        &self.key_type
    }

    pub fn value_type(&self) -> &LogicalType {
        &self.value_type
    }

    pub fn key(&self) -> &Value {
        &self.key
    }

    pub fn value(&self) -> &Value {
        &self.value
    }
}

/// A nested row: ordered `(name, value)` pairs.
///
/// Holds only the children the decoder supports; unsupported children are
/// absent rather than null.
#[derive(Debug, Clone, PartialEq)]
pub struct StructValue {
    fields: Vec<(String, Value)>,
}

impl StructValue {
    pub fn new(fields: Vec<(String, Value)>) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(name, _)| name.as_str())
    }

    /// Case-sensitive lookup of a child value.
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value)
    }
}
