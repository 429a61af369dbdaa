use std::fmt;

/// Semantic kind of a scalar field after normalization.
///
/// One kind per scalar [`crate::Value`] variant, plus [`ScalarKind::Unsupported`]
/// for physical types that have no normalized representation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScalarKind {
    /// Always-null column.
    Null,
    Boolean,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    Decimal { precision: u8, scale: i8 },
    Utf8,
    Binary,
    Timestamp,
    Time,
    Uuid,
    /// Physical type name that cannot be normalized.
    Unsupported(String),
}

impl ScalarKind {
    pub fn is_supported(&self) -> bool {
        !matches!(self, ScalarKind::Unsupported(_))
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScalarKind::Null => f.write_str("null"),
            ScalarKind::Boolean => f.write_str("boolean"),
            ScalarKind::Int8 => f.write_str("int8"),
            ScalarKind::Int16 => f.write_str("int16"),
            ScalarKind::Int32 => f.write_str("int32"),
            ScalarKind::Int64 => f.write_str("int64"),
            ScalarKind::UInt8 => f.write_str("uint8"),
            ScalarKind::UInt16 => f.write_str("uint16"),
            ScalarKind::UInt32 => f.write_str("uint32"),
            ScalarKind::UInt64 => f.write_str("uint64"),
            ScalarKind::Float32 => f.write_str("float32"),
            ScalarKind::Float64 => f.write_str("float64"),
            ScalarKind::Decimal { precision, scale } => {
                write!(f, "decimal({precision},{scale})")
            }
            ScalarKind::Utf8 => f.write_str("string"),
            ScalarKind::Binary => f.write_str("binary"),
            ScalarKind::Timestamp => f.write_str("timestamp"),
            ScalarKind::Time => f.write_str("time"),
            ScalarKind::Uuid => f.write_str("uuid"),
            ScalarKind::Unsupported(name) => write!(f, "unsupported({name})"),
        }
    }
}

/// Semantic type of a field: a scalar or one of the nested shapes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LogicalType {
    Scalar(ScalarKind),
    List(Box<LogicalType>),
    Map(Box<LogicalType>, Box<LogicalType>),
    Struct(Vec<(String, LogicalType)>),
}

impl LogicalType {
    pub fn scalar(kind: ScalarKind) -> Self {
        LogicalType::Scalar(kind)
    }

    pub fn list(item: LogicalType) -> Self {
        LogicalType::List(Box::new(item))
    }

    pub fn map(key: LogicalType, value: LogicalType) -> Self {
        LogicalType::Map(Box::new(key), Box::new(value))
    }

    pub fn is_nested(&self) -> bool {
        !matches!(self, LogicalType::Scalar(_))
    }

    /// The scalar kind, if this type is a scalar.
    pub fn as_scalar(&self) -> Option<&ScalarKind> {
        match self {
            LogicalType::Scalar(kind) => Some(kind),
            _ => None,
        }
    }

    /// Whether this is a supported scalar.
    pub fn is_supported_scalar(&self) -> bool {
        matches!(self, LogicalType::Scalar(kind) if kind.is_supported())
    }
}

impl From<ScalarKind> for LogicalType {
    fn from(kind: ScalarKind) -> Self {
        LogicalType::Scalar(kind)
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogicalType::Scalar(kind) => kind.fmt(f),
            LogicalType::List(item) => write!(f, "list<{item}>"),
            LogicalType::Map(key, value) => write!(f, "map<{key},{value}>"),
            LogicalType::Struct(fields) => {
                f.write_str("struct<")?;
                for (idx, (name, ty)) in fields.iter().enumerate() {
                    if idx > 0 {
                        f.write_str(",")?;
                    }
                    write!(f, "{name}:{ty}")?;
                }
                f.write_str(">")
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_nested_types() {
        let ty = LogicalType::Struct(vec![
            ("path".into(), ScalarKind::Utf8.into()),
            (
                "tags".into(),
                LogicalType::map(ScalarKind::Utf8.into(), ScalarKind::Int64.into()),
            ),
            ("ids".into(), LogicalType::list(ScalarKind::Int32.into())),
        ]);
        assert_eq!(
            ty.to_string(),
            "struct<path:string,tags:map<string,int64>,ids:list<int32>>"
        );
    }

    #[test]
    fn unsupported_scalar_is_flagged() {
        assert!(!LogicalType::from(ScalarKind::Unsupported("Interval".into())).is_supported_scalar());
        assert!(LogicalType::from(ScalarKind::Uuid).is_supported_scalar());
        assert!(!LogicalType::list(ScalarKind::Uuid.into()).is_supported_scalar());
    }
}
