//! Hive-style partition columns derived from directory names.
//!
//! A file at `root/year=2020/region=eu/part-0.parquet` carries the constant
//! values `year = 2020` and `region = "eu"` for every one of its rows.

use std::path::{Component, Path, PathBuf};

use pqv_result::{Error, Result};
use pqv_types::{ScalarKind, Value, fold_name};
use rustc_hash::FxHashSet;

/// Directory value Hive writes for a null partition key.
pub const HIVE_DEFAULT_PARTITION: &str = "__HIVE_DEFAULT_PARTITION__";

/// A partition column and its inferred type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionColumn {
    pub name: String,
    pub kind: ScalarKind,
}

/// Partition columns of a dataset plus the per-file constant values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PartitionLayout {
    columns: Vec<PartitionColumn>,
    /// One entry per file, each holding one value per column.
    values: Vec<Vec<Value>>,
}

impl PartitionLayout {
    /// Infer the layout from each file's path relative to `root`.
    ///
    /// Every file must expose the same ordered key list, and no key may
    /// collide (ignoring case) with a data column.
    pub(crate) fn infer(
        root: &Path,
        relative_paths: &[PathBuf],
        data_columns: &[&str],
    ) -> Result<Self> {
        let Some(first) = relative_paths.first() else {
            return Ok(Self::default());
        };

        let per_file: Vec<Vec<(String, Option<String>)>> = relative_paths
            .iter()
            .map(|rel| partition_segments(rel))
            .collect();

        let keys: Vec<&str> = per_file[0].iter().map(|(k, _)| k.as_str()).collect();
        for (rel, segments) in relative_paths.iter().zip(&per_file).skip(1) {
            let these: Vec<&str> = segments.iter().map(|(k, _)| k.as_str()).collect();
            if these != keys {
                return Err(Error::SchemaConflict {
                    first: root.join(first),
                    conflicting: root.join(rel),
                    detail: format!(
                        "partition keys [{}] differ from [{}]",
                        these.join(", "),
                        keys.join(", ")
                    ),
                });
            }
        }

        let data_folded: FxHashSet<String> = data_columns.iter().map(|n| fold_name(n)).collect();
        let mut seen = FxHashSet::default();
        for key in &keys {
            let folded = fold_name(key);
            if data_folded.contains(&folded) || !seen.insert(folded) {
                return Err(Error::SchemaConflict {
                    first: root.join(first),
                    conflicting: root.join(first),
                    detail: format!("partition key '{key}' collides with another column"),
                });
            }
        }

        let columns: Vec<PartitionColumn> = keys
            .iter()
            .enumerate()
            .map(|(idx, key)| {
                let observed: Vec<Option<&str>> = per_file
                    .iter()
                    .map(|segments| segments[idx].1.as_deref())
                    .collect();
                PartitionColumn {
                    name: (*key).to_string(),
                    kind: infer_kind(&observed),
                }
            })
            .collect();

        let values = per_file
            .iter()
            .map(|segments| {
                segments
                    .iter()
                    .zip(&columns)
                    .map(|((_, raw), col)| parse_value(raw.as_deref(), &col.kind))
                    .collect()
            })
            .collect();

        if !columns.is_empty() {
            tracing::debug!(
                columns = ?columns.iter().map(|c| c.name.as_str()).collect::<Vec<_>>(),
                "inferred partition columns"
            );
        }

        Ok(Self { columns, values })
    }

    pub fn columns(&self) -> &[PartitionColumn] {
        &self.columns
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub(crate) fn into_values(self) -> (Vec<PartitionColumn>, Vec<Vec<Value>>) {
        (self.columns, self.values)
    }
}

/// `key=value` segments of the directories between the root and the file.
/// Segments without `=` or with an empty key are ignored.
pub(crate) fn partition_segments(relative: &Path) -> Vec<(String, Option<String>)> {
    let Some(parent) = relative.parent() else {
        return Vec::new();
    };
    parent
        .components()
        .filter_map(|c| match c {
            Component::Normal(seg) => seg.to_str(),
            _ => None,
        })
        .filter_map(|seg| {
            let (key, value) = seg.split_once('=')?;
            if key.is_empty() {
                return None;
            }
            let value = percent_decode(value);
            let value = (value != HIVE_DEFAULT_PARTITION).then_some(value);
            Some((percent_decode(key), value))
        })
        .collect()
}

/// Decode `%XX` escapes. Malformed escapes are kept verbatim.
pub(crate) fn percent_decode(s: &str) -> String {
    let bytes = s.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            if let (Some(hi), Some(lo)) = (hex_digit(bytes[i + 1]), hex_digit(bytes[i + 2])) {
                out.push((hi << 4) | lo);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn hex_digit(b: u8) -> Option<u8> {
    (b as char).to_digit(16).map(|d| d as u8)
}

/// Zero-padded numbers such as `007` are labels, not quantities.
fn has_leading_zero(v: &str) -> bool {
    let digits = v.strip_prefix(['-', '+']).unwrap_or(v).as_bytes();
    digits.len() > 1 && digits[0] == b'0' && digits[1].is_ascii_digit()
}

fn is_integer(v: &str) -> bool {
    !has_leading_zero(v) && v.parse::<i64>().is_ok()
}

/// `nan` and `inf` spellings are left as text.
fn is_finite_float(v: &str) -> bool {
    !has_leading_zero(v) && v.parse::<f64>().is_ok_and(f64::is_finite)
}

/// Narrowest type that every non-null observed value parses as.
pub(crate) fn infer_kind(values: &[Option<&str>]) -> ScalarKind {
    let present: Vec<&str> = values.iter().flatten().copied().collect();
    if present.is_empty() {
        return ScalarKind::Utf8;
    }
    if present.iter().all(|v| is_integer(v)) {
        ScalarKind::Int64
    } else if present.iter().all(|v| is_finite_float(v)) {
        ScalarKind::Float64
    } else if present.iter().all(|v| parse_bool(v).is_some()) {
        ScalarKind::Boolean
    } else {
        ScalarKind::Utf8
    }
}

fn parse_bool(v: &str) -> Option<bool> {
    if v.eq_ignore_ascii_case("true") {
        Some(true)
    } else if v.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

pub(crate) fn parse_value(raw: Option<&str>, kind: &ScalarKind) -> Value {
    let Some(raw) = raw else {
        return Value::Null;
    };
    match kind {
        ScalarKind::Int64 => raw.parse::<i64>().map_or(Value::Null, Value::Int64),
        ScalarKind::Float64 => raw.parse::<f64>().map_or(Value::Null, Value::Float64),
        ScalarKind::Boolean => parse_bool(raw).map_or(Value::Null, Value::Boolean),
        _ => Value::Utf8(raw.to_string()),
    }
}
