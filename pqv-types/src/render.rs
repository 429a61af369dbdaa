//! Text rendering of normalized values.
//!
//! The date format is an explicit [`RenderOptions`] argument; value types do
//! not carry any formatting state.
//!
//! Shapes:
//!
//! - scalars render as plain text, nulls as the empty string
//! - lists render as `[a,b,c]`; null entries render empty, so `[null, 1]`
//!   becomes `[,1]`
//! - maps render as `(key,value)`
//! - structs render as compact JSON with nulls written as `{}`

use std::fmt::Write as _;

use pqv_result::{Error, Result};
use time::format_description::OwnedFormatItem;
use time::format_description::well_known::Rfc3339;

use crate::value::{ListValue, MapValue, StructValue, Value};

/// Format description used when none is configured.
pub const DEFAULT_DATE_FORMAT: &str = "[year]-[month]-[day] [hour]:[minute]:[second]";

/// Formatting options passed into [`Value::render`].
#[derive(Debug, Clone)]
pub struct RenderOptions {
    date_format: OwnedFormatItem,
    date_format_source: String,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self::new(DEFAULT_DATE_FORMAT).unwrap_or_else(|_| Self {
            date_format: OwnedFormatItem::Compound(Box::new([])),
            date_format_source: String::new(),
        })
    }
}

impl RenderOptions {
    /// Build options from a `time` format description such as
    /// `"[day]/[month]/[year]"`.
    pub fn new(date_format: &str) -> Result<Self> {
        let parsed = time::format_description::parse_owned::<2>(date_format).map_err(|e| {
            Error::InvalidArgumentError(format!("invalid date format '{date_format}': {e}"))
        })?;
        Ok(Self {
            date_format: parsed,
            date_format_source: date_format.to_string(),
        })
    }

    pub fn date_format(&self) -> &str {
        &self.date_format_source
    }

    /// Whether the configured format omits every time-of-day component.
    pub fn is_date_only(&self) -> bool {
        !["[hour", "[minute", "[second", "[subsecond"]
            .iter()
            .any(|c| self.date_format_source.contains(c))
    }

    fn format_timestamp(&self, ts: &time::PrimitiveDateTime) -> String {
        ts.format(&self.date_format)
            .or_else(|_| ts.assume_utc().format(&Rfc3339))
            .unwrap_or_else(|_| ts.to_string())
    }
}

impl Value {
    /// Render the value as display text.
    pub fn render(&self, opts: &RenderOptions) -> String {
        let mut out = String::new();
        write_text(&mut out, self, opts);
        out
    }
}

impl ListValue {
    pub fn render(&self, opts: &RenderOptions) -> String {
        let mut out = String::new();
        write_list(&mut out, self, opts);
        out
    }
}

impl MapValue {
    pub fn render(&self, opts: &RenderOptions) -> String {
        let mut out = String::new();
        write_map(&mut out, self, opts);
        out
    }
}

impl StructValue {
    pub fn render(&self, opts: &RenderOptions) -> String {
        let mut out = String::new();
        write_struct_json(&mut out, self, opts);
        out
    }
}

fn write_text(out: &mut String, value: &Value, opts: &RenderOptions) {
    match value {
        Value::Null => {}
        Value::Boolean(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Int8(v) => push_display(out, v),
        Value::Int16(v) => push_display(out, v),
        Value::Int32(v) => push_display(out, v),
        Value::Int64(v) => push_display(out, v),
        Value::UInt8(v) => push_display(out, v),
        Value::UInt16(v) => push_display(out, v),
        Value::UInt32(v) => push_display(out, v),
        Value::UInt64(v) => push_display(out, v),
        Value::Float32(v) => push_display(out, v),
        Value::Float64(v) => push_display(out, v),
        Value::Decimal(d) => push_display(out, d),
        Value::Utf8(s) => out.push_str(s),
        Value::Binary(bytes) => write_hex(out, bytes),
        Value::Timestamp(ts) => out.push_str(&opts.format_timestamp(ts)),
        Value::Time(t) => write_time(out, t),
        Value::Uuid(id) => push_display(out, id.hyphenated()),
        Value::List(list) => write_list(out, list, opts),
        Value::Map(map) => write_map(out, map, opts),
        Value::Struct(s) => write_struct_json(out, s, opts),
    }
}

fn write_list(out: &mut String, list: &ListValue, opts: &RenderOptions) {
    out.push('[');
    for (idx, item) in list.values().iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        write_text(out, item, opts);
    }
    out.push(']');
}

fn write_map(out: &mut String, map: &MapValue, opts: &RenderOptions) {
    out.push('(');
    write_text(out, map.key(), opts);
    out.push(',');
    write_text(out, map.value(), opts);
    out.push(')');
}

fn write_struct_json(out: &mut String, s: &StructValue, opts: &RenderOptions) {
    out.push('{');
    for (idx, (name, value)) in s.fields().iter().enumerate() {
        if idx > 0 {
            out.push(',');
        }
        write_json_string(out, name);
        out.push(':');
        write_json(out, value, opts);
    }
    out.push('}');
}

fn write_json(out: &mut String, value: &Value, opts: &RenderOptions) {
    match value {
        Value::Null => out.push_str("{}"),
        Value::Boolean(_)
        | Value::Int8(_)
        | Value::Int16(_)
        | Value::Int32(_)
        | Value::Int64(_)
        | Value::UInt8(_)
        | Value::UInt16(_)
        | Value::UInt32(_)
        | Value::UInt64(_)
        | Value::Decimal(_) => write_text(out, value, opts),
        Value::Float32(v) if v.is_finite() => push_display(out, v),
        Value::Float64(v) if v.is_finite() => push_display(out, v),
        Value::Float32(_)
        | Value::Float64(_)
        | Value::Utf8(_)
        | Value::Binary(_)
        | Value::Timestamp(_)
        | Value::Time(_)
        | Value::Uuid(_) => write_json_string(out, &value.render(opts)),
        Value::List(list) => {
            out.push('[');
            for (idx, item) in list.values().iter().enumerate() {
                if idx > 0 {
                    out.push(',');
                }
                write_json(out, item, opts);
            }
            out.push(']');
        }
        Value::Map(map) => {
            out.push('{');
            write_json_string(out, &map.key().render(opts));
            out.push(':');
            write_json(out, map.value(), opts);
            out.push('}');
        }
        Value::Struct(s) => write_struct_json(out, s, opts),
    }
}

fn write_json_string(out: &mut String, s: &str) {
    match serde_json::to_string(s) {
        Ok(quoted) => out.push_str(&quoted),
        Err(_) => {
            out.push('"');
            out.push_str(s);
            out.push('"');
        }
    }
}

fn write_time(out: &mut String, t: &time::Time) {
    let _ = write!(out, "{:02}:{:02}:{:02}", t.hour(), t.minute(), t.second());
    if t.nanosecond() != 0 {
        let frac = format!("{:09}", t.nanosecond());
        out.push('.');
        out.push_str(frac.trim_end_matches('0'));
    }
}

fn write_hex(out: &mut String, bytes: &[u8]) {
    out.push_str("0x");
    out.push_str(&hex::encode(bytes));
}

fn push_display(out: &mut String, v: impl std::fmt::Display) {
    let _ = write!(out, "{v}");
}
