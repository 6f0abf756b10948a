//! Field values and their canonical cell text
//!
//! The backing sheet stores every cell as text. Each column kind has exactly
//! one canonical rendering; parsing is lenient so historical rows written by
//! older tooling still decode.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Canonical date rendering (`2024-01-31`).
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Canonical timestamp rendering (`2025-07-28T13:37:28.036387`).
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";

/// Date spellings accepted on decode, besides the canonical one.
const LEGACY_DATE_FORMATS: &[&str] = &["%d/%m/%Y"];

/// Timestamp spellings accepted on decode, besides the canonical one.
const LEGACY_TIMESTAMP_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%d/%m/%Y %H:%M:%S"];

/// Every truthy spelling found in stored data and form posts.
const TRUTHY_ALIASES: &[&str] = &["SIM", "S", "TRUE", "1", "VERDADEIRO", "YES", "ON"];

/// Column value kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    Text,
    Boolean,
    Date,
    Numeric,
    Timestamp,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Text => "text",
            ValueKind::Boolean => "boolean",
            ValueKind::Date => "date",
            ValueKind::Numeric => "numeric",
            ValueKind::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single typed field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    Text(String),
    Bool(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
    Number(f64),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            FieldValue::Text(_) => ValueKind::Text,
            FieldValue::Bool(_) => ValueKind::Boolean,
            FieldValue::Date(_) => ValueKind::Date,
            FieldValue::Timestamp(_) => ValueKind::Timestamp,
            FieldValue::Number(_) => ValueKind::Numeric,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            FieldValue::Date(d) => Some(*d),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            FieldValue::Timestamp(t) => Some(*t),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Whether the value would encode to an empty cell.
    pub fn is_blank(&self) -> bool {
        matches!(self, FieldValue::Text(s) if s.is_empty())
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<NaiveDate> for FieldValue {
    fn from(value: NaiveDate) -> Self {
        FieldValue::Date(value)
    }
}

impl From<NaiveDateTime> for FieldValue {
    fn from(value: NaiveDateTime) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Number(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Number(value as f64)
    }
}

/// Boolean cell text for one schema version.
///
/// The sheet has no boolean type and downstream readers match on the exact
/// text, so a schema version fixes a single pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BooleanSentinels {
    pub truthy: String,
    pub falsy: String,
}

impl Default for BooleanSentinels {
    fn default() -> Self {
        Self {
            truthy: "SIM".to_string(),
            falsy: "NÃO".to_string(),
        }
    }
}

impl BooleanSentinels {
    pub fn render(&self, value: bool) -> &str {
        if value { &self.truthy } else { &self.falsy }
    }

    /// Any non-empty text that is not a known truthy spelling reads as false.
    pub fn parse(&self, raw: &str) -> bool {
        let upper = raw.trim().to_uppercase();
        upper == self.truthy.to_uppercase() || TRUTHY_ALIASES.contains(&upper.as_str())
    }
}

/// Render a value as its canonical cell text.
pub fn render_cell(value: &FieldValue, sentinels: &BooleanSentinels) -> String {
    match value {
        FieldValue::Text(s) => s.clone(),
        FieldValue::Bool(b) => sentinels.render(*b).to_string(),
        FieldValue::Date(d) => d.format(DATE_FORMAT).to_string(),
        FieldValue::Timestamp(t) => t.format(TIMESTAMP_FORMAT).to_string(),
        FieldValue::Number(n) => n.to_string(),
    }
}

/// Parse raw cell text for a column of `kind`.
///
/// Returns `None` for an empty cell. Date, timestamp and numeric cells that
/// do not parse come back as `Text` holding the raw cell so nothing stored is
/// lost.
pub fn parse_cell(raw: &str, kind: ValueKind, sentinels: &BooleanSentinels) -> Option<FieldValue> {
    if raw.is_empty() {
        return None;
    }
    let parsed = match kind {
        ValueKind::Text => Some(FieldValue::Text(raw.to_string())),
        ValueKind::Boolean => Some(FieldValue::Bool(sentinels.parse(raw))),
        ValueKind::Date => parse_date(raw).map(FieldValue::Date),
        ValueKind::Timestamp => parse_timestamp(raw).map(FieldValue::Timestamp),
        ValueKind::Numeric => parse_number(raw).map(FieldValue::Number),
    };
    Some(parsed.unwrap_or_else(|| {
        tracing::warn!(kind = %kind, cell = raw, "Unparseable cell kept as text");
        FieldValue::Text(raw.to_string())
    }))
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Some(date);
    }
    for format in LEGACY_DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    parse_timestamp(trimmed).map(|ts| ts.date())
}

fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    let trimmed = raw.trim();
    if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, TIMESTAMP_FORMAT) {
        return Some(ts);
    }
    for format in LEGACY_TIMESTAMP_FORMATS {
        if let Ok(ts) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(ts);
        }
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(ts.naive_utc());
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
}

fn parse_number(raw: &str) -> Option<f64> {
    let trimmed = raw.trim();
    let normalized = if trimmed.contains(',') && !trimmed.contains('.') {
        trimmed.replace(',', ".")
    } else {
        trimmed.to_string()
    };
    normalized.parse::<f64>().ok().filter(|n| n.is_finite())
}
