//! Type-aware value coercion.
//!
//! OData and FetchXML have different literal grammars, so each backend gets its own coercion
//! function:
//!
//! | Attribute type | OData | FetchXML |
//! |---|---|---|
//! | Boolean | `true` / `false` | `1` / `0` |
//! | Number family | bare numeral | numeral |
//! | DateTime | `'2024-01-15T00:00:00.000Z'` | raw input |
//! | anything else | `'O''Brien'` | raw input |
//!
//! Values that cannot be parsed for their type fall back to the string form.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};

use super::conditions::ConditionValue;

/// Logical attribute type, from the metadata `AttributeType` tag (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeKind {
    Boolean,
    /// number, integer, bigint, decimal, double, money
    Number,
    DateTime,
    String,
    Memo,
    UniqueIdentifier,
    Picklist,
    Lookup,
    Other,
}

impl AttributeKind {
    #[must_use]
    pub fn from_tag(tag: Option<&str>) -> Self {
        let Some(tag) = tag else {
            return Self::Other;
        };
        match tag.to_ascii_lowercase().as_str() {
            "boolean" => Self::Boolean,
            "number" | "integer" | "bigint" | "decimal" | "double" | "money" => Self::Number,
            "datetime" => Self::DateTime,
            "string" => Self::String,
            "memo" => Self::Memo,
            "uniqueidentifier" => Self::UniqueIdentifier,
            "picklist" => Self::Picklist,
            "lookup" => Self::Lookup,
            _ => Self::Other,
        }
    }
}

/// Double embedded single quotes
#[must_use]
pub fn escape_odata_string(value: &str) -> String {
    value.replace('\'', "''")
}

/// Shortest decimal form of a number, without a trailing `.0` and never in exponent notation
#[must_use]
#[allow(clippy::float_cmp)]
pub fn format_number(value: f64) -> String {
    if value == 0.0 {
        // also normalizes -0
        return "0".to_string();
    }
    format!("{value}")
}

fn parse_number(value: &ConditionValue) -> Option<f64> {
    let number = match value {
        ConditionValue::Number(number) => *number,
        ConditionValue::Text(text) => text.trim().parse::<f64>().ok()?,
    };
    number.is_finite().then_some(number)
}

#[allow(clippy::float_cmp)]
fn parse_boolean(value: &ConditionValue) -> bool {
    match value {
        ConditionValue::Number(number) => *number == 1.0,
        ConditionValue::Text(text) => {
            let text = text.trim();
            text.eq_ignore_ascii_case("true") || text == "1"
        }
    }
}

fn is_bare_date(value: &str) -> bool {
    let bytes = value.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && bytes
            .iter()
            .enumerate()
            .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit())
}

/// Parse a user-entered date in the given local time zone.
///
/// `YYYY-MM-DD` means local midnight, RFC 3339 input keeps its offset, and a date-time without an
/// offset is local time.
fn parse_datetime_in<Tz: TimeZone>(value: &str, tz: &Tz) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if is_bare_date(value) {
        let midnight = NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .ok()?
            .and_hms_opt(0, 0, 0)?;
        return tz
            .from_local_datetime(&midnight)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc));
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .and_then(|naive| tz.from_local_datetime(&naive).earliest())
        .map(|dt| dt.with_timezone(&Utc))
}

/// OData literal for a value, with dates interpreted in the machine's local time zone.
#[must_use]
pub fn to_odata_literal(attribute_type: Option<&str>, value: &ConditionValue) -> String {
    to_odata_literal_in(attribute_type, value, &Local)
}

/// OData literal for a value, with dates interpreted in `tz`.
#[must_use]
pub fn to_odata_literal_in<Tz: TimeZone>(
    attribute_type: Option<&str>,
    value: &ConditionValue,
    tz: &Tz,
) -> String {
    match AttributeKind::from_tag(attribute_type) {
        AttributeKind::Boolean => {
            return if parse_boolean(value) { "true" } else { "false" }.to_string();
        }
        AttributeKind::Number => {
            if let Some(number) = parse_number(value) {
                return format_number(number);
            }
        }
        AttributeKind::DateTime => {
            if let ConditionValue::Text(text) = value
                && let Some(dt) = parse_datetime_in(text, tz)
            {
                return format!("'{}'", dt.to_rfc3339_opts(SecondsFormat::Millis, true));
            }
        }
        _ => {}
    }
    format!("'{}'", escape_odata_string(&value.to_string()))
}

/// FetchXML value for a condition. Escaping is left to the document writer.
#[must_use]
pub fn to_fetch_xml_literal(attribute_type: Option<&str>, value: &ConditionValue) -> String {
    match AttributeKind::from_tag(attribute_type) {
        AttributeKind::Boolean => if parse_boolean(value) { "1" } else { "0" }.to_string(),
        AttributeKind::Number => parse_number(value).map_or_else(|| value.to_string(), format_number),
        _ => value.to_string(),
    }
}
