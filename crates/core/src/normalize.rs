//! Normalization of stored field shapes.
//!
//! Documents written by older tools store some list fields as a single
//! comma-joined string and some timestamps as strings. Every function here is
//! pure and total: it accepts whatever was stored (including nothing) and
//! returns the canonical shape, never an error.

use chrono::{DateTime, Utc};

use crate::document::FieldValue;
use crate::models::DimensionEntry;

/// Split a comma-joined string into trimmed, non-empty parts, in order.
#[must_use]
pub fn split_joined(joined: &str) -> Vec<String> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(str::to_owned)
        .collect()
}

/// Read a list-of-strings field.
///
/// - array: its string elements (non-string elements are skipped)
/// - string: [`split_joined`]
/// - anything else or missing: empty
#[must_use]
pub fn string_list(value: Option<&FieldValue>) -> Vec<String> {
    match value {
        Some(FieldValue::Array(items)) => items
            .iter()
            .filter_map(FieldValue::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_owned)
            .collect(),
        Some(FieldValue::String(joined)) => split_joined(joined),
        _ => Vec::new(),
    }
}

/// Read a timestamp field, falling back to `now`.
///
/// Accepts native timestamps and RFC 3339 strings.
#[must_use]
pub fn timestamp_or(value: Option<&FieldValue>, now: DateTime<Utc>) -> DateTime<Utc> {
    match value {
        Some(FieldValue::Timestamp(ts)) => *ts,
        Some(FieldValue::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .map_or(now, |ts| ts.with_timezone(&Utc)),
        _ => now,
    }
}

/// Read an integer field, falling back to zero.
///
/// Accepts integers, integral doubles and numeric strings.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn integer_or_zero(value: Option<&FieldValue>) -> i64 {
    match value {
        Some(FieldValue::Integer(n)) => *n,
        Some(FieldValue::Double(d)) if d.is_finite() && d.fract() == 0.0 => *d as i64,
        Some(FieldValue::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

/// Read a boolean field, falling back to `default`.
#[must_use]
pub fn bool_or(value: Option<&FieldValue>, default: bool) -> bool {
    match value {
        Some(FieldValue::Bool(b)) => *b,
        Some(FieldValue::String(s)) => match s.trim().to_lowercase().as_str() {
            "true" | "1" | "si" | "sí" => true,
            "false" | "0" | "no" => false,
            _ => default,
        },
        _ => default,
    }
}

/// Read a text field, falling back to an empty string.
///
/// Numbers are rendered as text so numeric codes survive.
#[must_use]
pub fn text(value: Option<&FieldValue>) -> String {
    match value {
        Some(FieldValue::String(s)) => s.trim().to_owned(),
        Some(FieldValue::Integer(n)) => n.to_string(),
        Some(FieldValue::Double(d)) => d.to_string(),
        _ => String::new(),
    }
}

/// Read an optional text field; blank text counts as absent.
#[must_use]
pub fn optional_text(value: Option<&FieldValue>) -> Option<String> {
    Some(text(value)).filter(|s| !s.is_empty())
}

/// Read structured dimension entries.
///
/// Accepts a list of `{label, value}` maps, a list of `"label: value"`
/// strings, or one comma-joined string of those. Text without a colon becomes
/// a value with an empty label; entries with neither label nor value are
/// dropped.
#[must_use]
pub fn dimensions(value: Option<&FieldValue>) -> Vec<DimensionEntry> {
    let entries: Vec<DimensionEntry> = match value {
        Some(FieldValue::Array(items)) => items
            .iter()
            .filter_map(|item| match item {
                FieldValue::Map(map) => Some(DimensionEntry {
                    label: text(map.get("label")),
                    value: text(map.get("value")),
                }),
                FieldValue::String(s) => Some(DimensionEntry::parse(s)),
                _ => None,
            })
            .collect(),
        Some(FieldValue::String(joined)) => split_joined(joined)
            .iter()
            .map(|s| DimensionEntry::parse(s))
            .collect(),
        _ => Vec::new(),
    };

    entries
        .into_iter()
        .filter(|entry| !entry.label.is_empty() || !entry.value.is_empty())
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::Fields;

    fn now() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2025-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn test_joined_string_becomes_trimmed_list_in_order() {
        let value = FieldValue::from(" a.png, b.png ,,c.png ,");
        assert_eq!(string_list(Some(&value)), vec!["a.png", "b.png", "c.png"]);
    }

    #[test]
    fn test_array_keeps_strings_only() {
        let value = FieldValue::Array(vec![
            FieldValue::from("a.png"),
            FieldValue::Integer(3),
            FieldValue::from("  "),
            FieldValue::from("b.png"),
        ]);
        assert_eq!(string_list(Some(&value)), vec!["a.png", "b.png"]);
    }

    #[test]
    fn test_missing_or_odd_list_is_empty() {
        assert!(string_list(None).is_empty());
        assert!(string_list(Some(&FieldValue::Bool(true))).is_empty());
        assert!(string_list(Some(&FieldValue::from(""))).is_empty());
    }

    #[test]
    fn test_timestamp_sources() {
        let stored = DateTime::parse_from_rfc3339("2024-01-02T03:04:05Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(timestamp_or(Some(&FieldValue::Timestamp(stored)), now()), stored);
        assert_eq!(
            timestamp_or(Some(&FieldValue::from("2024-01-02T03:04:05Z")), now()),
            stored
        );
        assert_eq!(timestamp_or(Some(&FieldValue::from("ayer")), now()), now());
        assert_eq!(timestamp_or(None, now()), now());
    }

    #[test]
    fn test_integer_sources() {
        assert_eq!(integer_or_zero(Some(&FieldValue::Integer(12))), 12);
        assert_eq!(integer_or_zero(Some(&FieldValue::Double(4.0))), 4);
        assert_eq!(integer_or_zero(Some(&FieldValue::Double(4.5))), 0);
        assert_eq!(integer_or_zero(Some(&FieldValue::from(" 990 "))), 990);
        assert_eq!(integer_or_zero(Some(&FieldValue::from("n/a"))), 0);
        assert_eq!(integer_or_zero(None), 0);
    }

    #[test]
    fn test_bool_sources() {
        assert!(bool_or(Some(&FieldValue::Bool(true)), false));
        assert!(!bool_or(Some(&FieldValue::from("false")), true));
        assert!(bool_or(None, true));
    }

    #[test]
    fn test_text_renders_numbers() {
        assert_eq!(text(Some(&FieldValue::Integer(7_801_234))), "7801234");
        assert_eq!(optional_text(Some(&FieldValue::from("   "))), None);
    }

    #[test]
    fn test_dimensions_from_maps_and_strings() {
        let mut map = Fields::new();
        map.insert("label".to_string(), FieldValue::from("A"));
        map.insert("value".to_string(), FieldValue::from("110 mm"));
        let value = FieldValue::Array(vec![
            FieldValue::Map(map),
            FieldValue::from("B: 45 mm"),
            FieldValue::from("PN10"),
            FieldValue::from(" : "),
        ]);

        let dims = dimensions(Some(&value));
        assert_eq!(dims.len(), 3);
        assert_eq!(dims[0], DimensionEntry::new("A", "110 mm"));
        assert_eq!(dims[1], DimensionEntry::new("B", "45 mm"));
        assert_eq!(dims[2], DimensionEntry::new("", "PN10"));
    }

    #[test]
    fn test_dimensions_from_joined_string() {
        let dims = dimensions(Some(&FieldValue::from("A: 1, B: 2")));
        assert_eq!(
            dims,
            vec![DimensionEntry::new("A", "1"), DimensionEntry::new("B", "2")]
        );
    }
}
