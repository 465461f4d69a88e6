//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

use bluefitt_core::UserRole;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Spanish label for a stored role string.
///
/// Usage in templates: `{{ user.role|role_label }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn role_label(role: impl Display, _env: &dyn askama::Values) -> askama::Result<&'static str> {
    Ok(UserRole::parse_lenient(&role.to_string()).label())
}

/// `dd-mm-yyyy` from an RFC 3339 or `Display`ed chrono timestamp.
///
/// Usage in templates: `{{ post.created_at|short_date }}`
#[allow(clippy::unnecessary_wraps)]
#[askama::filter_fn]
pub fn short_date(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    let text = value.to_string();
    // "2025-03-07 12:00:00 UTC" or "2025-03-07T12:00:00Z"
    let reordered = text.get(..10).and_then(|date| {
        let mut parts = date.split('-');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(y), Some(m), Some(d)) if y.len() == 4 => Some(format!("{d}-{m}-{y}")),
            _ => None,
        }
    });
    Ok(reordered.unwrap_or(text))
}
