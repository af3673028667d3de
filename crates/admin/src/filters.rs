//! Custom Askama template filters.

#![allow(clippy::unnecessary_wraps)]

use std::fmt::Display;

/// Returns the current year.
///
/// Usage in templates: `{{ ""|current_year }}`
#[askama::filter_fn]
pub fn current_year(_value: impl Display, _env: &dyn askama::Values) -> askama::Result<i32> {
    use chrono::Datelike;
    Ok(chrono::Utc::now().year())
}

/// Turn a status code into a CSS class suffix.
///
/// Usage in templates: `class="badge badge-{{ order.status|slug }}"`
/// renders `PARTIALLY_REFUNDED` as `partially-refunded`.
#[askama::filter_fn]
pub fn slug(value: impl Display, _env: &dyn askama::Values) -> askama::Result<String> {
    Ok(slugify(&value.to_string()))
}

fn slugify(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}
