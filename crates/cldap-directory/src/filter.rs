//! Search filter construction.

/// Placeholder replaced by the username in filter templates.
pub const FILTER_PLACEHOLDER: &str = "%s";

/// Substitutes `value` into every placeholder of `template`.
///
/// The value is escaped first so a username can never change the structure of the filter.
#[must_use]
pub fn build_filter(template: &str, value: &str) -> String {
    template.replace(FILTER_PLACEHOLDER, &escape_filter_value(value))
}

/// Escapes the characters RFC 4515 reserves inside filter assertion values.
#[must_use]
pub fn escape_filter_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '*' => escaped.push_str("\\2a"),
            '(' => escaped.push_str("\\28"),
            ')' => escaped.push_str("\\29"),
            '\\' => escaped.push_str("\\5c"),
            '\0' => escaped.push_str("\\00"),
            _ => escaped.push(ch),
        }
    }
    escaped
}
