//! Client-side evaluation of stored filter values against row fields.

use super::RoutedControl;
use super::controls::parse_loose;

pub(super) fn matches(control: &RoutedControl, raw: &str, field: Option<&str>) -> bool {
    if raw.is_empty() {
        return true;
    }
    match control {
        RoutedControl::Text(_) => field.is_some_and(|f| contains_ignore_case(f, raw)),
        RoutedControl::Select(_) => field == Some(raw),
        RoutedControl::MultiSelect(c) => {
            let wanted = c.decode(raw);
            wanted.is_empty() || field.is_some_and(|f| wanted.iter().any(|w| w == f))
        }
        RoutedControl::Date(c) => match c.decode(raw) {
            Ok(Some(wanted)) => field
                .and_then(parse_loose)
                .is_some_and(|value| c.precision.truncate(value) == wanted),
            Ok(None) => true,
            Err(error) => {
                tracing::warn!(%error, "undecodable date filter ignored");
                true
            }
        },
        RoutedControl::DateRange(c) => match c.decode(raw) {
            Ok(bounds) if bounds.is_unbounded() => true,
            Ok(bounds) => field
                .and_then(parse_loose)
                .is_some_and(|value| c.contains(&bounds, value)),
            Err(error) => {
                tracing::warn!(%error, "undecodable date-range filter ignored");
                true
            }
        },
    }
}

/// Case-insensitive substring test used by text filters and search.
pub fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}
