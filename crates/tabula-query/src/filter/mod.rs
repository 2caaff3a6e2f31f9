//! Filter control routing.
//!
//! A column declares one [`FilterSpec`]; [`FilterSpec::route`] dispatches it to
//! the control that translates between the control's native value and the
//! single string stored in `filters[key]`:
//!
//! | kind         | stored string                                  |
//! |--------------|------------------------------------------------|
//! | text         | the text itself                                |
//! | select       | the option value                               |
//! | multi-select | option values joined by `,`                    |
//! | date         | `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM[:SS]` with time |
//! | date-range   | `<from>|<to>`, either side may be empty        |
//!
//! An empty string always means "no filter".

mod controls;
mod options;
mod predicate;

use serde::{Deserialize, Serialize};

pub use controls::{
    DateBounds, DateControl, DatePrecision, DateRangeControl, MultiSelectControl, SelectControl,
    TextControl,
};
pub use options::{OptionSearch, SearchTicket};
pub use predicate::contains_ignore_case;

use crate::FilterError;

/// One selectable option of a select or multi-select filter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOption {
    pub value: String,
    pub label: String,
}

impl FilterOption {
    pub fn new(value: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            label: label.into(),
        }
    }
}

/// Declared filter of a column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum FilterSpec {
    Text {
        #[serde(default)]
        placeholder: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Select {
        #[serde(default)]
        options: Vec<FilterOption>,
        #[serde(default)]
        placeholder: Option<String>,
        /// Options are searched server-side through `onSearchChange`.
        #[serde(default)]
        searchable: bool,
    },
    #[serde(rename_all = "camelCase")]
    MultiSelect {
        #[serde(default)]
        options: Vec<FilterOption>,
        #[serde(default)]
        placeholder: Option<String>,
        #[serde(default)]
        searchable: bool,
    },
    #[serde(rename_all = "camelCase")]
    Date {
        #[serde(default)]
        with_time: bool,
        #[serde(default)]
        with_seconds: bool,
        #[serde(default)]
        placeholder: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    DateRange {
        #[serde(default)]
        with_time: bool,
        #[serde(default)]
        with_seconds: bool,
        #[serde(default)]
        from_label: Option<String>,
        #[serde(default)]
        to_label: Option<String>,
    },
}

/// When a control's edits reach the query state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitMode {
    /// Wait for the debounce delay (typing).
    Debounced,
    /// Apply synchronously (picking from a list or calendar).
    Immediate,
}

/// A decoded filter value, tagged by the control that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Single(Option<String>),
    Multi(Vec<String>),
    Date(Option<chrono::NaiveDateTime>),
    DateRange(DateBounds),
}

impl FilterValue {
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Single(_) => "select",
            Self::Multi(_) => "multi-select",
            Self::Date(_) => "date",
            Self::DateRange(_) => "date-range",
        }
    }
}

/// The control a [`FilterSpec`] dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutedControl {
    Text(TextControl),
    Select(SelectControl),
    MultiSelect(MultiSelectControl),
    Date(DateControl),
    DateRange(DateRangeControl),
}

impl FilterSpec {
    pub fn text() -> Self {
        Self::Text { placeholder: None }
    }

    pub fn select(options: Vec<FilterOption>) -> Self {
        Self::Select {
            options,
            placeholder: None,
            searchable: false,
        }
    }

    pub fn multi_select(options: Vec<FilterOption>) -> Self {
        Self::MultiSelect {
            options,
            placeholder: None,
            searchable: false,
        }
    }

    pub fn date(precision: DatePrecision) -> Self {
        Self::Date {
            with_time: precision != DatePrecision::Day,
            with_seconds: precision == DatePrecision::Second,
            placeholder: None,
        }
    }

    pub fn date_range(precision: DatePrecision) -> Self {
        Self::DateRange {
            with_time: precision != DatePrecision::Day,
            with_seconds: precision == DatePrecision::Second,
            from_label: None,
            to_label: None,
        }
    }

    /// Dispatches on the declared kind.
    pub fn route(&self) -> RoutedControl {
        match self {
            Self::Text { .. } => RoutedControl::Text(TextControl),
            Self::Select { .. } => RoutedControl::Select(SelectControl),
            Self::MultiSelect { .. } => RoutedControl::MultiSelect(MultiSelectControl),
            Self::Date {
                with_time,
                with_seconds,
                ..
            } => RoutedControl::Date(DateControl::new(DatePrecision::from_flags(
                *with_time,
                *with_seconds,
            ))),
            Self::DateRange {
                with_time,
                with_seconds,
                ..
            } => RoutedControl::DateRange(DateRangeControl::new(DatePrecision::from_flags(
                *with_time,
                *with_seconds,
            ))),
        }
    }

    /// Static options, empty for free-text and date kinds.
    pub fn options(&self) -> &[FilterOption] {
        match self {
            Self::Select { options, .. } | Self::MultiSelect { options, .. } => options,
            _ => &[],
        }
    }

    /// Label for an option value, falling back to the value itself.
    pub fn option_label<'a>(&'a self, value: &'a str) -> &'a str {
        self.options()
            .iter()
            .find(|o| o.value == value)
            .map_or(value, |o| o.label.as_str())
    }

    pub fn is_searchable(&self) -> bool {
        matches!(
            self,
            Self::Select {
                searchable: true,
                ..
            } | Self::MultiSelect {
                searchable: true,
                ..
            }
        )
    }
}

impl RoutedControl {
    pub fn commit_mode(&self) -> CommitMode {
        match self {
            Self::Text(_) => CommitMode::Debounced,
            _ => CommitMode::Immediate,
        }
    }

    pub fn decode(&self, raw: &str) -> Result<FilterValue, FilterError> {
        Ok(match self {
            Self::Text(c) => FilterValue::Text(c.decode(raw)),
            Self::Select(c) => FilterValue::Single(c.decode(raw)),
            Self::MultiSelect(c) => FilterValue::Multi(c.decode(raw)),
            Self::Date(c) => FilterValue::Date(c.decode(raw)?),
            Self::DateRange(c) => FilterValue::DateRange(c.decode(raw)?),
        })
    }

    pub fn encode(&self, value: &FilterValue) -> Result<String, FilterError> {
        match (self, value) {
            (Self::Text(c), FilterValue::Text(v)) => Ok(c.encode(v)),
            (Self::Select(c), FilterValue::Single(v)) => Ok(c.encode(v.as_deref())),
            (Self::MultiSelect(c), FilterValue::Multi(v)) => Ok(c.encode(v)),
            (Self::Date(c), FilterValue::Date(v)) => Ok(c.encode(v.as_ref())),
            (Self::DateRange(c), FilterValue::DateRange(v)) => c.encode(v),
            (control, value) => Err(FilterError::KindMismatch {
                control: control.name(),
                value: value.kind_name(),
            }),
        }
    }

    /// Whether a row whose field reads `field` passes the stored filter `raw`.
    ///
    /// An empty `raw` always passes; a value that fails to decode passes too,
    /// since the server applied the same filter and is the source of truth.
    pub fn matches(&self, raw: &str, field: Option<&str>) -> bool {
        predicate::matches(self, raw, field)
    }

    pub const fn name(&self) -> &'static str {
        match self {
            Self::Text(_) => "text",
            Self::Select(_) => "select",
            Self::MultiSelect(_) => "multi-select",
            Self::Date(_) => "date",
            Self::DateRange(_) => "date-range",
        }
    }
}
