#![deny(unsafe_code)]

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Timelike};

use crate::FilterError;

const DAY_FORMAT: &str = "%Y-%m-%d";
const MINUTE_FORMAT: &str = "%Y-%m-%dT%H:%M";
const SECOND_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";
const RANGE_SEPARATOR: char = '|';
const MULTI_SEPARATOR: char = ',';

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TextControl;

impl TextControl {
    pub fn decode(&self, raw: &str) -> String {
        raw.to_string()
    }

    pub fn encode(&self, value: &str) -> String {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SelectControl;

impl SelectControl {
    pub fn decode(&self, raw: &str) -> Option<String> {
        (!raw.is_empty()).then(|| raw.to_string())
    }

    pub fn encode(&self, value: Option<&str>) -> String {
        value.unwrap_or_default().to_string()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MultiSelectControl;

impl MultiSelectControl {
    pub fn decode(&self, raw: &str) -> Vec<String> {
        raw.split(MULTI_SEPARATOR)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn encode(&self, values: &[String]) -> String {
        values
            .iter()
            .filter(|v| !v.is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Adds `value` if absent, removes it if present.
    pub fn toggle(&self, raw: &str, value: &str) -> String {
        let mut values = self.decode(raw);
        if let Some(pos) = values.iter().position(|v| v == value) {
            values.remove(pos);
        } else {
            values.push(value.to_string());
        }
        self.encode(&values)
    }
}

/// Precision a date control edits and stores at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum DatePrecision {
    #[default]
    Day,
    Minute,
    Second,
}

impl DatePrecision {
    pub fn from_flags(with_time: bool, with_seconds: bool) -> Self {
        match (with_time, with_seconds) {
            (false, _) => Self::Day,
            (true, false) => Self::Minute,
            (true, true) => Self::Second,
        }
    }

    const fn format(self) -> &'static str {
        match self {
            Self::Day => DAY_FORMAT,
            Self::Minute => MINUTE_FORMAT,
            Self::Second => SECOND_FORMAT,
        }
    }

    /// Drops the components finer than this precision.
    pub fn truncate(self, value: NaiveDateTime) -> NaiveDateTime {
        match self {
            Self::Day => value.date().and_time(NaiveTime::MIN),
            Self::Minute => value
                .date()
                .and_hms_opt(value.hour(), value.minute(), 0)
                .unwrap_or(value),
            Self::Second => value.with_nanosecond(0).unwrap_or(value),
        }
    }
}

/// Parses a stored or row-side date in any of the accepted shapes.
///
/// Accepts `YYYY-MM-DD`, `YYYY-MM-DDTHH:MM`, `YYYY-MM-DDTHH:MM:SS` (a space
/// may replace the `T`) and full RFC 3339 timestamps, which are read in UTC.
pub(crate) fn parse_loose(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_utc());
    }
    let normalized = value.replacen(' ', "T", 1);
    for format in [SECOND_FORMAT, "%Y-%m-%dT%H:%M:%S%.f", MINUTE_FORMAT] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(&normalized, format) {
            return Some(dt);
        }
    }
    NaiveDate::parse_from_str(value, DAY_FORMAT)
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateControl {
    pub precision: DatePrecision,
}

impl DateControl {
    pub fn new(precision: DatePrecision) -> Self {
        Self { precision }
    }

    pub fn decode(&self, raw: &str) -> Result<Option<NaiveDateTime>, FilterError> {
        if raw.trim().is_empty() {
            return Ok(None);
        }
        parse_loose(raw)
            .map(|dt| Some(self.precision.truncate(dt)))
            .ok_or_else(|| FilterError::InvalidDate {
                value: raw.to_string(),
            })
    }

    pub fn encode(&self, value: Option<&NaiveDateTime>) -> String {
        value.map_or_else(String::new, |dt| {
            dt.format(self.precision.format()).to_string()
        })
    }
}

/// Inclusive bounds of a date-range filter; either side may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateBounds {
    pub from: Option<NaiveDateTime>,
    pub to: Option<NaiveDateTime>,
}

impl DateBounds {
    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRangeControl {
    pub precision: DatePrecision,
}

impl DateRangeControl {
    pub fn new(precision: DatePrecision) -> Self {
        Self { precision }
    }

    pub fn decode(&self, raw: &str) -> Result<DateBounds, FilterError> {
        if raw.trim().is_empty() {
            return Ok(DateBounds::default());
        }
        let Some((from, to)) = raw.split_once(RANGE_SEPARATOR) else {
            return Err(FilterError::InvalidRange {
                value: raw.to_string(),
            });
        };
        let side = DateControl::new(self.precision);
        let bounds = DateBounds {
            from: side.decode(from)?,
            to: side.decode(to)?,
        };
        Self::check_order(&bounds)?;
        Ok(bounds)
    }

    pub fn encode(&self, bounds: &DateBounds) -> Result<String, FilterError> {
        if bounds.is_unbounded() {
            return Ok(String::new());
        }
        Self::check_order(bounds)?;
        let side = DateControl::new(self.precision);
        Ok(format!(
            "{}{RANGE_SEPARATOR}{}",
            side.encode(bounds.from.as_ref()),
            side.encode(bounds.to.as_ref())
        ))
    }

    /// Whether `value` falls inside `bounds`.
    ///
    /// The upper bound covers its whole precision unit, so a day-precision
    /// `to` of `2024-03-01` includes `2024-03-01T23:59:59`.
    pub fn contains(&self, bounds: &DateBounds, value: NaiveDateTime) -> bool {
        let value = self.precision.truncate(value);
        bounds.from.is_none_or(|from| value >= from) && bounds.to.is_none_or(|to| value <= to)
    }

    fn check_order(bounds: &DateBounds) -> Result<(), FilterError> {
        match (bounds.from, bounds.to) {
            (Some(from), Some(to)) if from > to => Err(FilterError::InvertedRange {
                from: from.to_string(),
                to: to.to_string(),
            }),
            _ => Ok(()),
        }
    }
}
