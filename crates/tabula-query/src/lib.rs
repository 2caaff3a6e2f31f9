#![deny(unsafe_code)]

//! Query state for the tabula grid.
//!
//! - [`QueryState`]: the `{page, limit, search, filters}` tuple that decides
//!   which page is wanted, with the reset-to-first-page rules.
//! - [`Debouncer`] and [`QueryController`]: turn keystrokes into settled
//!   query values so the loader runs once per settled value.
//! - [`filter`]: routes a column's declared filter kind to the control that
//!   encodes and decodes `filters[key]`.

pub mod controller;
pub mod debounce;
pub mod error;
pub mod filter;
pub mod sanitize;
pub mod state;

pub use controller::{InputTarget, QueryController};
pub use debounce::Debouncer;
pub use error::{FilterError, QueryError, Result};
pub use filter::{
    CommitMode, DateBounds, DatePrecision, FilterOption, FilterSpec, FilterValue, OptionSearch,
    RoutedControl, SearchTicket, contains_ignore_case,
};
pub use sanitize::{NoopSanitizer, Sanitizer};
pub use state::{QueryState, are_queries_equal};
