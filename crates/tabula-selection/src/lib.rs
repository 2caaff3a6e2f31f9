//! Selection reconciler for paginated grids.
//!
//! # Architecture
//!
//! A [`Selection`] is a small reducer: every [`SelectionAction`] produces a new
//! [`SelectionSet`] (or keeps the old allocation when nothing changed) and,
//! when the set changed, reports it through the change callback.
//!
//! Ownership is decided once, at construction:
//! - [`Selection::internal`] - the engine owns the set; the callback is optional.
//! - [`Selection::external`] - the caller owns the set and receives every new
//!   value; the engine keeps a mirror that [`Selection::sync_external`]
//!   overwrites whenever the caller's value changes.
//!
//! "Visible" always means the rows of the current view handed to each call;
//! bulk operations never touch ids outside that slice.

#![deny(unsafe_code)]

mod selection;
mod set;

pub use selection::{
    HeaderState, Selection, SelectionAction, SelectionChange, SelectionMode, VisibleRow,
};
pub use set::SelectionSet;
