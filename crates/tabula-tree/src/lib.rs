#![deny(unsafe_code)]

//! Hierarchical view over a flat row list.
//!
//! The hierarchy is never stored. Every data change rebuilds a [`FlatTree`]
//! from the rows' parent pointers; [`ExpandedSet`] decides which of those rows
//! are visible.

mod expanded;
mod flatten;
mod state;

pub use expanded::ExpandedSet;
pub use flatten::{FlatTree, TreeNode, flatten};
pub use state::{TreeAction, TreeConfig, TreeState};
