//! Shared data model for the tabula grid engine.
//!
//! Rows are opaque caller records; the engine only needs a stable identifier
//! and string views of individual fields. Everything else in the workspace
//! builds on the types defined here.

pub mod error;
pub mod event;
pub mod ids;
pub mod page;
pub mod params;
pub mod row;
pub mod settings;
pub mod status;

pub use error::{ModelError, Result};
pub use event::{MutationEvent, RemoveEvent, UpsertEvent};
pub use ids::{ResourceTag, RowId};
pub use page::{Page, total_pages_for};
pub use params::{AdminListParams, Filters};
pub use row::{Row, RowAccess, RowKey};
pub use settings::GridSettings;
pub use status::Status;
