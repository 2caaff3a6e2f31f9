//! Out-of-band mutation events consumed by the cache reconciler.

use serde::{Deserialize, Serialize};

use crate::{RowId, Status};

/// A row was created or changed; `previous_status` is `None` for creations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertEvent<R> {
    pub row: R,
    pub previous_status: Option<Status>,
    pub new_status: Status,
}

/// A row was permanently removed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveEvent {
    pub id: RowId,
    pub previous_status: Status,
}

#[derive(Debug, Clone, PartialEq)]
pub enum MutationEvent<R> {
    Upsert(UpsertEvent<R>),
    BatchUpsert(Vec<UpsertEvent<R>>),
    Remove(RemoveEvent),
}

impl<R> MutationEvent<R> {
    /// Short name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Upsert(_) => "upsert",
            Self::BatchUpsert(_) => "batch-upsert",
            Self::Remove(_) => "remove",
        }
    }
}
