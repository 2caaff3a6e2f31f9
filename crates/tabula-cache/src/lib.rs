#![deny(unsafe_code)]

//! Query cache and realtime reconciliation for the tabula grid.
//!
//! The cache holds one [`Page`](tabula_model::Page) per `(resource, params)`
//! pair the grid has fetched. Push-channel events are decoded by [`socket`] and
//! folded into every matching entry by the [`Reconciler`], so the next render
//! shows the change without a refetch.
//!
//! All writes for one event happen under a single borrow of the cache; the
//! [`actor`] serializes events so two reconciliation passes never interleave.

pub mod actor;
pub mod error;
pub mod matcher;
pub mod reconcile;
pub mod socket;
pub mod store;

pub use actor::{ReconcileStats, ReconcilerHandle, SharedCache, lock_cache, spawn_reconciler};
pub use error::{EventError, Result};
pub use matcher::ResourceMatcher;
pub use reconcile::Reconciler;
pub use socket::{SocketMessage, decode_event};
pub use store::{CacheEntry, CacheKey, QueryCache};
