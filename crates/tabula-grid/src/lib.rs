#![deny(unsafe_code)]

//! Grid composition for tabula.
//!
//! - [`loader`]: the `query -> page` contract and the failure boundary that
//!   turns a failed fetch into an empty, well-formed page.
//! - [`decode`]: lenient decoding of loader JSON.
//! - [`fetch`]: generation counter so a slow stale response never replaces a
//!   newer one.
//! - [`cached`]: loader backed by the shared query cache.
//! - [`shell`] and [`footer`]: the renderable grid state and its pagination
//!   footer.

pub mod cached;
pub mod column;
pub mod decode;
pub mod error;
pub mod fetch;
pub mod footer;
pub mod loader;
pub mod shell;

pub use cached::CachedLoader;
pub use column::ColumnDef;
pub use decode::decode_page;
pub use error::LoaderError;
pub use fetch::{FetchTicket, FetchTracker};
pub use footer::{PageLink, PaginationFooter};
pub use loader::{JsonLoader, LoadFuture, Loader, SafeLoader};
pub use shell::{Grid, RenderedRow, ShellPhase};
