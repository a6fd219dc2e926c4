//! Synchronization core: session context, item synchronizer, series cache
//! and fetcher, specifier parsing, the scalar value model and the
//! collaborator seams.

pub mod bridge;
pub mod item_sync;
pub mod series_cache;
pub mod series_fetch;
pub mod series_spec;
pub mod session;
pub mod value;
