// Declare the modules to re-export
pub mod configs;
pub mod connections;
pub mod core;
pub mod loggers;
pub mod retrieve;

// Re-export the session-facing surface
pub use crate::configs::config_endpoint::{ConfigError, EndpointConfig};
pub use crate::connections::flatfile::{FlatFileError, FlatFileStore};
pub use crate::core::bridge::{
    LogNotifySink, NotifySink, PlotPoint, TransportFailure, UpdatePayload, WidgetBridge,
};
pub use crate::core::item_sync::ItemSync;
pub use crate::core::series_cache::SeriesCache;
pub use crate::core::series_fetch::SeriesFetcher;
pub use crate::core::series_spec::{SeriesSpec, SpecError, WindowEnd};
pub use crate::core::session::Session;
pub use crate::core::value::ItemValue;
pub use crate::retrieve::http_io::{ChangeStream, HistoryRow, HttpIo, IoError};

#[cfg(test)]
pub(crate) mod testutil;
