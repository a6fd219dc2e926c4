//! # Series Fetcher
//!
//! Turns a series specifier into one published point sequence: computes the
//! query window, requests history, normalizes the rows, stamps the series
//! cache and hands the result to the plot widgets.

use std::sync::Arc;

use chrono::Utc;

use crate::core::bridge::{NotifySink, PlotPoint, TransportFailure, UpdatePayload, WidgetBridge};
use crate::core::series_cache::SeriesCache;
use crate::core::series_spec::SeriesSpec;
use crate::retrieve::http_io::{HistoryRow, HttpIo};

pub struct SeriesFetcher {
    io: Arc<HttpIo>,
    cache: Arc<SeriesCache>,
    bridge: Arc<dyn WidgetBridge>,
    notify: Arc<dyn NotifySink>,
}

impl SeriesFetcher {
    pub fn new(
        io: Arc<HttpIo>,
        cache: Arc<SeriesCache>,
        bridge: Arc<dyn WidgetBridge>,
        notify: Arc<dyn NotifySink>,
    ) -> Self {
        Self {
            io,
            cache,
            bridge,
            notify,
        }
    }

    /// Fetches one series and publishes the normalized points keyed by the
    /// full specifier string.
    ///
    /// A transport failure aborts the fetch, leaves the entry's fetch time
    /// unchanged (the next staleness check still sees it stale) and is
    /// surfaced to the notify sink.
    pub async fn fetch(&self, spec: &SeriesSpec) {
        log::debug!("fetching series '{}'", spec.key());
        let now_ms = Utc::now().timestamp_millis();
        let (window_start, window_end) = spec.window(now_ms);

        let rows = match self.io.query_history(&spec.item, spec.limit).await {
            Ok(rows) => rows,
            Err(e) => {
                self.notify.report_transport_failure(TransportFailure {
                    operation: "history query",
                    target: spec.key().to_string(),
                    detail: e.to_string(),
                });
                return;
            }
        };

        let points = normalize_rows(rows, window_start, window_end);
        self.cache.lookup_or_create(spec.key());
        self.cache.mark_fetched(spec.key(), now_ms);
        self.bridge
            .update(spec.key(), UpdatePayload::Series(points));
    }

    /// Re-parses a stored specifier key and fetches it. Used by the push
    /// path, which only keeps the raw string.
    pub async fn fetch_key(&self, raw: &str) {
        match SeriesSpec::parse(raw) {
            Ok(spec) => self.fetch(&spec).await,
            Err(e) => log::warn!("cannot re-fetch series: {}", e),
        }
    }
}

/// Maps rows to `(t, value)`, sorted strictly ascending by timestamp with
/// duplicate timestamps collapsed. An empty result set becomes the
/// two-point flat series over the window so plotting never receives an
/// empty sequence.
fn normalize_rows(rows: Vec<HistoryRow>, window_start_ms: i64, window_end_ms: i64) -> Vec<PlotPoint> {
    if rows.is_empty() {
        return vec![(window_start_ms, 0.0), (window_end_ms, 0.0)];
    }

    let mut points: Vec<PlotPoint> = rows
        .into_iter()
        .map(|row| (row.t, row.val.plot_number()))
        .collect();
    points.sort_by_key(|p| p.0);
    points.dedup_by_key(|p| p.0);
    points
}
