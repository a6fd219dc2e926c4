//! # Sync Session
//!
//! One explicit context object per backend connection: base endpoint,
//! transport, series cache, item synchronizer and series fetcher, plus the
//! collaborator handles everything publishes into. There are no ambient
//! globals; components hold `Arc`s handed out here.

use std::collections::HashSet;
use std::sync::Arc;

use crate::configs::config_endpoint::{ConfigError, EndpointConfig};
use crate::core::bridge::{NotifySink, WidgetBridge};
use crate::core::item_sync::ItemSync;
use crate::core::series_cache::SeriesCache;
use crate::core::series_fetch::SeriesFetcher;
use crate::core::series_spec::SeriesSpec;
use crate::retrieve::http_io::HttpIo;

pub struct Session {
    config: EndpointConfig,
    cache: Arc<SeriesCache>,
    fetcher: Arc<SeriesFetcher>,
    items: Arc<ItemSync>,
    bridge: Arc<dyn WidgetBridge>,
}

impl Session {
    /// Wires up a session against the configured base endpoint.
    pub fn new(
        config: EndpointConfig,
        bridge: Arc<dyn WidgetBridge>,
        notify: Arc<dyn NotifySink>,
    ) -> Result<Self, ConfigError> {
        let io = Arc::new(HttpIo::new(config.base_url()?));
        let cache = Arc::new(SeriesCache::new());
        let fetcher = Arc::new(SeriesFetcher::new(
            Arc::clone(&io),
            Arc::clone(&cache),
            Arc::clone(&bridge),
            Arc::clone(&notify),
        ));
        let items = Arc::new(ItemSync::new(
            io,
            Arc::clone(&bridge),
            notify,
            Arc::clone(&cache),
            Arc::clone(&fetcher),
            config.refetch_min_secs,
        ));

        Ok(Self {
            config,
            cache,
            fetcher,
            items,
            bridge,
        })
    }

    pub fn items(&self) -> &Arc<ItemSync> {
        &self.items
    }

    pub fn series_cache(&self) -> &Arc<SeriesCache> {
        &self.cache
    }

    pub fn fetcher(&self) -> &Arc<SeriesFetcher> {
        &self.fetcher
    }

    /// Drives startup against the current widget set.
    ///
    /// Every displayed identifier gets one immediate read and, when
    /// `realtime` is set, a push subscription. Every valid plotted series is
    /// fetched once; series whose window ends at "now" are flagged
    /// live-tracking (per identifier, last writer wins) before any fetch
    /// runs. One failed identifier or series never blocks the others.
    ///
    /// Calling `start` twice re-issues all reads and fetches and would open
    /// duplicate subscriptions; `shutdown` first is the caller's
    /// precondition, not handled here.
    pub async fn start(&self, realtime: bool) {
        log::info!(
            "starting sync session against {} (realtime: {})",
            self.config,
            realtime
        );

        for item in self.bridge.active_items() {
            self.items.read(&item).await;
            if realtime {
                self.items.enable_realtime(&item);
            }
        }

        let mut seen: HashSet<String> = HashSet::new();
        let mut specs: Vec<SeriesSpec> = Vec::new();
        for raw in self.bridge.active_series() {
            if !seen.insert(raw.clone()) {
                continue;
            }
            match SeriesSpec::parse(&raw) {
                Ok(spec) => {
                    if spec.is_live() {
                        self.cache.set_live(&spec.item, spec.key());
                    }
                    specs.push(spec);
                }
                Err(e) => log::warn!("skipping plot widget: {}", e),
            }
        }

        for spec in &specs {
            self.fetcher.fetch(spec).await;
        }
    }

    /// Tears down all push subscriptions.
    pub fn shutdown(&self) {
        self.items.shutdown();
    }
}
