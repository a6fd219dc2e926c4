//! # Item Synchronizer
//!
//! Per-identifier read/write/subscribe operations. Owns the mapping from
//! identifier to open push subscription and enforces its one invariant:
//! at most one open subscription per identifier at any time.
//!
//! State machine per identifier: `Idle -> Reading -> Idle` on read, and,
//! once realtime is enabled, `Idle -> Subscribed`, terminal until
//! teardown.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::core::bridge::{NotifySink, TransportFailure, UpdatePayload, WidgetBridge};
use crate::core::series_cache::SeriesCache;
use crate::core::series_fetch::SeriesFetcher;
use crate::core::value::ItemValue;
use crate::retrieve::http_io::HttpIo;

pub struct ItemSync {
    io: Arc<HttpIo>,
    bridge: Arc<dyn WidgetBridge>,
    notify: Arc<dyn NotifySink>,
    cache: Arc<SeriesCache>,
    fetcher: Arc<SeriesFetcher>,
    /// Minimum elapsed seconds before a push event may trigger a series
    /// re-fetch for the live-tracking series of its identifier.
    refetch_min_secs: u64,
    // identifier -> (generation, token); the generation lets a finished
    // reader task drop only its own table entry, never a successor's.
    subscriptions: Mutex<HashMap<String, (u64, CancellationToken)>>,
    next_gen: AtomicU64,
}

impl ItemSync {
    pub fn new(
        io: Arc<HttpIo>,
        bridge: Arc<dyn WidgetBridge>,
        notify: Arc<dyn NotifySink>,
        cache: Arc<SeriesCache>,
        fetcher: Arc<SeriesFetcher>,
        refetch_min_secs: u64,
    ) -> Self {
        Self {
            io,
            bridge,
            notify,
            cache,
            fetcher,
            refetch_min_secs,
            subscriptions: Mutex::new(HashMap::new()),
            next_gen: AtomicU64::new(0),
        }
    }

    /// Reads one item and publishes the value to its bound widgets.
    ///
    /// On failure the widgets are left untouched and the failure is
    /// surfaced; there is no automatic retry. Recovery is the next push
    /// message or scheduled poll.
    pub async fn read(&self, item: &str) {
        log::debug!("read '{}'", item);
        match self.io.fetch_value(item).await {
            Ok(value) => self.bridge.update(item, UpdatePayload::Scalar(value)),
            Err(e) => self.notify.report_transport_failure(TransportFailure {
                operation: "read",
                target: item.to_string(),
                detail: e.to_string(),
            }),
        }
    }

    /// Writes one item and, on acknowledgement, optimistically publishes the
    /// caller-supplied value without waiting for a confirming read.
    ///
    /// An empty value is still sent, not filtered; choosing not to write a
    /// sentinel "no change" value is the caller's responsibility. A failed
    /// write performs no local update.
    pub async fn write(&self, item: &str, value: ItemValue) {
        log::debug!("write '{}' = {}", item, value);
        match self.io.send_value(item, &value).await {
            Ok(()) => self.bridge.update(item, UpdatePayload::Scalar(value)),
            Err(e) => self.notify.report_transport_failure(TransportFailure {
                operation: "write",
                target: item.to_string(),
                detail: e.to_string(),
            }),
        }
    }

    /// Opens the push subscription for one item, superseding any existing
    /// one (the old reader is cancelled before the new entry takes its
    /// place, which keeps the one-subscription-per-identifier invariant).
    pub fn enable_realtime(self: &Arc<Self>, item: &str) {
        let token = CancellationToken::new();
        let generation = self.next_gen.fetch_add(1, Ordering::Relaxed);
        {
            let mut subs = self
                .subscriptions
                .lock()
                .expect("subscription table lock poisoned");
            if let Some((_, old)) = subs.insert(item.to_string(), (generation, token.clone())) {
                log::warn!("superseding open change subscription for '{}'", item);
                old.cancel();
            }
        }

        let sync = Arc::clone(self);
        let item = item.to_string();
        tokio::spawn(async move {
            sync.run_subscription(&item, generation, token).await;
        });
    }

    /// Closes the push subscription for one item, if open.
    pub fn close_realtime(&self, item: &str) {
        let mut subs = self
            .subscriptions
            .lock()
            .expect("subscription table lock poisoned");
        if let Some((_, token)) = subs.remove(item) {
            token.cancel();
        }
    }

    /// Cancels every open subscription. Explicit teardown is the
    /// precondition for starting the run loop a second time.
    pub fn shutdown(&self) {
        let mut subs = self
            .subscriptions
            .lock()
            .expect("subscription table lock poisoned");
        for (item, (_, token)) in subs.drain() {
            log::debug!("closing change subscription for '{}'", item);
            token.cancel();
        }
    }

    /// Number of currently open push subscriptions.
    pub fn open_subscriptions(&self) -> usize {
        self.subscriptions
            .lock()
            .expect("subscription table lock poisoned")
            .len()
    }

    async fn run_subscription(&self, item: &str, generation: u64, token: CancellationToken) {
        match self.io.subscribe_changes(item).await {
            Ok(mut stream) => {
                log::info!("change subscription open for '{}'", item);
                loop {
                    tokio::select! {
                        _ = token.cancelled() => {
                            log::debug!("change subscription for '{}' cancelled", item);
                            break;
                        }
                        next = stream.next_value() => match next {
                            Some(Ok(value)) => self.apply_push(item, value).await,
                            Some(Err(e)) => self.notify.report_transport_failure(TransportFailure {
                                operation: "push message",
                                target: item.to_string(),
                                detail: e.to_string(),
                            }),
                            None => {
                                log::warn!("change stream for '{}' closed by backend", item);
                                break;
                            }
                        }
                    }
                }
            }
            Err(e) => self.notify.report_transport_failure(TransportFailure {
                operation: "subscription open",
                target: item.to_string(),
                detail: e.to_string(),
            }),
        }

        // Drop the table entry only if it is still ours; a re-subscribe may
        // already have installed a successor under the same identifier.
        let mut subs = self
            .subscriptions
            .lock()
            .expect("subscription table lock poisoned");
        if subs.get(item).is_some_and(|(g, _)| *g == generation) {
            subs.remove(item);
        }
    }

    /// Applies one pushed value: publish to widgets exactly as `read` does,
    /// then, if this identifier is the live-tracking target of a series
    /// whose last fetch is older than the re-fetch threshold, trigger a
    /// series re-fetch.
    pub(crate) async fn apply_push(&self, item: &str, value: ItemValue) {
        log::debug!("push '{}' = {}", item, value);
        self.bridge.update(item, UpdatePayload::Scalar(value));

        if let Some(key) = self.cache.live_spec_for(item) {
            let now_ms = Utc::now().timestamp_millis();
            if self.cache.is_stale(&key, self.refetch_min_secs, now_ms) {
                self.fetcher.fetch_key(&key).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::value::ItemValue;
    use crate::testutil::{spawn_http_script, RecordingBridge, RecordingNotify};
    use url::Url;

    fn make_sync(
        base: &str,
        refetch_min_secs: u64,
    ) -> (
        Arc<ItemSync>,
        Arc<RecordingBridge>,
        Arc<RecordingNotify>,
        Arc<SeriesCache>,
    ) {
        let io = Arc::new(HttpIo::new(Url::parse(base).unwrap()));
        let bridge = Arc::new(RecordingBridge::new());
        let notify = Arc::new(RecordingNotify::default());
        let cache = Arc::new(SeriesCache::new());
        let fetcher = Arc::new(SeriesFetcher::new(
            Arc::clone(&io),
            Arc::clone(&cache),
            bridge.clone() as Arc<dyn WidgetBridge>,
            notify.clone() as Arc<dyn NotifySink>,
        ));
        let sync = Arc::new(ItemSync::new(
            io,
            bridge.clone() as Arc<dyn WidgetBridge>,
            notify.clone() as Arc<dyn NotifySink>,
            Arc::clone(&cache),
            fetcher,
            refetch_min_secs,
        ));
        (sync, bridge, notify, cache)
    }

    #[tokio::test]
    async fn read_publishes_value_to_widgets() {
        let (base, server) = spawn_http_script(vec![(200, "application/json", "21.5".into())]);
        let (sync, bridge, notify, _) = make_sync(&base, 60);

        sync.read("kitchen.temp").await;
        server.join().unwrap();

        let updates = bridge.updates.lock().unwrap();
        assert_eq!(
            *updates,
            vec![(
                "kitchen.temp".to_string(),
                UpdatePayload::Scalar(ItemValue::Number(21.5))
            )]
        );
        assert!(notify.failures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn successful_write_is_applied_optimistically() {
        let (base, server) = spawn_http_script(vec![(200, "application/json", "".into())]);
        let (sync, bridge, notify, _) = make_sync(&base, 60);

        sync.write("kitchen.light", ItemValue::Bool(true)).await;
        server.join().unwrap();

        let updates = bridge.updates.lock().unwrap();
        assert_eq!(
            *updates,
            vec![(
                "kitchen.light".to_string(),
                UpdatePayload::Scalar(ItemValue::Bool(true))
            )]
        );
        assert!(notify.failures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn failed_write_reports_and_later_read_still_works() {
        let (base, server) = spawn_http_script(vec![
            (404, "text/plain", "no such item".into()),
            (200, "application/json", "1".into()),
        ]);
        let (sync, bridge, notify, _) = make_sync(&base, 60);

        sync.write("kitchen.light", ItemValue::Number(1.0)).await;
        assert_eq!(bridge.updates.lock().unwrap().len(), 0);
        assert_eq!(notify.failures.lock().unwrap().len(), 1);
        assert_eq!(notify.failures.lock().unwrap()[0].operation, "write");

        sync.read("kitchen.light").await;
        server.join().unwrap();

        let updates = bridge.updates.lock().unwrap();
        assert_eq!(
            *updates,
            vec![(
                "kitchen.light".to_string(),
                UpdatePayload::Scalar(ItemValue::Number(1.0))
            )]
        );
        assert_eq!(notify.failures.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn at_most_one_subscription_per_item() {
        // The table entry is installed synchronously; on the current-thread
        // test runtime the reader tasks cannot run before the next await.
        let (sync, _, _, _) = make_sync("http://127.0.0.1:9/", 60);

        sync.enable_realtime("kitchen.light");
        sync.enable_realtime("kitchen.light");
        assert_eq!(sync.open_subscriptions(), 1);

        sync.enable_realtime("hall.light");
        assert_eq!(sync.open_subscriptions(), 2);

        sync.close_realtime("kitchen.light");
        assert_eq!(sync.open_subscriptions(), 1);

        sync.shutdown();
        assert_eq!(sync.open_subscriptions(), 0);
    }

    #[tokio::test]
    async fn push_refetches_live_series_only_when_stale() {
        let key = "kitchen.temp.sensor.1h.now.100";
        let (base, server) = spawn_http_script(vec![(200, "application/json", "[]".into())]);
        let (sync, bridge, notify, cache) = make_sync(&base, 60);
        cache.set_live("kitchen.temp", key);

        // Entry has never been fetched, so the first push triggers a fetch.
        sync.apply_push("kitchen.temp", ItemValue::Number(21.0)).await;
        server.join().unwrap();
        assert_eq!(bridge.scalar_count(), 1);
        assert_eq!(bridge.series_count(), 1);
        assert!(cache.last_fetch(key).is_some());

        // Freshly fetched: the next push publishes the scalar but must not
        // re-fetch inside the threshold.
        sync.apply_push("kitchen.temp", ItemValue::Number(21.5)).await;
        assert_eq!(bridge.scalar_count(), 2);
        assert_eq!(bridge.series_count(), 1);
        assert!(notify.failures.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn push_for_item_without_live_series_only_updates_widgets() {
        let (sync, bridge, _, _) = make_sync("http://127.0.0.1:9/", 60);

        sync.apply_push("hall.light", ItemValue::Bool(false)).await;
        assert_eq!(bridge.scalar_count(), 1);
        assert_eq!(bridge.series_count(), 0);
    }
}
