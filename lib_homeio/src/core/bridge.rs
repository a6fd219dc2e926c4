//! Collaborator seams: the widget registry the driver publishes into and
//! the notification subsystem that consumes transport failures. Both are
//! external to this layer and consumed through traits.

use crate::core::value::ItemValue;

/// One plotted sample: `(unix_ms, value)`.
pub type PlotPoint = (i64, f64);

/// What an update carries: a scalar for an item widget, a point sequence
/// for a plot widget.
#[derive(Debug, Clone, PartialEq)]
pub enum UpdatePayload {
    Scalar(ItemValue),
    Series(Vec<PlotPoint>),
}

/// The widget registry consumed by the driver.
///
/// `update` is keyed by either an identifier (scalar payloads) or a full
/// series specifier string (series payloads).
pub trait WidgetBridge: Send + Sync {
    /// Identifiers currently bound to displayed widgets.
    fn active_items(&self) -> Vec<String>;
    /// Raw series specifier strings currently bound to plot widgets.
    fn active_series(&self) -> Vec<String>;
    /// Publishes a new value or point sequence to every bound widget.
    fn update(&self, key: &str, payload: UpdatePayload);
}

/// Context handed to the notification collaborator when a transport call
/// fails. Widgets simply do not update on failure; no error value enters
/// the data model.
#[derive(Debug, Clone)]
pub struct TransportFailure {
    /// Which operation failed ("read", "write", "history query", ...).
    pub operation: &'static str,
    /// Identifier or series specifier the operation targeted.
    pub target: String,
    /// Human-readable failure detail.
    pub detail: String,
}

/// The notification/error-display subsystem consumed by the driver.
pub trait NotifySink: Send + Sync {
    fn report_transport_failure(&self, failure: TransportFailure);
}

/// Fallback sink routing failures to the process log; useful for headless
/// deployments and the test runners.
#[derive(Debug, Default)]
pub struct LogNotifySink;

impl NotifySink for LogNotifySink {
    fn report_transport_failure(&self, failure: TransportFailure) {
        log::error!(
            "transport failure during {} for '{}': {}",
            failure.operation,
            failure.target,
            failure.detail
        );
    }
}
