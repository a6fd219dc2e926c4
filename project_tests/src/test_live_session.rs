//! # Live Sync Session Test Runner
//!
//! Drives a full synchronization session against a running backend. This is
//! a manual integration check, not part of the unit suite: point it at a
//! reachable endpoint and watch the updates arrive.
//!
//! ```text
//! test_live_session --host 10.0.0.7 --port 8080 \
//!     --item kitchen.light --series "kitchen.temp.sensor.1h.now.100" \
//!     --realtime --watch-secs 30
//! ```

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use lib_homeio::{
    EndpointConfig, NotifySink, Session, TransportFailure, UpdatePayload, WidgetBridge,
};

#[derive(Parser, Debug)]
struct Args {
    /// Backend host.
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Backend port; omitted means the scheme default.
    #[arg(long)]
    port: Option<u16>,

    /// Identifier to display (repeatable).
    #[arg(long = "item")]
    items: Vec<String>,

    /// Series specifier to plot (repeatable).
    #[arg(long = "series")]
    series: Vec<String>,

    /// Open push subscriptions for every item.
    #[arg(long)]
    realtime: bool,

    /// How long to watch for push updates before shutting down.
    #[arg(long, default_value_t = 30)]
    watch_secs: u64,
}

/// Console stand-in for the widget registry: prints every update.
struct ConsoleBridge {
    items: Vec<String>,
    series: Vec<String>,
}

impl WidgetBridge for ConsoleBridge {
    fn active_items(&self) -> Vec<String> {
        self.items.clone()
    }

    fn active_series(&self) -> Vec<String> {
        self.series.clone()
    }

    fn update(&self, key: &str, payload: UpdatePayload) {
        match payload {
            UpdatePayload::Scalar(value) => println!("⇒ {} = {}", key, value),
            UpdatePayload::Series(points) => {
                println!("⇒ {} = {} points", key, points.len());
            }
        }
    }
}

/// Console stand-in for the notification subsystem.
struct ConsoleNotify;

impl NotifySink for ConsoleNotify {
    fn report_transport_failure(&self, failure: TransportFailure) {
        eprintln!(
            "✗ {} failed for '{}': {}",
            failure.operation, failure.target, failure.detail
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lib_homeio::loggers::init();
    let args = Args::parse();

    let config = EndpointConfig::new(args.host.clone(), args.port);
    println!("--- Starting Live Session Test against {} ---", config);

    let bridge = Arc::new(ConsoleBridge {
        items: args.items.clone(),
        series: args.series.clone(),
    });
    let session = Session::new(config, bridge, Arc::new(ConsoleNotify))?;

    println!(
        "\n[Step 1] start(realtime = {}): {} item(s), {} series",
        args.realtime,
        args.items.len(),
        args.series.len()
    );
    session.start(args.realtime).await;

    println!(
        "\n[Step 2] Open subscriptions: {}",
        session.items().open_subscriptions()
    );

    if args.realtime {
        println!("\n[Step 3] Watching push updates for {}s...", args.watch_secs);
        tokio::time::sleep(Duration::from_secs(args.watch_secs)).await;
    }

    session.shutdown();
    println!("\n--- Session shut down cleanly ---");
    Ok(())
}
