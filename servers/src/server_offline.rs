//! # Offline Flat-File Driver Service
//!
//! Serves the line-oriented `name = value` item store over HTTP as an
//! offline stand-in for a live home-automation backend. One route handles
//! both reads and writes:
//!
//! - `GET/POST /?item=a,b`        -> `{"a": "...", "b": "..."}`
//! - `GET/POST /?item=a,b&val=1`  -> writes, then returns the same map
//!
//! Requested names missing from the file map to an empty string. Writes
//! rewrite the whole file; concurrent requests race and the last writer
//! wins, which is accepted for an offline driver.

use std::collections::BTreeMap;
use std::env;
use std::sync::Arc;

use axum::extract::{Query, State};
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;
use tokio::net::TcpListener;

use lib_homeio::FlatFileStore;

#[derive(Debug, Deserialize)]
struct DriverParams {
    item: Option<String>,
    val: Option<String>,
}

async fn driver(
    State(store): State<Arc<FlatFileStore>>,
    Query(params): Query<DriverParams>,
) -> Json<BTreeMap<String, String>> {
    let item_list = params.item.unwrap_or_default();
    let items: Vec<&str> = item_list
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();
    // An empty val means read-only, same as no val at all.
    let val = params.val.as_deref().filter(|v| !v.is_empty());

    match store.request(&items, val) {
        Ok(map) => Json(map),
        Err(e) => {
            log::error!("flat-file request failed: {}", e);
            Json(BTreeMap::new())
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    lib_homeio::loggers::init();

    let port = env::args()
        .nth(1)
        .unwrap_or_else(|| "3000".to_string())
        .parse::<u16>()?;
    let file = env::var("HOMEIO_OFFLINE_FILE").unwrap_or_else(|_| "offline_items.var".to_string());

    let store = Arc::new(FlatFileStore::new(&file));
    let app = Router::new()
        .route("/", get(driver).post(driver))
        .with_state(store);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    log::info!("offline driver serving '{}' on port {}", file, port);
    axum::serve(listener, app).await?;
    Ok(())
}
