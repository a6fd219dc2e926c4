//! # Offline Driver Service Test Runner
//!
//! Exercises a running `server_offline` instance over HTTP: writes a pair
//! of items, reads them back, and checks an absent item maps to an empty
//! string. Start the service first, e.g. `server_offline 3000`.

use std::collections::BTreeMap;

use clap::Parser;

#[derive(Parser, Debug)]
struct Args {
    /// Base URL of the running offline driver service.
    #[arg(long, default_value = "http://127.0.0.1:3000/")]
    base: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lib_homeio::loggers::init();
    let args = Args::parse();
    let client = reqwest::Client::new();

    println!("--- Starting Offline Driver Tests against {} ---", args.base);

    // --- TEST 1: Write two items in one request ---
    println!("\n[Test 1] Writing kitchen.light,hall.light = 1...");
    let written: BTreeMap<String, String> = client
        .get(&args.base)
        .query(&[("item", "kitchen.light,hall.light"), ("val", "1")])
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(written.get("kitchen.light").map(String::as_str), Some("1"));
    assert_eq!(written.get("hall.light").map(String::as_str), Some("1"));
    println!("✅ Write acknowledged: {:?}", written);

    // --- TEST 2: Read the values back ---
    println!("\n[Test 2] Reading them back...");
    let read: BTreeMap<String, String> = client
        .get(&args.base)
        .query(&[("item", "kitchen.light,hall.light")])
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(read, written);
    println!("✅ Read back: {:?}", read);

    // --- TEST 3: Absent items map to empty strings ---
    println!("\n[Test 3] Reading an item that was never written...");
    let absent: BTreeMap<String, String> = client
        .get(&args.base)
        .query(&[("item", "attic.never.written")])
        .send()
        .await?
        .json()
        .await?;
    assert_eq!(absent.get("attic.never.written").map(String::as_str), Some(""));
    println!("✅ Absent item handled: {:?}", absent);

    println!("\n--- All Offline Driver Tests Passed ---");
    Ok(())
}
