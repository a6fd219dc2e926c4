//! Process logging bootstrap. Library code logs through the `log` facade
//! only; binaries call `init` once at startup.

use env_logger::Env;

/// Installs the process logger, honoring `RUST_LOG` with an `info` default.
/// Safe to call more than once; later calls are no-ops.
pub fn init() {
    let _ = env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .try_init();
}
