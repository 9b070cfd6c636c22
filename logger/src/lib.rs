//! Token Tap logging setup.
//!
//! Thin wrapper over `env_logger`: `RUST_LOG` always wins, the `filter`
//! argument is only the fallback. Calling any setup function more than once
//! is harmless; only the first call installs a logger.

use {
    env_logger::{Builder, Env},
    std::sync::Once,
};

/// Fallback filter: our own crates at `info`, dependencies at `warn`.
pub const DEFAULT_FILTER: &str = "warn,tap_chain=info,tap_faucet=info,tap_cli=info";

static INIT: Once = Once::new();

/// Installs the logger with `filter` unless `RUST_LOG` is set.
pub fn setup_with_default(filter: &str) {
    INIT.call_once(|| {
        let mut builder = Builder::from_env(Env::new().default_filter_or(filter));
        builder.format_timestamp_millis();
        // A test harness may have installed its own logger already.
        let _ = builder.try_init();
    });
}

pub fn setup() {
    setup_with_default(DEFAULT_FILTER);
}

/// Logger for tests: writes through the test harness's captured output.
pub fn setup_for_tests() {
    INIT.call_once(|| {
        let _ = Builder::from_env(Env::new().default_filter_or("debug"))
            .is_test(true)
            .try_init();
    });
}
