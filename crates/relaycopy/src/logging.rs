//! Logging initialization.

use tracing_subscriber::EnvFilter;

/// Initialize `tracing` based on verbosity level and the `--quiet` flag.
/// `RELAYCOPY_LOG` overrides both when set, the way `tracing_subscriber`
/// conventionally reads `RUST_LOG`.
pub fn init_logging(verbosity: u8, quiet: bool) {
    let default_level = if quiet {
        "error"
    } else {
        match verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_env("RELAYCOPY_LOG")
        .unwrap_or_else(|_| EnvFilter::new(format!("relaycopy={default_level},relaycopy_protocol={default_level},relaycopy_crypto={default_level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
