//! Logging setup and subsystem targets.
//!
//! Every subsystem logs through `tracing`; the `wlog!` macro tags a message
//! with one of the targets below so filters like `RUST_LOG=seat=debug` work.

use tracing_subscriber::fmt::time::ChronoLocal;
use tracing_subscriber::EnvFilter;

#[macro_export]
macro_rules! wlog {
    ($module:expr, $($arg:tt)*) => {{
        tracing::info!(target: $module, $($arg)*);
    }};
}

/// Standardized module identifiers
pub const MAIN: &str = "main";
pub const SERVER: &str = "server";
pub const OUTPUT: &str = "output";
pub const SEAT: &str = "seat";
pub const VIEW: &str = "view";
pub const IDLE: &str = "idle";
pub const CLIENT: &str = "client";

/// Install the global subscriber. `RUST_LOG` wins over `debug`.
pub fn init(debug: bool) {
    let default = if debug {
        "debug,wayframe=debug"
    } else {
        "info,wayframe=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let result = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_ansi(false)
        .try_init();

    if let Err(err) = result {
        eprintln!("logging already initialised: {}", err);
    }
}
