// 📜 Logging - tracing subscriber for the CLI
// Logs go to stderr so CSV written to stdout-redirected files stays clean.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_DIRECTIVE: &str = "freight_accrual=info";

/// Human-readable by default, one JSON object per line with `json`.
/// `RUST_LOG` overrides the default level.
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));

    let registry = tracing_subscriber::registry().with(filter);

    // try_init: a second call (tests, embedding) keeps the first subscriber
    if json {
        let _ = registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init();
    } else {
        let _ = registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init();
    }
}
