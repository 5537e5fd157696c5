//! Logging initialization for the `shiryoku` binary
//!
//! Human-readable or JSON output on stderr, so command output on stdout
//! stays machine-readable. `RUST_LOG` overrides the configured level.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;

pub fn init_logging(config: &LoggingConfig) -> anyhow::Result<()> {
    let subscriber = tracing_subscriber::registry().with(build_env_filter(&config.level));

    if config.json {
        subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    } else {
        subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()?;
    }
    Ok(())
}

/// Used before the configuration is available.
pub fn init_simple_logging() {
    let _ = tracing_subscriber::registry()
        .with(build_env_filter("warn"))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn build_env_filter(level: &str) -> EnvFilter {
    // Suppress verbose sqlx debug logs by default
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "shiryoku_cli={level},shiryoku_search={level},sqlx=warn"
        ))
    })
}
