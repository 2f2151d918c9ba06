//! Tracing initialization and subscriber setup.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::file_writer::RotatingFileWriter;
use crate::Config;

/// Installs the global tracing subscriber.
///
/// The level filter comes from `RUST_LOG` if set, then `config.trace_level`,
/// then `"info"`. Events are formatted as text to stderr, or appended to
/// `config.log_file` through a [`RotatingFileWriter`] when one is configured.
///
/// Idempotent: only the first call installs a subscriber; later calls (and
/// calls after another subscriber was installed) do nothing.
///
/// # Example
///
/// ```rust
/// use pamdash::observability::init_tracing;
/// use pamdash::Config;
///
/// let config = Config {
///     trace_level: Some("debug".to_string()),
///     ..Default::default()
/// };
///
/// init_tracing(&config);
///
/// tracing::debug!("tracing is now active");
/// ```
pub fn init_tracing(config: &Config) {
    let level = config.trace_level.as_deref().unwrap_or("info");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let registry = tracing_subscriber::registry().with(filter);

    let _ = match &config.log_file {
        Some(path) => registry
            .with(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(RotatingFileWriter::new(path.clone())),
            )
            .try_init(),
        None => registry
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };
}
