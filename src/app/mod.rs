//! Application glue module
//!
//! Configuration and logging setup shared by the binaries.

mod config;

pub use config::{Config, ConfigError, ConsoleConfig, RendererConfig, SlideConfig};

/// Install the stderr tracing subscriber used by the binaries
///
/// `RUST_LOG` overrides the `warn` default.
pub fn init_logging() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with(fmt::layer().with_writer(std::io::stderr))
        .try_init();
}
