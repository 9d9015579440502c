// Reelsmith - adaptive media-generation core
// Learns tagging decisions online from user ratings and refines generated
// artifacts in response to the same feedback.

pub mod core;
pub mod dispatch;
pub mod error;
pub mod learning;
pub mod refine;
pub mod store;

pub use error::{ReelsmithError, ReelsmithResult};

use anyhow::Result;
use tracing::info;

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Initialize the core with default logger settings
pub fn init() -> Result<()> {
    init_with_logger(true)
}

/// Initialize the core with custom logger configuration
///
/// @param ansi_colors - Whether to enable ANSI color codes in logs
/// When logs are consumed by another process, this should be false.
pub fn init_with_logger(ansi_colors: bool) -> Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    if !ansi_colors {
        fmt::Subscriber::builder()
            .with_ansi(false)
            .with_writer(std::io::stderr)
            .with_env_filter(EnvFilter::from_default_env())
            .with_target(false)
            .without_time()
            .init();

        info!("Initializing reelsmith v{} (minimal log format)", version());
    } else {
        fmt::Subscriber::builder()
            .with_ansi(true)
            .with_env_filter(EnvFilter::from_default_env())
            .with_target(true)
            .init();

        info!("Initializing reelsmith v{}", version());
    }

    Ok(())
}
