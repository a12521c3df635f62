//! Process-wide log subscriber

use tracing::Level;

/// Install the fmt subscriber. Debug output is enabled by `enable_logging`.
/// Safe to call more than once; later calls leave the first subscriber in place.
pub fn init(enable_logging: bool) {
    let level = if enable_logging {
        Level::DEBUG
    } else {
        Level::INFO
    };

    if tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .try_init()
        .is_err()
    {
        tracing::debug!("Log subscriber already installed");
    }
}
