//! Tracing setup for the crawlbox binary

use tracing_subscriber::EnvFilter;

use crate::config::LoggingSettings;

pub type InitError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Install the global subscriber
///
/// `RUST_LOG` wins over `logging.filter` when set.
pub fn init_tracing(settings: &LoggingSettings) -> Result<(), InitError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&settings.filter)?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
}
