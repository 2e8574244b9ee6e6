//! Tracing subscriber setup

use thiserror::Error;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;

/// Errors raised while installing the global subscriber
#[derive(Error, Debug)]
pub enum TelemetryError {
    #[error("Invalid tracing filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized,
}

/// Install the global tracing subscriber
///
/// `RUST_LOG` wins over `default_level` when set. With `json` enabled every
/// line is a JSON object, which is what the kiosk log shipper expects.
///
/// # Errors
/// Returns `TelemetryError::InvalidFilter` if the level directive cannot be
/// parsed and `TelemetryError::AlreadyInitialized` if called twice.
pub fn init_tracing<W>(default_level: &str, json: bool, writer: W) -> Result<(), TelemetryError>
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            EnvFilter::try_new(default_level).map_err(|e| TelemetryError::InvalidFilter {
                filter: default_level.to_string(),
                message: e.to_string(),
            })?
        }
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_target(true);

    let result = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    result.map_err(|_| TelemetryError::AlreadyInitialized)
}
