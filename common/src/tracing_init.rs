use thiserror::Error;
use tracing_subscriber::{EnvFilter, filter::ParseError, fmt, prelude::*};

#[derive(Debug, Error)]
pub enum TracingError {
    #[error("Invalid log filter directive: {0}")]
    Filter(#[from] ParseError),
    #[error("Global tracing subscriber already set: {0}")]
    AlreadySet(#[from] tracing_subscriber::util::TryInitError),
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence; otherwise `default_directive` is used.
/// # Parameters
/// - default_directive: filter directive applied when `RUST_LOG` is unset, e.g. `"info"`.
pub fn init_tracing(default_directive: &str) -> Result<(), TracingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_directive)?,
    };
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(filter)
        .try_init()?;
    Ok(())
}
