use crate::error::ConfigError;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod catalog;
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use catalog::{Catalog, CatalogEntry, InstrumentGroup, Selection};
pub use settings::{Config, DashboardSettings, DataSourceSettings, LoggingSettings};

/// The file read when no explicit path is given.
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Prefix of the environment variables that override file settings,
/// e.g. `COMMODEX__DASHBOARD__INTERVAL=15m`.
pub const ENV_PREFIX: &str = "COMMODEX";

/// Loads the application configuration.
///
/// Sources are layered in this order, later ones winning:
/// built-in defaults, the TOML file, then `COMMODEX__*` environment variables.
/// An explicitly given file must exist; the default `config.toml` is optional.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let (file, required) = match path {
        Some(path) => (path, true),
        None => (Path::new(DEFAULT_CONFIG_FILE), false),
    };

    let builder = config::Config::builder()
        .add_source(config::File::from(file).required(required))
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    // Attempt to deserialize the entire configuration into our `Config` struct
    let config = builder.try_deserialize::<Config>()?;
    config.validate()?;

    tracing::debug!(file = %file.display(), "Configuration loaded.");
    Ok(config)
}
