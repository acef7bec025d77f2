//! Configuration file loading for argos
//!
//! Handles file I/O and merging of configuration from multiple sources.
//! The priority order (highest to lowest):
//!
//! 1. `ARGOS_*` environment variables
//! 2. `--config <path>` specified file
//! 3. Project root: `./argos.toml` or `./.argos.toml`
//! 4. Global: `<config dir>/argos/config.toml`
//! 5. Default values

mod file_config;
mod loader;

pub use file_config::{
    ConfigValidationError, FileConfig, FileExecutorConfig, FileHardwareConfig, FileLoggingConfig,
    FileProfileOverride, FileResourcesConfig, FileToolConfig,
};
pub use loader::{ConfigLoader, ENV_PREFIX};
