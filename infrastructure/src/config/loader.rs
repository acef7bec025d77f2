//! Configuration file loader with multi-source merging

use super::file_config::FileConfig;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::path::{Path, PathBuf};

/// Project-level file names, checked in order
const PROJECT_FILES: [&str; 2] = ["argos.toml", ".argos.toml"];

/// Environment prefix; `ARGOS_RESOURCES__ACQUIRE_TIMEOUT_MS=100` sets `resources.acquire_timeout_ms`
pub const ENV_PREFIX: &str = "ARGOS_";

/// Configuration loader that handles file discovery and merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from all sources with proper priority
    ///
    /// Priority (highest to lowest):
    /// 1. `ARGOS_*` environment variables (`__` separates sections)
    /// 2. Explicit config path (if provided)
    /// 3. Project root: `./argos.toml` or `./.argos.toml`
    /// 4. Global: `<config dir>/argos/config.toml`
    /// 5. Default values
    pub fn load(config_path: Option<&Path>) -> Result<FileConfig, Box<figment::Error>> {
        if let Some(path) = config_path
            && !path.exists()
        {
            return Err(Box::new(figment::Error::from(format!(
                "config file not found: {}",
                path.display()
            ))));
        }
        let global = Self::global_config_path().filter(|p| p.exists());
        let project = Self::project_config_path();
        Self::figment(global.as_deref(), project.as_deref(), config_path)
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .map_err(Box::new)
    }

    /// File layers only, without the environment
    fn figment(global: Option<&Path>, project: Option<&Path>, explicit: Option<&Path>) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(FileConfig::default()));
        for path in [global, project, explicit].into_iter().flatten() {
            figment = figment.merge(Toml::file(path));
        }
        figment
    }

    /// Load only default configuration
    pub fn load_defaults() -> FileConfig {
        FileConfig::default()
    }

    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("argos").join("config.toml"))
    }

    /// The project-level config file, if one exists in the working directory
    pub fn project_config_path() -> Option<PathBuf> {
        PROJECT_FILES.iter().map(PathBuf::from).find(|p| p.exists())
    }

    /// Describe the config file locations (for `--verbose` startup output)
    pub fn config_sources() -> Vec<String> {
        let mut sources = Vec::new();
        match Self::project_config_path() {
            Some(path) => sources.push(format!("[FOUND] Project: {}", path.display())),
            None => sources.push("[     ] Project: ./argos.toml or ./.argos.toml".to_string()),
        }
        if let Some(path) = Self::global_config_path() {
            let marker = if path.exists() { "FOUND" } else { "     " };
            sources.push(format!("[{}] Global:  {}", marker, path.display()));
        }
        sources.push("[     ] Default: built-in defaults".to_string());
        sources
    }
}
