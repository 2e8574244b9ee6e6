//! Configuration source loading and composition

use crate::validation::Validate;
use crate::{ConfigResult, SearchConfig};
use std::path::{Path, PathBuf};

/// Trait for loading configuration from different sources
pub trait ConfigurationSource {
    /// Produce a configuration layered on top of `base`
    ///
    /// # Errors
    /// Returns configuration loading errors
    fn load(&self, base: SearchConfig) -> ConfigResult<SearchConfig>;

    /// Get the name of this configuration source
    fn name(&self) -> &str;

    /// Get the priority of this source (higher number = higher priority)
    fn priority(&self) -> u8;
}

/// Overrides from `KIOSK_SEARCH_*` environment variables
pub struct EnvironmentSource;

impl ConfigurationSource for EnvironmentSource {
    fn load(&self, base: SearchConfig) -> ConfigResult<SearchConfig> {
        Ok(base.with_env_overrides())
    }

    fn name(&self) -> &'static str {
        "environment"
    }

    fn priority(&self) -> u8 {
        100 // Environment variables override everything
    }
}

/// Load configuration from a TOML file
///
/// Sections or keys missing from the file keep their defaults.
pub struct TomlFileSource {
    path: PathBuf,
}

impl TomlFileSource {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl ConfigurationSource for TomlFileSource {
    fn load(&self, _base: SearchConfig) -> ConfigResult<SearchConfig> {
        let content = std::fs::read_to_string(&self.path)?;
        let config: SearchConfig = toml::from_str(&content)?;
        Ok(config)
    }

    fn name(&self) -> &'static str {
        "toml_file"
    }

    fn priority(&self) -> u8 {
        50 // Below env vars, above defaults
    }
}

/// Type alias for configuration sources
type ConfigSources = Vec<Box<dyn ConfigurationSource>>;

/// Configuration loader that combines multiple sources
pub struct ConfigurationLoader {
    sources: ConfigSources,
}

impl ConfigurationLoader {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    #[must_use]
    pub fn add_source(mut self, source: Box<dyn ConfigurationSource>) -> Self {
        self.sources.push(source);
        self
    }

    /// Load configuration from all sources with priority ordering
    ///
    /// A source that fails to load is logged and skipped; the composed result
    /// must still validate.
    ///
    /// # Errors
    /// Returns validation errors for the composed configuration
    pub fn load(&self) -> ConfigResult<SearchConfig> {
        let mut config = SearchConfig::default();

        // Lowest priority first, so higher priority sources layer on top
        let mut sorted_sources = self.sources.iter().collect::<Vec<_>>();
        sorted_sources.sort_by_key(|source| source.priority());

        for source in sorted_sources {
            match source.load(config.clone()) {
                Ok(layered) => {
                    tracing::debug!("Loaded configuration from source: {}", source.name());
                    config = layered;
                }
                Err(e) => {
                    tracing::warn!("Failed to load from source {}: {}", source.name(), e);
                }
            }
        }

        config.validate()?;
        Ok(config)
    }
}

impl Default for ConfigurationLoader {
    fn default() -> Self {
        Self::new()
    }
}
