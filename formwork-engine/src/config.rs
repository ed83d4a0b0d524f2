//! Engine configuration loaded with Figment
//!
//! Sources, later ones overriding earlier ones:
//! 1. Built-in defaults
//! 2. `formwork.toml`, `formwork.yaml`, `formwork.yml`, `formwork.json` in the
//!    search directory, or one explicitly named file
//! 3. `FORMWORK_`-prefixed environment variables (`FORMWORK_MAX_PASSES=4`)

use std::path::Path;

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use formwork_fields::{FormContext, FormContextBuilder};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{EngineError, Result};

/// Stem of the configuration files looked up in a directory.
pub const CONFIG_FILE_STEM: &str = "formwork";

/// Prefix of configuration environment variables.
pub const ENV_PREFIX: &str = "FORMWORK_";

/// Visibility passes `FormEngine::resolve` runs before giving up.
pub const DEFAULT_MAX_PASSES: usize = 8;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on visibility passes per resolution. Must be at least 1.
    pub max_passes: usize,
    /// Log diagnostics such as unknown type tags as warnings.
    pub warn_unknown_types: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_passes: DEFAULT_MAX_PASSES,
            warn_unknown_types: true,
        }
    }
}

impl EngineConfig {
    /// Load configuration discovered in the current directory.
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new("."))
    }

    /// Load configuration discovered in `dir`.
    pub fn load_from(dir: &Path) -> Result<Self> {
        let mut figment = Figment::new().merge(Serialized::defaults(Self::default()));
        for ext in ["toml", "yaml", "yml", "json"] {
            let path = dir.join(format!("{CONFIG_FILE_STEM}.{ext}"));
            if path.is_file() {
                trace!("Loading config file: {}", path.display());
                figment = figment.merge(file_provider(&path)?);
            }
        }
        Self::extract(figment.merge(Env::prefixed(ENV_PREFIX)))
    }

    /// Load configuration from one explicitly named file, plus environment.
    pub fn load_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(EngineError::invalid_config(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let figment = Figment::new()
            .merge(Serialized::defaults(Self::default()))
            .merge(file_provider(path)?)
            .merge(Env::prefixed(ENV_PREFIX));
        Self::extract(figment)
    }

    fn extract(figment: Figment) -> Result<Self> {
        let config: Self = figment.extract()?;
        config.validate()?;
        debug!(
            max_passes = config.max_passes,
            warn_unknown_types = config.warn_unknown_types,
            "engine configuration loaded"
        );
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_passes == 0 {
            return Err(EngineError::invalid_config("max_passes must be at least 1"));
        }
        Ok(())
    }

    /// A context builder carrying the settings that live on the context.
    pub fn context_builder(&self) -> FormContextBuilder {
        FormContext::builder().warn_unknown_types(self.warn_unknown_types)
    }
}

fn file_provider(path: &Path) -> Result<Figment> {
    match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Ok(Figment::from(Toml::file(path))),
        Some("yaml") | Some("yml") => Ok(Figment::from(Yaml::file(path))),
        Some("json") => Ok(Figment::from(Json::file(path))),
        _ => Err(EngineError::invalid_config(format!(
            "unsupported config format: {}",
            path.display()
        ))),
    }
}
