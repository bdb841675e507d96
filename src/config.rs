//! TOML configuration
//!
//! ```toml
//! scale = "dMajor"
//! input = "KeyStep"
//! output = "1"
//!
//! [router]
//! channel_count = 4
//! retrigger = "ignore"
//! flush_on_rebind = true
//! fixed_velocity = 96
//!
//! [chord_template]
//! 0 = [0, 4, 7, 14]
//! ```
//!
//! Every field is optional. Command-line flags override file values.

use crate::chord::ChordTemplate;
use crate::error::{HarmoniaError, HarmoniaResult};
use crate::router::RouterConfig;
use crate::scale::{Scale, ScaleTable};
use crate::session::PortSelector;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const CONFIG_DIR: &str = "harmonia";
const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarmoniaConfig {
    /// Scale active at startup
    pub scale: String,
    /// Input port selector (index or name substring)
    pub input: Option<String>,
    /// Output port selector (index or name substring)
    pub output: Option<String>,
    pub router: RouterConfig,
    /// Replaces the stock chord template when present
    pub chord_template: Option<ChordTemplate>,
}

impl Default for HarmoniaConfig {
    fn default() -> Self {
        Self {
            scale: ScaleTable::default_scale().name().to_string(),
            input: None,
            output: None,
            router: RouterConfig::default(),
            chord_template: None,
        }
    }
}

impl HarmoniaConfig {
    /// `<config dir>/harmonia/config.toml`, if the platform has a config dir
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(CONFIG_DIR).join(CONFIG_FILE))
    }

    /// Load and validate a config file
    pub fn load(path: &Path) -> HarmoniaResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::parse(&content)?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse and validate TOML content
    pub fn parse(content: &str) -> HarmoniaResult<Self> {
        let config: Self =
            toml::from_str(content).map_err(|e| HarmoniaError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, otherwise the default file if it exists
    ///
    /// An explicit path must exist; a missing default file means defaults.
    pub fn load_or_default(path: Option<&Path>) -> HarmoniaResult<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Self::load(&path),
            _ => {
                debug!("No config file, using defaults");
                Ok(Self::default())
            }
        }
    }

    pub fn validate(&self) -> HarmoniaResult<()> {
        self.router.validate()?;
        ScaleTable::lookup(&self.scale)
            .map_err(|e| HarmoniaError::Config(format!("scale: {}", e)))?;
        for selector in [&self.input, &self.output].into_iter().flatten() {
            selector
                .parse::<PortSelector>()
                .map_err(|e| HarmoniaError::Config(e.to_string()))?;
        }
        Ok(())
    }

    /// Startup scale
    pub fn initial_scale(&self) -> HarmoniaResult<Scale> {
        ScaleTable::lookup(&self.scale)
    }

    /// Chord template in effect: the override or the stock one
    pub fn template(&self) -> ChordTemplate {
        self.chord_template.clone().unwrap_or_default()
    }

    pub fn input_selector(&self) -> HarmoniaResult<Option<PortSelector>> {
        self.input.as_deref().map(str::parse::<PortSelector>).transpose()
    }

    pub fn output_selector(&self) -> HarmoniaResult<Option<PortSelector>> {
        self.output.as_deref().map(str::parse::<PortSelector>).transpose()
    }

    pub fn save(&self, path: &Path) -> HarmoniaResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_toml()?)?;
        Ok(())
    }

    pub fn to_toml(&self) -> HarmoniaResult<String> {
        toml::to_string_pretty(self).map_err(|e| HarmoniaError::Config(e.to_string()))
    }
}
