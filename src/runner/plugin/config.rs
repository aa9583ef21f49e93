//! Kernel configuration file parsing.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::runner::ds::error::{KernelError, KernelResult};

lazy_static! {
    /// Deep properties every composer merges unless configured otherwise.
    pub static ref DEFAULT_DEEP_PROPERTIES: Vec<String> = vec![
        "extendable".to_string(),
        "ownProps".to_string(),
        "eventsCatalog".to_string(),
    ];
}

/// How classes are composed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Prototype members merged (not replaced) along a class chain.
    pub deep_properties: Vec<String>,
    /// When true, later fragments overwrite earlier ones in `make`.
    #[serde(rename = "override")]
    pub override_members: bool,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        ComposerConfig {
            deep_properties: DEFAULT_DEEP_PROPERTIES.clone(),
            override_members: false,
        }
    }
}

/// How the registry is seeded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Register the standard fragments at startup.
    pub core_fragments: bool,
    /// `alias -> key` pairs registered at startup.
    pub aliases: BTreeMap<String, String>,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        RegistryConfig {
            core_fragments: true,
            aliases: BTreeMap::new(),
        }
    }
}

/// Complete kernel configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KernelConfig {
    pub composer: ComposerConfig,
    pub registry: RegistryConfig,
}

impl KernelConfig {
    /// Load configuration from a TOML file.
    ///
    /// Expected format:
    /// ```toml
    /// [composer]
    /// deep_properties = ["extendable", "ownProps", "eventsCatalog"]
    /// override = false
    ///
    /// [registry]
    /// core_fragments = true
    ///
    /// [registry.aliases]
    /// Eventable = "Events"
    /// ```
    pub fn load(path: &Path) -> KernelResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            KernelError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(content: &str) -> KernelResult<Self> {
        toml::from_str(content).map_err(|e| KernelError::Config(e.to_string()))
    }

    pub fn to_toml(&self) -> KernelResult<String> {
        toml::to_string(self).map_err(|e| KernelError::Config(e.to_string()))
    }
}
