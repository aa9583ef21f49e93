//! One-stop entry point: a registry plus the composer settings that go with it.

use std::path::Path;

use tracing::debug;

use crate::runner::compose::composer::{ClassComposer, Part};
use crate::runner::ds::class::{Class, ClassRef};
use crate::runner::ds::error::KernelResult;
use crate::runner::ds::value::Code;
use crate::runner::plugin::config::{ComposerConfig, KernelConfig};
use crate::runner::plugin::registry::Registry;

pub struct Kernel {
    registry: Registry,
    composer: ComposerConfig,
}

impl Kernel {
    /// A kernel with the standard fragments and default composer settings.
    pub fn new() -> Self {
        Self::from_config(KernelConfig::default())
    }

    pub fn from_config(config: KernelConfig) -> Self {
        let mut registry = if config.registry.core_fragments {
            Registry::with_core()
        } else {
            Registry::new()
        };
        for (alias, key) in &config.registry.aliases {
            registry.alias(key.clone(), alias.clone());
        }
        debug!(
            core_fragments = config.registry.core_fragments,
            aliases = config.registry.aliases.len(),
            "kernel ready"
        );
        Kernel {
            registry,
            composer: config.composer,
        }
    }

    /// Reads a TOML configuration file, see [`KernelConfig::load`].
    pub fn load(path: &Path) -> KernelResult<Self> {
        Ok(Self::from_config(KernelConfig::load(path)?))
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// A composer over this kernel's registry, configured from the kernel's settings.
    pub fn composer(&self) -> ClassComposer<'_> {
        ClassComposer::from_config(&self.registry, &self.composer)
    }

    pub fn base_class(&self) -> ClassRef {
        Class::root()
    }

    pub fn extend(
        &self,
        parent: Option<&ClassRef>,
        proto: &[Code],
        statics: &[Code],
    ) -> KernelResult<ClassRef> {
        self.composer().extend(parent, proto, statics)
    }

    pub fn make(
        &self,
        parent: Option<&ClassRef>,
        proto: &[Part],
        statics: &[Part],
    ) -> KernelResult<ClassRef> {
        self.composer().make(parent, proto, statics)
    }

    /// Drops every binding, singleton, fragment and alias.
    pub fn teardown(&mut self) {
        self.registry.flush();
        debug!("kernel torn down");
    }
}

impl Default for Kernel {
    fn default() -> Self {
        Kernel::new()
    }
}
