//! Core fragment registration.
//!
//! This module provides the function to register all standard fragments
//! with a [`Registry`].

use crate::runner::plugin::registry::Registry;

use super::auto_extend;
use super::events;
use super::own_props;
use super::properties;

/// Register all standard fragments with the registry.
pub fn register_core_fragments(registry: &mut Registry) {
    // Properties fires change events, so Events goes first
    events::register(registry);
    properties::register(registry);
    own_props::register(registry);
    auto_extend::register(registry);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_core_fragments_registered() {
        let mut registry = Registry::new();
        register_core_fragments(&mut registry);
        assert_eq!(
            registry.extension_names(),
            vec!["AutoExtend", "Events", "OwnProps", "Properties"]
        );
    }
}
