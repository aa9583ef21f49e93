//! The registry that mediates which fragments, factories and singletons exist.
//!
//! ## Stores
//!
//! ```text
//! bindings    key -> factory              built fresh on every make()
//! shared      key -> factory | value      built once, cached for the registry's lifetime
//! extensions  key -> fragment             what the class composer resolves names against
//! aliases     name -> key                 one-hop redirection, resolved at lookup time
//! ```
//!
//! A key lives in at most one of bindings, shared and extensions. `bind`,
//! `share`, `instance` and `extension` leave an already bound key alone; only
//! `bind_if`/`share_if`/`extension_if` with `override_existing` replace it.
//!
//! The registry is an ordinary value. Whatever needs it receives a reference,
//! and a test builds its own and throws it away.
//!
//! ## Example
//!
//! ```
//! use mixkit::runner::plugin::registry::Registry;
//! use mixkit::runner::ds::value::Value;
//!
//! let mut registry = Registry::new();
//! registry.share("config", |_call| Ok(Value::from("prod")));
//! registry.alias("config", "settings");
//! assert_eq!(registry.make("settings").unwrap(), Value::from("prod"));
//! ```

pub mod types;
pub mod registry;
pub mod config;

pub use types::{Factory, FactoryCall, Store};
pub use registry::Registry;
pub use config::KernelConfig;
