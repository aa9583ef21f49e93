//! The registry: a keyed container of factories, singletons, fragments and aliases.
//!
//! ## Resolution
//!
//! `make(key)` proceeds as follows:
//!
//! 1. An alias is replaced by its target (one hop; aliases of aliases are not followed).
//! 2. A fragment registered under the key is returned as `Value::Fragment`.
//! 3. A singleton that was already built is returned from its cache.
//! 4. Otherwise the key's factory runs. String arguments naming known keys are
//!    resolved first (one level only), and a singleton's result is cached for
//!    the registry's lifetime.
//!
//! Re-entering a key that is still being resolved fails with `CycleDetected`
//! instead of recursing forever.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use tracing::{debug, trace, warn};

use crate::runner::ds::error::{KernelError, KernelResult};
use crate::runner::ds::fragment::Fragment;
use crate::runner::ds::value::Value;
use crate::runner::plugin::types::{Binding, Factory, FactoryCall, SharedEntry, Store};
use crate::runner::std_lib::register_core_fragments;

pub struct Registry {
    bindings: HashMap<String, Binding>,
    shared: RefCell<HashMap<String, SharedEntry>>,
    extensions: HashMap<String, Rc<Fragment>>,
    aliases: HashMap<String, String>,
    resolving: RefCell<Vec<String>>,
}

impl Registry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Registry {
            bindings: HashMap::new(),
            shared: RefCell::new(HashMap::new()),
            extensions: HashMap::new(),
            aliases: HashMap::new(),
            resolving: RefCell::new(vec![]),
        }
    }

    /// Create a registry with the standard fragments (`Events`, `OwnProps`,
    /// `AutoExtend`, `Properties`) registered under their names.
    pub fn with_core() -> Self {
        let mut registry = Self::new();
        register_core_fragments(&mut registry);
        registry
    }

    /// Registers a factory. Does nothing when the key is already bound anywhere.
    /// With `shared`, the first result is cached and returned from then on.
    pub fn bind<F>(&mut self, key: impl Into<String>, factory: F, shared: bool) -> bool
    where
        F: Fn(FactoryCall<'_>) -> KernelResult<Value> + 'static,
    {
        self.bind_if(key, factory, shared, false)
    }

    /// Conditional form of `bind`. With `override_existing`, whatever the key
    /// held before is dropped from every store and the factory takes its place.
    /// Returns whether the factory was registered.
    pub fn bind_if<F>(
        &mut self,
        key: impl Into<String>,
        factory: F,
        shared: bool,
        override_existing: bool,
    ) -> bool
    where
        F: Fn(FactoryCall<'_>) -> KernelResult<Value> + 'static,
    {
        let key = key.into();
        if !self.make_room(&key, override_existing) {
            return false;
        }
        let factory: Factory = Rc::new(factory);
        if shared {
            self.shared.get_mut().insert(
                key,
                SharedEntry {
                    factory: Some(factory),
                    value: None,
                },
            );
        } else {
            self.bindings.insert(key, Binding { factory });
        }
        true
    }

    pub fn share<F>(&mut self, key: impl Into<String>, factory: F) -> bool
    where
        F: Fn(FactoryCall<'_>) -> KernelResult<Value> + 'static,
    {
        self.bind_if(key, factory, true, false)
    }

    pub fn share_if<F>(&mut self, key: impl Into<String>, factory: F, override_existing: bool) -> bool
    where
        F: Fn(FactoryCall<'_>) -> KernelResult<Value> + 'static,
    {
        self.bind_if(key, factory, true, override_existing)
    }

    /// Registers an already-built singleton unless the key is bound.
    pub fn instance(&mut self, key: impl Into<String>, value: Value) -> bool {
        let key = key.into();
        if !self.make_room(&key, false) {
            return false;
        }
        self.shared.get_mut().insert(
            key,
            SharedEntry {
                factory: None,
                value: Some(value),
            },
        );
        true
    }

    /// Makes `alias_name` resolve to whatever `key` resolves to at lookup time.
    pub fn alias(&mut self, key: impl Into<String>, alias_name: impl Into<String>) {
        let key = key.into();
        let alias_name = alias_name.into();
        trace!(alias = %alias_name, target = %key, "alias registered");
        self.aliases.insert(alias_name, key);
    }

    /// Stores a fragment under `key` unless the key is bound. The registry owns its copy.
    pub fn extension(&mut self, key: impl Into<String>, fragment: Fragment) -> bool {
        self.extension_if(key, fragment, false)
    }

    /// Conditional form of `extension`; `override_existing` replaces a previous entry.
    pub fn extension_if(
        &mut self,
        key: impl Into<String>,
        fragment: Fragment,
        override_existing: bool,
    ) -> bool {
        let key = key.into();
        if !self.make_room(&key, override_existing) {
            return false;
        }
        debug!(key = %key, fragment = %fragment.name(), "fragment registered");
        self.extensions.insert(key, Rc::new(fragment));
        true
    }

    /// Stores a fragment under its own name.
    pub fn register(&mut self, fragment: Fragment) -> bool {
        let key = fragment.name().to_string();
        self.extension(key, fragment)
    }

    pub fn make(&self, key: &str) -> KernelResult<Value> {
        self.make_with(key, vec![], None)
    }

    pub fn make_with(
        &self,
        key: &str,
        args: Vec<Value>,
        scope: Option<&Value>,
    ) -> KernelResult<Value> {
        let key = self.resolve_alias(key);
        trace!(key = %key, "resolving");

        if let Some(fragment) = self.extensions.get(key) {
            return Ok(Value::Fragment(fragment.clone()));
        }

        let shared_factory = {
            let shared = self.shared.borrow();
            match shared.get(key) {
                Some(SharedEntry { value: Some(v), .. }) => return Ok(v.clone()),
                Some(SharedEntry { factory, .. }) => factory.clone(),
                None => None,
            }
        };
        let (factory, is_shared) = match shared_factory {
            Some(f) => (f, true),
            None => match self.bindings.get(key) {
                Some(b) => (b.factory.clone(), false),
                None => return Err(KernelError::Resolution(key.to_string())),
            },
        };

        let _guard = self.enter(key)?;
        let args = self.substitute(args)?;
        let value = factory(FactoryCall {
            args,
            scope,
            registry: self,
        })?;

        if is_shared {
            if let Some(entry) = self.shared.borrow_mut().get_mut(key) {
                entry.value = Some(value.clone());
            }
            debug!(key = %key, "singleton cached");
        }
        Ok(value)
    }

    /// Resolves `key` to a registered fragment, following one alias hop.
    /// Only the extensions store is consulted, so no factory runs.
    pub fn fragment(&self, key: &str) -> KernelResult<Rc<Fragment>> {
        let key = self.resolve_alias(key);
        self.extensions
            .get(key)
            .cloned()
            .ok_or_else(|| KernelError::Resolution(key.to_string()))
    }

    /// Whether `key` is present in any store, aliases included.
    pub fn bound(&self, key: &str) -> bool {
        self.store_of(key).is_some()
    }

    /// Whether `key` names a singleton that has been built.
    pub fn resolved(&self, key: &str) -> bool {
        let key = self.resolve_alias(key);
        self.shared
            .borrow()
            .get(key)
            .map(|e| e.value.is_some())
            .unwrap_or(false)
    }

    pub fn is_alias(&self, key: &str) -> bool {
        self.aliases.contains_key(key)
    }

    pub fn alias_target(&self, key: &str) -> Option<&str> {
        self.aliases.get(key).map(|s| s.as_str())
    }

    pub fn store_of(&self, key: &str) -> Option<Store> {
        if self.aliases.contains_key(key) {
            Some(Store::Alias)
        } else if self.extensions.contains_key(key) {
            Some(Store::Extension)
        } else if self.shared.borrow().contains_key(key) {
            Some(Store::Shared)
        } else if self.bindings.contains_key(key) {
            Some(Store::Binding)
        } else {
            None
        }
    }

    /// Every key with the store holding it, sorted by key.
    pub fn all(&self) -> Vec<(String, Store)> {
        let mut all: Vec<(String, Store)> = self
            .bindings
            .keys()
            .map(|k| (k.clone(), Store::Binding))
            .chain(self.shared.borrow().keys().map(|k| (k.clone(), Store::Shared)))
            .chain(self.extensions.keys().map(|k| (k.clone(), Store::Extension)))
            .chain(self.aliases.keys().map(|k| (k.clone(), Store::Alias)))
            .collect();
        all.sort();
        all
    }

    /// Keys of registered fragments, sorted.
    pub fn extension_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.extensions.keys().cloned().collect();
        names.sort();
        names
    }

    /// Union of the deep properties every registered fragment declares.
    pub fn deep_property_names(&self) -> Vec<String> {
        let mut names = vec![];
        for key in self.extension_names() {
            if let Some(fragment) = self.extensions.get(&key) {
                for name in fragment.deep_properties() {
                    if !names.contains(name) {
                        names.push(name.clone());
                    }
                }
            }
        }
        names
    }

    /// Drops `key` from every store. Returns whether anything was removed.
    pub fn forget(&mut self, key: &str) -> bool {
        let b = self.bindings.remove(key).is_some();
        let s = self.shared.get_mut().remove(key).is_some();
        let e = self.extensions.remove(key).is_some();
        let a = self.aliases.remove(key).is_some();
        b || s || e || a
    }

    /// Empties all four stores.
    pub fn flush(&mut self) {
        self.bindings.clear();
        self.shared.get_mut().clear();
        self.extensions.clear();
        self.aliases.clear();
        debug!("registry flushed");
    }

    /// Clears the way for a new entry under `key`. Without `override_existing`
    /// an existing key is left alone and `false` is returned.
    fn make_room(&mut self, key: &str, override_existing: bool) -> bool {
        if !self.bound(key) {
            return true;
        }
        if !override_existing {
            trace!(key = %key, "already bound, skipping");
            return false;
        }
        self.forget(key);
        warn!(key = %key, "replacing existing registration");
        true
    }

    fn resolve_alias<'a>(&'a self, key: &'a str) -> &'a str {
        self.aliases.get(key).map(|s| s.as_str()).unwrap_or(key)
    }

    fn substitute(&self, args: Vec<Value>) -> KernelResult<Vec<Value>> {
        args.into_iter()
            .map(|arg| match arg {
                Value::String(ref s) if self.bound(s) => self.make(s),
                other => Ok(other),
            })
            .collect()
    }

    fn enter(&self, key: &str) -> KernelResult<ResolutionGuard<'_>> {
        let mut stack = self.resolving.borrow_mut();
        if stack.iter().any(|k| k == key) {
            let mut path = stack.clone();
            path.push(key.to_string());
            return Err(KernelError::CycleDetected {
                key: key.to_string(),
                path,
            });
        }
        stack.push(key.to_string());
        Ok(ResolutionGuard {
            stack: &self.resolving,
        })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::with_core()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry").field("keys", &self.all()).finish()
    }
}

struct ResolutionGuard<'a> {
    stack: &'a RefCell<Vec<String>>,
}

impl Drop for ResolutionGuard<'_> {
    fn drop(&mut self) {
        self.stack.borrow_mut().pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code;

    #[test]
    fn test_forget_clears_every_store() {
        let mut r = Registry::new();
        r.bind("k", |_c| Ok(Value::Null), false);
        assert!(r.forget("k"));
        assert!(!r.bound("k"));
        assert!(!r.forget("k"));
    }

    #[test]
    fn test_instance_is_returned_as_is() {
        let mut r = Registry::new();
        r.instance("cfg", Value::from("prod"));
        assert!(r.resolved("cfg"));
        assert_eq!(r.make("cfg").unwrap(), Value::from("prod"));
    }

    #[test]
    fn test_one_level_argument_substitution() {
        let mut r = Registry::new();
        r.instance("name", Value::from("db"));
        r.bind(
            "conn",
            |c| {
                let name = c.args.get(0).cloned().unwrap_or_default();
                let port = c.args.get(1).cloned().unwrap_or_default();
                Ok(Value::from(format!("{}:{}", name.as_str().unwrap_or("?"), port)))
            },
            false,
        );
        let v = r
            .make_with("conn", vec![Value::from("name"), Value::from(5432)], None)
            .unwrap();
        assert_eq!(v, Value::from("db:5432"));
    }

    #[test]
    fn test_scope_reaches_factory() {
        let mut r = Registry::new();
        r.bind(
            "echo",
            |c| Ok(c.scope.cloned().unwrap_or(Value::Null)),
            false,
        );
        let scope = Value::from("me");
        assert_eq!(r.make_with("echo", vec![], Some(&scope)).unwrap(), scope);
    }

    #[test]
    fn test_deep_property_names_scans_fragments() {
        let mut r = Registry::new();
        r.register(
            Fragment::new(
                "A",
                Value::Map(code! { "deepProperties" => vec![Value::from("a"), Value::from("b")] }),
            )
            .unwrap(),
        );
        r.register(
            Fragment::new(
                "B",
                Value::Map(code! { "deepProperties" => vec![Value::from("b"), Value::from("c")] }),
            )
            .unwrap(),
        );
        assert_eq!(
            r.deep_property_names(),
            vec!["a".to_string(), "b".to_string(), "c".to_string()]
        );
    }

    #[test]
    fn test_guard_unwinds_after_error() {
        let mut r = Registry::new();
        r.bind(
            "fails",
            |_c| Err(KernelError::Type("boom".to_string())),
            false,
        );
        assert!(r.make("fails").is_err());
        assert!(r.resolving.borrow().is_empty());
    }
}
