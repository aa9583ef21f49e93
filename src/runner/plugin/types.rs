//! Core types for the registry.

use std::fmt;
use std::rc::Rc;

use crate::runner::ds::error::KernelResult;
use crate::runner::ds::value::Value;
use crate::runner::plugin::registry::Registry;

/// What a factory is invoked with.
pub struct FactoryCall<'a> {
    /// Arguments after dependency substitution.
    pub args: Vec<Value>,

    /// The `this` the caller asked the factory to run with, if any.
    pub scope: Option<&'a Value>,

    /// The registry performing the resolution, for further lookups.
    pub registry: &'a Registry,
}

pub type Factory = Rc<dyn Fn(FactoryCall<'_>) -> KernelResult<Value>>;

/// A build-fresh registration.
#[derive(Clone)]
pub struct Binding {
    pub factory: Factory,
}

/// A singleton registration: the factory runs once, on first lookup.
pub struct SharedEntry {
    pub factory: Option<Factory>,
    pub value: Option<Value>,
}

/// The store a key lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Store {
    Binding,
    Shared,
    Extension,
    Alias,
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Store::Binding => "binding",
            Store::Shared => "shared",
            Store::Extension => "extension",
            Store::Alias => "alias",
        };
        write!(f, "{}", name)
    }
}
