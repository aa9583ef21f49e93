//! Capability fragments: named, reusable bundles of members.
//!
//! A fragment is either a static member mapping merged onto its target, or a
//! functional mixin handed the target to modify as it sees fit. Fragments are
//! immutable once built and every read of their code returns a copy, so mixing
//! the same fragment onto two targets never leaks mutations between them.

use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::runner::ds::class::MixinRecord;
use crate::runner::ds::error::{KernelError, KernelResult};
use crate::runner::ds::method::BoundMethod;
use crate::runner::ds::object::ObjectRef;
use crate::runner::ds::value::{Code, Value};

pub const KEY_INITIALIZER: &str = "initializer";
pub const KEY_INTERFACES: &str = "interfaces";
pub const KEY_DEEP_PROPERTIES: &str = "deepProperties";

lazy_static! {
    static ref RESERVED_KEYS: HashSet<&'static str> =
        [KEY_INITIALIZER, KEY_INTERFACES, KEY_DEEP_PROPERTIES]
            .iter()
            .cloned()
            .collect();
}

pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(key)
}

/// Anything a fragment can be mixed onto: a prototype under construction or a live instance.
pub trait MixTarget {
    /// Whether `name` is already present, in which case non-destructive mixing keeps it.
    fn has_member(&self, name: &str) -> bool;

    fn get_member(&self, name: &str) -> Option<Value>;

    fn set_member(&mut self, name: &str, value: Value);

    /// Remember that a fragment contributed to this target.
    fn record_mixin(&mut self, record: MixinRecord, interfaces: &[String]);

    /// Human-readable label for logs.
    fn label(&self) -> String;
}

pub type MixFn = Rc<dyn Fn(&mut dyn MixTarget) -> KernelResult<()>>;

#[derive(Clone)]
pub enum FragmentKind {
    Static(Code),
    Functional(MixFn),
}

#[derive(Clone)]
pub struct Fragment {
    name: String,
    kind: FragmentKind,
    initializer: Option<String>,
    interfaces: Vec<String>,
    deep_properties: Vec<String>,
}

impl Fragment {
    /// Builds a static fragment. `code` must be a `Value::Map`; its reserved keys are
    /// parsed and stripped.
    pub fn new(name: &str, code: Value) -> KernelResult<Self> {
        let name = validate_name(name)?;
        let mut code = match code {
            Value::Map(m) => m,
            other => {
                return Err(KernelError::InvalidFragmentCode {
                    name,
                    reason: format!("expected a mapping, got {}", other.type_name()),
                })
            }
        };

        let initializer = match code.shift_remove(KEY_INITIALIZER) {
            None | Some(Value::Undefined) | Some(Value::Null) => None,
            Some(Value::String(m)) if !m.is_empty() => Some(m),
            Some(other) => {
                return Err(KernelError::InvalidFragmentCode {
                    name,
                    reason: format!(
                        "'{}' must be a method name, got {}",
                        KEY_INITIALIZER,
                        other.type_name()
                    ),
                })
            }
        };
        let interfaces = take_name_list(&name, &mut code, KEY_INTERFACES)?;
        let deep_properties = take_name_list(&name, &mut code, KEY_DEEP_PROPERTIES)?;

        Ok(Fragment {
            name,
            kind: FragmentKind::Static(code),
            initializer,
            interfaces,
            deep_properties,
        })
    }

    /// Builds a functional mixin, invoked with the target instead of being merged.
    pub fn functional<F>(name: &str, f: F) -> KernelResult<Self>
    where
        F: Fn(&mut dyn MixTarget) -> KernelResult<()> + 'static,
    {
        Ok(Fragment {
            name: validate_name(name)?,
            kind: FragmentKind::Functional(Rc::new(f)),
            initializer: None,
            interfaces: vec![],
            deep_properties: vec![],
        })
    }

    /// Compiled-in fragments whose shape is known to be valid.
    pub(crate) fn builtin(
        name: &str,
        code: Code,
        initializer: Option<&str>,
        interfaces: &[&str],
        deep_properties: &[&str],
    ) -> Self {
        Fragment {
            name: name.to_string(),
            kind: FragmentKind::Static(code),
            initializer: initializer.map(|m| m.to_string()),
            interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
            deep_properties: deep_properties.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn with_initializer(mut self, method: impl Into<String>) -> Self {
        self.initializer = Some(method.into());
        self
    }

    pub fn with_interface(mut self, interface: impl Into<String>) -> Self {
        let interface = interface.into();
        if !self.interfaces.contains(&interface) {
            self.interfaces.push(interface);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &FragmentKind {
        &self.kind
    }

    pub fn is_functional(&self) -> bool {
        matches!(self.kind, FragmentKind::Functional(_))
    }

    /// A copy of the member mapping. Functional fragments have none.
    pub fn get_code(&self) -> Code {
        match &self.kind {
            FragmentKind::Static(code) => code.clone(),
            FragmentKind::Functional(_) => Code::new(),
        }
    }

    pub fn initializer_method(&self) -> Option<&str> {
        self.initializer.as_deref()
    }

    /// Capability tags this fragment satisfies: its own name, then declared interfaces.
    pub fn interfaces(&self) -> Vec<String> {
        let mut tags = vec![self.name.clone()];
        for i in &self.interfaces {
            if !tags.contains(i) {
                tags.push(i.clone());
            }
        }
        tags
    }

    pub fn deep_properties(&self) -> &[String] {
        &self.deep_properties
    }

    pub fn method_names(&self) -> Vec<String> {
        self.members_where(|v| v.is_callable())
    }

    pub fn property_names(&self) -> Vec<String> {
        self.members_where(|v| !v.is_callable())
    }

    /// The fragment's methods with `this` fixed to `target`.
    pub fn bind_to(&self, target: &ObjectRef) -> IndexMap<String, BoundMethod> {
        let mut bound = IndexMap::new();
        if let FragmentKind::Static(code) = &self.kind {
            for (name, value) in code {
                if let Value::Function(m) = value {
                    bound.insert(name.clone(), BoundMethod::new(name.clone(), target, m.clone()));
                }
            }
        }
        bound
    }

    pub(crate) fn record(&self) -> MixinRecord {
        MixinRecord {
            name: self.name.clone(),
            initializer: self.initializer.clone(),
        }
    }

    fn members_where(&self, keep: impl Fn(&Value) -> bool) -> Vec<String> {
        match &self.kind {
            FragmentKind::Static(code) => code
                .iter()
                .filter(|(_, v)| keep(v))
                .map(|(k, _)| k.clone())
                .collect(),
            FragmentKind::Functional(_) => vec![],
        }
    }
}

impl fmt::Debug for Fragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fragment")
            .field("name", &self.name)
            .field("functional", &self.is_functional())
            .field("initializer", &self.initializer)
            .field("interfaces", &self.interfaces)
            .field("deep_properties", &self.deep_properties)
            .finish()
    }
}

fn validate_name(name: &str) -> KernelResult<String> {
    if name.trim().is_empty() {
        Err(KernelError::InvalidFragmentName(name.to_string()))
    } else {
        Ok(name.to_string())
    }
}

fn take_name_list(fragment: &str, code: &mut Code, key: &str) -> KernelResult<Vec<String>> {
    match code.shift_remove(key) {
        None | Some(Value::Undefined) | Some(Value::Null) => Ok(vec![]),
        Some(Value::List(items)) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(KernelError::InvalidFragmentCode {
                    name: fragment.to_string(),
                    reason: format!("'{}' entries must be strings, got {}", key, other.type_name()),
                }),
            })
            .collect(),
        Some(other) => Err(KernelError::InvalidFragmentCode {
            name: fragment.to_string(),
            reason: format!("'{}' must be a list, got {}", key, other.type_name()),
        }),
    }
}
