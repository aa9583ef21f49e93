//! Class descriptors.
//!
//! A derived class holds an explicit reference to its parent descriptor.
//! Member resolution walks that chain by hand; there is no implicit
//! delegation. Every chain ends at the per-thread root class `Class`.

use std::collections::BTreeSet;
use std::fmt;
use std::rc::Rc;

use uuid::Uuid;

use crate::runner::compose::initializer;
use crate::runner::ds::error::KernelResult;
use crate::runner::ds::object::ObjectRef;
use crate::runner::ds::value::{Code, Value};

pub const ROOT_CLASS_NAME: &str = "Class";

pub type ClassRef = Rc<Class>;

thread_local! {
    static ROOT: ClassRef = Rc::new(Class {
        id: Uuid::new_v4(),
        name: ROOT_CLASS_NAME.to_string(),
        parent: None,
        prototype: Code::new(),
        statics: Code::new(),
        mixins: vec![],
        interfaces: BTreeSet::new(),
        deep_properties: vec![],
    });
}

/// A fragment that contributed to a class or instance, with the initializer it declared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MixinRecord {
    pub name: String,
    pub initializer: Option<String>,
}

pub struct Class {
    id: Uuid,
    name: String,
    parent: Option<ClassRef>,
    prototype: Code,
    statics: Code,
    mixins: Vec<MixinRecord>,
    interfaces: BTreeSet<String>,
    deep_properties: Vec<String>,
}

/// The pieces the composer hands over to build a class.
pub(crate) struct ClassParts {
    pub name: String,
    pub prototype: Code,
    pub statics: Code,
    pub mixins: Vec<MixinRecord>,
    pub interfaces: BTreeSet<String>,
    pub deep_properties: Vec<String>,
}

impl Class {
    /// The common ancestor of every class on this thread.
    pub fn root() -> ClassRef {
        ROOT.with(|r| r.clone())
    }

    pub(crate) fn derive(parent: &ClassRef, parts: ClassParts) -> ClassRef {
        Rc::new(Class {
            id: Uuid::new_v4(),
            name: parts.name,
            parent: Some(parent.clone()),
            prototype: parts.prototype,
            statics: parts.statics,
            mixins: parts.mixins,
            interfaces: parts.interfaces,
            deep_properties: parts.deep_properties,
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// The parent class (`__parent__`).
    pub fn parent(&self) -> Option<&ClassRef> {
        self.parent.as_ref()
    }

    /// The parent's own prototype (`__super__`), for explicit super calls.
    pub fn super_prototype(&self) -> Option<&Code> {
        self.parent.as_ref().map(|p| &p.prototype)
    }

    pub fn prototype(&self) -> &Code {
        &self.prototype
    }

    pub fn statics(&self) -> &Code {
        &self.statics
    }

    /// This class followed by its ancestors, ending at the root.
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    pub fn lookup(&self, member: &str) -> Option<&Value> {
        self.ancestors().find_map(|c| c.prototype.get(member))
    }

    /// Resolves a member starting above this class, skipping its own prototype.
    pub fn lookup_super(&self, member: &str) -> Option<&Value> {
        self.parent.as_ref().and_then(|p| p.lookup(member))
    }

    pub fn lookup_static(&self, member: &str) -> Option<&Value> {
        self.ancestors().find_map(|c| c.statics.get(member))
    }

    pub fn has_member(&self, member: &str) -> bool {
        self.lookup(member).is_some()
    }

    /// Fragments mixed into the chain, root-most first, each name once.
    pub fn mixins(&self) -> Vec<MixinRecord> {
        let chain: Vec<&Class> = self.ancestors().collect();
        let mut seen = BTreeSet::new();
        let mut out = vec![];
        for class in chain.into_iter().rev() {
            for record in &class.mixins {
                if seen.insert(record.name.clone()) {
                    out.push(record.clone());
                }
            }
        }
        out
    }

    pub fn own_mixins(&self) -> &[MixinRecord] {
        &self.mixins
    }

    pub fn implements(&self, interface: &str) -> bool {
        self.ancestors().any(|c| c.interfaces.contains(interface))
    }

    pub fn interfaces(&self) -> BTreeSet<String> {
        self.ancestors()
            .flat_map(|c| c.interfaces.iter().cloned())
            .collect()
    }

    /// Deep property names in force for subclasses of this class.
    pub fn deep_properties(&self) -> &[String] {
        &self.deep_properties
    }

    pub fn is_subclass_of(&self, other: &Class) -> bool {
        self.ancestors().any(|c| c.id == other.id)
    }

    /// `new Class(options)`: allocates, runs fragment initializers, then `initialize`.
    pub fn instantiate(self: &Rc<Self>, options: Value) -> KernelResult<ObjectRef> {
        initializer::construct(self, options)
    }
}

impl fmt::Debug for Class {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Class")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("parent", &self.parent.as_ref().map(|p| p.name.clone()))
            .field("members", &self.prototype.keys().collect::<Vec<_>>())
            .field("mixins", &self.mixins)
            .finish()
    }
}

pub struct Ancestors<'a> {
    next: Option<&'a Class>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Class;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent.as_deref();
        Some(current)
    }
}
