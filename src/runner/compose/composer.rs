//! Deriving classes from a parent plus fragments.
//!
//! The pipeline for both entry points is: gather fragments, merge them into one
//! prototype, deep-merge against the parent chain, derive the class, link it to
//! its parent.
//!
//! Conflicts between fragments follow a fixed rule. Without override each mix
//! only fills members the target lacks, so the first fragment to define a
//! member keeps it. With override every mix writes, so the last one wins.
//! Members the target had before `include` started are never overwritten by it.

use std::collections::{BTreeSet, HashSet};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::runner::compose::deep_merge::{deep_property_names, merge_deep};
use crate::runner::ds::class::{Class, ClassParts, ClassRef, MixinRecord};
use crate::runner::ds::error::{KernelError, KernelResult};
use crate::runner::ds::fragment::{Fragment, FragmentKind, MixTarget};
use crate::runner::ds::value::{Code, Value};
use crate::runner::plugin::config::{ComposerConfig, DEFAULT_DEEP_PROPERTIES};
use crate::runner::plugin::registry::Registry;

pub const CLASS_NAME_KEY: &str = "className";
const ANONYMOUS_CLASS: &str = "Anonymous";

/// One entry in a `make` fragment list.
#[derive(Clone)]
pub enum Part {
    /// A registry key resolved to a fragment.
    Alias(String),
    Fragment(Fragment),
    /// Plain members, mixed in place but not recorded as a fragment.
    Code(Code),
}

impl From<&str> for Part {
    fn from(key: &str) -> Self {
        Part::Alias(key.to_string())
    }
}

impl From<String> for Part {
    fn from(key: String) -> Self {
        Part::Alias(key)
    }
}

impl From<Fragment> for Part {
    fn from(f: Fragment) -> Self {
        Part::Fragment(f)
    }
}

impl From<Code> for Part {
    fn from(c: Code) -> Self {
        Part::Code(c)
    }
}

enum Gathered {
    Fragment(Rc<Fragment>),
    Code(Code),
}

/// Members accumulated for a prototype (or statics) that is not a class yet.
pub struct ProtoBuilder {
    label: String,
    members: Code,
    mixins: Vec<MixinRecord>,
    interfaces: BTreeSet<String>,
}

impl ProtoBuilder {
    pub fn new(label: &str) -> Self {
        ProtoBuilder {
            label: label.to_string(),
            members: Code::new(),
            mixins: vec![],
            interfaces: BTreeSet::new(),
        }
    }

    pub fn members(&self) -> &Code {
        &self.members
    }

    pub fn mixins(&self) -> &[MixinRecord] {
        &self.mixins
    }

    pub fn into_members(self) -> Code {
        self.members
    }
}

impl MixTarget for ProtoBuilder {
    fn has_member(&self, name: &str) -> bool {
        self.members.contains_key(name)
    }

    fn get_member(&self, name: &str) -> Option<Value> {
        self.members.get(name).cloned()
    }

    fn set_member(&mut self, name: &str, value: Value) {
        self.members.insert(name.to_string(), value);
    }

    fn record_mixin(&mut self, record: MixinRecord, interfaces: &[String]) {
        if !self.mixins.iter().any(|r| r.name == record.name) {
            self.mixins.push(record);
        }
        self.interfaces.extend(interfaces.iter().cloned());
    }

    fn label(&self) -> String {
        self.label.clone()
    }
}

/// Mixes one fragment onto `target`.
///
/// Static fragments fill in members the target lacks, or overwrite everything
/// when `override_members` is set. Functional fragments are called with the target.
pub fn mix(target: &mut dyn MixTarget, fragment: &Fragment, override_members: bool) -> KernelResult<()> {
    match fragment.kind() {
        FragmentKind::Functional(f) => f(&mut *target)?,
        FragmentKind::Static(_) => {
            for (name, value) in fragment.get_code() {
                if override_members || !target.has_member(&name) {
                    target.set_member(&name, value);
                } else {
                    trace!(member = %name, fragment = %fragment.name(), "member kept");
                }
            }
        }
    }
    target.record_mixin(fragment.record(), &fragment.interfaces());
    debug!(fragment = %fragment.name(), target = %target.label(), "fragment mixed");
    Ok(())
}

/// Mixes fragments in order. See the module docs for the conflict rule.
pub fn include<'a, I>(target: &mut dyn MixTarget, fragments: I, override_members: bool) -> KernelResult<()>
where
    I: IntoIterator<Item = &'a Fragment>,
{
    let mut written = HashSet::new();
    for fragment in fragments {
        include_one(target, fragment, override_members, &mut written)?;
    }
    Ok(())
}

fn include_one(
    target: &mut dyn MixTarget,
    fragment: &Fragment,
    override_members: bool,
    written: &mut HashSet<String>,
) -> KernelResult<()> {
    match fragment.kind() {
        FragmentKind::Functional(f) => f(&mut *target)?,
        FragmentKind::Static(_) => fill(target, fragment.get_code(), fragment.name(), override_members, written),
    }
    target.record_mixin(fragment.record(), &fragment.interfaces());
    debug!(fragment = %fragment.name(), target = %target.label(), "fragment included");
    Ok(())
}

fn fill(
    target: &mut dyn MixTarget,
    code: Code,
    source: &str,
    override_members: bool,
    written: &mut HashSet<String>,
) {
    for (name, value) in code {
        let replace = !target.has_member(&name) || (override_members && written.contains(&name));
        if replace {
            target.set_member(&name, value);
            written.insert(name);
        } else {
            trace!(member = %name, source = %source, "member kept");
        }
    }
}

/// Derives classes. Borrows the registry it resolves fragment names against.
pub struct ClassComposer<'r> {
    registry: &'r Registry,
    deep_properties: Vec<String>,
    override_members: bool,
}

impl<'r> ClassComposer<'r> {
    pub fn new(registry: &'r Registry) -> Self {
        ClassComposer {
            registry,
            deep_properties: DEFAULT_DEEP_PROPERTIES.clone(),
            override_members: false,
        }
    }

    pub fn from_config(registry: &'r Registry, config: &ComposerConfig) -> Self {
        ClassComposer {
            registry,
            deep_properties: config.deep_properties.clone(),
            override_members: config.override_members,
        }
    }

    pub fn with_deep_properties(mut self, names: Vec<String>) -> Self {
        self.deep_properties = names;
        self
    }

    pub fn with_override(mut self, override_members: bool) -> Self {
        self.override_members = override_members;
        self
    }

    pub fn registry(&self) -> &Registry {
        self.registry
    }

    /// Derives a class from plain member mappings. Later mappings win on collision.
    pub fn extend(
        &self,
        parent: Option<&ClassRef>,
        proto: &[Code],
        statics: &[Code],
    ) -> KernelResult<ClassRef> {
        let parent = parent.ok_or(KernelError::MissingParent)?;
        let mut builder = ProtoBuilder::new("prototype");
        builder.members = flatten(proto);
        let names = deep_property_names(&self.deep_properties, parent, None::<&Fragment>);
        Ok(self.finish(parent, builder, flatten(statics), names))
    }

    /// Derives a class from fragments, registry keys and plain mappings.
    pub fn make(
        &self,
        parent: Option<&ClassRef>,
        proto: &[Part],
        statics: &[Part],
    ) -> KernelResult<ClassRef> {
        let parent = parent.ok_or(KernelError::MissingParent)?;
        let proto_parts = self.gather(proto)?;
        let static_parts = self.gather(statics)?;

        let mut builder = ProtoBuilder::new("prototype");
        self.include_parts(&mut builder, &proto_parts)?;
        let mut static_builder = ProtoBuilder::new("statics");
        self.include_parts(&mut static_builder, &static_parts)?;

        let fragments = proto_parts.iter().filter_map(|p| match p {
            Gathered::Fragment(f) => Some(f.as_ref()),
            Gathered::Code(_) => None,
        });
        let names = deep_property_names(&self.deep_properties, parent, fragments);
        Ok(self.finish(parent, builder, static_builder.into_members(), names))
    }

    fn gather(&self, parts: &[Part]) -> KernelResult<Vec<Gathered>> {
        parts
            .iter()
            .map(|part| match part {
                Part::Alias(key) => self.registry.fragment(key).map(Gathered::Fragment),
                Part::Fragment(f) => Ok(Gathered::Fragment(Rc::new(f.clone()))),
                Part::Code(c) => Ok(Gathered::Code(c.clone())),
            })
            .collect()
    }

    fn include_parts(&self, target: &mut ProtoBuilder, parts: &[Gathered]) -> KernelResult<()> {
        let mut written = HashSet::new();
        for part in parts {
            match part {
                Gathered::Fragment(f) => include_one(&mut *target, f, self.override_members, &mut written)?,
                Gathered::Code(c) => fill(&mut *target, c.clone(), "own members", self.override_members, &mut written),
            }
        }
        Ok(())
    }

    fn finish(
        &self,
        parent: &ClassRef,
        builder: ProtoBuilder,
        statics: Code,
        deep_properties: Vec<String>,
    ) -> ClassRef {
        let ProtoBuilder {
            members: mut prototype,
            mixins,
            interfaces,
            ..
        } = builder;
        merge_deep(&mut prototype, parent, &deep_properties);
        let name = class_name(&prototype, &statics);
        let class = Class::derive(
            parent,
            ClassParts {
                name,
                prototype,
                statics,
                mixins,
                interfaces,
                deep_properties,
            },
        );
        debug!(
            class = %class.name(),
            parent = %parent.name(),
            mixins = ?class.own_mixins().iter().map(|m| m.name.as_str()).collect::<Vec<_>>(),
            "class derived"
        );
        class
    }
}

fn flatten(codes: &[Code]) -> Code {
    let mut out = Code::new();
    for code in codes {
        for (k, v) in code {
            out.insert(k.clone(), v.clone());
        }
    }
    out
}

fn class_name(prototype: &Code, statics: &Code) -> String {
    statics
        .get(CLASS_NAME_KEY)
        .or_else(|| prototype.get(CLASS_NAME_KEY))
        .and_then(|v| v.as_str())
        .unwrap_or(ANONYMOUS_CLASS)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::code;

    fn fragment(name: &str, code: Code) -> Fragment {
        Fragment::new(name, Value::Map(code)).unwrap()
    }

    #[test]
    fn test_mix_defaults_keep_existing() {
        let mut target = ProtoBuilder::new("t");
        target.set_member("x", Value::from(0));
        mix(&mut target, &fragment("A", code! { "x" => 1, "y" => 1 }), false).unwrap();
        assert_eq!(target.members().get("x"), Some(&Value::from(0)));
        assert_eq!(target.members().get("y"), Some(&Value::from(1)));
        mix(&mut target, &fragment("B", code! { "x" => 2 }), true).unwrap();
        assert_eq!(target.members().get("x"), Some(&Value::from(2)));
    }

    #[test]
    fn test_include_protects_predating_members_even_with_override() {
        let mut target = ProtoBuilder::new("t");
        target.set_member("x", Value::from(0));
        let a = fragment("A", code! { "x" => 1, "y" => 1 });
        let b = fragment("B", code! { "x" => 2, "y" => 2 });
        include(&mut target, vec![&a, &b], true).unwrap();
        assert_eq!(target.members().get("x"), Some(&Value::from(0)));
        assert_eq!(target.members().get("y"), Some(&Value::from(2)));
        let names: Vec<&str> = target.mixins().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B"]);
    }

    #[test]
    fn test_functional_fragment_receives_target() {
        let f = Fragment::functional("Stamp", |t| {
            let n = t.get_member("n").and_then(|v| v.as_number()).unwrap_or(0.0);
            t.set_member("n", Value::Number(n + 1.0));
            Ok(())
        })
        .unwrap();
        let mut target = ProtoBuilder::new("t");
        mix(&mut target, &f, false).unwrap();
        mix(&mut target, &f, false).unwrap();
        assert_eq!(target.members().get("n"), Some(&Value::from(2)));
        assert_eq!(target.mixins().len(), 1);
    }

    #[test]
    fn test_extend_last_wins_and_names_class() {
        let registry = Registry::new();
        let composer = ClassComposer::new(&registry);
        let class = composer
            .extend(
                Some(&Class::root()),
                &[code! { "x" => 1, "className" => "Point" }, code! { "x" => 2 }],
                &[code! { "origin" => 0 }],
            )
            .unwrap();
        assert_eq!(class.name(), "Point");
        assert_eq!(class.lookup("x"), Some(&Value::from(2)));
        assert_eq!(class.lookup_static("origin"), Some(&Value::from(0)));
    }

    #[test]
    fn test_missing_parent() {
        let registry = Registry::new();
        let composer = ClassComposer::new(&registry);
        assert_eq!(
            composer.extend(None, &[], &[]).unwrap_err(),
            KernelError::MissingParent
        );
        assert_eq!(
            composer.make(None, &[], &[]).unwrap_err(),
            KernelError::MissingParent
        );
    }
}
