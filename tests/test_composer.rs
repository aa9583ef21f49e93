//! Tests for class composition: merge order, deep merging and class chains.

extern crate mixkit;

use std::cell::Cell;
use std::rc::Rc;

use mixkit::code;
use mixkit::runner::compose::{include, mix, ClassComposer, Part};
use mixkit::runner::ds::class::{Class, ClassRef, ROOT_CLASS_NAME};
use mixkit::runner::ds::error::{KernelError, KernelResult};
use mixkit::runner::ds::fragment::Fragment;
use mixkit::runner::ds::method::Method;
use mixkit::runner::ds::object::ObjectRef;
use mixkit::runner::ds::value::{Code, Value};
use mixkit::runner::plugin::Registry;

fn registry_with_ab() -> Registry {
    let mut r = Registry::new();
    r.register(Fragment::new("A", Value::Map(code! { "x" => 1, "fromA" => true })).unwrap());
    r.register(Fragment::new("B", Value::Map(code! { "x" => 2, "fromB" => true })).unwrap());
    r
}

fn make(registry: &Registry, parts: &[Part], override_members: bool) -> ClassRef {
    ClassComposer::new(registry)
        .with_override(override_members)
        .make(Some(&Class::root()), parts, &[])
        .unwrap()
}

// ============================================================================
// Merge order
// ============================================================================

#[test]
fn test_first_fragment_wins_without_override() {
    let r = registry_with_ab();
    let class = make(&r, &[Part::from("A"), Part::from("B")], false);
    let obj = class.instantiate(Value::Undefined).unwrap();
    assert_eq!(obj.get("x"), Value::from(1));
    assert_eq!(obj.get("fromA"), Value::from(true));
    assert_eq!(obj.get("fromB"), Value::from(true));
}

#[test]
fn test_last_fragment_wins_with_override() {
    let r = registry_with_ab();
    let class = make(&r, &[Part::from("A"), Part::from("B")], true);
    let obj = class.instantiate(Value::Undefined).unwrap();
    assert_eq!(obj.get("x"), Value::from(2));
}

#[test]
fn test_mixins_recorded_in_composition_order() {
    let r = registry_with_ab();
    let class = make(&r, &[Part::from("B"), Part::from("A")], false);
    let names: Vec<String> = class.mixins().into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["B".to_string(), "A".to_string()]);
    assert!(class.implements("A"));
    assert!(!class.implements("C"));
}

#[test]
fn test_plain_code_is_not_recorded_as_fragment() {
    let r = registry_with_ab();
    let class = make(&r, &[Part::from(code! { "x" => 0 }), Part::from("A")], false);
    assert_eq!(class.lookup("x"), Some(&Value::from(0)));
    let names: Vec<String> = class.mixins().into_iter().map(|m| m.name).collect();
    assert_eq!(names, vec!["A".to_string()]);
}

#[test]
fn test_unknown_fragment_key_fails() {
    let r = Registry::new();
    let err = ClassComposer::new(&r)
        .make(Some(&Class::root()), &[Part::from("Nope")], &[])
        .unwrap_err();
    assert_eq!(err, KernelError::Resolution("Nope".to_string()));
}

#[test]
fn test_factory_key_is_not_a_fragment() {
    let mut r = Registry::new();
    let runs = Rc::new(Cell::new(0));
    let counter = runs.clone();
    r.bind(
        "Widget",
        move |_c| {
            counter.set(counter.get() + 1);
            Ok(Value::Null)
        },
        false,
    );
    r.alias("Widget", "W");
    for key in &["Widget", "W"] {
        let err = ClassComposer::new(&r)
            .make(Some(&Class::root()), &[Part::from(*key)], &[])
            .unwrap_err();
        assert_eq!(err, KernelError::Resolution("Widget".to_string()));
    }
    assert_eq!(runs.get(), 0);
}

#[test]
fn test_missing_parent() {
    let r = Registry::new();
    let composer = ClassComposer::new(&r);
    assert_eq!(composer.extend(None, &[], &[]).unwrap_err(), KernelError::MissingParent);
    assert_eq!(
        composer.make(None, &[Part::from("A")], &[]).unwrap_err(),
        KernelError::MissingParent
    );
}

// ============================================================================
// Deep properties
// ============================================================================

#[test]
fn test_deep_list_concatenates_parent_first() {
    let r = Registry::new();
    let composer = ClassComposer::new(&r);
    let parent = composer
        .extend(Some(&Class::root()), &[code! { "extendable" => vec![Value::from("a")] }], &[])
        .unwrap();
    let child = composer
        .extend(Some(&parent), &[code! { "extendable" => vec![Value::from("b")] }], &[])
        .unwrap();
    assert_eq!(
        child.lookup("extendable"),
        Some(&Value::List(vec![Value::from("a"), Value::from("b")]))
    );
    assert_eq!(
        parent.lookup("extendable"),
        Some(&Value::List(vec![Value::from("a")]))
    );
}

#[test]
fn test_deep_map_merges_with_child_winning() {
    let r = Registry::new();
    let composer = ClassComposer::new(&r);
    let parent = composer
        .extend(
            Some(&Class::root()),
            &[code! { "eventsCatalog" => code! { "save" => "saved", "load" => "loaded" } }],
            &[],
        )
        .unwrap();
    let child = composer
        .extend(Some(&parent), &[code! { "eventsCatalog" => code! { "save" => "stored" } }], &[])
        .unwrap();
    assert_eq!(
        child.lookup("eventsCatalog"),
        Some(&Value::Map(code! { "save" => "stored", "load" => "loaded" }))
    );
}

#[test]
fn test_non_deep_members_are_replaced() {
    let r = Registry::new();
    let composer = ClassComposer::new(&r);
    let parent = composer
        .extend(Some(&Class::root()), &[code! { "tags" => vec![Value::from("a")] }], &[])
        .unwrap();
    let child = composer
        .extend(Some(&parent), &[code! { "tags" => vec![Value::from("b")] }], &[])
        .unwrap();
    assert_eq!(child.lookup("tags"), Some(&Value::List(vec![Value::from("b")])));
}

#[test]
fn test_fragment_declared_deep_property_applies_to_subclasses() {
    let mut r = Registry::new();
    r.register(
        Fragment::new(
            "Routes",
            Value::Map(code! { "deepProperties" => vec![Value::from("routes")], "routes" => vec![Value::from("/")] }),
        )
        .unwrap(),
    );
    let composer = ClassComposer::new(&r);
    let parent = composer.make(Some(&Class::root()), &[Part::from("Routes")], &[]).unwrap();
    let child = composer
        .extend(Some(&parent), &[code! { "routes" => vec![Value::from("/about")] }], &[])
        .unwrap();
    assert_eq!(
        child.lookup("routes"),
        Some(&Value::List(vec![Value::from("/"), Value::from("/about")]))
    );
}

#[test]
fn test_custom_deep_list() {
    let r = Registry::new();
    let composer = ClassComposer::new(&r).with_deep_properties(vec!["tags".to_string()]);
    let parent = composer
        .extend(Some(&Class::root()), &[code! { "tags" => vec![Value::from("a")] }], &[])
        .unwrap();
    let child = composer
        .extend(Some(&parent), &[code! { "tags" => vec![Value::from("b")] }], &[])
        .unwrap();
    assert_eq!(
        child.lookup("tags"),
        Some(&Value::List(vec![Value::from("a"), Value::from("b")]))
    );
}

// ============================================================================
// Class chain
// ============================================================================

fn describe(_this: &ObjectRef, _args: Vec<Value>) -> KernelResult<Value> {
    Ok(Value::from("base"))
}

#[test]
fn test_chain_ends_at_root_and_super_calls_work() {
    fn child_describe(this: &ObjectRef, args: Vec<Value>) -> KernelResult<Value> {
        let class = this.class();
        let parent = this.call_super(&class, "describe", args)?;
        Ok(Value::from(format!("child of {}", parent)))
    }

    let r = Registry::new();
    let composer = ClassComposer::new(&r);
    let base = composer
        .extend(Some(&Class::root()), &[code! { "className" => "Base", "describe" => Method::native(describe) }], &[])
        .unwrap();
    let child = composer
        .extend(
            Some(&base),
            &[code! { "describe" => Method::native(child_describe) }],
            &[code! { "className" => "Child", "kind" => "static" }],
        )
        .unwrap();

    assert_eq!(child.name(), "Child");
    assert_eq!(child.lookup_static("kind"), Some(&Value::from("static")));
    assert!(child.is_subclass_of(&base));
    assert!(!base.is_subclass_of(&child));
    let names: Vec<&str> = child.ancestors().map(|c| c.name()).collect();
    assert_eq!(names, vec!["Child", "Base", ROOT_CLASS_NAME]);

    let obj = child.instantiate(Value::Undefined).unwrap();
    assert_eq!(obj.call("describe", vec![]).unwrap(), Value::from("child of \"base\""));
}

#[test]
fn test_extend_later_mappings_win() {
    let r = Registry::new();
    let class = ClassComposer::new(&r)
        .extend(Some(&Class::root()), &[code! { "x" => 1 }, code! { "x" => 2 }], &[])
        .unwrap();
    assert_eq!(class.lookup("x"), Some(&Value::from(2)));
    assert_eq!(class.name(), "Anonymous");
}

// ============================================================================
// mix / include on live instances
// ============================================================================

#[test]
fn test_include_never_overwrites_existing_instance_members() {
    let r = Registry::new();
    let class = ClassComposer::new(&r)
        .extend(Some(&Class::root()), &[code! { "x" => 0 }], &[])
        .unwrap();
    let obj = class.instantiate(Value::Undefined).unwrap();
    let a = Fragment::new("A", Value::Map(code! { "x" => 1, "y" => 1 })).unwrap();
    let b = Fragment::new("B", Value::Map(code! { "y" => 2 })).unwrap();

    let mut target = obj.clone();
    include(&mut target, vec![&a, &b], true).unwrap();
    assert_eq!(obj.get("x"), Value::from(0));
    assert_eq!(obj.get("y"), Value::from(2));
    assert_eq!(obj.included(), vec!["A".to_string(), "B".to_string()]);
    assert!(obj.implements("B"));
    assert!(!class.implements("B"));
}

#[test]
fn test_mix_with_override_replaces() {
    let r = Registry::new();
    let class = ClassComposer::new(&r)
        .extend(Some(&Class::root()), &[code! { "x" => 0 }], &[])
        .unwrap();
    let obj = class.instantiate(Value::Undefined).unwrap();
    let a = Fragment::new("A", Value::Map(code! { "x" => 1 })).unwrap();
    let mut target = obj.clone();
    mix(&mut target, &a, false).unwrap();
    assert_eq!(obj.get("x"), Value::from(0));
    mix(&mut target, &a, true).unwrap();
    assert_eq!(obj.get("x"), Value::from(1));
}

#[test]
fn test_functional_fragment_in_make() {
    let stamp = Fragment::functional("Stamp", |target| {
        let label = target.label();
        target.set_member("stampedOn", Value::from(label));
        Ok(())
    })
    .unwrap();
    let r = Registry::new();
    let own: Code = code! { "className" => "Stamped" };
    let class = ClassComposer::new(&r)
        .make(Some(&Class::root()), &[Part::from(own), Part::from(stamp)], &[])
        .unwrap();
    assert_eq!(class.lookup("stampedOn"), Some(&Value::from("prototype")));
    assert!(class.implements("Stamp"));
}

#[test]
fn test_functional_fragment_error_propagates() {
    let failing = Fragment::functional("Failing", |_t| Err(KernelError::Type("nope".to_string()))).unwrap();
    let r = Registry::new();
    let err = ClassComposer::new(&r)
        .make(Some(&Class::root()), &[Part::from(failing)], &[])
        .unwrap_err();
    assert_eq!(err, KernelError::Type("nope".to_string()));
}
