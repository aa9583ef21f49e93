//! Tests for per-instance fragment initialization.

extern crate mixkit;

use std::cell::RefCell;
use std::rc::Rc;

use mixkit::code;
use mixkit::runner::compose::{init, init_with, mix, ClassComposer, Part};
use mixkit::runner::ds::class::Class;
use mixkit::runner::ds::error::KernelResult;
use mixkit::runner::ds::fragment::Fragment;
use mixkit::runner::ds::method::Method;
use mixkit::runner::ds::object::ObjectRef;
use mixkit::runner::ds::value::Value;
use mixkit::runner::plugin::Registry;

fn increment(this: &ObjectRef, _args: Vec<Value>) -> KernelResult<Value> {
    let n = this.get("counter").as_number().unwrap_or(0.0);
    this.set("counter", Value::Number(n + 1.0));
    Ok(Value::Undefined)
}

/// A fragment whose initializer appends its name to a shared log.
fn logging_fragment(name: &str, log: &Rc<RefCell<Vec<String>>>) -> Fragment {
    let sink = log.clone();
    let tag = name.to_string();
    let method = format!("init{}", name);
    Fragment::new(
        name,
        Value::Map(code! {
            "initializer" => method.clone(),
            method.as_str() => Method::closure(move |_this, _args| {
                sink.borrow_mut().push(tag.clone());
                Ok(Value::Undefined)
            }),
        }),
    )
    .unwrap()
}

#[test]
fn test_init_twice_equals_init_once() {
    let counter = Fragment::new(
        "Counter",
        Value::Map(code! { "initializer" => "initCounter", "initCounter" => Method::native(increment) }),
    )
    .unwrap();
    let r = Registry::new();
    let class = ClassComposer::new(&r)
        .make(Some(&Class::root()), &[Part::from(counter)], &[])
        .unwrap();
    let obj = class.instantiate(Value::Undefined).unwrap();
    assert_eq!(obj.get("counter"), Value::from(1));

    assert_eq!(init(&obj).unwrap(), 0);
    assert_eq!(init(&obj).unwrap(), 0);
    assert_eq!(obj.get("counter"), Value::from(1));
}

#[test]
fn test_initializers_run_in_composition_order() {
    let log = Rc::new(RefCell::new(vec![]));
    let r = Registry::new();
    let composer = ClassComposer::new(&r);
    let base = composer
        .make(
            Some(&Class::root()),
            &[Part::from(logging_fragment("B", &log)), Part::from(logging_fragment("A", &log))],
            &[],
        )
        .unwrap();
    let child = composer
        .make(Some(&base), &[Part::from(logging_fragment("C", &log))], &[])
        .unwrap();
    child.instantiate(Value::Undefined).unwrap();
    assert_eq!(*log.borrow(), vec!["B".to_string(), "A".to_string(), "C".to_string()]);
}

#[test]
fn test_fragment_repeated_down_the_chain_initializes_once() {
    let log = Rc::new(RefCell::new(vec![]));
    let shared = logging_fragment("Shared", &log);
    let r = Registry::new();
    let composer = ClassComposer::new(&r);
    let base = composer
        .make(Some(&Class::root()), &[Part::from(shared.clone())], &[])
        .unwrap();
    let child = composer.make(Some(&base), &[Part::from(shared)], &[]).unwrap();
    let obj = child.instantiate(Value::Undefined).unwrap();
    assert_eq!(log.borrow().len(), 1);
    assert!(obj.is_initialized("Shared"));
}

#[test]
fn test_initialize_hook_runs_after_fragment_initializers() {
    let log = Rc::new(RefCell::new(vec![]));
    let sink = log.clone();
    let hook = Method::closure(move |_this, args| {
        let opts = args.into_iter().next().unwrap_or_default();
        sink.borrow_mut().push(format!("initialize {}", opts));
        Ok(Value::Undefined)
    });
    let r = Registry::new();
    let class = ClassComposer::new(&r)
        .make(
            Some(&Class::root()),
            &[Part::from(code! { "initialize" => hook }), Part::from(logging_fragment("F", &log))],
            &[],
        )
        .unwrap();
    class.instantiate(Value::from(7)).unwrap();
    assert_eq!(*log.borrow(), vec!["F".to_string(), "initialize 7".to_string()]);
}

#[test]
fn test_instance_level_mixins_initialize_on_demand() {
    let log = Rc::new(RefCell::new(vec![]));
    let obj = Class::root().instantiate(Value::Undefined).unwrap();
    let late = logging_fragment("Late", &log);
    let mut target = obj.clone();
    mix(&mut target, &late, false).unwrap();
    assert!(log.borrow().is_empty());

    assert_eq!(init_with(&obj, &[&late]).unwrap(), 1);
    assert_eq!(init(&obj).unwrap(), 0);
    assert_eq!(*log.borrow(), vec!["Late".to_string()]);
}

#[test]
fn test_fragments_without_initializer_are_marked_only() {
    let plain = Fragment::new("Plain", Value::Map(code! { "x" => 1 })).unwrap();
    let r = Registry::new();
    let class = ClassComposer::new(&r)
        .make(Some(&Class::root()), &[Part::from(plain)], &[])
        .unwrap();
    let obj = class.instantiate(Value::Undefined).unwrap();
    assert!(obj.is_initialized("Plain"));
    assert_eq!(obj.get("x"), Value::from(1));
}

#[test]
fn test_non_callable_initializer_member_is_skipped() {
    let odd = Fragment::new("Odd", Value::Map(code! { "initializer" => "setup", "setup" => 3 })).unwrap();
    let r = Registry::new();
    let class = ClassComposer::new(&r)
        .make(Some(&Class::root()), &[Part::from(odd)], &[])
        .unwrap();
    let obj = class.instantiate(Value::Undefined).unwrap();
    assert!(obj.is_initialized("Odd"));
    assert_eq!(obj.get("setup"), Value::from(3));
}
