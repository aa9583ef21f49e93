//! The `Properties` fragment: named property access with change events.
//!
//! `set` writes an own property. When the instance also carries the events
//! capability and the value actually changed, it fires `change:<name>` with
//! `(value, previous)` and then `change` with `(name)`. Both names go through
//! the instance's namespace and catalog like any other event.

use crate::code;
use crate::runner::ds::error::{KernelError, KernelResult};
use crate::runner::ds::fragment::Fragment;
use crate::runner::ds::method::Method;
use crate::runner::ds::object::ObjectRef;
use crate::runner::ds::value::Value;
use crate::runner::plugin::registry::Registry;
use crate::runner::std_lib::emitter::Emitter;
use crate::runner::std_lib::events::{resolve_event_name, EVENTS_INTERFACE};

pub const PROPERTIES_FRAGMENT: &str = "Properties";

pub fn fragment() -> Fragment {
    Fragment::builtin(
        PROPERTIES_FRAGMENT,
        code! {
            "get" => Method::native(get),
            "set" => Method::native(set),
            "has" => Method::native(has),
            "unset" => Method::native(unset),
        },
        None,
        &["properties"],
        &[],
    )
}

pub fn register(registry: &mut Registry) {
    registry.register(fragment());
}

fn name_arg(args: &[Value]) -> KernelResult<String> {
    match args.first() {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(KernelError::Type("property name must be a non-empty string".to_string())),
    }
}

fn get(this: &ObjectRef, args: Vec<Value>) -> KernelResult<Value> {
    Ok(this.get(&name_arg(&args)?))
}

fn has(this: &ObjectRef, args: Vec<Value>) -> KernelResult<Value> {
    Ok(Value::Boolean(this.has(&name_arg(&args)?)))
}

fn set(this: &ObjectRef, args: Vec<Value>) -> KernelResult<Value> {
    let name = name_arg(&args)?;
    let value = args.get(1).cloned().unwrap_or_default();
    let previous = this.get(&name);
    this.set(&name, value.clone());
    if previous != value {
        changed(this, &name, value, previous)?;
    }
    Ok(Value::Object(this.clone()))
}

fn unset(this: &ObjectRef, args: Vec<Value>) -> KernelResult<Value> {
    let name = name_arg(&args)?;
    let previous = this.get(&name);
    this.unset(&name);
    let now = this.get(&name);
    if previous != now {
        changed(this, &name, now, previous)?;
    }
    Ok(Value::Object(this.clone()))
}

fn changed(this: &ObjectRef, name: &str, value: Value, previous: Value) -> KernelResult<()> {
    if !this.implements(EVENTS_INTERFACE) {
        return Ok(());
    }
    let specific = resolve_event_name(this, &format!("change:{}", name));
    this.trigger(&specific, vec![value, previous])?;
    let general = resolve_event_name(this, "change");
    this.trigger(&general, vec![Value::from(name)])
}
