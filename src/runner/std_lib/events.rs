//! The `Events` fragment: namespaced, catalogued events on top of [`Emitter`].
//!
//! An event name written by a caller goes through two optional steps before it
//! reaches the emitter. The catalog maps it to another name, then the
//! namespace is prefixed with `:`. The prefix characters pick which steps run:
//!
//! ```text
//! eventsNs = "model", eventsCatalog = { save: "model:save:done" }
//!
//! "save"   -> "model:model:save:done"
//! "!save"  -> "model:save"
//! "@save"  -> "save"
//! ```
//!
//! Selectors passed to `fire`/`when`/`after` may hold several names separated
//! by whitespace; each one is resolved on its own.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use tracing::{debug, trace};

use crate::code;
use crate::runner::ds::error::{KernelError, KernelResult};
use crate::runner::ds::fragment::Fragment;
use crate::runner::ds::method::{Method, WeakMethod};
use crate::runner::ds::object::ObjectRef;
use crate::runner::ds::resolve::{is_object, resolve, Checker, MatchMode, Resolved};
use crate::runner::ds::value::{Code, Value};
use crate::runner::plugin::registry::Registry;
use crate::runner::std_lib::emitter::Emitter;
use crate::runner::std_lib::selector::{parse_selector, EventName};

pub const EVENTS_FRAGMENT: &str = "Events";
pub const EVENTS_INTERFACE: &str = "events";
pub const KEY_EVENTS_NS: &str = "eventsNs";
pub const KEY_EVENTS_CATALOG: &str = "eventsCatalog";

const INIT_METHOD: &str = "initEvents";
const OWN_NS: &str = "_eventsNs";
const OWN_CATALOG: &str = "_eventsCatalog";

pub fn fragment() -> Fragment {
    Fragment::builtin(
        EVENTS_FRAGMENT,
        code! {
            KEY_EVENTS_NS => "",
            KEY_EVENTS_CATALOG => Code::new(),
            INIT_METHOD => Method::native(init_events),
            "fire" => Method::native(fire),
            "when" => Method::native(when),
            "after" => Method::native(after),
            "resolveEventName" => Method::native(resolve_event_name_method),
            "addEventAlias" => Method::native(add_event_alias),
            "setEventsNs" => Method::native(set_events_ns),
        },
        Some(INIT_METHOD),
        &[EVENTS_INTERFACE],
        &[KEY_EVENTS_CATALOG],
    )
}

pub fn register(registry: &mut Registry) {
    registry.register(fragment());
}

/// Gives the instance its own namespace and catalog, seeded from what the class declares.
fn init_events(this: &ObjectRef, _args: Vec<Value>) -> KernelResult<Value> {
    let ns = this.get(KEY_EVENTS_NS).as_str().unwrap_or("").to_string();
    let catalog = this.get(KEY_EVENTS_CATALOG).as_map().cloned().unwrap_or_default();
    this.set(OWN_NS, Value::String(ns));
    this.set(OWN_CATALOG, Value::Map(catalog));
    Ok(Value::Undefined)
}

fn namespace(object: &ObjectRef) -> String {
    match object.get(OWN_NS) {
        Value::String(ns) => ns,
        _ => object.get(KEY_EVENTS_NS).as_str().unwrap_or("").to_string(),
    }
}

fn catalog_lookup(object: &ObjectRef, name: &str) -> Option<String> {
    let catalog = match object.get(OWN_CATALOG) {
        Value::Map(m) => m,
        _ => object.get(KEY_EVENTS_CATALOG).as_map().cloned().unwrap_or_default(),
    };
    catalog.get(name).and_then(|v| v.as_str()).map(|s| s.to_string())
}

fn with_namespace(object: &ObjectRef, name: &str) -> String {
    let ns = namespace(object);
    if ns.is_empty() {
        name.to_string()
    } else {
        format!("{}:{}", ns, name)
    }
}

/// Resolves one already-classified event name against `object`'s namespace and catalog.
pub fn resolve_name(object: &ObjectRef, event: &EventName) -> String {
    let resolved = match event {
        EventName::Literal(n) => n.clone(),
        EventName::Raw(n) => with_namespace(object, n),
        EventName::Plain(n) => {
            let real = catalog_lookup(object, n).unwrap_or_else(|| n.clone());
            with_namespace(object, &real)
        }
    };
    trace!(input = %event.name(), resolved = %resolved, "event name resolved");
    resolved
}

/// Resolves a single event name, honouring its `@`/`!` prefix.
pub fn resolve_event_name(object: &ObjectRef, name: &str) -> String {
    resolve_name(object, &EventName::classify(name))
}

/// Resolves every name in a whitespace-separated selector.
pub fn resolve_selector(object: &ObjectRef, selector: &str) -> KernelResult<Vec<String>> {
    Ok(parse_selector(selector)?
        .iter()
        .map(|e| resolve_name(object, e))
        .collect())
}

fn selector_arg(args: &[Value]) -> KernelResult<String> {
    match args.first() {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(KernelError::Type(format!(
            "event selector must be a string, got {}",
            other.type_name()
        ))),
        None => Err(KernelError::Type("missing event selector".to_string())),
    }
}

fn action_arg(args: &[Value]) -> KernelResult<Method> {
    match args.get(1) {
        Some(Value::Function(m)) => Ok(m.clone()),
        other => Err(KernelError::Type(format!(
            "event action must be callable, got {}",
            other.map(|v| v.type_name()).unwrap_or("nothing")
        ))),
    }
}

fn listenable_arg(args: &[Value]) -> Option<ObjectRef> {
    let value = args.get(2).cloned().unwrap_or_default();
    match resolve(&value, None, Some(&Checker::One(is_object)), MatchMode::Some) {
        Resolved::Given(Value::Object(o)) => Some(o),
        _ => None,
    }
}

/// `fire(selector, ...args)`
fn fire(this: &ObjectRef, args: Vec<Value>) -> KernelResult<Value> {
    let selector = selector_arg(&args)?;
    let payload: Vec<Value> = args.into_iter().skip(1).collect();
    for event in resolve_selector(this, &selector)? {
        debug!(event = %event, "fire");
        this.trigger(&event, payload.clone())?;
    }
    Ok(Value::Object(this.clone()))
}

/// `when(selector, action, listenable?)`
fn when(this: &ObjectRef, args: Vec<Value>) -> KernelResult<Value> {
    let selector = selector_arg(&args)?;
    let action = action_arg(&args)?;
    match listenable_arg(&args) {
        Some(source) => {
            for event in resolve_selector(&source, &selector)? {
                this.listen_to(&source, &event, action.clone());
            }
        }
        None => {
            for event in resolve_selector(this, &selector)? {
                this.on(&event, action.clone());
            }
        }
    }
    Ok(Value::Object(this.clone()))
}

/// `after(selector, action, listenable?)`: like `when`, but each handler runs once.
fn after(this: &ObjectRef, args: Vec<Value>) -> KernelResult<Value> {
    let selector = selector_arg(&args)?;
    let action = action_arg(&args)?;
    let source = listenable_arg(&args);
    let target = source.clone().unwrap_or_else(|| this.clone());
    for event in resolve_selector(&target, &selector)? {
        let handler = once(event.clone(), action.clone(), source.as_ref());
        match &source {
            Some(s) => this.listen_to(s, &event, handler),
            None => this.on(&event, handler),
        }
    }
    Ok(Value::Object(this.clone()))
}

/// Wraps `action` in a handler that unhooks itself before its first run.
fn once(event: String, action: Method, source: Option<&ObjectRef>) -> Method {
    let own: Rc<RefCell<Option<WeakMethod>>> = Rc::new(RefCell::new(None));
    let fired = Cell::new(false);
    let source = source.map(|s| s.downgrade());
    let slot = own.clone();
    let handler = Method::closure(move |me, args| {
        if fired.replace(true) {
            return Ok(Value::Undefined);
        }
        if let Some(handler) = slot.borrow().as_ref().and_then(|w| w.upgrade()) {
            match source.as_ref().and_then(|s| s.upgrade()) {
                Some(src) => me.stop_listening(Some(&src), Some(event.as_str()), Some(&handler)),
                None => me.off(Some(event.as_str()), Some(&handler)),
            }
        }
        action.call(me, args)
    });
    *own.borrow_mut() = Some(handler.downgrade());
    handler
}

/// `resolveEventName(selector)`: resolved names joined by a single space.
fn resolve_event_name_method(this: &ObjectRef, args: Vec<Value>) -> KernelResult<Value> {
    let selector = selector_arg(&args)?;
    Ok(Value::String(resolve_selector(this, &selector)?.join(" ")))
}

/// `addEventAlias(alias, eventName)`
fn add_event_alias(this: &ObjectRef, args: Vec<Value>) -> KernelResult<Value> {
    let alias = selector_arg(&args)?;
    let real = match args.get(1) {
        Some(Value::String(s)) => s.clone(),
        _ => return Err(KernelError::Type("event alias target must be a string".to_string())),
    };
    let mut catalog = match this.get(OWN_CATALOG) {
        Value::Map(m) => m,
        _ => this.get(KEY_EVENTS_CATALOG).as_map().cloned().unwrap_or_default(),
    };
    catalog.insert(alias, Value::String(real));
    this.set(OWN_CATALOG, Value::Map(catalog));
    Ok(Value::Object(this.clone()))
}

/// `setEventsNs(ns)`; a null namespace clears it.
fn set_events_ns(this: &ObjectRef, args: Vec<Value>) -> KernelResult<Value> {
    let ns = match args.first() {
        Some(Value::String(s)) => s.clone(),
        Some(v) if v.is_nullish() => String::new(),
        None => String::new(),
        Some(other) => {
            return Err(KernelError::Type(format!(
                "namespace must be a string, got {}",
                other.type_name()
            )))
        }
    };
    this.set(OWN_NS, Value::String(ns));
    Ok(Value::Object(this.clone()))
}
