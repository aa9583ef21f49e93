//! Instances of composed classes.
//!
//! Property reads check the instance's own properties first, then walk its
//! class chain. Method calls look the member up the same way and invoke it
//! with `this` bound to the instance; no borrow of the instance is held while
//! the method runs, so methods are free to read and write their receiver.

use std::cell::{Ref, RefCell};
use std::collections::{BTreeSet, HashSet};
use std::rc::{Rc, Weak};

use tracing::debug;
use uuid::Uuid;

use crate::runner::ds::class::{ClassRef, MixinRecord};
use crate::runner::ds::error::{KernelError, KernelResult};
use crate::runner::ds::fragment::MixTarget;
use crate::runner::ds::value::{Code, Value};
use crate::runner::std_lib::emitter::{Emitter, EventTable};

pub struct Instance {
    id: Uuid,
    class: ClassRef,
    properties: Code,
    options: Value,
    mixins: Vec<MixinRecord>,
    interfaces: BTreeSet<String>,
    initialized: HashSet<String>,
    events: EventTable,
    destroyed: bool,
}

impl Instance {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn class(&self) -> &ClassRef {
        &self.class
    }

    pub fn properties(&self) -> &Code {
        &self.properties
    }

    pub fn options(&self) -> &Value {
        &self.options
    }

    fn lookup(&self, name: &str) -> Option<&Value> {
        self.properties
            .get(name)
            .or_else(|| self.class.lookup(name))
    }
}

/// Shared handle to an instance.
#[derive(Clone)]
pub struct ObjectRef(Rc<RefCell<Instance>>);

/// Non-owning handle to an instance.
#[derive(Clone)]
pub struct WeakObjectRef(Weak<RefCell<Instance>>);

impl WeakObjectRef {
    pub fn upgrade(&self) -> Option<ObjectRef> {
        self.0.upgrade().map(ObjectRef)
    }

    pub fn ptr_eq(a: &WeakObjectRef, b: &WeakObjectRef) -> bool {
        Weak::ptr_eq(&a.0, &b.0)
    }

    pub fn points_to(&self, object: &ObjectRef) -> bool {
        Weak::ptr_eq(&self.0, &Rc::downgrade(&object.0))
    }
}

impl ObjectRef {
    /// A bare instance: prototype in place, nothing initialized yet.
    pub(crate) fn alloc(class: &ClassRef, options: Value) -> ObjectRef {
        ObjectRef(Rc::new(RefCell::new(Instance {
            id: Uuid::new_v4(),
            class: class.clone(),
            properties: Code::new(),
            options,
            mixins: vec![],
            interfaces: BTreeSet::new(),
            initialized: HashSet::new(),
            events: EventTable::default(),
            destroyed: false,
        })))
    }

    pub fn borrow(&self) -> Ref<'_, Instance> {
        self.0.borrow()
    }

    pub fn id(&self) -> Uuid {
        self.0.borrow().id
    }

    pub fn class(&self) -> ClassRef {
        self.0.borrow().class.clone()
    }

    /// The options the instance was constructed with.
    pub fn options(&self) -> Value {
        self.0.borrow().options.clone()
    }

    pub fn ptr_eq(a: &ObjectRef, b: &ObjectRef) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    pub fn downgrade(&self) -> WeakObjectRef {
        WeakObjectRef(Rc::downgrade(&self.0))
    }

    /// Own property, else the nearest prototype member, else `Undefined`.
    pub fn get(&self, name: &str) -> Value {
        self.0.borrow().lookup(name).cloned().unwrap_or_default()
    }

    pub fn get_own(&self, name: &str) -> Option<Value> {
        self.0.borrow().properties.get(name).cloned()
    }

    pub fn has(&self, name: &str) -> bool {
        self.0.borrow().lookup(name).is_some()
    }

    pub fn has_own(&self, name: &str) -> bool {
        self.0.borrow().properties.contains_key(name)
    }

    /// Sets an own property and returns the previous own value.
    pub fn set(&self, name: &str, value: Value) -> Option<Value> {
        self.0
            .borrow_mut()
            .properties
            .insert(name.to_string(), value)
    }

    /// Removes an own property. Prototype members stay visible afterwards.
    pub fn unset(&self, name: &str) -> Option<Value> {
        self.0.borrow_mut().properties.shift_remove(name)
    }

    pub fn own_keys(&self) -> Vec<String> {
        self.0.borrow().properties.keys().cloned().collect()
    }

    pub fn call(&self, name: &str, args: Vec<Value>) -> KernelResult<Value> {
        match self.try_call(name, args)? {
            Some(v) => Ok(v),
            None => Err(KernelError::UndefinedMember {
                class: self.class().name().to_string(),
                member: name.to_string(),
            }),
        }
    }

    /// Like [`call`](Self::call) but `Ok(None)` when the member is absent.
    pub fn try_call(&self, name: &str, args: Vec<Value>) -> KernelResult<Option<Value>> {
        let member = {
            let instance = self.0.borrow();
            if instance.destroyed {
                return Err(KernelError::Destroyed(instance.id.to_string()));
            }
            instance.lookup(name).cloned()
        };
        match member {
            None => Ok(None),
            Some(Value::Function(m)) => m.call(self, args).map(Some),
            Some(_) => Err(KernelError::NotCallable {
                class: self.class().name().to_string(),
                member: name.to_string(),
            }),
        }
    }

    /// Invokes the implementation `from`'s parent chain provides for `name` (`__super__.name`).
    pub fn call_super(&self, from: &ClassRef, name: &str, args: Vec<Value>) -> KernelResult<Value> {
        match from.lookup_super(name).cloned() {
            Some(Value::Function(m)) => m.call(self, args),
            Some(_) => Err(KernelError::NotCallable {
                class: from.name().to_string(),
                member: name.to_string(),
            }),
            None => Err(KernelError::UndefinedMember {
                class: from.name().to_string(),
                member: name.to_string(),
            }),
        }
    }

    pub fn implements(&self, interface: &str) -> bool {
        let instance = self.0.borrow();
        instance.interfaces.contains(interface) || instance.class.implements(interface)
    }

    pub fn interfaces(&self) -> BTreeSet<String> {
        let instance = self.0.borrow();
        let mut all = instance.class.interfaces();
        all.extend(instance.interfaces.iter().cloned());
        all
    }

    /// Fragments composed into the class chain, then those mixed onto the instance itself.
    pub fn mixins(&self) -> Vec<MixinRecord> {
        let instance = self.0.borrow();
        let mut all = instance.class.mixins();
        for record in &instance.mixins {
            if !all.iter().any(|r| r.name == record.name) {
                all.push(record.clone());
            }
        }
        all
    }

    /// Names of every fragment included on this instance.
    pub fn included(&self) -> Vec<String> {
        self.mixins().into_iter().map(|m| m.name).collect()
    }

    pub fn is_initialized(&self, fragment: &str) -> bool {
        self.0.borrow().initialized.contains(fragment)
    }

    /// Marks a fragment initialized; `false` if it already was.
    pub(crate) fn mark_initialized(&self, fragment: &str) -> bool {
        self.0
            .borrow_mut()
            .initialized
            .insert(fragment.to_string())
    }

    pub(crate) fn with_events<R>(&self, f: impl FnOnce(&mut EventTable) -> R) -> R {
        f(&mut self.0.borrow_mut().events)
    }

    pub fn is_destroyed(&self) -> bool {
        self.0.borrow().destroyed
    }

    /// Drops every event binding this instance holds and marks it destroyed.
    pub fn destroy(&self) {
        if self.is_destroyed() {
            return;
        }
        self.stop_listening(None, None, None);
        self.off(None, None);
        let mut instance = self.0.borrow_mut();
        instance.destroyed = true;
        debug!(class = %instance.class.name(), id = %instance.id, "instance destroyed");
    }
}

impl MixTarget for ObjectRef {
    fn has_member(&self, name: &str) -> bool {
        self.has(name)
    }

    fn get_member(&self, name: &str) -> Option<Value> {
        self.0.borrow().lookup(name).cloned()
    }

    fn set_member(&mut self, name: &str, value: Value) {
        self.set(name, value);
    }

    fn record_mixin(&mut self, record: MixinRecord, interfaces: &[String]) {
        let mut instance = self.0.borrow_mut();
        if !instance.mixins.iter().any(|r| r.name == record.name) {
            instance.mixins.push(record);
        }
        instance.interfaces.extend(interfaces.iter().cloned());
    }

    fn label(&self) -> String {
        let instance = self.0.borrow();
        format!("{} instance {}", instance.class.name(), instance.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::ds::class::Class;
    use crate::runner::ds::method::Method;

    fn answer(_this: &ObjectRef, _args: Vec<Value>) -> KernelResult<Value> {
        Ok(Value::from(42))
    }

    #[test]
    fn test_own_property_shadows_nothing_on_class() {
        let obj = ObjectRef::alloc(&Class::root(), Value::Undefined);
        assert_eq!(obj.get("missing"), Value::Undefined);
        obj.set("a", Value::from(1));
        assert!(obj.has_own("a"));
        assert_eq!(obj.unset("a"), Some(Value::from(1)));
        assert!(!obj.has("a"));
    }

    #[test]
    fn test_call_own_method() {
        let obj = ObjectRef::alloc(&Class::root(), Value::Undefined);
        obj.set("answer", Value::Function(Method::native(answer)));
        assert_eq!(obj.call("answer", vec![]).unwrap(), Value::from(42));
        obj.set("plain", Value::from(1));
        assert!(matches!(
            obj.call("plain", vec![]),
            Err(KernelError::NotCallable { .. })
        ));
        assert!(matches!(
            obj.call("nope", vec![]),
            Err(KernelError::UndefinedMember { .. })
        ));
        assert_eq!(obj.try_call("nope", vec![]).unwrap(), None);
    }

    #[test]
    fn test_destroyed_instance_rejects_calls() {
        let obj = ObjectRef::alloc(&Class::root(), Value::Undefined);
        obj.set("answer", Value::Function(Method::native(answer)));
        obj.destroy();
        assert!(obj.is_destroyed());
        assert!(matches!(
            obj.call("answer", vec![]),
            Err(KernelError::Destroyed(_))
        ));
    }

    #[test]
    fn test_weak_handle() {
        let obj = ObjectRef::alloc(&Class::root(), Value::Undefined);
        let weak = obj.downgrade();
        assert!(weak.points_to(&obj));
        drop(obj);
        assert!(weak.upgrade().is_none());
    }
}
