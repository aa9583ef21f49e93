//! Callable members.
//!
//! A method is invoked with the receiving instance (`this`) and its arguments.
//! Compiled-in methods are plain function pointers; everything else is a
//! shared closure. Identity matters: event subscriptions are removed by
//! comparing methods with [`Method::same`].

use std::fmt;
use std::rc::{Rc, Weak};

use crate::runner::ds::error::{KernelError, KernelResult};
use crate::runner::ds::object::{ObjectRef, WeakObjectRef};
use crate::runner::ds::value::Value;

/// Function signature for compiled-in methods.
pub type NativeFn = fn(this: &ObjectRef, args: Vec<Value>) -> KernelResult<Value>;

pub type ClosureFn = dyn Fn(&ObjectRef, Vec<Value>) -> KernelResult<Value>;

#[derive(Clone)]
pub enum Method {
    /// Direct function pointer.
    Native(NativeFn),

    /// Closure, compared by allocation.
    Closure(Rc<ClosureFn>),
}

impl Method {
    pub fn native(f: NativeFn) -> Self {
        Method::Native(f)
    }

    pub fn closure<F>(f: F) -> Self
    where
        F: Fn(&ObjectRef, Vec<Value>) -> KernelResult<Value> + 'static,
    {
        Method::Closure(Rc::new(f))
    }

    pub fn call(&self, this: &ObjectRef, args: Vec<Value>) -> KernelResult<Value> {
        match self {
            Method::Native(f) => f(this, args),
            Method::Closure(f) => f(this, args),
        }
    }

    /// Identity comparison.
    pub fn same(&self, other: &Method) -> bool {
        match (self, other) {
            (Method::Native(a), Method::Native(b)) => *a as usize == *b as usize,
            (Method::Closure(a), Method::Closure(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Non-owning handle, used by handlers that must refer to themselves.
    pub(crate) fn downgrade(&self) -> WeakMethod {
        match self {
            Method::Native(f) => WeakMethod::Native(*f),
            Method::Closure(f) => WeakMethod::Closure(Rc::downgrade(f)),
        }
    }
}

impl fmt::Debug for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Method::Native(_) => write!(f, "Method::Native(...)"),
            Method::Closure(_) => write!(f, "Method::Closure(...)"),
        }
    }
}

#[derive(Clone)]
pub(crate) enum WeakMethod {
    Native(NativeFn),
    Closure(Weak<ClosureFn>),
}

impl WeakMethod {
    pub(crate) fn upgrade(&self) -> Option<Method> {
        match self {
            WeakMethod::Native(f) => Some(Method::Native(*f)),
            WeakMethod::Closure(w) => w.upgrade().map(Method::Closure),
        }
    }
}

/// A method with `this` fixed to one instance.
///
/// The target is held weakly so an instance can store methods bound to itself
/// without keeping itself alive.
#[derive(Clone)]
pub struct BoundMethod {
    name: String,
    target: WeakObjectRef,
    method: Method,
}

impl BoundMethod {
    pub fn new(name: impl Into<String>, target: &ObjectRef, method: Method) -> Self {
        BoundMethod {
            name: name.into(),
            target: target.downgrade(),
            method,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn target(&self) -> Option<ObjectRef> {
        self.target.upgrade()
    }

    pub fn call(&self, args: Vec<Value>) -> KernelResult<Value> {
        let target = self
            .target
            .upgrade()
            .ok_or_else(|| KernelError::DetachedTarget(self.name.clone()))?;
        self.method.call(&target, args)
    }
}
