//! # mixkit - capability composition kernel
//!
//! Builds classes out of reusable capability fragments:
//! - Named fragments (member bundles or functional mixins) kept in a registry
//! - Class derivation with deterministic conflict resolution between fragments
//! - "Deep" members (lists, maps) combined along the class chain instead of replaced
//! - Fragment initializers run exactly once per instance, in composition order
//! - A namespaced, catalogued event capability built on a small pub/sub primitive
//!
//! ## Quick Start
//!
//! ### Composing a class from fragments
//!
//! ```
//! use mixkit::code;
//! use mixkit::runner::api::Kernel;
//! use mixkit::runner::compose::Part;
//! use mixkit::runner::ds::value::Value;
//!
//! let kernel = Kernel::new();
//! let base = kernel.base_class();
//! let own = code! { "className" => "Model", "eventsNs" => "model" };
//! let model = kernel
//!     .make(Some(&base), &[Part::from(own), Part::from("Events")], &[])
//!     .unwrap();
//!
//! let m = model.instantiate(Value::Undefined).unwrap();
//! assert!(m.implements("events"));
//! let name = m.call("resolveEventName", vec![Value::from("save")]).unwrap();
//! assert_eq!(name, Value::from("model:save"));
//! ```
//!
//! ### Registering your own fragment
//!
//! ```
//! use mixkit::code;
//! use mixkit::runner::ds::error::KernelResult;
//! use mixkit::runner::ds::fragment::Fragment;
//! use mixkit::runner::ds::method::Method;
//! use mixkit::runner::ds::object::ObjectRef;
//! use mixkit::runner::ds::value::Value;
//! use mixkit::runner::plugin::Registry;
//! use mixkit::runner::compose::{ClassComposer, Part};
//! use mixkit::runner::ds::class::Class;
//!
//! fn start(this: &ObjectRef, _args: Vec<Value>) -> KernelResult<Value> {
//!     this.set("ticks", Value::from(0));
//!     Ok(Value::Undefined)
//! }
//!
//! let mut registry = Registry::new();
//! registry.register(
//!     Fragment::new("Clock", Value::Map(code! {
//!         "initializer" => "startClock",
//!         "startClock" => Method::native(start),
//!     }))
//!     .unwrap(),
//! );
//!
//! let class = ClassComposer::new(&registry)
//!     .make(Some(&Class::root()), &[Part::from("Clock")], &[])
//!     .unwrap();
//! let clock = class.instantiate(Value::Undefined).unwrap();
//! assert_eq!(clock.get("ticks"), Value::from(0));
//! ```
//!
//! ## Architecture
//!
//! - **[`runner::ds`]** - Data structures (values, fragments, classes, instances, errors)
//! - **[`runner::plugin`]** - Registry of fragments, factories and singletons; configuration
//! - **[`runner::compose`]** - Class composer, deep merging, instance initialization
//! - **[`runner::std_lib`]** - Event primitive and the standard fragments
//! - **[`runner::api`]** - The `Kernel` facade

#[macro_use]
extern crate lazy_static;

pub mod runner;
