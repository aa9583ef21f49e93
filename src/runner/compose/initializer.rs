//! Running fragment initializers on instances.
//!
//! Every fragment composed into an instance's class chain, and every fragment
//! mixed onto the instance itself, may name an initializer method. `init`
//! calls each of those once per instance, root class first, in the order the
//! fragments were composed. The instance remembers which fragments it has
//! initialized, so calling `init` again only picks up fragments added since.

use tracing::{debug, trace, warn};

use crate::runner::ds::class::{ClassRef, MixinRecord};
use crate::runner::ds::error::KernelResult;
use crate::runner::ds::fragment::Fragment;
use crate::runner::ds::object::ObjectRef;
use crate::runner::ds::value::Value;

pub const INITIALIZE_HOOK: &str = "initialize";

/// Runs the pending initializers of every fragment on `object`. Returns how many ran.
pub fn init(object: &ObjectRef) -> KernelResult<usize> {
    run(object, object.mixins())
}

/// Same as [`init`], restricted to `fragments`.
pub fn init_with(object: &ObjectRef, fragments: &[&Fragment]) -> KernelResult<usize> {
    run(object, fragments.iter().map(|f| f.record()).collect())
}

fn run(object: &ObjectRef, records: Vec<MixinRecord>) -> KernelResult<usize> {
    let mut ran = 0;
    for record in records {
        // Marked before the call so an initializer that re-enters `init` skips itself.
        if !object.mark_initialized(&record.name) {
            trace!(fragment = %record.name, "already initialized");
            continue;
        }
        let method = match &record.initializer {
            Some(m) => m,
            None => continue,
        };
        match object.get(method) {
            Value::Function(m) => {
                m.call(object, vec![])?;
                ran += 1;
                debug!(fragment = %record.name, method = %method, "initializer ran");
            }
            _ => warn!(
                fragment = %record.name,
                method = %method,
                "initializer is not a callable member, skipped"
            ),
        }
    }
    Ok(ran)
}

/// Builds an instance of `class`: fragment initializers first, then the `initialize` hook.
pub fn construct(class: &ClassRef, options: Value) -> KernelResult<ObjectRef> {
    let object = ObjectRef::alloc(class, options.clone());
    init(&object)?;
    object.try_call(INITIALIZE_HOOK, vec![options])?;
    debug!(class = %class.name(), id = %object.id(), "instance constructed");
    Ok(object)
}
