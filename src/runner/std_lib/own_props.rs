//! The `OwnProps` fragment.
//!
//! Prototype defaults that are lists or maps would otherwise be read through
//! the class chain by every instance. Members named in `ownProps` are copied
//! onto each instance when it is initialized, so instances never observe each
//! other's writes to them.

use tracing::trace;

use crate::code;
use crate::runner::ds::error::KernelResult;
use crate::runner::ds::fragment::Fragment;
use crate::runner::ds::method::Method;
use crate::runner::ds::object::ObjectRef;
use crate::runner::ds::value::Value;
use crate::runner::plugin::registry::Registry;

pub const OWN_PROPS_FRAGMENT: &str = "OwnProps";
pub const KEY_OWN_PROPS: &str = "ownProps";

pub fn fragment() -> Fragment {
    Fragment::builtin(
        OWN_PROPS_FRAGMENT,
        code! {
            KEY_OWN_PROPS => Vec::<Value>::new(),
            "initOwnProps" => Method::native(init_own_props),
        },
        Some("initOwnProps"),
        &[],
        &[KEY_OWN_PROPS],
    )
}

pub fn register(registry: &mut Registry) {
    registry.register(fragment());
}

fn init_own_props(this: &ObjectRef, _args: Vec<Value>) -> KernelResult<Value> {
    for name in this.get(KEY_OWN_PROPS).string_items() {
        if this.has_own(&name) {
            continue;
        }
        match this.get(&name) {
            Value::Undefined => {}
            value => {
                trace!(member = %name, "own copy");
                this.set(&name, value);
            }
        }
    }
    Ok(Value::Undefined)
}
