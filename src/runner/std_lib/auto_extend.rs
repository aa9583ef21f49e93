//! The `AutoExtend` fragment: copies whitelisted constructor options onto the instance.

use tracing::trace;

use crate::code;
use crate::runner::ds::error::KernelResult;
use crate::runner::ds::fragment::Fragment;
use crate::runner::ds::method::Method;
use crate::runner::ds::object::ObjectRef;
use crate::runner::ds::value::Value;
use crate::runner::plugin::registry::Registry;

pub const AUTO_EXTEND_FRAGMENT: &str = "AutoExtend";
pub const KEY_EXTENDABLE: &str = "extendable";

pub fn fragment() -> Fragment {
    Fragment::builtin(
        AUTO_EXTEND_FRAGMENT,
        code! {
            KEY_EXTENDABLE => Vec::<Value>::new(),
            "initAutoExtend" => Method::native(init_auto_extend),
            "options" => Method::native(options),
        },
        Some("initAutoExtend"),
        &[],
        &[KEY_EXTENDABLE],
    )
}

pub fn register(registry: &mut Registry) {
    registry.register(fragment());
}

fn init_auto_extend(this: &ObjectRef, _args: Vec<Value>) -> KernelResult<Value> {
    let options = match this.options() {
        Value::Map(m) => m,
        _ => return Ok(Value::Undefined),
    };
    for key in this.get(KEY_EXTENDABLE).string_items() {
        if let Some(value) = options.get(&key) {
            trace!(member = %key, "extended from options");
            this.set(&key, value.clone());
        }
    }
    Ok(Value::Undefined)
}

/// The options the instance was constructed with.
fn options(this: &ObjectRef, _args: Vec<Value>) -> KernelResult<Value> {
    Ok(this.options())
}
