//! Merging "deep" prototype members across a class chain.
//!
//! Most members follow ordinary override rules: the child's value wins. Members
//! named in the deep list are combined with what the parent chain already
//! provides instead:
//!
//! ```text
//! parent ['a']        + child ['b']        => ['a', 'b']
//! parent {x: 1, y: 1} + child {y: 2}       => {x: 1, y: 2}
//! parent 1            + child 2            => 2          (never merged)
//! ```

use tracing::trace;

use crate::runner::ds::class::Class;
use crate::runner::ds::fragment::Fragment;
use crate::runner::ds::value::{Code, Value};

/// Merges each named member of `child` with the value `parent`'s chain resolves for it.
///
/// `parent` is only read. `child` is rewritten in place and is expected to be a
/// fresh prototype about to become a class.
pub fn merge_deep(child: &mut Code, parent: &Class, names: &[String]) {
    for name in names {
        let inherited = match parent.lookup(name) {
            Some(v) => v,
            None => continue,
        };
        let own = match child.get_mut(name) {
            Some(v) => v,
            None => continue,
        };
        match own {
            Value::List(items) => {
                let mut merged = match inherited {
                    Value::List(parent_items) => parent_items.clone(),
                    other => vec![other.clone()],
                };
                merged.append(items);
                *items = merged;
                trace!(member = %name, "deep-merged list");
            }
            Value::Map(entries) => {
                if let Value::Map(parent_entries) = inherited {
                    let mut merged = parent_entries.clone();
                    for (k, v) in entries.drain(..) {
                        merged.insert(k, v);
                    }
                    *entries = merged;
                    trace!(member = %name, "deep-merged map");
                }
            }
            _ => {}
        }
    }
}

/// The deep list in force for a class derived from `parent` with `fragments`:
/// the configured names, then the parent's, then those the fragments declare.
pub fn deep_property_names<'a>(
    configured: &[String],
    parent: &Class,
    fragments: impl IntoIterator<Item = &'a Fragment>,
) -> Vec<String> {
    let mut names: Vec<String> = vec![];
    let mut add = |name: &String| {
        if !names.contains(name) {
            names.push(name.clone());
        }
    };
    configured.iter().for_each(&mut add);
    parent.deep_properties().iter().for_each(&mut add);
    for fragment in fragments {
        fragment.deep_properties().iter().for_each(&mut add);
    }
    names
}
