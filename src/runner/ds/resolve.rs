//! "Value or default" resolution for optional arguments.
//!
//! ```
//! use mixkit::runner::ds::resolve::{resolve, Checker, MatchMode, Resolved, is_string};
//! use mixkit::runner::ds::value::Value;
//!
//! let given = Value::from("x");
//! let fallback = Value::from("y");
//! assert_eq!(resolve(&Value::Null, Some(&fallback), None, MatchMode::Some).into_value(), fallback);
//! assert_eq!(resolve(&Value::Null, None, None, MatchMode::Some), Resolved::NotDefined);
//! let checker = Checker::One(is_string);
//! assert_eq!(resolve(&given, Some(&fallback), Some(&checker), MatchMode::Some).into_value(), given);
//! ```

use crate::runner::ds::value::Value;

pub type Predicate = fn(&Value) -> bool;

/// Validity predicate(s) a value must pass to be accepted.
#[derive(Clone)]
pub enum Checker {
    One(Predicate),
    Many(Vec<Predicate>),
}

impl Checker {
    fn accepts(&self, value: &Value, mode: MatchMode) -> bool {
        match self {
            Checker::One(p) => p(value),
            Checker::Many(ps) => match mode {
                MatchMode::Every => ps.iter().all(|p| p(value)),
                MatchMode::Some => ps.iter().any(|p| p(value)),
            },
        }
    }
}

/// How several predicates combine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Every,
    Some,
}

impl MatchMode {
    /// `"every"`/`"all"` mean AND, anything else OR.
    pub fn parse(mode: &str) -> MatchMode {
        match mode {
            "every" | "all" => MatchMode::Every,
            _ => MatchMode::Some,
        }
    }
}

impl Default for MatchMode {
    fn default() -> Self {
        MatchMode::Some
    }
}

/// Outcome of [`resolve`].
#[derive(Debug, Clone, PartialEq)]
pub enum Resolved {
    /// The caller's value was usable.
    Given(Value),
    /// The caller's value was missing or rejected; this is the default.
    Default(Value),
    /// Missing or rejected, and no default was supplied.
    NotDefined,
}

impl Resolved {
    pub fn is_defined(&self) -> bool {
        !matches!(self, Resolved::NotDefined)
    }

    pub fn is_given(&self) -> bool {
        matches!(self, Resolved::Given(_))
    }

    /// Collapses `NotDefined` into `Value::Undefined`.
    pub fn into_value(self) -> Value {
        match self {
            Resolved::Given(v) | Resolved::Default(v) => v,
            Resolved::NotDefined => Value::Undefined,
        }
    }
}

pub fn resolve(
    value: &Value,
    defaults: Option<&Value>,
    checker: Option<&Checker>,
    mode: MatchMode,
) -> Resolved {
    let accepted = !value.is_nullish()
        && checker.map(|c| c.accepts(value, mode)).unwrap_or(true);
    if accepted {
        Resolved::Given(value.clone())
    } else {
        match defaults {
            Some(d) => Resolved::Default(d.clone()),
            None => Resolved::NotDefined,
        }
    }
}

/// Shorthand for an optional positional argument.
pub fn arg_or(args: &[Value], index: usize, defaults: Value) -> Value {
    let value = args.get(index).cloned().unwrap_or_default();
    resolve(&value, Some(&defaults), None, MatchMode::Some).into_value()
}

pub fn is_string(v: &Value) -> bool {
    matches!(v, Value::String(_))
}

pub fn is_number(v: &Value) -> bool {
    matches!(v, Value::Number(_))
}

pub fn is_bool(v: &Value) -> bool {
    matches!(v, Value::Boolean(_))
}

pub fn is_list(v: &Value) -> bool {
    matches!(v, Value::List(_))
}

pub fn is_map(v: &Value) -> bool {
    matches!(v, Value::Map(_))
}

pub fn is_callable(v: &Value) -> bool {
    v.is_callable()
}

pub fn is_object(v: &Value) -> bool {
    matches!(v, Value::Object(_))
}
