use std::fmt;
use std::fmt::{Display, Formatter};
use std::rc::Rc;

use indexmap::IndexMap;

use crate::runner::ds::fragment::Fragment;
use crate::runner::ds::method::Method;
use crate::runner::ds::object::ObjectRef;

/// An insertion-ordered member mapping. Fragment code, prototypes and statics are all `Code`.
pub type Code = IndexMap<String, Value>;

pub const TYPE_STR_UNDEFINED: &str = "undefined";
pub const TYPE_STR_NULL: &str = "null";

#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Boolean(bool),
    Number(f64),
    String(String),
    List(Vec<Value>),
    Map(Code),
    Function(Method),
    Object(ObjectRef),
    Fragment(Rc<Fragment>),
}

impl Value {
    /// `undefined` or `null`.
    pub fn is_nullish(&self) -> bool {
        matches!(self, Value::Undefined | Value::Null)
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&Vec<Value>> {
        match self {
            Value::List(l) => Some(l),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Code> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&Method> {
        match self {
            Value::Function(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(o) => Some(o),
            _ => None,
        }
    }

    /// The string entries of a list value. Non-string entries are skipped.
    pub fn string_items(&self) -> Vec<String> {
        match self {
            Value::List(items) => items
                .iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect(),
            _ => vec![],
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Undefined => TYPE_STR_UNDEFINED,
            Value::Null => TYPE_STR_NULL,
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::List(_) => "list",
            Value::Map(_) => "map",
            Value::Function(_) => "function",
            Value::Object(_) => "object",
            Value::Fragment(_) => "fragment",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Undefined
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "{}", TYPE_STR_UNDEFINED),
            Value::Null => write!(f, "{}", TYPE_STR_NULL),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "\"{}\"", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
            Value::Map(m) => {
                write!(f, "{{")?;
                for (i, (k, v)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", k, v)?;
                }
                write!(f, "}}")
            }
            Value::Function(_) => write!(f, "function"),
            Value::Object(o) => write!(f, "[object {}]", o.class().name()),
            Value::Fragment(fr) => write!(f, "[fragment {}]", fr.name()),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Value::Undefined"),
            Value::Null => write!(f, "Value::Null"),
            Value::Boolean(b) => write!(f, "Value::Boolean({})", b),
            Value::Number(n) => write!(f, "Value::Number({})", n),
            Value::String(s) => write!(f, "Value::String({:?})", s),
            Value::List(l) => write!(f, "Value::List({:?})", l),
            Value::Map(m) => write!(f, "Value::Map({:?})", m),
            Value::Function(_) => write!(f, "Value::Function(...)"),
            Value::Object(o) => write!(f, "Value::Object({})", o.id()),
            Value::Fragment(fr) => write!(f, "Value::Fragment({})", fr.name()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) => true,
            (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.same(b),
            (Value::Object(a), Value::Object(b)) => ObjectRef::ptr_eq(a, b),
            (Value::Fragment(a), Value::Fragment(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<Vec<Value>> for Value {
    fn from(l: Vec<Value>) -> Self {
        Value::List(l)
    }
}

impl From<Code> for Value {
    fn from(m: Code) -> Self {
        Value::Map(m)
    }
}

impl From<Method> for Value {
    fn from(m: Method) -> Self {
        Value::Function(m)
    }
}

impl From<ObjectRef> for Value {
    fn from(o: ObjectRef) -> Self {
        Value::Object(o)
    }
}

/// Builds a `Code` mapping from `key => value` pairs.
///
/// ```
/// use mixkit::code;
/// use mixkit::runner::ds::value::Value;
///
/// let c = code! { "x" => 1, "name" => "point" };
/// assert_eq!(c.get("x"), Some(&Value::Number(1.0)));
/// ```
#[macro_export]
macro_rules! code {
    () => {
        $crate::runner::ds::value::Code::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut c = $crate::runner::ds::value::Code::new();
        $(
            c.insert($key.to_string(), $crate::runner::ds::value::Value::from($value));
        )+
        c
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_clone_is_independent() {
        let original = Value::List(vec![Value::from("a")]);
        let mut copy = original.clone();
        if let Value::List(items) = &mut copy {
            items.push(Value::from("b"));
        }
        assert_eq!(original, Value::List(vec![Value::from("a")]));
    }

    #[test]
    fn test_nullish() {
        assert!(Value::Undefined.is_nullish());
        assert!(Value::Null.is_nullish());
        assert!(!Value::Boolean(false).is_nullish());
        assert!(!Value::from("").is_nullish());
    }

    #[test]
    fn test_display_map() {
        let v = Value::Map(crate::code! { "a" => 1, "b" => "x" });
        assert_eq!(v.to_string(), "{a: 1, b: \"x\"}");
    }

    #[test]
    fn test_string_items_skips_non_strings() {
        let v = Value::List(vec![Value::from("a"), Value::Null, Value::from("b")]);
        assert_eq!(v.string_items(), vec!["a".to_string(), "b".to_string()]);
    }
}
