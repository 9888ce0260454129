mod convert;
mod host;

pub use convert::{FromValue, IntoValueResult};
pub use host::{CallError, Function, HostObject, Indexed, Invocable, Keyed, Record, Shape};

use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;

/// Runtime value produced and consumed by the VM.
#[derive(Clone)]
pub enum Value {
    Nil,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    List(Vec<Value>),
    Map(IndexMap<String, Value>),
    Function(Function),
    Host(Arc<dyn HostObject>),
}

/// Dispatch tag of a value. Operator overloads are keyed on pairs of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Nil,
    Bool,
    Int,
    Float,
    Text,
    List,
    Map,
    Function,
    Host(&'static str),
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Kind::Nil => "nil",
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::Float => "float",
            Kind::Text => "text",
            Kind::List => "list",
            Kind::Map => "map",
            Kind::Function => "function",
            Kind::Host(name) => *name,
        };
        f.write_str(name)
    }
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Nil => Kind::Nil,
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::Float(_) => Kind::Float,
            Value::Text(_) => Kind::Text,
            Value::List(_) => Kind::List,
            Value::Map(_) => Kind::Map,
            Value::Function(_) => Kind::Function,
            Value::Host(obj) => Kind::Host(obj.type_name()),
        }
    }

    pub fn host(obj: impl HostObject) -> Value {
        Value::Host(Arc::new(obj))
    }

    /// The concrete host type behind a `Host` value, if it is a `T`.
    pub fn host_ref<T: HostObject>(&self) -> Option<&T> {
        match self {
            Value::Host(obj) => obj.as_any().downcast_ref::<T>(),
            _ => None,
        }
    }

    pub fn function<F>(f: F) -> Value
    where
        F: Fn(Vec<Value>) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Value::Function(Function::new(f))
    }

    /// Build a map value, keeping the given key order.
    pub fn map<K: Into<String>>(entries: impl IntoIterator<Item = (K, Value)>) -> Value {
        Value::Map(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Nil => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(n) => *n != 0.0,
            Value::Text(s) => !s.is_empty(),
            Value::List(items) => !items.is_empty(),
            Value::Map(entries) => !entries.is_empty(),
            Value::Function(_) => true,
            Value::Host(obj) => obj.truthy(),
        }
    }

    /// Resolve `name` against this value the way `.name` and bare identifiers
    /// do. Never fails: anything unresolvable is nil.
    pub fn get(&self, name: &str) -> Value {
        match self {
            Value::List(items) => parse_index(name)
                .and_then(|i| items.get(i))
                .cloned()
                .unwrap_or(Value::Nil),
            Value::Text(s) => parse_index(name)
                .and_then(|i| s.chars().nth(i))
                .map(|c| Value::Text(c.to_string()))
                .unwrap_or(Value::Nil),
            Value::Map(entries) => entries.get(name).cloned().unwrap_or(Value::Nil),
            Value::Host(obj) => match obj.shape() {
                Shape::Indexed(seq) => parse_index(name)
                    .and_then(|i| seq.index(i))
                    .unwrap_or(Value::Nil),
                Shape::Keyed(keyed) => keyed.key(name).unwrap_or_else(|| keyed.zero()),
                Shape::Record(record) => record.field(name).unwrap_or(Value::Nil),
                Shape::Opaque => Value::Nil,
            },
            _ => Value::Nil,
        }
    }

    /// Find something callable under `name`: a record method first, then a
    /// field or map entry holding a function.
    pub fn callable(&self, name: &str) -> Option<Function> {
        if let Value::Host(obj) = self {
            if let Shape::Record(record) = obj.shape() {
                if let Some(method) = record.method(name) {
                    return Some(method);
                }
            }
        }
        match self.get(name) {
            Value::Function(f) => Some(f),
            _ => None,
        }
    }

    /// Membership for `needle in self`. `None` when this value is not a
    /// container that supports the needle's kind.
    pub fn contains(&self, needle: &Value) -> Option<bool> {
        match (self, needle) {
            (Value::List(items), _) => Some(items.iter().any(|item| item.loose_eq(needle))),
            (Value::Map(entries), Value::Text(key)) => Some(entries.contains_key(key)),
            (Value::Text(haystack), Value::Text(part)) => Some(haystack.contains(part.as_str())),
            (Value::Host(obj), _) => match (obj.shape(), needle) {
                (Shape::Keyed(keyed), Value::Text(key)) => Some(keyed.contains_key(key)),
                (Shape::Indexed(seq), _) => Some(
                    (0..seq.len())
                        .filter_map(|i| seq.index(i))
                        .any(|item| item.loose_eq(needle)),
                ),
                _ => None,
            },
            _ => None,
        }
    }

    /// Equality used by `==`, `!=` and `in`: ints and floats compare
    /// numerically, containers element-wise.
    pub fn loose_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Int(a), Value::Float(b)) | (Value::Float(b), Value::Int(a)) => {
                cmp_int_float(*a, *b) == Some(Ordering::Equal)
            }
            (Value::List(a), Value::List(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.loose_eq(y))
            }
            (Value::Map(a), Value::Map(b)) => {
                a.len() == b.len()
                    && a.iter().all(|(k, v)| b.get(k).is_some_and(|w| v.loose_eq(w)))
            }
            _ => self == other,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;
        match self {
            Value::Nil | Value::Function(_) | Value::Host(_) => Json::Null,
            Value::Bool(b) => Json::Bool(*b),
            Value::Int(n) => Json::from(*n),
            Value::Float(n) => serde_json::Number::from_f64(*n).map_or(Json::Null, Json::Number),
            Value::Text(s) => Json::String(s.clone()),
            Value::List(items) => Json::Array(items.iter().map(Value::to_json).collect()),
            Value::Map(entries) => Json::Object(
                entries.iter().map(|(k, v)| (k.clone(), v.to_json())).collect(),
            ),
        }
    }
}

/// Exact ordering of an int against a float. Converting the int to `f64`
/// would round above 2^53; `None` only for NaN.
pub(crate) fn cmp_int_float(a: i64, b: f64) -> Option<Ordering> {
    // 2^63 is exact in f64; the range [-2^63, 2^63) truncates into i64 losslessly.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    if b.is_nan() {
        return None;
    }
    if b >= LIMIT {
        return Some(Ordering::Less);
    }
    if b < -LIMIT {
        return Some(Ordering::Greater);
    }
    let whole = b.trunc();
    match a.cmp(&(whole as i64)) {
        Ordering::Equal if b > whole => Some(Ordering::Less),
        Ordering::Equal if b < whole => Some(Ordering::Greater),
        ord => Some(ord),
    }
}

fn parse_index(name: &str) -> Option<usize> {
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    name.parse().ok()
}

impl PartialEq for Value {
    fn eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => a.ptr_eq(b),
            (Value::Host(a), Value::Host(b)) => std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b)),
            _ => false,
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("Nil"),
            Value::Bool(b) => write!(f, "Bool({:?})", b),
            Value::Int(n) => write!(f, "Int({:?})", n),
            Value::Float(n) => write!(f, "Float({:?})", n),
            Value::Text(s) => write!(f, "Text({:?})", s),
            Value::List(items) => f.debug_tuple("List").field(items).finish(),
            Value::Map(entries) => f.debug_tuple("Map").field(entries).finish(),
            Value::Function(func) => fmt::Debug::fmt(func, f),
            Value::Host(obj) => write!(f, "Host({:?})", obj),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Nil => f.write_str("nil"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(n) => write!(f, "{}", n),
            Value::Float(n) => {
                // keep floats recognisable: 3.0, not 3
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 1e16 {
                    write!(f, "{:.1}", n)
                } else {
                    write!(f, "{}", n)
                }
            }
            Value::Text(s) => f.write_str(s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write_nested(f, item)?;
                }
                write!(f, "]")
            }
            Value::Map(entries) => {
                write!(f, "{{")?;
                for (i, (k, v)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: ", k)?;
                    write_nested(f, v)?;
                }
                write!(f, "}}")
            }
            Value::Function(_) => f.write_str("<function>"),
            Value::Host(obj) => write!(f, "<{}>", obj.type_name()),
        }
    }
}

fn write_nested(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Text(s) => write!(f, "{:?}", s),
        other => write!(f, "{}", other),
    }
}

// ---- Conversions ----

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Int(n as i64)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::List(items)
    }
}

impl From<IndexMap<String, Value>> for Value {
    fn from(entries: IndexMap<String, Value>) -> Self {
        Value::Map(entries)
    }
}

impl From<Function> for Value {
    fn from(f: Function) -> Self {
        Value::Function(f)
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        use serde_json::Value as Json;
        match json {
            Json::Null => Value::Nil,
            Json::Bool(b) => Value::Bool(b),
            Json::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            Json::String(s) => Value::Text(s),
            Json::Array(items) => Value::List(items.into_iter().map(Value::from).collect()),
            Json::Object(entries) => {
                Value::Map(entries.into_iter().map(|(k, v)| (k, Value::from(v))).collect())
            }
        }
    }
}
