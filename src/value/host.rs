use std::any::Any;
use std::fmt;
use std::sync::Arc;

use super::Value;

/// Failure reported by a host function or an operator overload.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct CallError {
    pub message: String,
}

impl CallError {
    pub fn new(message: impl Into<String>) -> Self {
        CallError { message: message.into() }
    }
}

/// Anything the VM can call with evaluated arguments.
pub trait Invocable: Send + Sync {
    fn invoke(&self, args: Vec<Value>) -> Result<Value, CallError>;
}

impl<F> Invocable for F
where
    F: Fn(Vec<Value>) -> Result<Value, CallError> + Send + Sync,
{
    fn invoke(&self, args: Vec<Value>) -> Result<Value, CallError> {
        self(args)
    }
}

/// Shared handle to a callable. Cloning shares the same implementation.
#[derive(Clone)]
pub struct Function(Arc<dyn Invocable>);

impl Function {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> Result<Value, CallError> + Send + Sync + 'static,
    {
        Function(Arc::new(f))
    }

    /// Wrap a type implementing `Invocable` directly.
    pub fn from_invocable(f: impl Invocable + 'static) -> Self {
        Function(Arc::new(f))
    }

    pub fn call(&self, args: Vec<Value>) -> Result<Value, CallError> {
        self.0.invoke(args)
    }

    pub fn ptr_eq(&self, other: &Function) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.0), Arc::as_ptr(&other.0))
    }
}

impl fmt::Debug for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Function(..)")
    }
}

// ---- Host objects ----

/// Positional access: `obj.0`, `x in obj`.
pub trait Indexed {
    fn len(&self) -> usize;
    fn index(&self, i: usize) -> Option<Value>;
}

/// String-keyed lookup. A missing key resolves to `zero()`.
pub trait Keyed {
    fn key(&self, key: &str) -> Option<Value>;

    fn zero(&self) -> Value {
        Value::Nil
    }

    fn contains_key(&self, key: &str) -> bool {
        self.key(key).is_some()
    }
}

/// Named fields and methods.
pub trait Record {
    fn field(&self, name: &str) -> Option<Value>;

    fn method(&self, _name: &str) -> Option<Function> {
        None
    }
}

/// The capability a host object exposes to property access, membership and
/// calls.
pub enum Shape<'a> {
    Indexed(&'a dyn Indexed),
    Keyed(&'a dyn Keyed),
    Record(&'a dyn Record),
    Opaque,
}

pub trait HostObject: Any + fmt::Debug + Send + Sync {
    /// Name used as the dispatch tag (`Kind::Host`) and in error messages.
    fn type_name(&self) -> &'static str;

    fn shape(&self) -> Shape<'_> {
        Shape::Opaque
    }

    fn truthy(&self) -> bool {
        true
    }

    fn as_any(&self) -> &dyn Any;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closure_is_invocable() {
        let f = Function::new(|args: Vec<Value>| Ok(Value::Int(args.len() as i64)));
        assert_eq!(f.call(vec![Value::Nil, Value::Nil]).unwrap(), Value::Int(2));
    }

    struct Counter(i64);

    impl Invocable for Counter {
        fn invoke(&self, args: Vec<Value>) -> Result<Value, CallError> {
            Ok(Value::Int(self.0 + args.len() as i64))
        }
    }

    #[test]
    fn struct_is_invocable() {
        let f = Function::from_invocable(Counter(10));
        assert_eq!(f.call(vec![Value::Nil]).unwrap(), Value::Int(11));
    }

    #[test]
    fn function_identity() {
        let f = Function::new(|_: Vec<Value>| Ok(Value::Nil));
        let g = f.clone();
        let h = Function::new(|_: Vec<Value>| Ok(Value::Nil));
        assert!(f.ptr_eq(&g));
        assert!(!f.ptr_eq(&h));
    }

    #[test]
    fn call_error_displays_message() {
        let err = CallError::new("division by zero");
        assert_eq!(err.to_string(), "division by zero");
    }
}
