// Typed adapters between Rust values and `Value`, used by typed operator and
// function registration.

use indexmap::IndexMap;

use super::{CallError, Kind, Value};

/// A Rust type an operand can be narrowed to. `KIND` is the exact runtime
/// kind the overload declares for that operand.
pub trait FromValue: Sized {
    const KIND: Kind;

    fn from_value(value: Value) -> Result<Self, CallError>;
}

fn mismatch(expected: Kind, got: &Value) -> CallError {
    CallError::new(format!("expected {}, got {}", expected, got.kind()))
}

macro_rules! impl_from_value {
    ($ty:ty, $kind:ident, $variant:ident) => {
        impl FromValue for $ty {
            const KIND: Kind = Kind::$kind;

            fn from_value(value: Value) -> Result<Self, CallError> {
                match value {
                    Value::$variant(v) => Ok(v),
                    other => Err(mismatch(Kind::$kind, &other)),
                }
            }
        }
    };
}

impl_from_value!(i64, Int, Int);
impl_from_value!(f64, Float, Float);
impl_from_value!(bool, Bool, Bool);
impl_from_value!(String, Text, Text);
impl_from_value!(Vec<Value>, List, List);
impl_from_value!(IndexMap<String, Value>, Map, Map);

/// Return types accepted from typed implementations: a plain value, or a
/// `Result` carrying one.
pub trait IntoValueResult {
    fn into_value_result(self) -> Result<Value, CallError>;
}

macro_rules! impl_into_value_result {
    ($($ty:ty),+) => {
        $(
            impl IntoValueResult for $ty {
                fn into_value_result(self) -> Result<Value, CallError> {
                    Ok(self.into())
                }
            }
        )+
    };
}

impl_into_value_result!(Value, i64, f64, bool, String, Vec<Value>);

impl<T: IntoValueResult> IntoValueResult for Result<T, CallError> {
    fn into_value_result(self) -> Result<Value, CallError> {
        self.and_then(IntoValueResult::into_value_result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn narrow_matching_kind() {
        assert_eq!(i64::from_value(Value::Int(3)).unwrap(), 3);
        assert_eq!(String::from_value(Value::from("x")).unwrap(), "x");
    }

    #[test]
    fn narrow_mismatch_names_both_kinds() {
        let err = i64::from_value(Value::Float(1.0)).unwrap_err();
        assert_eq!(err.message, "expected int, got float");
    }

    #[test]
    fn result_returns_flatten() {
        let ok: Result<i64, CallError> = Ok(4);
        assert_eq!(ok.into_value_result().unwrap(), Value::Int(4));
        let err: Result<i64, CallError> = Err(CallError::new("nope"));
        assert_eq!(err.into_value_result().unwrap_err().message, "nope");
        assert_eq!(true.into_value_result().unwrap(), Value::Bool(true));
    }
}
