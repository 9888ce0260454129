use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::value::{CallError, FromValue, IntoValueResult, Kind, Value, cmp_int_float};

/// Erased implementation of one operator overload.
pub type OperatorFn = dyn Fn(Value, Value) -> Result<Value, CallError> + Send + Sync;

/// One implementation of a binary operator for an exact pair of operand kinds.
#[derive(Clone)]
pub struct Overload {
    pub left: Kind,
    pub right: Kind,
    func: Arc<OperatorFn>,
}

impl Overload {
    pub fn call(&self, left: Value, right: Value) -> Result<Value, CallError> {
        (self.func)(left, right)
    }
}

impl fmt::Debug for Overload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Overload({}, {})", self.left, self.right)
    }
}

/// Symbol -> overloads, searched in registration order. The VM has no
/// arithmetic of its own: `+ - * / % ^ < > <= >=` all dispatch through here.
#[derive(Debug, Clone, Default)]
pub struct OperatorRegistry {
    table: HashMap<String, Vec<Overload>>,
}

impl OperatorRegistry {
    pub fn new() -> Self {
        OperatorRegistry::default()
    }

    /// Register a typed implementation. Operand kinds come from the parameter
    /// types, so `|a: i64, b: f64| ...` only matches `(int, float)`.
    pub fn register<L, R, O, F>(&mut self, symbol: &str, f: F) -> &mut Self
    where
        L: FromValue,
        R: FromValue,
        O: IntoValueResult,
        F: Fn(L, R) -> O + Send + Sync + 'static,
    {
        self.register_raw(symbol, L::KIND, R::KIND, move |left, right| {
            f(L::from_value(left)?, R::from_value(right)?).into_value_result()
        })
    }

    /// Register an implementation over raw values, e.g. for host kinds.
    pub fn register_raw(
        &mut self,
        symbol: &str,
        left: Kind,
        right: Kind,
        f: impl Fn(Value, Value) -> Result<Value, CallError> + Send + Sync + 'static,
    ) -> &mut Self {
        self.table.entry(symbol.to_string()).or_default().push(Overload {
            left,
            right,
            func: Arc::new(f),
        });
        self
    }

    /// First overload registered for `symbol` whose kinds equal the operands'.
    pub fn resolve(&self, symbol: &str, left: Kind, right: Kind) -> Option<&Overload> {
        self.overloads(symbol)
            .iter()
            .find(|o| o.left == left && o.right == right)
    }

    pub fn overloads(&self, symbol: &str) -> &[Overload] {
        self.table.get(symbol).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Int and float arithmetic (mixed operands promote to float), text
    /// concatenation, and ordering for numbers and text.
    pub fn standard() -> Self {
        let mut registry = OperatorRegistry::new();

        registry.arithmetic("+", |a, b| checked(a.checked_add(b)), |a, b| a + b);
        registry.arithmetic("-", |a, b| checked(a.checked_sub(b)), |a, b| a - b);
        registry.arithmetic("*", |a, b| checked(a.checked_mul(b)), |a, b| a * b);
        registry.arithmetic("/", int_div, |a, b| a / b);
        registry.arithmetic("%", int_rem, |a, b| a % b);
        registry.arithmetic("^", int_pow, f64::powf);
        registry.register("+", |a: String, b: String| a + &b);

        registry.ordering("<", Ordering::is_lt);
        registry.ordering(">", Ordering::is_gt);
        registry.ordering("<=", Ordering::is_le);
        registry.ordering(">=", Ordering::is_ge);

        registry
    }

    fn arithmetic(
        &mut self,
        symbol: &str,
        int: fn(i64, i64) -> Result<Value, CallError>,
        float: fn(f64, f64) -> f64,
    ) {
        self.register(symbol, move |a: i64, b: i64| int(a, b));
        self.register(symbol, move |a: f64, b: f64| float(a, b));
        self.register(symbol, move |a: i64, b: f64| float(a as f64, b));
        self.register(symbol, move |a: f64, b: i64| float(a, b as f64));
    }

    fn ordering(&mut self, symbol: &str, test: fn(Ordering) -> bool) {
        self.register(symbol, move |a: i64, b: i64| test(a.cmp(&b)));
        self.register(symbol, move |a: f64, b: f64| a.partial_cmp(&b).is_some_and(test));
        self.register(symbol, move |a: i64, b: f64| cmp_int_float(a, b).is_some_and(test));
        self.register(symbol, move |a: f64, b: i64| {
            cmp_int_float(b, a).map(Ordering::reverse).is_some_and(test)
        });
        self.register(symbol, move |a: String, b: String| test(a.cmp(&b)));
    }
}

fn checked(result: Option<i64>) -> Result<Value, CallError> {
    result.map(Value::Int).ok_or_else(|| CallError::new("integer overflow"))
}

fn int_div(a: i64, b: i64) -> Result<Value, CallError> {
    if b == 0 {
        return Err(CallError::new("division by zero"));
    }
    checked(a.checked_div(b))
}

fn int_rem(a: i64, b: i64) -> Result<Value, CallError> {
    if b == 0 {
        return Err(CallError::new("division by zero"));
    }
    checked(a.checked_rem(b))
}

// A negative exponent has no integer result.
fn int_pow(a: i64, b: i64) -> Result<Value, CallError> {
    if b < 0 {
        return Ok(Value::Float((a as f64).powf(b as f64)));
    }
    let exp = u32::try_from(b).map_err(|_| CallError::new("integer overflow"))?;
    checked(a.checked_pow(exp))
}
