pub mod disasm;
pub mod registry;

pub use disasm::disassemble;
pub use registry::{OperatorFn, OperatorRegistry, Overload};

use std::borrow::Cow;

use crate::compiler::chunk::*;
use crate::value::{CallError, FromValue, IntoValueResult, Kind, Value};

#[derive(Debug, thiserror::Error)]
pub enum VmError {
    #[error("unknown instruction 0x{op:02x} at byte {offset}")]
    UnknownInstruction { op: u8, offset: usize },
    #[error("invalid operator '{symbol}' for {left} and {right}")]
    InvalidOperator {
        symbol: &'static str,
        left: Kind,
        right: Kind,
    },
    #[error("cannot call '{name}': no such function")]
    UnresolvedCall { name: String },
    #[error("'{name}' failed: {source}")]
    CallFailed { name: String, source: CallError },
    #[error("invalid operand for '{operator}': {kind}")]
    InvalidOperand { operator: &'static str, kind: Kind },
    #[error("malformed chunk at byte {offset}: {reason}")]
    MalformedChunk { offset: usize, reason: &'static str },
}

impl VmError {
    pub fn code(&self) -> &'static str {
        match self {
            VmError::UnknownInstruction { .. } => "RB-R001",
            VmError::InvalidOperator { .. } => "RB-R002",
            VmError::UnresolvedCall { .. } => "RB-R003",
            VmError::CallFailed { .. } => "RB-R004",
            VmError::InvalidOperand { .. } => "RB-R005",
            VmError::MalformedChunk { .. } => "RB-R006",
        }
    }
}

type VmResult<T> = Result<T, VmError>;

fn malformed(offset: usize, reason: &'static str) -> VmError {
    VmError::MalformedChunk { offset, reason }
}

/// Executes one chunk against one environment. `run` keeps its stack and
/// instruction pointer local, so a `Vm` can be run any number of times and
/// shared between threads.
pub struct Vm<'a> {
    chunk: &'a Chunk,
    env: &'a Value,
    registry: Cow<'a, OperatorRegistry>,
}

impl<'a> Vm<'a> {
    /// A VM with an empty operator registry: every arithmetic or ordering
    /// instruction fails until something is registered.
    pub fn new(chunk: &'a Chunk, env: &'a Value) -> Self {
        Vm { chunk, env, registry: Cow::Owned(OperatorRegistry::new()) }
    }

    pub fn with_registry(chunk: &'a Chunk, env: &'a Value, registry: &'a OperatorRegistry) -> Self {
        Vm { chunk, env, registry: Cow::Borrowed(registry) }
    }

    /// Add an overload to this VM's registry; a borrowed registry is copied
    /// first.
    pub fn register<L, R, O, F>(&mut self, symbol: &str, f: F) -> &mut Self
    where
        L: FromValue,
        R: FromValue,
        O: IntoValueResult,
        F: Fn(L, R) -> O + Send + Sync + 'static,
    {
        self.registry.to_mut().register(symbol, f);
        self
    }

    pub fn registry(&self) -> &OperatorRegistry {
        &self.registry
    }

    pub fn run(&self) -> VmResult<Value> {
        let code = &self.chunk.code;
        let mut stack: Vec<Value> = Vec::with_capacity(16);
        let mut ip = 0;

        while ip < code.len() {
            let at = ip;
            let op = code[ip];
            ip += 1;
            let operand = if has_operand(op) {
                let idx = self
                    .chunk
                    .read_operand(ip)
                    .ok_or_else(|| malformed(at, "truncated operand"))?;
                ip += 2;
                idx
            } else {
                0
            };

            match op {
                OP_PUSH => stack.push(self.literal(at, operand)?),
                OP_POP => {
                    pop(&mut stack, at)?;
                }
                OP_TRUE => stack.push(Value::Bool(true)),
                OP_FALSE => stack.push(Value::Bool(false)),
                OP_NIL => stack.push(Value::Nil),
                OP_NOT => {
                    let value = pop(&mut stack, at)?;
                    stack.push(Value::Bool(!value.is_truthy()));
                }
                OP_NEGATE => {
                    let value = pop(&mut stack, at)?;
                    stack.push(negate(value)?);
                }
                OP_ADD | OP_SUB | OP_MUL | OP_DIV | OP_MOD | OP_POW | OP_LT | OP_GT | OP_LE
                | OP_GE => {
                    let right = pop(&mut stack, at)?;
                    let left = pop(&mut stack, at)?;
                    stack.push(self.apply(registry_symbol(op), left, right)?);
                }
                OP_EQ | OP_NE => {
                    let right = pop(&mut stack, at)?;
                    let left = pop(&mut stack, at)?;
                    let equal = left.loose_eq(&right);
                    stack.push(Value::Bool(if op == OP_EQ { equal } else { !equal }));
                }
                OP_IN => {
                    let container = pop(&mut stack, at)?;
                    let needle = pop(&mut stack, at)?;
                    let found = container.contains(&needle).ok_or(VmError::InvalidOperator {
                        symbol: "in",
                        left: needle.kind(),
                        right: container.kind(),
                    })?;
                    stack.push(Value::Bool(found));
                }
                OP_AND | OP_OR => {
                    let right = pop(&mut stack, at)?.is_truthy();
                    let left = pop(&mut stack, at)?.is_truthy();
                    stack.push(Value::Bool(if op == OP_AND { left && right } else { left || right }));
                }
                OP_FETCH => {
                    let name = self.name(at, operand)?;
                    stack.push(self.env.get(name));
                }
                OP_PROPERTY => {
                    let name = self.name(at, operand)?;
                    let receiver = pop(&mut stack, at)?;
                    stack.push(receiver.get(name));
                }
                OP_CALL => {
                    let call = self.descriptor(at, operand)?;
                    let args = pop_n(&mut stack, call.arg_count, at)?;
                    stack.push(invoke(self.env, call, args)?);
                }
                OP_METHOD => {
                    let call = self.descriptor(at, operand)?;
                    let args = pop_n(&mut stack, call.arg_count, at)?;
                    let receiver = pop(&mut stack, at)?;
                    stack.push(invoke(&receiver, call, args)?);
                }
                OP_LIST => {
                    let count = self.count(at, operand)?;
                    let items = pop_n(&mut stack, count, at)?;
                    stack.push(Value::List(items));
                }
                _ => return Err(VmError::UnknownInstruction { op, offset: at }),
            }
        }

        Ok(stack.pop().unwrap_or(Value::Nil))
    }

    fn apply(&self, symbol: &'static str, left: Value, right: Value) -> VmResult<Value> {
        let (left_kind, right_kind) = (left.kind(), right.kind());
        let overload = self.registry.resolve(symbol, left_kind, right_kind).ok_or(
            VmError::InvalidOperator { symbol, left: left_kind, right: right_kind },
        )?;
        overload
            .call(left, right)
            .map_err(|source| VmError::CallFailed { name: symbol.to_string(), source })
    }

    fn constant(&self, at: usize, idx: u16) -> VmResult<&'a Constant> {
        self.chunk
            .constants
            .get(idx as usize)
            .ok_or_else(|| malformed(at, "constant index out of range"))
    }

    fn literal(&self, at: usize, idx: u16) -> VmResult<Value> {
        match self.constant(at, idx)? {
            Constant::Int(n) => Ok(Value::Int(*n)),
            Constant::Float(n) => Ok(Value::Float(*n)),
            Constant::Text(s) => Ok(Value::Text(s.clone())),
            Constant::Call(_) => Err(malformed(at, "call descriptor used as a literal")),
        }
    }

    fn name(&self, at: usize, idx: u16) -> VmResult<&'a str> {
        match self.constant(at, idx)? {
            Constant::Text(s) => Ok(s),
            _ => Err(malformed(at, "expected a name constant")),
        }
    }

    fn descriptor(&self, at: usize, idx: u16) -> VmResult<&'a CallDescriptor> {
        match self.constant(at, idx)? {
            Constant::Call(call) => Ok(call),
            _ => Err(malformed(at, "expected a call descriptor")),
        }
    }

    fn count(&self, at: usize, idx: u16) -> VmResult<usize> {
        match self.constant(at, idx)? {
            Constant::Int(n) => usize::try_from(*n).map_err(|_| malformed(at, "negative item count")),
            _ => Err(malformed(at, "expected an item count")),
        }
    }
}

fn registry_symbol(op: u8) -> &'static str {
    match op {
        OP_ADD => "+",
        OP_SUB => "-",
        OP_MUL => "*",
        OP_DIV => "/",
        OP_MOD => "%",
        OP_POW => "^",
        OP_LT => "<",
        OP_GT => ">",
        OP_LE => "<=",
        _ => ">=",
    }
}

fn pop(stack: &mut Vec<Value>, at: usize) -> VmResult<Value> {
    stack.pop().ok_or_else(|| malformed(at, "stack underflow"))
}

/// The top `n` values in push order.
fn pop_n(stack: &mut Vec<Value>, n: usize, at: usize) -> VmResult<Vec<Value>> {
    if stack.len() < n {
        return Err(malformed(at, "stack underflow"));
    }
    Ok(stack.split_off(stack.len() - n))
}

fn negate(value: Value) -> VmResult<Value> {
    match value {
        Value::Int(n) => n.checked_neg().map(Value::Int).ok_or_else(|| VmError::CallFailed {
            name: "-".to_string(),
            source: CallError::new("integer overflow"),
        }),
        Value::Float(n) => Ok(Value::Float(-n)),
        other => Err(VmError::InvalidOperand { operator: "-", kind: other.kind() }),
    }
}

fn invoke(target: &Value, call: &CallDescriptor, args: Vec<Value>) -> VmResult<Value> {
    let function = target
        .callable(&call.name)
        .ok_or_else(|| VmError::UnresolvedCall { name: call.name.clone() })?;
    function
        .call(args)
        .map_err(|source| VmError::CallFailed { name: call.name.clone(), source })
}
