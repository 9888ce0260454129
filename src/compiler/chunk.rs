use std::fmt;

use serde::Serialize;

// ── Opcodes ──────────────────────────────────────────────────────────
//
// One byte each; the ones listed in `has_operand` are followed by a
// 2-byte big-endian constant-pool index.

pub(crate) const OP_ADD: u8 = 0;
pub(crate) const OP_SUB: u8 = 1;
pub(crate) const OP_MUL: u8 = 2;
pub(crate) const OP_DIV: u8 = 3;
pub(crate) const OP_POW: u8 = 4;
pub(crate) const OP_MOD: u8 = 5;
pub(crate) const OP_POP: u8 = 6;
pub(crate) const OP_PUSH: u8 = 7; // push K[idx]
pub(crate) const OP_CALL: u8 = 8; // K[idx] = Call{name, arg_count}
pub(crate) const OP_NOT: u8 = 9;
pub(crate) const OP_NEGATE: u8 = 10;
pub(crate) const OP_PROPERTY: u8 = 11; // K[idx] = property name
pub(crate) const OP_FETCH: u8 = 12; // K[idx] = identifier
pub(crate) const OP_TRUE: u8 = 13;
pub(crate) const OP_FALSE: u8 = 14;
pub(crate) const OP_NIL: u8 = 15;
pub(crate) const OP_EQ: u8 = 16;
pub(crate) const OP_NE: u8 = 17;
pub(crate) const OP_LT: u8 = 18;
pub(crate) const OP_GT: u8 = 19;
pub(crate) const OP_LE: u8 = 20;
pub(crate) const OP_GE: u8 = 21;
pub(crate) const OP_IN: u8 = 22;
pub(crate) const OP_AND: u8 = 23;
pub(crate) const OP_OR: u8 = 24;
pub(crate) const OP_METHOD: u8 = 25; // K[idx] = Call{name, arg_count}, receiver below args
pub(crate) const OP_LIST: u8 = 26; // K[idx] = Int item count

pub fn opcode_name(op: u8) -> Option<&'static str> {
    let name = match op {
        OP_ADD => "ADD",
        OP_SUB => "SUB",
        OP_MUL => "MUL",
        OP_DIV => "DIV",
        OP_POW => "POW",
        OP_MOD => "MOD",
        OP_POP => "POP",
        OP_PUSH => "PUSH",
        OP_CALL => "CALL",
        OP_NOT => "NOT",
        OP_NEGATE => "NEGATE",
        OP_PROPERTY => "PROPERTY",
        OP_FETCH => "FETCH",
        OP_TRUE => "TRUE",
        OP_FALSE => "FALSE",
        OP_NIL => "NIL",
        OP_EQ => "EQ",
        OP_NE => "NE",
        OP_LT => "LT",
        OP_GT => "GT",
        OP_LE => "LE",
        OP_GE => "GE",
        OP_IN => "IN",
        OP_AND => "AND",
        OP_OR => "OR",
        OP_METHOD => "METHOD",
        OP_LIST => "LIST",
        _ => return None,
    };
    Some(name)
}

pub fn has_operand(op: u8) -> bool {
    matches!(op, OP_PUSH | OP_CALL | OP_PROPERTY | OP_FETCH | OP_METHOD | OP_LIST)
}

// ── Chunk ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CallDescriptor {
    pub name: String,
    pub arg_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Constant {
    Int(i64),
    Float(f64),
    Text(String),
    Call(CallDescriptor),
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Int(n) => write!(f, "{}", n),
            Constant::Float(n) => write!(f, "{:?}", n),
            Constant::Text(s) => write!(f, "{:?}", s),
            Constant::Call(call) => write!(f, "{}/{}", call.name, call.arg_count),
        }
    }
}

/// A compiled program: an instruction stream plus the constant pool its
/// operands index into. Immutable once the compiler returns it.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Chunk {
    pub code: Vec<u8>,
    pub constants: Vec<Constant>,
}

impl Chunk {
    pub fn new() -> Self {
        Chunk::default()
    }

    /// Big-endian operand starting at `at`, or `None` if the stream is cut short.
    pub fn read_operand(&self, at: usize) -> Option<u16> {
        let bytes = self.code.get(at..at + 2)?;
        Some(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}
