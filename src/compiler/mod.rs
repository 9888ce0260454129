pub mod chunk;

pub use chunk::{CallDescriptor, Chunk, Constant, has_operand, opcode_name};

use std::collections::HashMap;

use crate::ast::Node;
use chunk::*;

/// Operands are `u16`, so the pool can address at most this many entries.
pub const MAX_CONSTANTS: usize = u16::MAX as usize + 1;

#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("constant pool overflow: more than {limit} constants")]
    PoolOverflow { limit: usize },
    #[error("operator '{operator}' has no {position} instruction")]
    UnsupportedOperator {
        operator: String,
        position: &'static str,
    },
}

impl CompileError {
    pub fn code(&self) -> &'static str {
        match self {
            CompileError::PoolOverflow { .. } => "RB-C001",
            CompileError::UnsupportedOperator { .. } => "RB-C002",
        }
    }
}

type Result<T> = std::result::Result<T, CompileError>;

/// Lower an expression tree into a chunk. Pure: the same tree always yields
/// the same chunk.
pub fn compile(node: &Node) -> Result<Chunk> {
    let mut compiler = Compiler::new();
    compiler.compile_node(node)?;
    Ok(compiler.chunk)
}

// Floats dedup by bit pattern, so 0.0 and -0.0 stay distinct.
#[derive(Hash, PartialEq, Eq)]
enum ConstKey {
    Int(i64),
    Float(u64),
    Text(String),
}

struct Compiler {
    chunk: Chunk,
    slots: HashMap<ConstKey, u16>,
}

impl Compiler {
    fn new() -> Self {
        Compiler { chunk: Chunk::new(), slots: HashMap::new() }
    }

    /// Scalars share one slot per distinct value.
    fn add_const(&mut self, constant: Constant) -> Result<u16> {
        let key = match &constant {
            Constant::Int(n) => ConstKey::Int(*n),
            Constant::Float(n) => ConstKey::Float(n.to_bits()),
            Constant::Text(s) => ConstKey::Text(s.clone()),
            Constant::Call(_) => return self.add_const_raw(constant),
        };
        if let Some(&idx) = self.slots.get(&key) {
            return Ok(idx);
        }
        let idx = self.add_const_raw(constant)?;
        self.slots.insert(key, idx);
        Ok(idx)
    }

    /// Always appends; call descriptors go through here.
    fn add_const_raw(&mut self, constant: Constant) -> Result<u16> {
        if self.chunk.constants.len() >= MAX_CONSTANTS {
            return Err(CompileError::PoolOverflow { limit: MAX_CONSTANTS });
        }
        let idx = self.chunk.constants.len() as u16;
        self.chunk.constants.push(constant);
        Ok(idx)
    }

    fn emit(&mut self, op: u8) {
        self.chunk.code.push(op);
    }

    fn emit_with(&mut self, op: u8, operand: u16) {
        self.chunk.code.push(op);
        self.chunk.code.extend_from_slice(&operand.to_be_bytes());
    }

    fn emit_call(&mut self, op: u8, name: &str, arg_count: usize) -> Result<()> {
        let idx = self.add_const_raw(Constant::Call(CallDescriptor {
            name: name.to_string(),
            arg_count,
        }))?;
        self.emit_with(op, idx);
        Ok(())
    }

    fn compile_node(&mut self, node: &Node) -> Result<()> {
        match node {
            Node::Int { value } => {
                let idx = self.add_const(Constant::Int(*value))?;
                self.emit_with(OP_PUSH, idx);
            }
            Node::Float { value } => {
                let idx = self.add_const(Constant::Float(*value))?;
                self.emit_with(OP_PUSH, idx);
            }
            Node::String { value } => {
                let idx = self.add_const(Constant::Text(value.clone()))?;
                self.emit_with(OP_PUSH, idx);
            }
            Node::Bool { value } => self.emit(if *value { OP_TRUE } else { OP_FALSE }),
            Node::Nil => self.emit(OP_NIL),
            Node::Identifier { name } => {
                let idx = self.add_const(Constant::Text(name.clone()))?;
                self.emit_with(OP_FETCH, idx);
            }
            Node::Unary { operator, operand } => {
                self.compile_node(operand)?;
                match operator.as_str() {
                    "+" => {}
                    "-" => self.emit(OP_NEGATE),
                    "!" | "not" => self.emit(OP_NOT),
                    _ => {
                        return Err(CompileError::UnsupportedOperator {
                            operator: operator.clone(),
                            position: "prefix",
                        });
                    }
                }
            }
            Node::Binary { operator, left, right } => {
                let op = binary_opcode(operator).ok_or_else(|| {
                    CompileError::UnsupportedOperator {
                        operator: operator.clone(),
                        position: "infix",
                    }
                })?;
                self.compile_node(left)?;
                self.compile_node(right)?;
                self.emit(op);
            }
            Node::Property { receiver, name } => {
                self.compile_node(receiver)?;
                let idx = self.add_const(Constant::Text(name.clone()))?;
                self.emit_with(OP_PROPERTY, idx);
            }
            Node::FunctionCall { name, args } => {
                for arg in args {
                    self.compile_node(arg)?;
                }
                self.emit_call(OP_CALL, name, args.len())?;
            }
            Node::MethodCall { receiver, name, args } => {
                self.compile_node(receiver)?;
                for arg in args {
                    self.compile_node(arg)?;
                }
                self.emit_call(OP_METHOD, name, args.len())?;
            }
            Node::List { items } => {
                for item in items {
                    self.compile_node(item)?;
                }
                let idx = self.add_const(Constant::Int(items.len() as i64))?;
                self.emit_with(OP_LIST, idx);
            }
        }
        Ok(())
    }
}

fn binary_opcode(operator: &str) -> Option<u8> {
    let op = match operator {
        "+" => OP_ADD,
        "-" => OP_SUB,
        "*" => OP_MUL,
        "/" => OP_DIV,
        "^" => OP_POW,
        "%" => OP_MOD,
        "==" => OP_EQ,
        "!=" => OP_NE,
        "<" => OP_LT,
        ">" => OP_GT,
        "<=" => OP_LE,
        ">=" => OP_GE,
        "in" => OP_IN,
        "and" | "&&" => OP_AND,
        "or" | "||" => OP_OR,
        _ => return None,
    };
    Some(op)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer, parser};

    fn compile_str(source: &str) -> Chunk {
        let tokens = lexer::tokenize(source).unwrap();
        let ast = parser::parse(tokens).unwrap();
        compile(&ast).unwrap()
    }

    fn call(name: &str, arg_count: usize) -> Constant {
        Constant::Call(CallDescriptor { name: name.into(), arg_count })
    }

    #[test]
    fn compile_arithmetic_chain() {
        let chunk = compile_str("1 + 2 - 3");
        assert_eq!(
            chunk.constants,
            vec![Constant::Int(1), Constant::Int(2), Constant::Int(3)]
        );
        assert_eq!(
            chunk.code,
            vec![OP_PUSH, 0, 0, OP_PUSH, 0, 1, OP_ADD, OP_PUSH, 0, 2, OP_SUB]
        );
    }

    #[test]
    fn compile_is_deterministic() {
        let tokens = lexer::tokenize("f(a.b, 2.5) * -x + 'y'").unwrap();
        let ast = parser::parse(tokens).unwrap();
        assert_eq!(compile(&ast).unwrap(), compile(&ast).unwrap());
    }

    #[test]
    fn compile_dedups_literals_not_call_sites() {
        let chunk = compile_str("func(1 + 2 - 3) + func(1)");
        assert_eq!(
            chunk.constants,
            vec![
                Constant::Int(1),
                Constant::Int(2),
                Constant::Int(3),
                call("func", 1),
                call("func", 1),
            ]
        );
        assert_eq!(
            chunk.code,
            vec![
                OP_PUSH, 0, 0, OP_PUSH, 0, 1, OP_ADD, OP_PUSH, 0, 2, OP_SUB, OP_CALL, 0, 3,
                OP_PUSH, 0, 0, OP_CALL, 0, 4, OP_ADD,
            ]
        );
    }

    #[test]
    fn compile_int_and_float_get_separate_slots() {
        let chunk = compile_str("1 + 1.0 + 1");
        assert_eq!(chunk.constants, vec![Constant::Int(1), Constant::Float(1.0)]);
    }

    #[test]
    fn compile_identifier_and_string_share_text_slot() {
        let chunk = compile_str("a + 'a'");
        assert_eq!(chunk.constants, vec![Constant::Text("a".into())]);
        assert_eq!(chunk.code, vec![OP_FETCH, 0, 0, OP_PUSH, 0, 0, OP_ADD]);
    }

    #[test]
    fn compile_literals_without_pool() {
        let chunk = compile_str("true == false != nil");
        assert!(chunk.constants.is_empty());
        assert_eq!(chunk.code, vec![OP_TRUE, OP_FALSE, OP_EQ, OP_NIL, OP_NE]);
    }

    #[test]
    fn compile_unary() {
        assert_eq!(compile_str("-x").code, vec![OP_FETCH, 0, 0, OP_NEGATE]);
        assert_eq!(compile_str("not x").code, vec![OP_FETCH, 0, 0, OP_NOT]);
        assert_eq!(compile_str("!x").code, vec![OP_FETCH, 0, 0, OP_NOT]);
        assert_eq!(compile_str("+x").code, vec![OP_FETCH, 0, 0]);
    }

    #[test]
    fn compile_comparison_and_logic() {
        let chunk = compile_str("a < 1 and b >= 2 or c in d");
        let ops: Vec<u8> = chunk
            .code
            .iter()
            .copied()
            .filter(|&op| matches!(op, OP_LT | OP_GE | OP_AND | OP_OR | OP_IN))
            .collect();
        assert_eq!(ops, vec![OP_LT, OP_GE, OP_AND, OP_IN, OP_OR]);
        assert_eq!(compile_str("a && b || c").code.last(), Some(&OP_OR));
    }

    #[test]
    fn compile_property_chain() {
        let chunk = compile_str("x.1.name");
        assert_eq!(
            chunk.constants,
            vec![
                Constant::Text("x".into()),
                Constant::Text("1".into()),
                Constant::Text("name".into())
            ]
        );
        assert_eq!(
            chunk.code,
            vec![OP_FETCH, 0, 0, OP_PROPERTY, 0, 1, OP_PROPERTY, 0, 2]
        );
    }

    #[test]
    fn compile_method_call_keeps_receiver_first() {
        let chunk = compile_str("user.greet('hi')");
        assert_eq!(
            chunk.constants,
            vec![Constant::Text("user".into()), Constant::Text("hi".into()), call("greet", 1)]
        );
        assert_eq!(
            chunk.code,
            vec![OP_FETCH, 0, 0, OP_PUSH, 0, 1, OP_METHOD, 0, 2]
        );
    }

    #[test]
    fn compile_list_literal() {
        let chunk = compile_str("[5, 6]");
        assert_eq!(
            chunk.constants,
            vec![Constant::Int(5), Constant::Int(6), Constant::Int(2)]
        );
        assert_eq!(chunk.code.last(), Some(&2));
        assert_eq!(chunk.code[chunk.code.len() - 3], OP_LIST);
    }

    #[test]
    fn compile_unsupported_operator() {
        let node = Node::binary("?", Node::int(1), Node::int(2));
        let err = compile(&node).unwrap_err();
        assert_eq!(err.code(), "RB-C002");
        assert!(err.to_string().contains("'?'"));

        let err = compile(&Node::unary("~", Node::int(1))).unwrap_err();
        assert_eq!(err.code(), "RB-C002");
    }

    #[test]
    fn compile_pool_overflow() {
        let items = (0..MAX_CONSTANTS as i64).map(Node::int).collect();
        // the item count itself needs one more slot
        let err = compile(&Node::List { items }).unwrap_err();
        assert_eq!(err.code(), "RB-C001");
    }

    #[test]
    fn compile_pool_at_limit() {
        let items: Vec<Node> = (0..(MAX_CONSTANTS - 1) as i64).map(Node::int).collect();
        let chunk = compile(&Node::List { items }).unwrap();
        assert_eq!(chunk.constants.len(), MAX_CONSTANTS);
        assert_eq!(chunk.read_operand(chunk.code.len() - 2), Some(u16::MAX));
    }
}
