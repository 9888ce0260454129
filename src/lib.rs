//! rulebyte: small expressions compiled to bytecode and run against a host
//! environment.
//!
//! ```ignore
//! let env = rulebyte::Value::from(serde_json::json!({"price": 12, "qty": 3}));
//! let registry = rulebyte::OperatorRegistry::standard();
//! let total = rulebyte::eval("price * qty", &env, &registry)?;
//! assert_eq!(total, rulebyte::Value::Int(36));
//! ```

pub mod ast;
pub mod codegen;
pub mod compiler;
pub mod diagnostic;
pub mod lexer;
pub mod parser;
pub mod value;
pub mod vm;

pub use ast::Node;
pub use compiler::{Chunk, CompileError};
pub use lexer::LexError;
pub use parser::ParseError;
pub use value::{CallError, Function, HostObject, Kind, Value};
pub use vm::{OperatorRegistry, Vm, VmError};

/// Any failure along the pipeline. Each stage's error passes through
/// unchanged.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Compile(#[from] CompileError),
    #[error(transparent)]
    Runtime(#[from] VmError),
}

impl Error {
    pub fn code(&self) -> &'static str {
        match self {
            Error::Lex(e) => e.code,
            Error::Parse(e) => e.code,
            Error::Compile(e) => e.code(),
            Error::Runtime(e) => e.code(),
        }
    }
}

pub fn parse(source: &str) -> Result<Node, Error> {
    let tokens = lexer::tokenize(source)?;
    Ok(parser::parse(tokens)?)
}

pub fn compile(source: &str) -> Result<Chunk, Error> {
    let node = parse(source)?;
    Ok(compiler::compile(&node)?)
}

/// Compile and run `source` once. Hosts evaluating the same expression many
/// times should keep the `Chunk` from [`compile`] and build a [`Vm`] per run.
pub fn eval(source: &str, env: &Value, registry: &OperatorRegistry) -> Result<Value, Error> {
    let chunk = compile(source)?;
    Ok(Vm::with_registry(&chunk, env, registry).run()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env() -> Value {
        Value::from(serde_json::json!({
            "price": 12,
            "qty": 3,
            "tags": ["new", "sale"],
            "user": {"name": "ada", "age": 36},
        }))
    }

    #[test]
    fn eval_with_standard_registry() {
        let registry = OperatorRegistry::standard();
        assert_eq!(eval("price * qty", &env(), &registry).unwrap(), Value::Int(36));
        assert_eq!(
            eval("'sale' in tags and user.age >= 18", &env(), &registry).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(eval("user.name + '!'", &env(), &registry).unwrap(), Value::from("ada!"));
    }

    #[test]
    fn eval_with_empty_registry_rejects_arithmetic() {
        let err = eval("1 + 2", &Value::Nil, &OperatorRegistry::new()).unwrap_err();
        assert!(matches!(err, Error::Runtime(VmError::InvalidOperator { .. })));
        assert_eq!(err.code(), "RB-R002");
    }

    #[test]
    fn errors_keep_their_stage() {
        let registry = OperatorRegistry::standard();
        assert!(matches!(eval("'open", &Value::Nil, &registry), Err(Error::Lex(_))));
        assert!(matches!(eval("1 +", &Value::Nil, &registry), Err(Error::Parse(_))));
        assert!(matches!(eval("f(1)", &Value::Nil, &registry), Err(Error::Runtime(_))));
    }

    #[test]
    fn error_display_is_the_stage_message() {
        let err = parse("1 +").unwrap_err();
        assert_eq!(err.to_string(), "Parse error at 1:3: unexpected end of expression");
    }

    #[test]
    fn compile_is_deterministic() {
        let a = compile("func(1 + 2 - 3) + func(1)").unwrap();
        let b = compile("func(1 + 2 - 3) + func(1)").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.constants.len(), 5);
    }
}
