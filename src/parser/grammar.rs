use std::collections::HashMap;
use std::sync::LazyLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Associativity {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperatorInfo {
    pub priority: u8,
    pub associativity: Associativity,
}

/// Operator tables consulted by the parser (and the formatter). Immutable once
/// handed to a parser; build a custom one with the `with_*` methods.
#[derive(Debug, Clone, Default)]
pub struct Grammar {
    prefix: HashMap<String, OperatorInfo>,
    infix: HashMap<String, OperatorInfo>,
}

static STANDARD: LazyLock<Grammar> = LazyLock::new(|| {
    let mut grammar = Grammar::empty()
        .with_prefix("not", 5)
        .with_prefix("!", 5)
        .with_prefix("-", 10)
        .with_prefix("+", 10);

    let infix: &[(&str, u8)] = &[
        ("or", 1),
        ("||", 1),
        ("and", 2),
        ("&&", 2),
        ("==", 3),
        ("!=", 3),
        ("<", 3),
        (">", 3),
        ("<=", 3),
        (">=", 3),
        ("in", 3),
        ("+", 4),
        ("-", 4),
        ("*", 6),
        ("/", 6),
        ("%", 6),
        ("^", 7),
    ];
    for &(op, priority) in infix {
        grammar = grammar.with_infix(op, priority, Associativity::Left);
    }
    grammar
});

impl Grammar {
    /// The default expression grammar.
    pub fn standard() -> &'static Grammar {
        &STANDARD
    }

    pub fn empty() -> Self {
        Grammar::default()
    }

    pub fn with_prefix(mut self, op: &str, priority: u8) -> Self {
        self.prefix.insert(
            op.to_string(),
            OperatorInfo { priority, associativity: Associativity::Left },
        );
        self
    }

    pub fn with_infix(mut self, op: &str, priority: u8, associativity: Associativity) -> Self {
        self.infix.insert(op.to_string(), OperatorInfo { priority, associativity });
        self
    }

    pub fn prefix(&self, op: &str) -> Option<OperatorInfo> {
        self.prefix.get(op).copied()
    }

    pub fn infix(&self, op: &str) -> Option<OperatorInfo> {
        self.infix.get(op).copied()
    }
}
