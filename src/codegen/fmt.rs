use crate::ast::*;
use crate::parser::{Associativity, Grammar};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmtMode {
    /// Minimal whitespace: `a+b*c`, `f(a,b)`. Word operators keep their spaces.
    Dense,
    /// Spaces around every infix operator and after commas.
    Expanded,
}

/// Print an expression as source the standard grammar parses back to the
/// same tree, with only the parentheses that grammar needs.
pub fn format(node: &Node, mode: FmtMode) -> String {
    format_with(node, mode, Grammar::standard())
}

pub fn format_with(node: &Node, mode: FmtMode, grammar: &Grammar) -> String {
    Formatter { mode, grammar }.expr(node)
}

struct Formatter<'g> {
    mode: FmtMode,
    grammar: &'g Grammar,
}

impl Formatter<'_> {
    fn expr(&self, node: &Node) -> String {
        match node {
            Node::Identifier { name } => name.clone(),
            Node::Bool { value } => value.to_string(),
            Node::Nil => "nil".to_string(),
            Node::Int { value } => value.to_string(),
            Node::Float { value } => fmt_float(*value),
            Node::String { value } => format!("\"{}\"", escape_text(value)),
            Node::List { items } => format!("[{}]", self.list(items)),
            Node::FunctionCall { name, args } => format!("{}({})", name, self.list(args)),
            Node::Property { receiver, name } => {
                format!("{}.{}", self.receiver(receiver), name)
            }
            Node::MethodCall { receiver, name, args } => {
                format!("{}.{}({})", self.receiver(receiver), name, self.list(args))
            }
            Node::Unary { operator, operand } => {
                let priority = self.grammar.prefix(operator).map_or(u8::MAX, |i| i.priority);
                let inner = match operand.as_ref() {
                    Node::Binary { operator: op, .. } if self.infix_priority(op) < priority => {
                        format!("({})", self.expr(operand))
                    }
                    _ => self.expr(operand),
                };
                if is_word(operator) {
                    format!("{} {}", operator, inner)
                } else {
                    format!("{}{}", operator, inner)
                }
            }
            Node::Binary { operator, left, right } => {
                let info = self.grammar.infix(operator);
                let priority = info.map_or(0, |i| i.priority);
                let right_assoc = info.is_some_and(|i| i.associativity == Associativity::Right);
                let left = self.operand(left, priority, right_assoc);
                let right = self.operand(right, priority, !right_assoc);
                if self.mode == FmtMode::Expanded || is_word(operator) {
                    format!("{} {} {}", left, operator, right)
                } else {
                    format!("{}{}{}", left, operator, right)
                }
            }
        }
    }

    /// A child of an infix operator; `tie_needs_parens` is true on the side
    /// where an equal priority would regroup.
    fn operand(&self, node: &Node, parent: u8, tie_needs_parens: bool) -> String {
        let wrap = match node {
            Node::Binary { operator, .. } => {
                let child = self.infix_priority(operator);
                child < parent || (child == parent && tie_needs_parens) || parent == 0
            }
            // a prefix operator would swallow the parent operator
            Node::Unary { operator, .. } => {
                self.grammar.prefix(operator).is_none_or(|i| parent >= i.priority)
            }
            _ => false,
        };
        if wrap {
            format!("({})", self.expr(node))
        } else {
            self.expr(node)
        }
    }

    /// Only names, calls, lists and other postfix chains take `.name` directly.
    fn receiver(&self, node: &Node) -> String {
        match node {
            Node::Identifier { .. }
            | Node::FunctionCall { .. }
            | Node::Property { .. }
            | Node::MethodCall { .. }
            | Node::List { .. } => self.expr(node),
            _ => format!("({})", self.expr(node)),
        }
    }

    fn list(&self, items: &[Node]) -> String {
        let sep = match self.mode {
            FmtMode::Dense => ",",
            FmtMode::Expanded => ", ",
        };
        items.iter().map(|item| self.expr(item)).collect::<Vec<_>>().join(sep)
    }

    fn infix_priority(&self, operator: &str) -> u8 {
        self.grammar.infix(operator).map_or(0, |i| i.priority)
    }
}

fn is_word(operator: &str) -> bool {
    operator.chars().next().is_some_and(char::is_alphabetic)
}

fn fmt_float(n: f64) -> String {
    let s = n.to_string();
    if s.contains('.') || !n.is_finite() {
        s
    } else {
        format!("{}.0", s)
    }
}

fn escape_text(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{7}' => out.push_str("\\a"),
            '\u{8}' => out.push_str("\\b"),
            '\u{b}' => out.push_str("\\v"),
            '\u{c}' => out.push_str("\\f"),
            _ => out.push(c),
        }
    }
    out
}

// ---- Tests ----
