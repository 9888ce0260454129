pub mod grammar;

pub use grammar::{Associativity, Grammar, OperatorInfo};

use crate::ast::Node;
use crate::lexer::{Position, Token, TokenKind};

/// Bound on both parser recursion and the depth of the resulting tree. Every
/// later pass (compiler, formatter, drop) recurses over the tree, so a parsed
/// expression is always shallow enough for them.
pub const MAX_DEPTH: usize = 256;

pub struct Parser<'g> {
    tokens: Vec<Token>,
    pos: usize,
    grammar: &'g Grammar,
    nesting: usize,
}

#[derive(Debug, thiserror::Error)]
#[error("Parse error at {position}: {message}")]
pub struct ParseError {
    pub code: &'static str,
    pub position: Position,
    pub message: String,
}

type Result<T> = std::result::Result<T, ParseError>;

/// Parse a token sequence with the standard grammar.
pub fn parse(tokens: Vec<Token>) -> Result<Node> {
    Parser::new(tokens).parse()
}

impl Parser<'static> {
    pub fn new(tokens: Vec<Token>) -> Self {
        Parser::with_grammar(tokens, Grammar::standard())
    }
}

impl<'g> Parser<'g> {
    pub fn with_grammar(mut tokens: Vec<Token>, grammar: &'g Grammar) -> Self {
        // Hand-built token lists may lack the end marker; the cursor relies on it.
        if !tokens.last().is_some_and(Token::is_end) {
            let position = tokens.last().map(|t| t.position).unwrap_or_default();
            tokens.push(Token {
                kind: TokenKind::EndOfInput,
                position,
                value: String::new(),
            });
        }
        Parser { tokens, pos: 0, grammar, nesting: 0 }
    }

    /// Parse one expression; every token up to the end marker must be used.
    pub fn parse(mut self) -> Result<Node> {
        let (root, _) = self.parse_expression(0)?;
        let token = self.current();
        if !token.is_end() {
            return Err(self.error(
                "RB-P001",
                token.position,
                format!("unexpected token {}", describe(token)),
            ));
        }
        Ok(root)
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos]
    }

    /// Never moves past the end marker.
    fn advance(&mut self) {
        if !self.current().is_end() {
            self.pos += 1;
        }
    }

    fn error(&self, code: &'static str, position: Position, message: String) -> ParseError {
        ParseError { code, position, message }
    }

    fn unexpected(&self, token: &Token) -> ParseError {
        if token.is_end() {
            self.error("RB-P002", token.position, "unexpected end of expression".into())
        } else {
            self.error(
                "RB-P001",
                token.position,
                format!("unexpected token {}", describe(token)),
            )
        }
    }

    fn too_deep(&self, position: Position) -> ParseError {
        self.error(
            "RB-P007",
            position,
            format!("expression nested too deeply (limit {})", MAX_DEPTH),
        )
    }

    fn check_depth(&self, depth: usize, position: Position) -> Result<usize> {
        if depth > MAX_DEPTH {
            return Err(self.too_deep(position));
        }
        Ok(depth)
    }

    fn expect_close(&mut self, close: &str, open_at: Position) -> Result<()> {
        let token = self.current();
        if token.is_bracket(close) {
            self.advance();
            return Ok(());
        }
        if token.is_end() {
            return Err(self.error(
                "RB-P005",
                open_at,
                format!("unclosed bracket, expected '{}' before end of expression", close),
            ));
        }
        Err(self.error(
            "RB-P001",
            token.position,
            format!("expected '{}', got {}", close, describe(token)),
        ))
    }

    // ---- Precedence climbing ----
    //
    // The internal parse functions return each node with its tree depth.

    fn parse_expression(&mut self, min_priority: u8) -> Result<(Node, usize)> {
        if self.nesting >= MAX_DEPTH {
            return Err(self.too_deep(self.current().position));
        }
        self.nesting += 1;
        let result = self.parse_climb(min_priority);
        self.nesting -= 1;
        result
    }

    fn parse_climb(&mut self, min_priority: u8) -> Result<(Node, usize)> {
        let (mut left, mut depth) = self.parse_primary()?;
        loop {
            let token = self.current();
            if token.kind != TokenKind::Operator {
                break;
            }
            let Some(info) = self.grammar.infix(&token.value) else {
                break;
            };
            if info.priority < min_priority {
                break;
            }
            let operator = token.value.clone();
            let at = token.position;
            self.advance();
            let next_min = match info.associativity {
                Associativity::Left => info.priority + 1,
                Associativity::Right => info.priority,
            };
            let (right, right_depth) = self.parse_expression(next_min)?;
            depth = self.check_depth(depth.max(right_depth) + 1, at)?;
            left = Node::binary(operator, left, right);
        }
        Ok((left, depth))
    }

    fn parse_primary(&mut self) -> Result<(Node, usize)> {
        let token = self.current().clone();
        match token.kind {
            TokenKind::Operator => {
                let Some(info) = self.grammar.prefix(&token.value) else {
                    return Err(self.unexpected(&token));
                };
                self.advance();
                let (operand, operand_depth) = self.parse_expression(info.priority)?;
                let depth = self.check_depth(operand_depth + 1, token.position)?;
                self.parse_postfix(Node::unary(token.value, operand), depth)
            }
            TokenKind::Bracket if token.value == "(" => {
                self.advance();
                let (inner, depth) = self.parse_expression(0)?;
                self.expect_close(")", token.position)?;
                self.parse_postfix(inner, depth)
            }
            TokenKind::Bracket if token.value == "[" => {
                self.advance();
                let (items, items_depth) = self.parse_sequence("]", token.position, "list")?;
                let depth = self.check_depth(items_depth + 1, token.position)?;
                self.parse_postfix(Node::List { items }, depth)
            }
            TokenKind::Identifier => {
                self.advance();
                match token.value.as_str() {
                    "true" => Ok((Node::Bool { value: true }, 1)),
                    "false" => Ok((Node::Bool { value: false }, 1)),
                    "nil" => Ok((Node::Nil, 1)),
                    _ => {
                        if self.current().is_bracket("(") {
                            let open_at = self.current().position;
                            self.advance();
                            let (args, args_depth) =
                                self.parse_sequence(")", open_at, "argument list")?;
                            let depth = self.check_depth(args_depth + 1, token.position)?;
                            self.parse_postfix(Node::call(token.value, args), depth)
                        } else {
                            self.parse_postfix(Node::ident(token.value), 1)
                        }
                    }
                }
            }
            TokenKind::Number => {
                self.advance();
                Ok((self.parse_number(&token)?, 1))
            }
            TokenKind::String => {
                self.advance();
                Ok((Node::String { value: token.value }, 1))
            }
            TokenKind::Bracket | TokenKind::EndOfInput => Err(self.unexpected(&token)),
        }
    }

    /// `.name`, `.name(args)`, `.0` and `(args)` after a bare identifier.
    fn parse_postfix(&mut self, mut node: Node, mut depth: usize) -> Result<(Node, usize)> {
        loop {
            let token = self.current().clone();
            if token.is_operator(".") {
                self.advance();
                let name = self.current().clone();
                if name.kind != TokenKind::Identifier {
                    return Err(self.error(
                        "RB-P003",
                        name.position,
                        format!("expected name after '.', got {}", describe(&name)),
                    ));
                }
                self.advance();
                if self.current().is_bracket("(") {
                    let open_at = self.current().position;
                    self.advance();
                    let (args, args_depth) = self.parse_sequence(")", open_at, "argument list")?;
                    depth = self.check_depth(depth.max(args_depth) + 1, token.position)?;
                    node = Node::method(node, name.value, args);
                } else {
                    depth = self.check_depth(depth + 1, token.position)?;
                    node = Node::property(node, name.value);
                }
            } else if token.kind == TokenKind::Number && token.value.starts_with('.') {
                // `x.1` lexes as `x` followed by the number `.1`
                for index in index_chain(&token.value).ok_or_else(|| {
                    self.error(
                        "RB-P003",
                        token.position,
                        format!("expected name or index after '.', got '{}'", token.value),
                    )
                })? {
                    depth = self.check_depth(depth + 1, token.position)?;
                    node = Node::property(node, index);
                }
                self.advance();
            } else if token.is_bracket("(") {
                let Node::Identifier { name } = &node else {
                    break;
                };
                let name = name.clone();
                self.advance();
                let (args, args_depth) = self.parse_sequence(")", token.position, "argument list")?;
                depth = self.check_depth(args_depth + 1, token.position)?;
                node = Node::call(name, args);
            } else {
                break;
            }
        }
        Ok((node, depth))
    }

    /// Comma separated expressions up to `close`; the opening bracket is
    /// already consumed. Also returns the deepest item's depth.
    fn parse_sequence(
        &mut self,
        close: &str,
        open_at: Position,
        what: &str,
    ) -> Result<(Vec<Node>, usize)> {
        let mut items = Vec::new();
        let mut depth = 0;
        if self.current().is_bracket(close) {
            self.advance();
            return Ok((items, depth));
        }
        loop {
            let token = self.current();
            if token.is_operator(",") {
                return Err(self.error(
                    "RB-P004",
                    token.position,
                    format!("unexpected ',' in {}", what),
                ));
            }
            let (item, item_depth) = self.parse_expression(0)?;
            depth = depth.max(item_depth);
            items.push(item);

            let token = self.current();
            if token.is_bracket(close) {
                self.advance();
                return Ok((items, depth));
            }
            if token.is_operator(",") {
                self.advance();
                let next = self.current();
                if next.is_bracket(close) {
                    return Err(self.error(
                        "RB-P004",
                        next.position,
                        format!("trailing ',' in {}", what),
                    ));
                }
                continue;
            }
            if token.is_end() {
                return Err(self.error(
                    "RB-P005",
                    open_at,
                    format!("unclosed {}, expected '{}' before end of expression", what, close),
                ));
            }
            return Err(self.error(
                "RB-P004",
                token.position,
                format!("expected ',' or '{}' in {}, got {}", close, what, describe(token)),
            ));
        }
    }

    fn parse_number(&self, token: &Token) -> Result<Node> {
        let text: String = token.value.chars().filter(|&c| c != '_').collect();
        let (radix, digits) = match text.get(..2) {
            Some("0x" | "0X") => (16, &text[2..]),
            Some("0o" | "0O") => (8, &text[2..]),
            Some("0b" | "0B") => (2, &text[2..]),
            _ => (10, text.as_str()),
        };

        if digits.contains('.') {
            let value = if radix == 10 {
                digits.parse::<f64>().ok()
            } else {
                radix_float(digits, radix)
            };
            return value.map(Node::float).ok_or_else(|| {
                self.error(
                    "RB-P006",
                    token.position,
                    format!("invalid float literal '{}'", token.value),
                )
            });
        }

        i64::from_str_radix(digits, radix).map(Node::int).map_err(|_| {
            self.error(
                "RB-P006",
                token.position,
                format!("integer literal '{}' is out of range", token.value),
            )
        })
    }
}

/// `.1.2` -> `["1", "2"]`; `None` when any segment is not a plain index.
fn index_chain(lexeme: &str) -> Option<Vec<String>> {
    lexeme[1..]
        .split('.')
        .map(|segment| {
            let digits: String = segment.chars().filter(|&c| c != '_').collect();
            digits.parse::<usize>().ok().map(|i| i.to_string())
        })
        .collect()
}

fn radix_float(digits: &str, radix: u32) -> Option<f64> {
    let (whole, fraction) = digits.split_once('.')?;
    let mut value = if whole.is_empty() {
        0.0
    } else {
        u64::from_str_radix(whole, radix).ok()? as f64
    };
    let mut scale = 1.0 / radix as f64;
    for c in fraction.chars() {
        value += c.to_digit(radix)? as f64 * scale;
        scale /= radix as f64;
    }
    Some(value)
}

fn describe(token: &Token) -> String {
    match token.kind {
        TokenKind::EndOfInput => "end of expression".to_string(),
        TokenKind::String => format!("string {:?}", token.value),
        _ => format!("'{}'", token.value),
    }
}
