use serde::Serialize;

/// Word operators. An identifier lexeme matching one of these is emitted as
/// an operator token so the parser's operator tables cover them.
pub const KEYWORDS: &[&str] = &["not", "in", "and", "or"];

/// 1-based line, 0-based offset in code points from the start of the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Position {
    pub line: usize,
    pub offset: usize,
}

impl Position {
    pub const START: Position = Position { line: 1, offset: 0 };
}

impl Default for Position {
    fn default() -> Self {
        Position::START
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.line, self.offset)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Operator,
    Number,
    String,
    Bracket,
    Identifier,
    EndOfInput,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub position: Position,
    /// Raw lexeme, except for strings where it holds the unescaped text.
    pub value: String,
}

impl Token {
    pub fn is_operator(&self, op: &str) -> bool {
        self.kind == TokenKind::Operator && self.value == op
    }

    pub fn is_bracket(&self, bracket: &str) -> bool {
        self.kind == TokenKind::Bracket && self.value == bracket
    }

    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::EndOfInput
    }
}

#[derive(Debug, thiserror::Error)]
#[error("Lex error at {position}: {message}")]
pub struct LexError {
    pub code: &'static str,
    pub position: Position,
    pub message: String,
}

type Result<T> = std::result::Result<T, LexError>;

/// Tokenize with the standard keyword set.
pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source, KEYWORDS).run()
}

enum State {
    Root,
    Identifier,
    Number,
    Dot,
}

pub struct Lexer<'a> {
    source: &'a str,
    keywords: &'a [&'a str],
    cursor: usize,
    start: usize,
    position: Position,
    start_position: Position,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str, keywords: &'a [&'a str]) -> Self {
        Lexer {
            source,
            keywords,
            cursor: 0,
            start: 0,
            position: Position::START,
            start_position: Position::START,
            tokens: Vec::new(),
        }
    }

    pub fn run(mut self) -> Result<Vec<Token>> {
        let mut state = State::Root;
        loop {
            state = match state {
                State::Root => match self.root()? {
                    Some(next) => next,
                    None => break,
                },
                State::Identifier => self.identifier(),
                State::Number => self.number()?,
                State::Dot => self.dot(),
            };
        }
        Ok(self.tokens)
    }

    // ---- Cursor ----

    fn peek(&self) -> Option<char> {
        self.source[self.cursor..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.source[self.cursor..].chars().nth(1)
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.peek()?;
        self.cursor += ch.len_utf8();
        if ch == '\n' {
            self.position.line += 1;
            self.position.offset = 0;
        } else {
            self.position.offset += 1;
        }
        Some(ch)
    }

    fn accept(&mut self, valid: impl Fn(char) -> bool) -> bool {
        match self.peek() {
            Some(ch) if valid(ch) => {
                self.bump();
                true
            }
            _ => false,
        }
    }

    fn mark(&mut self) {
        self.start = self.cursor;
        self.start_position = self.position;
    }

    fn lexeme(&self) -> &'a str {
        &self.source[self.start..self.cursor]
    }

    fn emit(&mut self, kind: TokenKind, value: String) {
        self.tokens.push(Token { kind, position: self.start_position, value });
        self.mark();
    }

    fn emit_lexeme(&mut self, kind: TokenKind) {
        let value = self.lexeme().to_string();
        self.emit(kind, value);
    }

    fn error(&self, code: &'static str, position: Position, message: String) -> LexError {
        LexError { code, position, message }
    }

    // ---- States ----

    fn root(&mut self) -> Result<Option<State>> {
        self.mark();
        let Some(ch) = self.peek() else {
            self.tokens.push(Token {
                kind: TokenKind::EndOfInput,
                position: self.position,
                value: String::new(),
            });
            return Ok(None);
        };

        match ch {
            c if c.is_whitespace() => {
                self.bump();
            }
            '\'' | '"' => self.string(ch)?,
            '0'..='9' => return Ok(Some(State::Number)),
            '.' => return Ok(Some(State::Dot)),
            '(' | ')' | '[' | ']' | '{' | '}' => {
                self.bump();
                self.emit_lexeme(TokenKind::Bracket);
            }
            '?' | ':' | '%' | ',' | '+' | '-' | '*' | '/' | '^' => {
                self.bump();
                self.emit_lexeme(TokenKind::Operator);
            }
            '&' | '|' | '!' | '=' | '<' | '>' => {
                self.bump();
                self.accept(|c| matches!(c, '&' | '|' | '='));
                self.emit_lexeme(TokenKind::Operator);
            }
            c if is_identifier_start(c) => return Ok(Some(State::Identifier)),
            other => {
                return Err(self.error(
                    "RB-L004",
                    self.position,
                    format!("unexpected character '{}'", other.escape_default()),
                ));
            }
        }
        Ok(Some(State::Root))
    }

    fn identifier(&mut self) -> State {
        while self.accept(is_identifier_continue) {}
        let word = self.lexeme();
        let kind = if self.keywords.contains(&word) {
            TokenKind::Operator
        } else {
            TokenKind::Identifier
        };
        self.emit(kind, word.to_string());
        State::Root
    }

    /// A `.` is either the start of a fraction-only number (`.5`) or the
    /// property access operator.
    fn dot(&mut self) -> State {
        self.bump();
        if self.peek().is_some_and(|c| c.is_ascii_digit()) {
            return State::Number;
        }
        self.emit_lexeme(TokenKind::Operator);
        State::Root
    }

    fn number(&mut self) -> Result<State> {
        let leading_dot = self.lexeme() == ".";
        let mut radix = 10;

        if !leading_dot && self.accept(|c| c == '0') {
            radix = match self.peek() {
                Some('x' | 'X') => 16,
                Some('o' | 'O') => 8,
                Some('b' | 'B') => 2,
                _ => 10,
            };
            if radix != 10 {
                self.bump();
                if self.digit_run(radix) == 0 {
                    return Err(self.malformed_number());
                }
            }
        }

        self.digit_run(radix);

        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_digit(radix)) {
            self.bump();
            self.digit_run(radix);
        }

        if self.peek().is_some_and(is_identifier_continue) {
            // Swallow the rest of the run so the diagnostic shows the whole literal.
            while self.accept(is_identifier_continue) {}
            return Err(self.malformed_number());
        }

        self.emit_lexeme(TokenKind::Number);
        Ok(State::Root)
    }

    /// Consume digits of `radix` and `_` separators; returns the digit count.
    fn digit_run(&mut self, radix: u32) -> usize {
        let mut digits = 0;
        while let Some(ch) = self.peek() {
            if ch == '_' {
                self.bump();
            } else if ch.is_digit(radix) {
                self.bump();
                digits += 1;
            } else {
                break;
            }
        }
        digits
    }

    fn malformed_number(&self) -> LexError {
        self.error(
            "RB-L003",
            self.start_position,
            format!("malformed number literal '{}'", self.lexeme()),
        )
    }

    fn string(&mut self, quote: char) -> Result<()> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.peek() {
                None | Some('\n') => {
                    return Err(self.error(
                        "RB-L001",
                        self.start_position,
                        "unterminated string literal".into(),
                    ));
                }
                Some(c) if c == quote => {
                    self.bump();
                    break;
                }
                Some('\\') => {
                    let at = self.position;
                    self.bump();
                    let resolved = match self.peek() {
                        Some('a') => '\x07',
                        Some('b') => '\x08',
                        Some('f') => '\x0c',
                        Some('n') => '\n',
                        Some('r') => '\r',
                        Some('t') => '\t',
                        Some('v') => '\x0b',
                        Some('\\') => '\\',
                        Some('\'') => '\'',
                        Some(c) if c == quote => c,
                        None => {
                            return Err(self.error(
                                "RB-L001",
                                self.start_position,
                                "unterminated string literal".into(),
                            ));
                        }
                        Some(other) => {
                            return Err(self.error(
                                "RB-L002",
                                at,
                                format!("unknown escape sequence '\\{}'", other.escape_default()),
                            ));
                        }
                    };
                    self.bump();
                    value.push(resolved);
                }
                Some('\r') => {
                    self.bump();
                    value.push('\n');
                }
                Some(c) => {
                    self.bump();
                    value.push(c);
                }
            }
        }
        self.emit(TokenKind::String, value);
        Ok(())
    }
}

fn is_identifier_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_identifier_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}
