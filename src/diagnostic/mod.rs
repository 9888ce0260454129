pub mod ansi;
pub mod json;
pub mod registry;
pub mod source_map;

pub use source_map::SourceMap;

use crate::compiler::CompileError;
use crate::lexer::{LexError, Position};
use crate::parser::ParseError;
use crate::vm::VmError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
}

#[derive(Debug, Clone)]
pub struct Label {
    pub position: Position,
    pub length: usize,
    pub message: String,
    pub is_primary: bool,
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: Option<&'static str>,
    pub message: String,
    pub labels: Vec<Label>,
    pub notes: Vec<String>,
    pub suggestion: Option<String>,
    pub source: Option<String>,
}

impl Diagnostic {
    pub fn error(message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code: None,
            message: message.into(),
            labels: Vec::new(),
            notes: Vec::new(),
            suggestion: None,
            source: None,
        }
    }

    pub fn with_code(mut self, code: &'static str) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_label(mut self, position: Position, length: usize, label: impl Into<String>) -> Self {
        self.labels.push(Label { position, length, message: label.into(), is_primary: true });
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

// ---- From impls for the stage errors ----

impl From<&LexError> for Diagnostic {
    fn from(e: &LexError) -> Self {
        let d = Diagnostic::error(&e.message).with_code(e.code).with_label(e.position, 1, "here");
        match e.code {
            "RB-L001" => d.with_suggestion("close the literal with the quote it was opened with"),
            "RB-L002" => d.with_suggestion(
                "valid escapes are \\a \\b \\f \\n \\r \\t \\v \\\\ \\' and the enclosing quote",
            ),
            _ => d,
        }
    }
}

impl From<&ParseError> for Diagnostic {
    fn from(e: &ParseError) -> Self {
        let label = if e.code == "RB-P005" { "opened here" } else { "here" };
        let d = Diagnostic::error(&e.message).with_code(e.code).with_label(e.position, 1, label);
        match e.code {
            "RB-P002" => d.with_note("the expression ends before an operand"),
            "RB-P005" => d.with_suggestion("add the missing closing bracket"),
            _ => d,
        }
    }
}

impl From<&CompileError> for Diagnostic {
    fn from(e: &CompileError) -> Self {
        Diagnostic::error(e.to_string()).with_code(e.code())
    }
}

impl From<&VmError> for Diagnostic {
    fn from(e: &VmError) -> Self {
        let d = Diagnostic::error(e.to_string()).with_code(e.code());
        match e {
            VmError::InvalidOperator { symbol, left, right } => d.with_note(format!(
                "no overload of '{}' is registered for ({}, {})",
                symbol, left, right
            )),
            VmError::UnresolvedCall { .. } => {
                d.with_note("calls resolve against the environment, or the receiver for methods")
            }
            _ => d,
        }
    }
}

impl From<&crate::Error> for Diagnostic {
    fn from(e: &crate::Error) -> Self {
        match e {
            crate::Error::Lex(e) => e.into(),
            crate::Error::Parse(e) => e.into(),
            crate::Error::Compile(e) => e.into(),
            crate::Error::Runtime(e) => e.into(),
        }
    }
}
