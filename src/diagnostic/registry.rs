/// An entry in the error code registry.
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str,  // brief description for tooling
    pub long: &'static str,   // full explanation for --explain
}

/// All stable error codes. Prefix letter is the stage: L lexer, P parser,
/// C compiler, R runtime.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Lexer ────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "RB-L001",
        short: "unterminated string literal",
        long: r#"## RB-L001: unterminated string literal

A string literal was opened but the line or the input ended before the
matching quote.

**Example:**

    name == 'alice

**Fix:** close the literal with the quote it was opened with:

    name == 'alice'

Strings cannot span lines. Use `\n` for an embedded newline.
"#,
    },
    ErrorEntry {
        code: "RB-L002",
        short: "unknown escape sequence",
        long: r#"## RB-L002: unknown escape sequence

A backslash inside a string was followed by a character that is not a
known escape.

**Example:**

    "C:\path"

Valid escapes are `\a \b \f \n \r \t \v \\ \'` and the quote that opened
the literal. Write a literal backslash as `\\`:

    "C:\\path"
"#,
    },
    ErrorEntry {
        code: "RB-L003",
        short: "malformed number literal",
        long: r#"## RB-L003: malformed number literal

A number literal runs into characters that do not belong to it, has no
digits after its radix prefix, or uses a digit its radix does not allow.

**Examples:**

    0x
    0b102
    12abc

Digits may be grouped with `_` (`1_000`), and `0x`, `0o` and `0b`
prefixes select hexadecimal, octal and binary.
"#,
    },
    ErrorEntry {
        code: "RB-L004",
        short: "unexpected character",
        long: r#"## RB-L004: unexpected character

A character was encountered that cannot start any token.

**Example:**

    price $ 2

Remove the character or replace it with an operator or identifier.
"#,
    },
    // ── Parser ───────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "RB-P001",
        short: "unexpected token",
        long: r#"## RB-P001: unexpected token

The parser found a token that cannot appear at this point, usually two
operands with no operator between them, or a stray closing bracket.

**Examples:**

    a b
    (a + b))

The conditional form `a ? b : c` is not part of the language and is
reported here too.
"#,
    },
    ErrorEntry {
        code: "RB-P002",
        short: "unexpected end of expression",
        long: r#"## RB-P002: unexpected end of expression

The input ended where an operand was expected.

**Examples:**

    1 +
    f(a,

An empty input is also reported with this code.
"#,
    },
    ErrorEntry {
        code: "RB-P003",
        short: "expected a property name after '.'",
        long: r#"## RB-P003: expected a property name after '.'

A `.` must be followed by a name or a run of integer indexes.

**Examples:**

    user.
    user.'name'

**Fix:**

    user.name
    items.0.name
"#,
    },
    ErrorEntry {
        code: "RB-P004",
        short: "malformed argument or element list",
        long: r#"## RB-P004: malformed argument or element list

Items in a call or list literal are separated by single commas, with no
leading or trailing comma.

**Examples:**

    f(a b)
    [, 1]
    f(a,)
"#,
    },
    ErrorEntry {
        code: "RB-P005",
        short: "unclosed bracket",
        long: r#"## RB-P005: unclosed bracket

A `(` or `[` was opened and the input ended before it was closed. The
diagnostic points at the opening bracket.

**Example:**

    f(a, (b + c)

**Fix:** add the missing closing bracket.
"#,
    },
    ErrorEntry {
        code: "RB-P006",
        short: "integer literal out of range",
        long: r#"## RB-P006: integer literal out of range

An integer literal does not fit in a signed 64-bit integer.

**Example:**

    9223372036854775808

Integers range from -9223372036854775808 to 9223372036854775807. Write
a float literal (`9223372036854775808.0`) if precision loss is fine.
"#,
    },
    ErrorEntry {
        code: "RB-P007",
        short: "expression nested too deeply",
        long: r#"## RB-P007: expression nested too deeply

Brackets, prefix operators, calls and operator chains may nest at most
256 levels. Deeper input is rejected before it can exhaust the stack.

**Examples:**

    ((((((((((...1...))))))))))
    - - - - - - - - - ... x
    a.b.b.b.b.b ... (more than 256 accesses)

Flatten the expression, or compute the deep part in the host and pass it
in through the environment.
"#,
    },
    // ── Compiler ─────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "RB-C001",
        short: "constant pool overflow",
        long: r#"## RB-C001: constant pool overflow

Operands are 16-bit indexes into the constant pool, so a chunk holds at
most 65536 constants. Repeated numbers and strings share one slot; call
descriptors do not.

Split the expression, or move large literal lists into the environment.
"#,
    },
    ErrorEntry {
        code: "RB-C002",
        short: "operator has no instruction",
        long: r#"## RB-C002: operator has no instruction

The tree contains an operator the compiler has no instruction for. This
happens when a custom grammar accepts an operator the bytecode does not
know, or a tree is built by hand.

Prefix operators are `-`, `+`, `!` and `not`. Infix operators are the
arithmetic, comparison, `in`, `and` and `or` families.
"#,
    },
    // ── Runtime ──────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "RB-R001",
        short: "unknown instruction",
        long: r#"## RB-R001: unknown instruction

The machine met a byte that is not an opcode. Chunks produced by the
compiler never contain one; a chunk built or edited by hand can.

Use `--emit bytecode` to inspect a chunk.
"#,
    },
    ErrorEntry {
        code: "RB-R002",
        short: "invalid operator for operand kinds",
        long: r#"## RB-R002: invalid operator for operand kinds

No overload of the operator is registered for the kinds of its two
operands.

**Example:**

    1 + 'a'

Arithmetic and ordering are resolved through the operator registry. The
standard registry covers numbers and text; a host can register more
overloads. A bare machine has none.
"#,
    },
    ErrorEntry {
        code: "RB-R003",
        short: "unresolved call",
        long: r#"## RB-R003: unresolved call

A call names something that is not a function.

Plain calls `f(x)` resolve `f` against the environment. Method calls
`x.f()` resolve against the receiver: a record method first, then a
function-valued field or entry.
"#,
    },
    ErrorEntry {
        code: "RB-R004",
        short: "host function failed",
        long: r#"## RB-R004: host function failed

A host function or operator overload was called and returned an error.
The message after the name comes from the host.
"#,
    },
    ErrorEntry {
        code: "RB-R005",
        short: "invalid operand",
        long: r#"## RB-R005: invalid operand

A prefix operator was applied to a value it does not accept.

**Example:**

    -'text'

Negation takes an int or a float. `not` and `!` accept any value and
use its truthiness.
"#,
    },
    ErrorEntry {
        code: "RB-R006",
        short: "malformed chunk",
        long: r#"## RB-R006: malformed chunk

The chunk is inconsistent: an operand is cut off, a constant index is
out of range, a constant has the wrong type for its instruction, or the
stack underflows. Compiler output never triggers this.
"#,
    },
];

/// Look up an error entry by code (e.g. `"RB-P002"`).
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_code() {
        let e = lookup("RB-P005").expect("RB-P005 should be in registry");
        assert_eq!(e.code, "RB-P005");
        assert!(!e.short.is_empty());
        assert!(e.long.contains("RB-P005"));
    }

    #[test]
    fn lookup_unknown_returns_none() {
        assert!(lookup("RB-X999").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn all_codes_unique() {
        let mut codes: Vec<&str> = REGISTRY.iter().map(|e| e.code).collect();
        codes.sort_unstable();
        let len_before = codes.len();
        codes.dedup();
        assert_eq!(codes.len(), len_before, "duplicate codes in registry");
    }

    #[test]
    fn all_codes_have_content() {
        for entry in REGISTRY {
            assert!(!entry.short.is_empty(), "{} missing short description", entry.code);
            assert!(entry.long.contains(entry.code), "{} long text lacks its code", entry.code);
        }
    }

    #[test]
    fn every_stage_error_is_registered() {
        use crate::compiler::CompileError;
        use crate::value::Kind;
        use crate::vm::VmError;

        let compile = [
            CompileError::PoolOverflow { limit: 1 },
            CompileError::UnsupportedOperator { operator: "?".into(), position: "infix" },
        ];
        for e in &compile {
            assert!(lookup(e.code()).is_some(), "{} not registered", e.code());
        }
        let runtime = [
            VmError::UnknownInstruction { op: 0xff, offset: 0 },
            VmError::InvalidOperator { symbol: "+", left: Kind::Int, right: Kind::Nil },
            VmError::UnresolvedCall { name: "f".into() },
            VmError::InvalidOperand { operator: "-", kind: Kind::Text },
            VmError::MalformedChunk { offset: 0, reason: "stack underflow" },
        ];
        for e in &runtime {
            assert!(lookup(e.code()).is_some(), "{} not registered", e.code());
        }
        for code in ["RB-L001", "RB-L002", "RB-L003", "RB-L004", "RB-R004"] {
            assert!(lookup(code).is_some(), "{code} not registered");
        }
        for n in 1..=7 {
            let code = format!("RB-P00{n}");
            assert!(lookup(&code).is_some(), "{code} not registered");
        }
    }
}
