use std::fmt::Write;

use crate::compiler::chunk::{Chunk, has_operand, opcode_name};

/// Human-readable listing of a chunk: the constant pool, then one line per
/// instruction with its byte offset. Tolerates malformed input.
pub fn disassemble(chunk: &Chunk) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "constants ({}):", chunk.constants.len());
    for (i, constant) in chunk.constants.iter().enumerate() {
        let _ = writeln!(out, "  #{:<5} {}", i, constant);
    }

    let _ = writeln!(out, "code ({} bytes):", chunk.code.len());
    let mut ip = 0;
    while ip < chunk.code.len() {
        let op = chunk.code[ip];
        let name = opcode_name(op).unwrap_or("UNKNOWN");
        if !has_operand(op) {
            if opcode_name(op).is_some() {
                let _ = writeln!(out, "  {:04}: {}", ip, name);
            } else {
                let _ = writeln!(out, "  {:04}: {} 0x{:02x}", ip, name, op);
            }
            ip += 1;
            continue;
        }
        match chunk.read_operand(ip + 1) {
            Some(idx) => {
                let constant = chunk
                    .constants
                    .get(idx as usize)
                    .map(ToString::to_string)
                    .unwrap_or_else(|| "<out of range>".to_string());
                let _ = writeln!(out, "  {:04}: {:<9}#{:<5} ; {}", ip, name, idx, constant);
            }
            None => {
                let _ = writeln!(out, "  {:04}: {:<9}<truncated>", ip, name);
            }
        }
        ip += 3;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::chunk::{Constant, OP_ADD, OP_PUSH};

    fn listing(source: &str) -> String {
        disassemble(&crate::compile(source).unwrap())
    }

    #[test]
    fn disassemble_arithmetic() {
        let text = listing("1 + 2 - 3");
        assert!(text.starts_with("constants (3):\n"));
        assert!(text.contains("  0000: PUSH     #0     ; 1\n"));
        assert!(text.contains("  0006: ADD\n"));
        assert!(text.contains("  0010: SUB\n"));
    }

    #[test]
    fn disassemble_shows_call_descriptors() {
        let text = listing("max(a, 2)");
        assert!(text.contains("CALL     #2     ; max/2"));
        assert!(text.contains("FETCH    #0     ; \"a\""));
    }

    #[test]
    fn disassemble_malformed() {
        let chunk = Chunk {
            code: vec![0xEE, OP_PUSH, 0, 9, OP_ADD, OP_PUSH, 0],
            constants: vec![Constant::Int(1)],
        };
        let text = disassemble(&chunk);
        assert!(text.contains("0000: UNKNOWN 0xee"));
        assert!(text.contains("0001: PUSH     #9     ; <out of range>"));
        assert!(text.contains("0004: ADD"));
        assert!(text.contains("0005: PUSH     <truncated>"));
    }
}
