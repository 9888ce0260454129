use std::io::Write;
use std::process::{Command, Output};

fn rulebyte() -> Command {
    Command::new(env!("CARGO_BIN_EXE_rulebyte"))
}

fn run(args: &[&str]) -> Output {
    rulebyte().args(args).output().expect("failed to run rulebyte")
}

fn stdout(out: &Output) -> String {
    String::from_utf8_lossy(&out.stdout).trim().to_string()
}

fn stderr(out: &Output) -> String {
    String::from_utf8_lossy(&out.stderr).to_string()
}

// --- Evaluation ---

#[test]
fn eval_arithmetic() {
    let out = run(&["1 + 2 * 3"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "7");
}

#[test]
fn eval_mixed_arithmetic_is_float() {
    let out = run(&["8 + 7.5 - 10"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "5.5");
}

#[test]
fn eval_text_prints_raw() {
    let out = run(&["'a' + \"b\""]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "ab");
}

#[test]
fn eval_with_inline_env() {
    let out = run(&[
        "--env-json",
        r#"{"x": [10, 20, 30], "user": {"name": "ada"}}"#,
        "x.1 + 1",
    ]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "21");

    let out = run(&["--env-json", r#"{"user": {"name": "ada"}}"#, "user.missing"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "nil");
}

#[test]
fn eval_with_env_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"price": 12, "qty": 3, "tags": ["sale"]}}"#).unwrap();
    let path = file.path().to_str().unwrap();

    let out = run(&["-e", path, "price * qty >= 30 and 'sale' in tags"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "true");
}

#[test]
fn eval_json_output() {
    let out = run(&["--json", "--env-json", r#"{"a": 1}"#, "[a, 'x', nil, 2.5]"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let v: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(v, serde_json::json!([1, "x", null, 2.5]));
}

#[test]
fn eval_bare_has_no_arithmetic() {
    let out = run(&["--bare", "1 + 2"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("RB-R002"), "stderr: {}", stderr(&out));

    // equality and logic do not go through the registry
    let out = run(&["--bare", "1 == 1.0 and not nil"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "true");
}

// --- Emit ---

#[test]
fn emit_tokens() {
    let out = run(&["--emit", "tokens", "a.b"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let v: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    let tokens = v.as_array().unwrap();
    assert_eq!(tokens.len(), 4);
    assert_eq!(tokens[0]["kind"], "Identifier");
    assert_eq!(tokens[1]["value"], ".");
    assert_eq!(tokens[3]["kind"], "EndOfInput");
}

#[test]
fn emit_ast() {
    let out = run(&["--emit", "ast", "a - b - c"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let v: serde_json::Value = serde_json::from_str(&stdout(&out)).unwrap();
    assert_eq!(v["Binary"]["operator"], "-");
    assert_eq!(v["Binary"]["left"]["Binary"]["operator"], "-");
    assert_eq!(v["Binary"]["right"]["Identifier"]["name"], "c");
}

#[test]
fn emit_bytecode() {
    let out = run(&["--emit", "bytecode", "1 + 2 - 3"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    let listing = stdout(&out);
    assert!(listing.contains("constants (3):"), "listing:\n{listing}");
    assert!(listing.contains("ADD"), "listing:\n{listing}");
    assert!(listing.contains("SUB"), "listing:\n{listing}");
}

#[test]
fn emit_does_not_evaluate() {
    // would fail at runtime: no such function
    let out = run(&["--emit", "bytecode", "missing(1)"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).contains("CALL"));
}

#[test]
fn emit_fmt() {
    let out = run(&["--emit", "fmt", "(a+b)*c-(d)"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert_eq!(stdout(&out), "(a + b) * c - d");
}

// --- Errors ---

#[test]
fn parse_error_exits_one_with_diagnostic() {
    let out = run(&["--no-color", "1 +"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(out.stdout.is_empty());
    let err = stderr(&out);
    assert!(err.starts_with("error[RB-P002]: unexpected end of expression"), "stderr: {err}");
    assert!(err.contains("--> 1:4"), "stderr: {err}");
    assert!(err.contains("1 | 1 +"), "stderr: {err}");
}

#[test]
fn lex_error_points_at_character() {
    let out = run(&["--no-color", "a # b"]);
    assert_eq!(out.status.code(), Some(1));
    let err = stderr(&out);
    assert!(err.contains("RB-L004"), "stderr: {err}");
    assert!(err.contains("  |   ^"), "stderr: {err}");
}

#[test]
fn deep_nesting_is_reported_not_fatal() {
    let source = format!("{}1{}", "(".repeat(50_000), ")".repeat(50_000));
    let out = run(&["--no-color", &source]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).starts_with("error[RB-P007]"), "stderr: {}", stderr(&out));
}

#[test]
fn runtime_error_unresolved_call() {
    let out = run(&["missing(1)"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("RB-R003"), "stderr: {}", stderr(&out));
}

#[test]
fn json_diagnostics() {
    let out = run(&["--diagnostics", "json", "f(a,"]);
    assert_eq!(out.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_str(stderr(&out).trim()).unwrap();
    assert_eq!(v["code"], "RB-P002");
    assert_eq!(v["severity"], "error");
    assert_eq!(v["labels"][0]["line"], 1);
}

#[test]
fn bad_env_json_is_an_error() {
    let out = run(&["--env-json", "{not json", "1"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("invalid environment JSON"), "stderr: {}", stderr(&out));
}

#[test]
fn missing_env_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("absent.json");
    let out = run(&["-e", path.to_str().unwrap(), "1"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("cannot read environment file"));
}

// --- Usage ---

#[test]
fn no_expression_is_a_usage_error() {
    let out = run(&[]);
    assert_eq!(out.status.code(), Some(2));
    assert!(stderr(&out).contains("Usage"), "stderr: {}", stderr(&out));
}

#[test]
fn unknown_emit_target_is_a_usage_error() {
    let out = run(&["--emit", "python", "1"]);
    assert_eq!(out.status.code(), Some(2));
}

#[test]
fn explain_known_code() {
    let out = run(&["--explain", "RB-P005"]);
    assert!(out.status.success(), "stderr: {}", stderr(&out));
    assert!(stdout(&out).starts_with("## RB-P005: unclosed bracket"));
}

#[test]
fn explain_unknown_code() {
    let out = run(&["--explain", "RB-X999"]);
    assert_eq!(out.status.code(), Some(1));
    assert!(stderr(&out).contains("unknown error code"));
}
