use std::io::IsTerminal;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, ValueEnum};

use rulebyte::codegen::{FmtMode, format};
use rulebyte::diagnostic::{self, Diagnostic, ansi::AnsiRenderer};
use rulebyte::{OperatorRegistry, Value, Vm, compiler, lexer, parser, vm};

#[derive(Parser)]
#[command(name = "rulebyte", version, about = "Evaluate an expression against a JSON environment")]
struct Cli {
    /// Expression to evaluate
    #[arg(required_unless_present = "explain")]
    expression: Option<String>,

    /// JSON environment file
    #[arg(short = 'e', long = "env", value_name = "FILE", conflicts_with = "env_json")]
    env: Option<PathBuf>,

    /// Inline JSON environment
    #[arg(long, value_name = "JSON")]
    env_json: Option<String>,

    /// Print an intermediate form instead of evaluating
    #[arg(long, value_enum, value_name = "TARGET")]
    emit: Option<Emit>,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Do not install the standard operator set
    #[arg(long)]
    bare: bool,

    /// Diagnostic output format
    #[arg(long, value_enum, value_name = "FMT", default_value_t = DiagnosticFormat::Ansi)]
    diagnostics: DiagnosticFormat,

    /// Disable ANSI colours
    #[arg(long)]
    no_color: bool,

    /// Print the long explanation of an error code
    #[arg(long, value_name = "CODE")]
    explain: Option<String>,
}

#[derive(Clone, Copy, ValueEnum)]
enum Emit {
    Tokens,
    Ast,
    Bytecode,
    Fmt,
}

#[derive(Clone, Copy, ValueEnum)]
enum DiagnosticFormat {
    Ansi,
    Json,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(out) => {
            println!("{}", out);
            ExitCode::SUCCESS
        }
        Err(d) => {
            report(&cli, &d);
            ExitCode::FAILURE
        }
    }
}

fn report(cli: &Cli, d: &Diagnostic) {
    match cli.diagnostics {
        DiagnosticFormat::Json => eprintln!("{}", diagnostic::json::render(d)),
        DiagnosticFormat::Ansi => {
            let renderer = AnsiRenderer {
                use_color: !cli.no_color && std::io::stderr().is_terminal(),
            };
            eprint!("{}", renderer.render(d));
        }
    }
}

fn run(cli: &Cli) -> Result<String, Diagnostic> {
    if let Some(code) = &cli.explain {
        return match diagnostic::registry::lookup(code) {
            Some(entry) => Ok(entry.long.trim_end().to_string()),
            None => Err(Diagnostic::error(format!("unknown error code '{}'", code))
                .with_suggestion("codes look like RB-P002")),
        };
    }

    let Some(source) = cli.expression.as_deref() else {
        return Err(Diagnostic::error("no expression given"));
    };
    let located = |d: Diagnostic| d.with_source(source);

    let tokens = lexer::tokenize(source).map_err(|e| located(Diagnostic::from(&e)))?;
    if let Some(Emit::Tokens) = cli.emit {
        return to_pretty_json(&tokens);
    }

    let ast = parser::parse(tokens).map_err(|e| located(Diagnostic::from(&e)))?;
    match cli.emit {
        Some(Emit::Ast) => return to_pretty_json(&ast),
        Some(Emit::Fmt) => return Ok(format(&ast, FmtMode::Expanded)),
        _ => {}
    }

    let chunk = compiler::compile(&ast).map_err(|e| Diagnostic::from(&e))?;
    if let Some(Emit::Bytecode) = cli.emit {
        return Ok(vm::disassemble(&chunk).trim_end().to_string());
    }

    let env = load_env(cli)?;
    let registry = if cli.bare { OperatorRegistry::new() } else { OperatorRegistry::standard() };
    let value = Vm::with_registry(&chunk, &env, &registry)
        .run()
        .map_err(|e| Diagnostic::from(&e))?;

    if cli.json {
        Ok(value.to_json().to_string())
    } else {
        Ok(value.to_string())
    }
}

fn load_env(cli: &Cli) -> Result<Value, Diagnostic> {
    let text = match (&cli.env, &cli.env_json) {
        (Some(path), _) => std::fs::read_to_string(path).map_err(|e| {
            Diagnostic::error(format!("cannot read environment file {}: {}", path.display(), e))
        })?,
        (None, Some(json)) => json.clone(),
        (None, None) => return Ok(Value::Map(Default::default())),
    };
    let json: serde_json::Value = serde_json::from_str(&text).map_err(|e| {
        Diagnostic::error(format!("invalid environment JSON: {}", e))
            .with_note("the environment must be a JSON document, usually an object")
    })?;
    Ok(Value::from(json))
}

fn to_pretty_json<T: serde::Serialize>(value: &T) -> Result<String, Diagnostic> {
    serde_json::to_string_pretty(value)
        .map_err(|e| Diagnostic::error(format!("serialization error: {}", e)))
}
