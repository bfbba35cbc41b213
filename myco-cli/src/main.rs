use std::ffi::OsString;
use std::fs;
use std::io::{self, BufRead, IsTerminal, Write};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{ArgAction, Parser, ValueEnum};
use myco_compiler::{
    Compilation, CompileOptions, Compiler, Diagnostic, DiagnosticLevel, Keyword, Lexer,
    LexerError, SourceFile, SourceId, TokenKind, DEFAULT_MAX_DEPTH,
};
use serde_json::json;
use tracing::{debug, Level};

const CHECK_AFTER_HELP: &str = "\
Subcommands:
  myco-cli repl            Read Myco statements from stdin and check each submission.

See `myco-cli repl --help` for REPL options.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Emit {
    Ast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Parser)]
#[command(
    name = "myco-cli",
    version,
    about = "Parse and type check Myco source files.",
    long_about = "Parse and type check a Myco source file, reporting every syntax and type error found.",
    after_help = CHECK_AFTER_HELP
)]
struct CheckCli {
    /// Path to a Myco source file.
    input: PathBuf,

    /// Dump the token stream produced by the lexer.
    #[arg(long)]
    dump_tokens: bool,

    /// Emit additional compiler output (e.g. `ast`).
    #[arg(long, value_enum)]
    emit: Vec<Emit>,

    /// How diagnostics are printed.
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Maximum nesting depth accepted by the parser.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Only parse; skip the type checker.
    #[arg(long)]
    no_typecheck: bool,

    /// Print inferred types with their confidence scores.
    #[arg(long)]
    hints: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

#[derive(Parser)]
#[command(
    name = "myco-cli repl",
    version,
    about = "Check Myco statements interactively, one submission at a time."
)]
struct ReplCli {
    /// Maximum nesting depth accepted by the parser.
    #[arg(long, value_name = "N", default_value_t = DEFAULT_MAX_DEPTH)]
    max_depth: usize,

    /// Only parse; skip the type checker.
    #[arg(long)]
    no_typecheck: bool,

    /// Increase log verbosity (-v, -vv).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() -> Result<()> {
    let raw: Vec<OsString> = std::env::args_os().collect();
    if raw.get(1).map(|arg| arg == "repl").unwrap_or(false) {
        return handle_repl(raw);
    }

    let cli = CheckCli::parse_from(raw);
    init_logging(cli.verbose);
    run_check(cli)
}

fn handle_repl(raw: Vec<OsString>) -> Result<()> {
    let mut args = raw;
    args.remove(1); // drop the literal "repl"
    let cli = ReplCli::parse_from(args);
    init_logging(cli.verbose);
    run_repl(cli)
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_ansi(false)
        .with_max_level(level)
        .init();
}

fn run_check(cli: CheckCli) -> Result<()> {
    let contents = fs::read_to_string(&cli.input)
        .with_context(|| format!("Failed to read {:?}", cli.input))?;

    let source = SourceFile::new(SourceId(0), cli.input.clone(), contents);
    let line_cache = source.lines();
    let mut compiler = Compiler::new(CompileOptions {
        dump_tokens: cli.dump_tokens,
        type_check: !cli.no_typecheck,
        max_depth: cli.max_depth,
    });

    let compilation = match compiler.compile(&source) {
        Ok(compilation) => compilation,
        Err(err) => {
            match cli.format {
                OutputFormat::Json => {
                    print_json_report(&source, compiler.diagnostics().entries(), None, false)?
                }
                OutputFormat::Text => {
                    if !compiler.diagnostics().is_empty() {
                        eprintln!("Diagnostics:");
                        for diagnostic in compiler.diagnostics().entries() {
                            print_diagnostic(&source, &line_cache, diagnostic);
                        }
                    }
                }
            }
            return Err(err.context("Compilation failed"));
        }
    };

    if cli.emit.contains(&Emit::Ast) {
        println!("{:#?}", compilation.program);
    }

    match cli.format {
        OutputFormat::Json => {
            print_json_report(
                &source,
                compiler.diagnostics().entries(),
                Some(&compilation),
                cli.hints,
            )?;
        }
        OutputFormat::Text => {
            if !compiler.diagnostics().is_empty() {
                eprintln!("Diagnostics:");
                for diagnostic in compiler.diagnostics().entries() {
                    print_diagnostic(&source, &line_cache, diagnostic);
                }
            }
            if cli.hints {
                print_hints(&source, &compilation);
            }
        }
    }

    let errors = compiler
        .diagnostics()
        .entries()
        .iter()
        .filter(|diagnostic| diagnostic.level == DiagnosticLevel::Error)
        .count();
    if errors > 0 {
        bail!("{} error(s) found in {}", errors, source.path.display());
    }

    Ok(())
}

fn print_json_report(
    source: &SourceFile,
    diagnostics: &[Diagnostic],
    compilation: Option<&Compilation>,
    hints: bool,
) -> Result<()> {
    let mut report = json!({
        "file": source.path.display().to_string(),
        "diagnostics": diagnostics,
        "parse_errors": compilation.map(|compilation| &compilation.parse_errors),
    });
    if let Some(compilation) = compilation.filter(|_| hints) {
        report["inference"] = json!(compilation.inference);
    }
    println!(
        "{}",
        serde_json::to_string_pretty(&report).context("failed to serialize diagnostics")?
    );
    Ok(())
}

fn print_hints(source: &SourceFile, compilation: &Compilation) {
    if !compilation.type_checked {
        return;
    }
    for hint in &compilation.inference {
        let marker = if hint.ambiguous { " (ambiguous)" } else { "" };
        println!(
            "{}:{}:{}: {} [{}%]{}",
            source.path.display(),
            hint.span.line,
            hint.span.column,
            hint.ty,
            hint.confidence,
            marker
        );
    }
}

fn run_repl(cli: ReplCli) -> Result<()> {
    let interactive = io::stdin().is_terminal();
    let stdin = io::stdin();
    let mut lines = stdin.lock().lines();
    let mut buffer = String::new();
    let mut submissions = 0u32;

    loop {
        if interactive {
            print!("{}", if buffer.is_empty() { "myco> " } else { "...   " });
            io::stdout().flush().context("failed to flush prompt")?;
        }

        let Some(line) = lines.next() else {
            break;
        };
        let line = line.context("failed to read from stdin")?;
        if buffer.is_empty() && matches!(line.trim(), "exit" | "quit") {
            return Ok(());
        }

        buffer.push_str(&line);
        buffer.push('\n');
        if !is_complete_submission(&buffer) {
            continue;
        }

        evaluate_submission(&cli, submissions, &buffer);
        submissions += 1;
        buffer.clear();
    }

    if !buffer.trim().is_empty() {
        evaluate_submission(&cli, submissions, &buffer);
    }
    Ok(())
}

fn evaluate_submission(cli: &ReplCli, index: u32, text: &str) {
    let source = SourceFile::from_snippet(SourceId(index), "repl", text);
    let line_cache = source.lines();
    let mut compiler = Compiler::new(CompileOptions {
        type_check: !cli.no_typecheck,
        max_depth: cli.max_depth,
        ..CompileOptions::default()
    });

    let outcome = compiler.compile(&source);
    for diagnostic in compiler.diagnostics().entries() {
        print_diagnostic(&source, &line_cache, diagnostic);
    }

    match outcome {
        Ok(compilation) if !compiler.diagnostics().has_errors() => {
            println!("ok ({} statement(s))", compilation.program.len());
        }
        Ok(_) => {}
        Err(err) => debug!(error = %err, "submission rejected"),
    }
}

/// A submission is complete once every block opened in it has been closed
/// with `end`. Text that does not lex yet (an open string) keeps reading.
fn is_complete_submission(text: &str) -> bool {
    let tokens = match Lexer::from_text(text).tokenize() {
        Ok(tokens) => tokens,
        Err(LexerError::UnterminatedString { .. }) => return false,
        Err(_) => return true,
    };

    let mut depth = 0i64;
    let mut previous: Option<&TokenKind> = None;
    for token in &tokens {
        if let TokenKind::Keyword(keyword) = token.kind {
            match keyword {
                Keyword::If if previous == Some(&TokenKind::Keyword(Keyword::Else)) => {}
                Keyword::If
                | Keyword::While
                | Keyword::For
                | Keyword::Func
                | Keyword::Function
                | Keyword::Class
                | Keyword::Match
                | Keyword::Spore
                | Keyword::Try => depth += 1,
                Keyword::End => depth -= 1,
                _ => {}
            }
        }
        previous = Some(&token.kind);
    }
    depth <= 0
}

fn print_diagnostic(source: &SourceFile, lines: &[&str], diagnostic: &Diagnostic) {
    let (level_label, level_color) = match diagnostic.level {
        DiagnosticLevel::Error => ("error", "  -"),
        DiagnosticLevel::Warning => ("warning", "  ~"),
    };
    eprintln!("{} {}: {}", level_color, level_label, diagnostic);
    if let Some(span) = diagnostic.span {
        let display_path = source.path.display();
        eprintln!("     --> {}:{}:{}", display_path, span.line, span.column);

        if let Some(raw_line) = lines.get(span.line.saturating_sub(1)) {
            let display_line = raw_line.replace('\t', "    ");
            eprintln!("      {}", display_line);

            let mut caret_line = String::from("      ");
            let mut current_col = 1usize;
            for ch in raw_line.chars() {
                if current_col >= span.column {
                    break;
                }
                match ch {
                    '\t' => caret_line.push_str("    "),
                    _ => caret_line.push(' '),
                }
                current_col += 1;
            }

            let highlight_len = if span.end_line == span.line {
                span.end_column
                    .saturating_sub(span.column)
                    .saturating_add(1)
            } else {
                display_line.chars().count().saturating_sub(
                    span.column
                        .saturating_sub(1)
                        .min(display_line.chars().count()),
                )
            };

            caret_line.push_str(&"^".repeat(highlight_len.max(1)));
            eprintln!("{}", caret_line);
        }
    }
    if let Some(suggestion) = &diagnostic.suggestion {
        eprintln!("      help: {}", suggestion);
    }
}

#[cfg(test)]
mod tests {
    use super::is_complete_submission;

    #[test]
    fn open_blocks_keep_reading() {
        assert!(!is_complete_submission("if x > 1:\n"));
        assert!(!is_complete_submission("func f(a):\n  return a;\n"));
        assert!(is_complete_submission("func f(a):\n  return a;\nend\n"));
    }

    #[test]
    fn else_if_shares_the_outer_end() {
        let text = "if a:\n  x = 1;\nelse if b:\n  x = 2;\nend\n";
        assert!(is_complete_submission(text));
    }

    #[test]
    fn open_string_keeps_reading() {
        assert!(!is_complete_submission("let s = \"abc\n"));
        assert!(is_complete_submission("let x = 1;\n"));
    }
}
