use std::path::PathBuf;

use myco_compiler::{
    Block, DiagnosticKind, Diagnostics, Lexer, ParseErrorRecord, Parser, ParserOptions,
    SourceFile, SourceId, StatementKind, DEFAULT_MAX_DEPTH,
};

struct Parsed {
    block: Block,
    record: ParseErrorRecord,
    diagnostics: Diagnostics,
}

fn parse_with(source: &str, options: ParserOptions) -> Parsed {
    let source_file = SourceFile::new(SourceId(0), PathBuf::from("test.myco"), source.to_string());
    let tokens = Lexer::new(&source_file).tokenize().expect("lex source");
    let mut parser = Parser::with_options(&source_file, tokens, options);
    let block = parser.parse_program();
    let record = parser.error_record().clone();
    Parsed {
        block,
        record,
        diagnostics: parser.into_diagnostics(),
    }
}

fn parse(source: &str) -> Parsed {
    parse_with(source, ParserOptions::default())
}

/// Deeply nested input recurses far; give it room regardless of the test
/// harness's thread stack size.
fn with_large_stack<T: Send + 'static>(f: impl FnOnce() -> T + Send + 'static) -> T {
    std::thread::Builder::new()
        .stack_size(64 * 1024 * 1024)
        .spawn(f)
        .expect("spawn parser thread")
        .join()
        .expect("parser thread panicked")
}

#[test]
fn missing_semicolon_reports_once_and_keeps_next_statement() {
    let parsed = parse("let x = 5\nlet y = 10;\n");
    assert_eq!(parsed.record.count, 1);
    assert_eq!(parsed.block.len(), 2);

    let message = parsed.record.message.as_deref().expect("error message");
    assert!(
        message.contains("Missing semicolon (;) at end of statement"),
        "unexpected message: {message}"
    );
    assert_eq!(parsed.record.line, 2);
    assert_eq!(parsed.record.column, 1);

    let StatementKind::Let(second) = &parsed.block.statements[1].kind else {
        panic!("expected second let");
    };
    assert_eq!(second.name, "y");
}

#[test]
fn missing_semicolon_before_statement_on_same_line() {
    let parsed = parse("let x = 5 let y = 10;\n");
    assert_eq!(parsed.record.count, 1);
    assert_eq!(parsed.block.len(), 2);
}

#[test]
fn junk_after_expression_is_skipped_to_the_semicolon() {
    let parsed = parse("let x = 5 6;\nlet y = 1;\n");
    assert_eq!(parsed.record.count, 1);
    assert_eq!(parsed.block.len(), 2);
}

#[test]
fn semicolon_diagnostic_carries_a_suggestion() {
    let parsed = parse("print(1)\nprint(2);\n");
    let diagnostic = &parsed.diagnostics.entries()[0];
    assert_eq!(diagnostic.kind, DiagnosticKind::Syntax);
    assert!(diagnostic.suggestion.is_some());
    assert!(diagnostic
        .to_string()
        .starts_with("Parse Error at Line 2, Column 1:"));
}

#[test]
fn failed_statement_is_dropped_and_parsing_resumes() {
    let parsed = parse("let = 5;\nlet ok = 1;\n");
    assert_eq!(parsed.record.count, 1);
    assert_eq!(parsed.block.len(), 1);
    assert!(parsed
        .record
        .message
        .as_deref()
        .is_some_and(|message| message.starts_with("Expected variable name")));
}

#[test]
fn invalid_assignment_target_is_reported() {
    let parsed = parse("1 = 2;\nlet a = 1;\n");
    assert_eq!(parsed.record.count, 1);
    assert_eq!(parsed.block.len(), 1);
    assert!(parsed
        .record
        .message
        .as_deref()
        .is_some_and(|message| message.contains("Invalid assignment target")));
}

#[test]
fn missing_end_keeps_the_construct() {
    let parsed = parse("func f():\n  return 1;\n");
    assert_eq!(parsed.record.count, 1);
    assert!(matches!(
        parsed.block.statements.first().map(|statement| &statement.kind),
        Some(StatementKind::Function(_))
    ));
    assert!(parsed
        .record
        .message
        .as_deref()
        .is_some_and(|message| message.contains("Expected 'end' to close function")));
}

#[test]
fn bad_class_member_is_skipped() {
    let parsed = parse("class A:\n  42;\n  let x = 1\nend\n");
    assert_eq!(parsed.record.count, 1);
    let StatementKind::Class(class) = &parsed.block.statements[0].kind else {
        panic!("expected class");
    };
    assert_eq!(class.fields.len(), 1);
}

#[test]
fn multiple_errors_accumulate() {
    let parsed = parse("let = 1;\nlet b = (2;\nlet c = 3;\n");
    assert!(parsed.record.count >= 2, "got {:?}", parsed.record);
    assert!(parsed.block.statements.iter().any(|statement| matches!(
        &statement.kind,
        StatementKind::Let(let_stmt) if let_stmt.name == "c"
    )));
}

#[test]
fn pathological_input_terminates() {
    let source = "( [ { ) ] } = , . : end else case => ** ".repeat(500);
    let parsed = parse(&source);
    assert!(parsed.record.count > 0);
    assert!(parsed.record.count <= 3 * source.split_whitespace().count());
}

#[test]
fn stray_block_keywords_terminate() {
    let parsed = parse("end end else catch finally root\nlet x = 1;\n");
    assert!(parsed.record.count > 0);
    assert!(parsed.block.statements.iter().any(|statement| matches!(
        &statement.kind,
        StatementKind::Let(let_stmt) if let_stmt.name == "x"
    )));
}

#[test]
fn depth_guard_rejects_deep_nesting() {
    let depth = 40;
    let source = format!("{}1{};\n", "(".repeat(depth), ")".repeat(depth));
    let parsed = parse_with(&source, ParserOptions { max_depth: 16 });
    assert!(parsed
        .diagnostics
        .entries()
        .iter()
        .any(|diagnostic| diagnostic.message.contains("Maximum nesting depth exceeded")));
}

#[test]
fn default_depth_guard_handles_runaway_nesting() {
    let parsed = with_large_stack(|| {
        let depth = 10_000;
        let source = format!("let x = {}1{};\n", "[".repeat(depth), "]".repeat(depth));
        let parsed = parse(&source);
        (parsed.record.count, parsed.diagnostics.entries().len())
    });
    assert!(parsed.0 > 0);
    assert!(parsed.1 > 0);
}

#[test]
fn nesting_within_the_limit_parses_cleanly() {
    let count = with_large_stack(|| {
        let depth = DEFAULT_MAX_DEPTH / 4;
        let source = format!("let x = {}1{};\n", "(".repeat(depth), ")".repeat(depth));
        parse(&source).record.count
    });
    assert_eq!(count, 0);
}
