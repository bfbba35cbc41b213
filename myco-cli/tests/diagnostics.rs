use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use tempfile::{tempdir, TempDir};

fn myco_cli_binary() -> &'static str {
    env!("CARGO_BIN_EXE_myco-cli")
}

fn write_script(contents: &str) -> (TempDir, PathBuf) {
    let tmp = tempdir().expect("tempdir");
    let script_path = tmp.path().join("script.myco");
    fs::write(&script_path, contents).expect("write script");
    (tmp, script_path)
}

fn run(script_path: &Path, extra_args: &[&str]) -> Output {
    Command::new(myco_cli_binary())
        .args(extra_args)
        .arg(script_path)
        .output()
        .expect("run myco-cli")
}

#[test]
fn clean_file_exits_successfully() {
    let (_tmp, script_path) = write_script(
        "func add(a: Int, b: Int) -> Int:\n  return a + b;\nend\nlet total = add(1, 2);\n",
    );
    let output = run(&script_path, &[]);

    assert!(
        output.status.success(),
        "expected success, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(!stderr.contains("Diagnostics:"), "unexpected diagnostics: {stderr}");
}

#[test]
fn reports_missing_semicolon_with_span() {
    let (_tmp, script_path) = write_script("let x = 5\nlet y = 10;\n");
    let output = run(&script_path, &[]);

    assert!(
        !output.status.success(),
        "expected non-zero exit for a syntax error"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Parse Error at Line 2, Column 1: Missing semicolon (;) at end of statement"),
        "expected semicolon message, got: {stderr}"
    );
    assert!(
        stderr.contains("-->"),
        "expected span reference in diagnostics: {stderr}"
    );
    assert!(
        stderr.contains("let y = 10;"),
        "expected source line in diagnostics: {stderr}"
    );
    assert!(
        stderr.contains("help: Add a semicolon (;) at the end of this statement."),
        "expected suggestion in diagnostics: {stderr}"
    );
    assert!(
        stderr.contains("1 error(s) found in"),
        "expected error summary: {stderr}"
    );
}

#[test]
fn highlights_initializer_type_mismatch() {
    let (_tmp, script_path) = write_script("let x: Int = \"nope\";\n");
    let output = run(&script_path, &[]);

    assert!(
        !output.status.success(),
        "expected non-zero exit for a type mismatch"
    );

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains(
            "Type error at line 1, column 14: Type mismatch in variable initialization: expected Int, found String"
        ),
        "expected mismatch message, got: {stderr}"
    );
    assert!(
        stderr.contains("^"),
        "expected caret highlight: {stderr}"
    );
}

#[test]
fn no_typecheck_skips_type_errors() {
    let (_tmp, script_path) = write_script("let x: Int = \"nope\";\n");
    let output = run(&script_path, &["--no-typecheck"]);

    assert!(
        output.status.success(),
        "expected success without the type checker, stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn json_format_reports_structured_diagnostics() {
    let (_tmp, script_path) = write_script("let x = 5\nlet y: String = 1;\n");
    let output = run(&script_path, &["--format", "json"]);

    assert!(!output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let report: serde_json::Value = serde_json::from_str(&stdout).expect("valid JSON report");

    let diagnostics = report["diagnostics"].as_array().expect("diagnostics array");
    assert_eq!(diagnostics.len(), 2, "unexpected diagnostics: {diagnostics:?}");
    assert_eq!(diagnostics[0]["kind"], "syntax");
    assert_eq!(diagnostics[0]["level"], "error");
    assert_eq!(diagnostics[0]["span"]["line"], 2);
    assert_eq!(diagnostics[1]["kind"], "type");
    assert_eq!(
        diagnostics[1]["message"],
        "Type mismatch in variable initialization: expected String, found Int"
    );

    assert_eq!(report["parse_errors"]["count"], 1);
    assert!(report.get("inference").is_none());
}

#[test]
fn hints_print_inferred_types_with_confidence() {
    let (_tmp, script_path) = write_script("let sum = 1 + 2;\n");
    let output = run(&script_path, &["--hints"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(
        stdout.contains("Int [100%]"),
        "expected a full-confidence Int hint, got: {stdout}"
    );
}

#[test]
fn json_hints_include_inference_results() {
    let (_tmp, script_path) = write_script(
        "func greet(name):\n  return \"Hello, \" + name;\nend\n",
    );
    let output = run(&script_path, &["--format", "json", "--hints"]);

    assert!(output.status.success());
    let report: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("valid JSON report");
    let inference = report["inference"].as_array().expect("inference array");
    assert!(
        inference
            .iter()
            .any(|result| result["type"] == "String" && result["ambiguous"] == true),
        "expected an ambiguous String result: {inference:?}"
    );
}

#[test]
fn emit_ast_prints_the_tree() {
    let (_tmp, script_path) = write_script("let answer = 42;\n");
    let output = run(&script_path, &["--emit", "ast"]);

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("answer"), "expected AST dump, got: {stdout}");
}

#[test]
fn unterminated_string_aborts() {
    let (_tmp, script_path) = write_script("let s = \"open;\n");
    let output = run(&script_path, &[]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Compilation failed"),
        "expected failure context, got: {stderr}"
    );
}

#[test]
fn missing_file_is_reported() {
    let tmp = tempdir().expect("tempdir");
    let output = run(&tmp.path().join("absent.myco"), &[]);

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to read"), "got: {stderr}");
}
