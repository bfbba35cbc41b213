use std::io::Write;
use std::process::{Command, Output, Stdio};

fn run_repl(input: &str) -> Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_myco-cli"))
        .arg("repl")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn myco-cli repl");

    child
        .stdin
        .take()
        .expect("repl stdin")
        .write_all(input.as_bytes())
        .expect("write repl input");

    child.wait_with_output().expect("wait for repl")
}

#[test]
fn each_complete_submission_is_checked() {
    let output = run_repl("let x = 1;\nif true:\n  let z = 2;\nend\nexit\n");

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(
        stdout.matches("ok (1 statement(s))").count(),
        2,
        "unexpected output: {stdout}"
    );
}

#[test]
fn errors_are_reported_and_the_session_continues() {
    let output = run_repl("let y: Int = \"s\";\nlet w = 3;\n");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("Type mismatch in variable initialization: expected Int, found String"),
        "expected type error, got: {stderr}"
    );
    assert!(stderr.contains("<repl>"), "expected snippet label: {stderr}");

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout.trim(), "ok (1 statement(s))");
}

#[test]
fn unfinished_block_is_checked_at_end_of_input() {
    let output = run_repl("while true:\n  let n = 1;\n");

    assert!(output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("'end'"),
        "expected a missing 'end' error, got: {stderr}"
    );
}

#[test]
fn quit_stops_reading() {
    let output = run_repl("quit\nlet x = 1;\n");

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).trim().is_empty());
}
