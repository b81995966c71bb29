use std::process::{Command, Output};

fn exprcc(args: &[&str]) -> Output {
  Command::new(env!("CARGO_BIN_EXE_exprcc"))
    .args(args)
    .env_remove("EXPRCC_LOG")
    .output()
    .expect("failed to run exprcc")
}

#[test]
fn success_writes_assembly_to_stdout() {
  let output = exprcc(&["5+6*7"]);
  assert!(output.status.success());
  assert!(output.stderr.is_empty());
  let asm = String::from_utf8(output.stdout).unwrap();
  assert!(asm.contains(".global _start\n_start:\n"));
  assert!(asm.contains("    imul %rdi, %rax\n"));
}

#[test]
fn compiling_twice_is_byte_identical() {
  let first = exprcc(&[" 12 + 34 - 5 "]);
  let second = exprcc(&[" 12 + 34 - 5 "]);
  assert!(first.status.success());
  assert_eq!(first.stdout, second.stdout);
}

#[test]
fn flags_reach_the_code_generator() {
  let output = exprcc(&["--intel", "--entry=main", "1"]);
  assert!(output.status.success());
  let asm = String::from_utf8(output.stdout).unwrap();
  assert!(asm.starts_with(".intel_syntax noprefix\n"));
  assert!(asm.contains("main:\n"));
}

#[test]
fn lex_error_emits_no_assembly() {
  let output = exprcc(&["1 + a"]);
  assert_eq!(output.status.code(), Some(1));
  assert!(output.stdout.is_empty());
  let stderr = String::from_utf8(output.stderr).unwrap();
  assert!(stderr.contains("'1 + a'"));
  assert!(stderr.contains("^ invalid token: 'a'"));
}

#[test]
fn syntax_errors_emit_no_assembly() {
  for expr in ["(1+2", "1+2)", "1 2", "", "1+"] {
    let output = exprcc(&[expr]);
    assert_eq!(output.status.code(), Some(1), "{expr:?}");
    assert!(output.stdout.is_empty(), "{expr:?}");
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("expected"), "{expr:?}: {stderr}");
  }
}

#[test]
fn wrong_argument_count_prints_usage() {
  for args in [&[][..], &["1", "2"][..]] {
    let output = exprcc(args);
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8(output.stderr).unwrap().contains("usage:"));
  }
}

#[test]
fn long_operator_chain_compiles() {
  // Stays under the kernel's 128 KiB limit for a single argument.
  let expr = vec!["1"; 50_000].join("+");
  let output = exprcc(&[&expr]);
  assert!(output.status.success());
  let asm = String::from_utf8(output.stdout).unwrap();
  assert!(asm.ends_with(".section .note.GNU-stack,\"\",@progbits\n"));
}

#[test]
fn deep_parenthesis_nesting_is_a_syntax_error() {
  let expr = format!("{}1{}", "(".repeat(30_000), ")".repeat(30_000));
  let output = exprcc(&[&expr]);
  assert_eq!(output.status.code(), Some(1));
  assert!(output.stdout.is_empty());
  let stderr = String::from_utf8(output.stderr).unwrap();
  assert!(stderr.contains("expected at most 256 nested parentheses"));
}
