use std::env;
use std::process;

use exprcc::{CodegenOptions, Entry, Syntax, generate_assembly_with};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const USAGE: &str = "[--intel] [--entry=start|main] <expr>";

/// Parsed command line: codegen options plus the single expression.
struct Invocation {
  options: CodegenOptions,
  expr: String,
}

fn parse_args(args: &[String]) -> Option<Invocation> {
  let mut options = CodegenOptions::default();
  let mut expr = None;

  for arg in args {
    match arg.as_str() {
      "--intel" => options.syntax = Syntax::Intel,
      "--entry=start" => options.entry = Entry::Start,
      "--entry=main" => options.entry = Entry::Main,
      // "--10" is a valid expression, so only "--<letter>" is taken as a flag.
      flag
        if flag
          .strip_prefix("--")
          .is_some_and(|rest| rest.starts_with(|c: char| c.is_ascii_alphabetic())) =>
      {
        return None;
      }
      _ if expr.is_some() => return None,
      _ => expr = Some(arg.clone()),
    }
  }

  Some(Invocation {
    options,
    expr: expr?,
  })
}

fn init_logging() {
  let filter = EnvFilter::try_from_env("EXPRCC_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_target(false)
    .with_writer(std::io::stderr)
    .init();
}

fn main() {
  init_logging();

  let args: Vec<String> = env::args().collect();
  let program = args.first().map(String::as_str).unwrap_or("exprcc");
  let Some(invocation) = parse_args(args.get(1..).unwrap_or_default()) else {
    eprintln!("usage: {program} {USAGE}");
    process::exit(1);
  };

  debug!(expr = %invocation.expr, options = ?invocation.options, "compiling");
  match generate_assembly_with(&invocation.expr, &invocation.options) {
    Ok(asm) => print!("{asm}"),
    Err(err) => {
      eprintln!("{err}");
      process::exit(1);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn args(list: &[&str]) -> Vec<String> {
    list.iter().map(|arg| arg.to_string()).collect()
  }

  #[test]
  fn single_expression_uses_defaults() {
    let invocation = parse_args(&args(&["1+2"])).unwrap();
    assert_eq!(invocation.expr, "1+2");
    assert_eq!(invocation.options, CodegenOptions::default());
  }

  #[test]
  fn flags_select_dialect_and_entry() {
    let invocation = parse_args(&args(&["--intel", "--entry=main", "3"])).unwrap();
    assert_eq!(invocation.options.syntax, Syntax::Intel);
    assert_eq!(invocation.options.entry, Entry::Main);
  }

  #[test]
  fn sign_runs_are_expressions_not_flags() {
    assert_eq!(parse_args(&args(&["--10"])).unwrap().expr, "--10");
    assert_eq!(parse_args(&args(&["- -10"])).unwrap().expr, "- -10");
  }

  #[test]
  fn rejects_bad_invocations() {
    assert!(parse_args(&args(&[])).is_none());
    assert!(parse_args(&args(&["1", "2"])).is_none());
    assert!(parse_args(&args(&["--verbose", "1"])).is_none());
  }
}
