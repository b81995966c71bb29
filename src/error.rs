//! Shared error utilities used across the compilation pipeline.
//!
//! Diagnostics are kept lightweight on purpose: every user-facing error quotes
//! the input and points at the offending byte with a caret, in the style of
//! chibicc. Nothing is recovered; the first error aborts the compilation.

use std::fmt;

use snafu::Snafu;

pub type CompileResult<T> = Result<T, CompileError>;

/// Coarse classification of a [`CompileError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  Lex,
  Syntax,
  Internal,
}

/// A byte offset into the input together with its pre-rendered caret line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLoc {
  pub offset: usize,
  expr_line: String,
  marker: String,
}

impl SourceLoc {
  pub fn new(expr: &str, offset: usize) -> Self {
    let expr_line = format!("'{expr}'");
    let safe_loc = offset.min(expr.len());
    let char_offset = expr[..safe_loc].chars().count() + 1; // account for opening quote
    let marker = format!("{}^", " ".repeat(char_offset));
    Self {
      offset,
      expr_line,
      marker,
    }
  }
}

impl fmt::Display for SourceLoc {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}\n{}", self.expr_line, self.marker)
  }
}

#[derive(Debug, Snafu)]
pub enum CompileError {
  #[snafu(display("{at} invalid token: '{ch}'"))]
  InvalidChar { ch: char, at: SourceLoc },

  #[snafu(display("{at} number out of range: {text}"))]
  NumberOutOfRange { text: String, at: SourceLoc },

  #[snafu(display("{at} expected {expected}, but got \"{found}\""))]
  Unexpected {
    expected: String,
    found: String,
    at: SourceLoc,
  },

  #[snafu(display("internal error: {message}"))]
  Internal { message: String },
}

impl CompileError {
  /// A character that does not start any token.
  pub fn invalid_char(expr: &str, loc: usize, ch: char) -> Self {
    InvalidCharSnafu {
      ch,
      at: SourceLoc::new(expr, loc),
    }
    .build()
  }

  /// A run of digits too large for a 64-bit signed integer.
  pub fn number_out_of_range(expr: &str, loc: usize, text: impl Into<String>) -> Self {
    NumberOutOfRangeSnafu {
      text,
      at: SourceLoc::new(expr, loc),
    }
    .build()
  }

  /// The token at `loc` does not fit the grammar.
  pub fn unexpected(
    expr: &str,
    loc: usize,
    expected: impl Into<String>,
    found: impl Into<String>,
  ) -> Self {
    UnexpectedSnafu {
      expected,
      found,
      at: SourceLoc::new(expr, loc),
    }
    .build()
  }

  pub fn internal(message: impl Into<String>) -> Self {
    InternalSnafu { message }.build()
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::InvalidChar { .. } | Self::NumberOutOfRange { .. } => ErrorKind::Lex,
      Self::Unexpected { .. } => ErrorKind::Syntax,
      Self::Internal { .. } => ErrorKind::Internal,
    }
  }

  /// Byte offset of the offending input, if the error has one.
  pub fn loc(&self) -> Option<usize> {
    match self {
      Self::InvalidChar { at, .. }
      | Self::NumberOutOfRange { at, .. }
      | Self::Unexpected { at, .. } => Some(at.offset),
      Self::Internal { .. } => None,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn caret_points_at_offending_byte() {
    let err = CompileError::invalid_char("1 + a", 4, 'a');
    assert_eq!(err.to_string(), "'1 + a'\n     ^ invalid token: 'a'");
  }

  #[test]
  fn caret_counts_characters_not_bytes() {
    let err = CompileError::invalid_char("é#", 2, '#');
    assert_eq!(err.to_string(), "'é#'\n  ^ invalid token: '#'");
  }

  #[test]
  fn syntax_error_reports_expected_and_found() {
    let err = CompileError::unexpected("(1", 2, "\")\"", "EOF");
    assert_eq!(err.kind(), ErrorKind::Syntax);
    assert_eq!(err.loc(), Some(2));
    assert_eq!(err.to_string(), "'(1'\n   ^ expected \")\", but got \"EOF\"");
  }

  #[test]
  fn internal_errors_have_no_location() {
    let err = CompileError::internal("stack depth 2 after walk");
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert_eq!(err.loc(), None);
    assert_eq!(err.to_string(), "internal error: stack depth 2 after walk");
  }
}
