//! Lexical analysis: turns the raw input string into a vector of tokens.
//!
//! The tokenizer is intentionally tiny: it knows nothing about semantics
//! beyond recognising operators and numeric literals. Two-character
//! punctuators are matched before single-character ones to avoid ambiguity.

use tracing::trace;

use crate::error::{CompileError, CompileResult};

/// Kinds of tokens recognised by the front-end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  Num,
  Plus,
  Minus,
  Star,
  Slash,
  LParen,
  RParen,
  EqEq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
  Eof,
}

const TWO_CHAR_PUNCTS: [(&str, TokenKind); 4] = [
  ("==", TokenKind::EqEq),
  ("!=", TokenKind::Ne),
  ("<=", TokenKind::Le),
  (">=", TokenKind::Ge),
];

/// Thin wrapper for lexical information needed by later stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
  pub kind: TokenKind,
  pub value: Option<i64>,
  pub loc: usize,
  pub len: usize,
}

impl Token {
  /// Convenience constructor to keep the `tokenize` loop readable.
  pub fn new(kind: TokenKind, loc: usize, len: usize, value: Option<i64>) -> Self {
    Self {
      kind,
      value,
      loc,
      len,
    }
  }
}

fn single_char_kind(c: u8) -> Option<TokenKind> {
  let kind = match c {
    b'+' => TokenKind::Plus,
    b'-' => TokenKind::Minus,
    b'*' => TokenKind::Star,
    b'/' => TokenKind::Slash,
    b'(' => TokenKind::LParen,
    b')' => TokenKind::RParen,
    b'<' => TokenKind::Lt,
    b'>' => TokenKind::Gt,
    _ => return None,
  };
  Some(kind)
}

/// Lex the input into a flat vector of tokens terminated by an `Eof` marker.
pub fn tokenize(input: &str) -> CompileResult<Vec<Token>> {
  let mut tokens = Vec::new();
  let bytes = input.as_bytes();
  let mut i = 0;

  while i < bytes.len() {
    let c = bytes[i];
    if c.is_ascii_whitespace() {
      i += 1;
      continue;
    }

    if c.is_ascii_digit() {
      let start = i;
      i += 1;
      while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
      }
      let text = &input[start..i];
      let value = text
        .parse::<i64>()
        .map_err(|_| CompileError::number_out_of_range(input, start, text))?;
      tokens.push(Token::new(TokenKind::Num, start, i - start, Some(value)));
      continue;
    }

    if let Some((op, kind)) = TWO_CHAR_PUNCTS
      .into_iter()
      .find(|(op, _)| input[i..].starts_with(op))
    {
      tokens.push(Token::new(kind, i, op.len(), None));
      i += op.len();
      continue;
    }

    if let Some(kind) = single_char_kind(c) {
      tokens.push(Token::new(kind, i, 1, None));
      i += 1;
      continue;
    }

    let invalid_char = input[i..].chars().next().unwrap_or('\0');
    return Err(CompileError::invalid_char(input, i, invalid_char));
  }

  tokens.push(Token::new(TokenKind::Eof, input.len(), 0, None));
  trace!(count = tokens.len(), "tokenized input");
  Ok(tokens)
}

/// Return the slice from the source that produced this token.
pub fn token_text<'a>(token: &Token, source: &'a str) -> &'a str {
  let end = token.loc + token.len;
  &source[token.loc..end]
}

/// Human-friendly description used in diagnostics.
pub fn describe_token(token: Option<&Token>, source: &str) -> String {
  match token {
    Some(t) => match t.kind {
      TokenKind::Eof => "EOF".to_string(),
      _ => token_text(t, source).to_string(),
    },
    None => "EOF".to_string(),
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::ErrorKind;

  fn kinds(input: &str) -> Vec<TokenKind> {
    tokenize(input)
      .unwrap()
      .into_iter()
      .map(|token| token.kind)
      .collect()
  }

  #[test]
  fn empty_input_is_just_eof() {
    let tokens = tokenize("   ").unwrap();
    assert_eq!(tokens, vec![Token::new(TokenKind::Eof, 3, 0, None)]);
  }

  #[test]
  fn numbers_are_maximal_munch() {
    let tokens = tokenize(" 123+4").unwrap();
    assert_eq!(tokens[0], Token::new(TokenKind::Num, 1, 3, Some(123)));
    assert_eq!(tokens[1].kind, TokenKind::Plus);
    assert_eq!(tokens[2], Token::new(TokenKind::Num, 5, 1, Some(4)));
    assert_eq!(tokens[3].kind, TokenKind::Eof);
  }

  #[test]
  fn recognises_every_operator() {
    use TokenKind::*;
    assert_eq!(
      kinds("+ - * / ( ) == != < <= > >="),
      vec![Plus, Minus, Star, Slash, LParen, RParen, EqEq, Ne, Lt, Le, Gt, Ge, Eof]
    );
  }

  #[test]
  fn two_char_operators_win_over_single() {
    use TokenKind::*;
    assert_eq!(kinds("1<=2"), vec![Num, Le, Num, Eof]);
    assert_eq!(kinds("1< 2"), vec![Num, Lt, Num, Eof]);
    assert_eq!(kinds("1>>=2"), vec![Num, Gt, Ge, Num, Eof]);
  }

  #[test]
  fn token_text_slices_source() {
    let source = "12 >= 3";
    let tokens = tokenize(source).unwrap();
    assert_eq!(token_text(&tokens[1], source), ">=");
    assert_eq!(describe_token(tokens.last(), source), "EOF");
    assert_eq!(describe_token(None, source), "EOF");
  }

  #[test]
  fn rejects_unknown_character() {
    let err = tokenize("1 + x").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lex);
    assert_eq!(err.loc(), Some(4));
    assert!(matches!(err, CompileError::InvalidChar { ch: 'x', .. }));
  }

  #[test]
  fn lone_assign_and_bang_are_invalid() {
    assert!(matches!(
      tokenize("1 = 1").unwrap_err(),
      CompileError::InvalidChar { ch: '=', .. }
    ));
    assert!(matches!(
      tokenize("!1").unwrap_err(),
      CompileError::InvalidChar { ch: '!', .. }
    ));
  }

  #[test]
  fn rejects_non_ascii_character() {
    let err = tokenize("1+λ").unwrap_err();
    assert!(matches!(err, CompileError::InvalidChar { ch: 'λ', .. }));
    assert_eq!(err.loc(), Some(2));
  }

  #[test]
  fn literal_too_large_for_i64_is_a_lex_error() {
    let err = tokenize("99999999999999999999").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Lex);
    assert!(matches!(err, CompileError::NumberOutOfRange { .. }));
  }

  #[test]
  fn largest_i64_literal_is_accepted() {
    let tokens = tokenize("9223372036854775807").unwrap();
    assert_eq!(tokens[0].value, Some(i64::MAX));
  }
}
