//! Recursive-descent parser producing a single expression AST.
//!
//! The parser mirrors the classic chibicc structure: one helper per
//! precedence level, loosest first. Every binary level folds left to right in
//! a loop, so parse depth grows with parenthesis nesting only, never with the
//! length of an operator chain.

use std::{fmt, mem};

use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::tokenizer::{Token, TokenKind, describe_token};

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Pos,
  Neg,
}

/// Binary operators recognised by the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Eq,
  Ne,
  Lt,
  Le,
  Gt,
  Ge,
}

impl UnaryOp {
  pub fn symbol(self) -> &'static str {
    match self {
      Self::Pos => "+",
      Self::Neg => "-",
    }
  }
}

impl BinaryOp {
  pub fn symbol(self) -> &'static str {
    match self {
      Self::Add => "+",
      Self::Sub => "-",
      Self::Mul => "*",
      Self::Div => "/",
      Self::Eq => "==",
      Self::Ne => "!=",
      Self::Lt => "<",
      Self::Le => "<=",
      Self::Gt => ">",
      Self::Ge => ">=",
    }
  }
}

/// Expression tree produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AstNode {
  Num {
    value: i64,
  },
  Unary {
    op: UnaryOp,
    operand: Box<AstNode>,
  },
  Binary {
    op: BinaryOp,
    lhs: Box<AstNode>,
    rhs: Box<AstNode>,
  },
}

impl AstNode {
  pub fn number(value: i64) -> Self {
    Self::Num { value }
  }

  pub fn unary(op: UnaryOp, operand: AstNode) -> Self {
    Self::Unary {
      op,
      operand: Box::new(operand),
    }
  }

  pub fn binary(op: BinaryOp, lhs: AstNode, rhs: AstNode) -> Self {
    Self::Binary {
      op,
      lhs: Box::new(lhs),
      rhs: Box::new(rhs),
    }
  }
}

/// Children are detached onto a work list before they drop, so a long
/// operator chain is freed without recursing once per node.
impl Drop for AstNode {
  fn drop(&mut self) {
    let mut pending = Vec::new();
    self.detach_children(&mut pending);
    while let Some(mut node) = pending.pop() {
      node.detach_children(&mut pending);
    }
  }
}

impl AstNode {
  fn detach_children(&mut self, pending: &mut Vec<AstNode>) {
    match self {
      Self::Num { .. } => {}
      Self::Unary { operand, .. } => pending.push(mem::replace(&mut **operand, Self::number(0))),
      Self::Binary { lhs, rhs, .. } => {
        pending.push(mem::replace(&mut **lhs, Self::number(0)));
        pending.push(mem::replace(&mut **rhs, Self::number(0)));
      }
    }
  }
}

enum Piece<'a> {
  Node(&'a AstNode),
  Text(&'static str),
}

/// S-expression rendering, e.g. `(+ 5 (* 6 7))`.
impl fmt::Display for AstNode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let mut work = vec![Piece::Node(self)];
    while let Some(piece) = work.pop() {
      match piece {
        Piece::Text(text) => f.write_str(text)?,
        Piece::Node(Self::Num { value }) => write!(f, "{value}")?,
        Piece::Node(Self::Unary { op, operand }) => {
          write!(f, "({} ", op.symbol())?;
          work.push(Piece::Text(")"));
          work.push(Piece::Node(operand));
        }
        Piece::Node(Self::Binary { op, lhs, rhs }) => {
          write!(f, "({} ", op.symbol())?;
          work.push(Piece::Text(")"));
          work.push(Piece::Node(rhs));
          work.push(Piece::Text(" "));
          work.push(Piece::Node(lhs));
        }
      }
    }
    Ok(())
  }
}

/// Parse a whole expression from the token stream.
pub fn parse(tokens: Vec<Token>, source: &str) -> CompileResult<AstNode> {
  let mut stream = TokenStream::new(tokens, source);

  let node = parse_expr(&mut stream)?;

  if !stream.is_eof() {
    let (loc, got) = stream.describe_current();
    return Err(CompileError::unexpected(source, loc, "end of input", got));
  }

  debug!(ast = %node, "parsed expression");
  Ok(node)
}

fn parse_expr(stream: &mut TokenStream) -> CompileResult<AstNode> {
  parse_equality(stream)
}

fn parse_equality(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_relational(stream)?;

  loop {
    let op = match stream.peek_kind() {
      Some(TokenKind::EqEq) => BinaryOp::Eq,
      Some(TokenKind::Ne) => BinaryOp::Ne,
      _ => break,
    };

    stream.advance();
    let rhs = parse_relational(stream)?;
    node = AstNode::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_relational(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_add(stream)?;

  loop {
    let op = match stream.peek_kind() {
      Some(TokenKind::Lt) => BinaryOp::Lt,
      Some(TokenKind::Le) => BinaryOp::Le,
      Some(TokenKind::Gt) => BinaryOp::Gt,
      Some(TokenKind::Ge) => BinaryOp::Ge,
      _ => break,
    };

    stream.advance();
    let rhs = parse_add(stream)?;
    node = AstNode::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_add(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_mul(stream)?;

  loop {
    let op = match stream.peek_kind() {
      Some(TokenKind::Plus) => BinaryOp::Add,
      Some(TokenKind::Minus) => BinaryOp::Sub,
      _ => break,
    };

    stream.advance();
    let rhs = parse_mul(stream)?;
    node = AstNode::binary(op, node, rhs);
  }

  Ok(node)
}

fn parse_mul(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut node = parse_unary(stream)?;

  loop {
    let op = match stream.peek_kind() {
      Some(TokenKind::Star) => BinaryOp::Mul,
      Some(TokenKind::Slash) => BinaryOp::Div,
      _ => break,
    };

    stream.advance();
    let rhs = parse_unary(stream)?;
    node = AstNode::binary(op, node, rhs);
  }

  Ok(node)
}

/// `unary := ("+" | "-")? unary | primary`
///
/// The sign run is collected in a loop and the nodes are wrapped innermost
/// first, so a long run of signs does not recurse.
fn parse_unary(stream: &mut TokenStream) -> CompileResult<AstNode> {
  let mut signs = Vec::new();
  loop {
    if stream.equal(TokenKind::Plus) {
      signs.push(UnaryOp::Pos);
    } else if stream.equal(TokenKind::Minus) {
      signs.push(UnaryOp::Neg);
    } else {
      break;
    }
  }

  let mut node = parse_primary(stream)?;
  for op in signs.into_iter().rev() {
    node = AstNode::unary(op, node);
  }
  Ok(node)
}

fn parse_primary(stream: &mut TokenStream) -> CompileResult<AstNode> {
  if stream.peek_kind() == Some(TokenKind::LParen) {
    if stream.depth == MAX_NESTING {
      let (loc, got) = stream.describe_current();
      return Err(CompileError::unexpected(
        stream.source,
        loc,
        format!("at most {MAX_NESTING} nested parentheses"),
        got,
      ));
    }
    stream.advance();
    stream.depth += 1;
    let node = parse_expr(stream)?;
    stream.skip(TokenKind::RParen, "\")\"")?;
    stream.depth -= 1;
    return Ok(node);
  }

  let value = stream.get_number()?;
  Ok(AstNode::number(value))
}

/// Parenthesis nesting is the one place parsing recurses.
pub const MAX_NESTING: usize = 256;

/// Lightweight cursor over the token vector.
struct TokenStream<'a> {
  tokens: Vec<Token>,
  source: &'a str,
  pos: usize,
  depth: usize,
}

impl<'a> TokenStream<'a> {
  /// Take ownership of the token stream; the parser will advance `pos` as it consumes input.
  fn new(tokens: Vec<Token>, source: &'a str) -> Self {
    Self {
      tokens,
      source,
      pos: 0,
      depth: 0,
    }
  }

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos)
  }

  fn peek_kind(&self) -> Option<TokenKind> {
    self.peek().map(|token| token.kind)
  }

  fn advance(&mut self) {
    if self.pos < self.tokens.len() {
      self.pos += 1;
    }
  }

  /// Consume the current token if it has the given kind.
  fn equal(&mut self, kind: TokenKind) -> bool {
    if self.peek_kind() == Some(kind) {
      self.pos += 1;
      return true;
    }
    false
  }

  fn skip(&mut self, kind: TokenKind, expected: &str) -> CompileResult<()> {
    if self.equal(kind) {
      return Ok(());
    }
    let (loc, got) = self.describe_current();
    Err(CompileError::unexpected(self.source, loc, expected, got))
  }

  /// Location and rendering of the current token, for diagnostics.
  fn describe_current(&self) -> (usize, String) {
    match self.peek() {
      Some(token) => (token.loc, describe_token(Some(token), self.source)),
      None => (self.source.len(), "EOF".to_string()),
    }
  }

  /// Parse the current token as an integer literal.
  fn get_number(&mut self) -> CompileResult<i64> {
    if let Some(token) = self.peek()
      && token.kind == TokenKind::Num
    {
      let value = token.value.ok_or_else(|| {
        CompileError::internal(format!("numeric token at {} missing value", token.loc))
      })?;
      self.pos += 1;
      return Ok(value);
    }

    let (loc, got) = self.describe_current();
    Err(CompileError::unexpected(self.source, loc, "a number", got))
  }

  fn is_eof(&self) -> bool {
    matches!(self.peek_kind(), Some(TokenKind::Eof) | None)
  }
}
