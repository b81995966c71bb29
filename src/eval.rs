//! Reference evaluation of a parsed expression.
//!
//! Computes the value the generated program would produce, with the same
//! machine semantics: 64-bit two's-complement wrapping for `+ - *`, truncating
//! signed division, and comparisons yielding 0 or 1. Division by zero and
//! `i64::MIN / -1` trap in the generated code, so they have no value here.

use crate::parser::{AstNode, BinaryOp, UnaryOp};

enum Step<'a> {
  Visit(&'a AstNode),
  Unary(UnaryOp),
  Binary(BinaryOp),
}

/// Evaluate `node`, or `None` if the generated program would trap.
///
/// Walks the tree with an explicit value stack, in the same post-order as the
/// code generator.
pub fn evaluate(node: &AstNode) -> Option<i64> {
  let mut work = vec![Step::Visit(node)];
  let mut values = Vec::new();

  while let Some(step) = work.pop() {
    match step {
      Step::Visit(AstNode::Num { value }) => values.push(*value),
      Step::Visit(AstNode::Unary { op, operand }) => {
        work.push(Step::Unary(*op));
        work.push(Step::Visit(operand));
      }
      Step::Visit(AstNode::Binary { op, lhs, rhs }) => {
        work.push(Step::Binary(*op));
        work.push(Step::Visit(rhs));
        work.push(Step::Visit(lhs));
      }
      Step::Unary(op) => {
        let value = values.pop()?;
        values.push(match op {
          UnaryOp::Pos => value,
          UnaryOp::Neg => value.wrapping_neg(),
        });
      }
      Step::Binary(op) => {
        let b = values.pop()?;
        let a = values.pop()?;
        values.push(apply(op, a, b)?);
      }
    }
  }

  values.pop()
}

fn apply(op: BinaryOp, a: i64, b: i64) -> Option<i64> {
  let value = match op {
    BinaryOp::Add => a.wrapping_add(b),
    BinaryOp::Sub => a.wrapping_sub(b),
    BinaryOp::Mul => a.wrapping_mul(b),
    BinaryOp::Div => a.checked_div(b)?,
    BinaryOp::Eq => i64::from(a == b),
    BinaryOp::Ne => i64::from(a != b),
    BinaryOp::Lt => i64::from(a < b),
    BinaryOp::Le => i64::from(a <= b),
    BinaryOp::Gt => i64::from(a > b),
    BinaryOp::Ge => i64::from(a >= b),
  };
  Some(value)
}

/// The status a process observes when the program exits with `value`.
///
/// The kernel keeps only the low eight bits of the `exit` argument; the
/// compiler itself never narrows the value.
pub fn exit_status(value: i64) -> u8 {
  value as u8
}
