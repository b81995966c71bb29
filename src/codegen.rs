//! Code generation: lower the parsed AST into x86-64 assembly.
//!
//! The emitter uses a simple stack machine: every sub-expression leaves a
//! single value on the hardware stack, and operators pop their operands into
//! `%rax`/`%rdi` and push the result back. The final value becomes the process
//! exit status, so only its low eight bits are observable once the program runs.

use tracing::debug;

use crate::error::{CompileError, CompileResult};
use crate::parser::{AstNode, BinaryOp, UnaryOp};

/// Assembler dialect of the emitted text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Syntax {
  /// GNU AT&T syntax, `op %src, %dst`.
  #[default]
  Att,
  /// `.intel_syntax noprefix`, `op dst, src`.
  Intel,
}

/// How the program hands its result to the operating system.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Entry {
  /// Freestanding `_start` that calls the Linux `exit` syscall directly.
  #[default]
  Start,
  /// A `main` function returning the value, for linking with the C runtime.
  Main,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodegenOptions {
  pub syntax: Syntax,
  pub entry: Entry,
}

const SYS_EXIT: i64 = 60;

/// Emit a complete assembly program for an expression.
pub fn generate(node: &AstNode, options: &CodegenOptions) -> CompileResult<String> {
  let mut emitter = Emitter::new(options.syntax);

  if options.syntax == Syntax::Intel {
    emitter.directive(".intel_syntax noprefix");
  }
  let symbol = match options.entry {
    Entry::Start => "_start",
    Entry::Main => "main",
  };
  emitter.directive(".text");
  emitter.directive(&format!(".global {symbol}"));
  emitter.label(symbol);

  emitter.emit_expr(node)?;

  if emitter.depth != 1 {
    return Err(CompileError::internal(format!(
      "evaluation stack holds {} values after the walk, expected 1",
      emitter.depth
    )));
  }

  match options.entry {
    Entry::Start => {
      emitter.pop(Reg::Rdi)?;
      emitter.mov_imm(Reg::Rax, SYS_EXIT);
      emitter.op0("syscall");
    }
    Entry::Main => {
      emitter.pop(Reg::Rax)?;
      emitter.op0("ret");
    }
  }
  emitter.directive(".section .note.GNU-stack,\"\",@progbits");

  debug!(
    lines = emitter.asm.lines().count(),
    syntax = ?options.syntax,
    entry = ?options.entry,
    "generated assembly"
  );
  Ok(emitter.asm)
}

#[derive(Debug, Clone, Copy)]
enum Reg {
  Rax,
  Rdi,
  Eax,
  Al,
}

impl Reg {
  fn name(self) -> &'static str {
    match self {
      Self::Rax => "rax",
      Self::Rdi => "rdi",
      Self::Eax => "eax",
      Self::Al => "al",
    }
  }
}

/// Pending work in the post-order walk.
enum Step<'a> {
  Visit(&'a AstNode),
  Negate,
  Apply(BinaryOp),
}

/// Accumulates assembly text and tracks how many values the expression
/// evaluation has left on the stack.
struct Emitter {
  asm: String,
  syntax: Syntax,
  depth: usize,
}

impl Emitter {
  fn new(syntax: Syntax) -> Self {
    Self {
      asm: String::new(),
      syntax,
      depth: 0,
    }
  }

  fn reg(&self, reg: Reg) -> String {
    match self.syntax {
      Syntax::Att => format!("%{}", reg.name()),
      Syntax::Intel => reg.name().to_string(),
    }
  }

  fn directive(&mut self, text: &str) {
    self.asm.push_str(text);
    self.asm.push('\n');
  }

  fn label(&mut self, name: &str) {
    self.asm.push_str(&format!("{name}:\n"));
  }

  fn op0(&mut self, mnemonic: &str) {
    self.asm.push_str(&format!("    {mnemonic}\n"));
  }

  fn op1(&mut self, mnemonic: &str, reg: Reg) {
    let reg = self.reg(reg);
    self.asm.push_str(&format!("    {mnemonic} {reg}\n"));
  }

  /// Two-operand instruction; operand order follows the dialect.
  fn op2(&mut self, mnemonic: &str, dst: Reg, src: Reg) {
    let (dst, src) = (self.reg(dst), self.reg(src));
    let line = match self.syntax {
      Syntax::Att => format!("    {mnemonic} {src}, {dst}\n"),
      Syntax::Intel => format!("    {mnemonic} {dst}, {src}\n"),
    };
    self.asm.push_str(&line);
  }

  fn mov_imm(&mut self, dst: Reg, value: i64) {
    let dst = self.reg(dst);
    let line = match self.syntax {
      Syntax::Att => format!("    mov ${value}, {dst}\n"),
      Syntax::Intel => format!("    mov {dst}, {value}\n"),
    };
    self.asm.push_str(&line);
  }

  fn push(&mut self, reg: Reg) {
    self.op1("push", reg);
    self.depth += 1;
  }

  fn pop(&mut self, reg: Reg) -> CompileResult<()> {
    self.depth = self
      .depth
      .checked_sub(1)
      .ok_or_else(|| CompileError::internal("evaluation stack underflow"))?;
    self.op1("pop", reg);
    Ok(())
  }

  /// `%al` holds a flag; widen it to 0 or 1 in `%rax`.
  fn zero_extend_flag(&mut self) {
    let mnemonic = match self.syntax {
      Syntax::Att => "movzbl",
      Syntax::Intel => "movzx",
    };
    self.op2(mnemonic, Reg::Eax, Reg::Al);
  }

  /// Emit stack-based code for an expression tree.
  ///
  /// The post-order walk runs on an explicit work list, so a long operator
  /// chain (a left-deep tree) costs heap, not native stack.
  fn emit_expr(&mut self, root: &AstNode) -> CompileResult<()> {
    let mut work = vec![Step::Visit(root)];

    while let Some(step) = work.pop() {
      match step {
        Step::Visit(AstNode::Num { value }) => {
          self.mov_imm(Reg::Rax, *value);
          self.push(Reg::Rax);
        }
        Step::Visit(node @ AstNode::Unary { .. }) => {
          // Fold a run of signs into at most one negation.
          let mut negate = false;
          let mut inner = node;
          while let AstNode::Unary { op, operand } = inner {
            if *op == UnaryOp::Neg {
              negate = !negate;
            }
            inner = &**operand;
          }
          if negate {
            work.push(Step::Negate);
          }
          work.push(Step::Visit(inner));
        }
        Step::Visit(AstNode::Binary { op, lhs, rhs }) => {
          work.push(Step::Apply(*op));
          work.push(Step::Visit(rhs));
          work.push(Step::Visit(lhs));
        }
        Step::Negate => {
          self.pop(Reg::Rax)?;
          self.op1("neg", Reg::Rax);
          self.push(Reg::Rax);
        }
        Step::Apply(op) => {
          self.pop(Reg::Rdi)?;
          self.pop(Reg::Rax)?;
          self.emit_binary(op);
          self.push(Reg::Rax);
        }
      }
    }
    Ok(())
  }

  /// Apply `op` to `%rax` (left) and `%rdi` (right), leaving the result in `%rax`.
  fn emit_binary(&mut self, op: BinaryOp) {
    match op {
      BinaryOp::Add => self.op2("add", Reg::Rax, Reg::Rdi),
      BinaryOp::Sub => self.op2("sub", Reg::Rax, Reg::Rdi),
      BinaryOp::Mul => self.op2("imul", Reg::Rax, Reg::Rdi),
      BinaryOp::Div => {
        self.op0("cqo");
        self.op1("idiv", Reg::Rdi);
      }
      BinaryOp::Eq => self.compare("sete", Reg::Rax, Reg::Rdi),
      BinaryOp::Ne => self.compare("setne", Reg::Rax, Reg::Rdi),
      BinaryOp::Lt => self.compare("setl", Reg::Rax, Reg::Rdi),
      BinaryOp::Le => self.compare("setle", Reg::Rax, Reg::Rdi),
      // `a > b` is `b < a`: swap the compare operands.
      BinaryOp::Gt => self.compare("setl", Reg::Rdi, Reg::Rax),
      BinaryOp::Ge => self.compare("setle", Reg::Rdi, Reg::Rax),
    }
  }

  /// `cmp` then materialise the flag as 0 or 1 in `%rax`.
  fn compare(&mut self, setcc: &str, lhs: Reg, rhs: Reg) {
    // AT&T `cmp %rhs, %lhs` and Intel `cmp lhs, rhs` both compute lhs - rhs.
    self.op2("cmp", lhs, rhs);
    self.op1(setcc, Reg::Al);
    self.zero_extend_flag();
  }
}
