//! Crate root: wires together the compilation pipeline.
//!
//! The stages are small and strictly sequential, each consuming the whole
//! output of the previous one:
//! - `tokenizer` performs lexical analysis and produces a flat token stream.
//! - `parser` owns all syntactic knowledge and returns the expression AST.
//! - `codegen` lowers the AST into x86-64 assembly for a stack machine.
//! - `eval` computes the value a generated program exits with.
//! - `error` centralises reporting utilities shared by the other modules.

pub mod codegen;
pub mod error;
pub mod eval;
pub mod parser;
pub mod tokenizer;

pub use codegen::{CodegenOptions, Entry, Syntax};
pub use error::{CompileError, CompileResult, ErrorKind};

/// Compile an expression into AT&T assembly for a freestanding `_start`.
pub fn generate_assembly(expr: &str) -> CompileResult<String> {
  generate_assembly_with(expr, &CodegenOptions::default())
}

/// Compile an expression with explicit dialect and entry-point choices.
pub fn generate_assembly_with(expr: &str, options: &CodegenOptions) -> CompileResult<String> {
  let tokens = tokenizer::tokenize(expr)?;
  let program = parser::parse(tokens, expr)?;
  codegen::generate(&program, options)
}
