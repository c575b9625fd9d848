//! The candidate scoring language.
//!
//! Candidates are small scripts that define a `score_bin` function. The
//! language is deliberately tiny: f64 arithmetic, `let`/assignment,
//! `if`/`else`, `while`, function definitions, and two importable builtin
//! modules (`math`, `random`). There is no I/O, no string type, and no way
//! to reach the host environment.

use thiserror::Error;

mod ast;
mod interp;
mod lexer;
mod parser;

pub use ast::Program;
pub use interp::{Interpreter, Value};
pub use parser::parse;

/// Errors from parsing or running a candidate script.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LangError {
    /// Lexical or grammatical error, with the 1-based source line.
    #[error("syntax error at line {line}: {message}")]
    Syntax { line: usize, message: String },
    /// Error raised while executing a parsed program.
    #[error("runtime error: {message}")]
    Runtime { message: String },
}
