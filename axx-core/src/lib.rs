//! Core of the AXX to C++ compiler.
//!
//! The pipeline is:
//!
//!   source .axx
//!     -> lexer     (tokens, state machine)
//!     -> parser    (AST, recursive descent over FIRST sets)
//!     -> semantic  (scopes + static types)
//!     -> codegen_cpp (C++ translation unit)
//!
//! The CLI and any other front end should go through [`compile`] or
//! [`Compiler`] rather than wiring the stages by hand.

// ---------------------------------------------------------------------
// Error handling
// ---------------------------------------------------------------------

pub mod error;

// ---------------------------------------------------------------------
// Front-end: lexing and parsing
// ---------------------------------------------------------------------

pub mod token;
pub mod lexer;
pub mod grammar;
pub mod parser;
pub mod ast;

// ---------------------------------------------------------------------
// Semantic layer: types and checking
// ---------------------------------------------------------------------

pub mod types;
pub mod semantic;

// ---------------------------------------------------------------------
// Back-end: code generation and compiler orchestration
// ---------------------------------------------------------------------

pub mod codegen_cpp;
pub mod compiler;

// ---------------------------------------------------------------------
// Public API re-exports
// ---------------------------------------------------------------------

pub use compiler::{Compiler, compile, dump_ast, dump_tokens};
pub use error::CompileError;
