//! Single-pass compiler from class source text to stack machine code.
//!
//! Lexing, parsing, name resolution and code emission are interleaved:
//! `parser` pulls tokens from `lexer`, declares and resolves names through
//! `symbol_table`, and appends instructions through `code_gen` while it
//! recognizes each grammar rule. No syntax tree is built.

pub mod chunk;
pub mod code_gen;
pub mod common;
pub mod compiler;
pub mod lexer;
pub mod parser;
pub mod symbol_table;
pub mod trace;

pub use chunk::{Chunk, Command, Instruction, Segment};
pub use common::{CompileError, CompileResult};
pub use compiler::{compile, compile_traced};
