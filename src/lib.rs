//! Front end for the kaleidoscope calculator language: a character lexer, a
//! precedence climbing parser and a driver that hands every top-level
//! construct to a [`backend::Backend`].

pub mod ast;
pub mod backend;
#[cfg(feature = "llvm")]
pub mod codegen;
pub mod config;
pub mod driver;
pub mod eval;
pub mod lexer;
pub mod parser;
