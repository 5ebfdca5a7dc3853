//! Parser module for Amethyst configuration files
//!
//! This module provides the line lexer, the syntax tree, the tree builder and
//! environment variable interpolation.

pub mod ast;
pub mod lexer;
pub mod parser;
pub mod variables;

pub use ast::*;
pub use lexer::{Line, LexError, lex_line};
pub use parser::{ParseErrors, parse, parse_file};
pub use variables::{Environment, Unresolved, is_identifier};
