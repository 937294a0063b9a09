// Parse irregularities are reported through tracing, never stderr
#![deny(clippy::print_stderr)]

//! Declaration file syntax.
//!
//! Declaration files are a flat sequence of entries shaped like
//! `[type] name { body }`, interleaved with whitespace and `//` or `/* */`
//! comments. Bodies may nest braces and contain quoted strings.
//!
//! # Architecture
//!
//! * [`tokenizer`]: cuts raw text into whitespace, comment, token and braced-block tokens
//! * [`parser`]: groups tokens into a [`SyntaxTree`] of [`BlockSyntax`] nodes
//!
//! Both stages are lossless for well-formed input: [`SyntaxTree::to_source`]
//! reproduces the text the tree was parsed from.

pub mod parser;
pub mod tokenizer;

pub use parser::{BlockSyntax, SyntaxNode, SyntaxParser, SyntaxTree, parse};
pub use tokenizer::{SyntaxToken, TokenKind, Tokenizer};
