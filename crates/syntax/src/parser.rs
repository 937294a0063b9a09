//! Groups tokens into declaration blocks.
//!
//! A block header is everything between the previous top-level node and the
//! braced block that closes it. The first bare token of a header is the block
//! name; a second bare token turns the first into the type keyword, so both
//! `decl/name { }` and `particle fx/name { }` are valid.

use std::iter::Peekable;
use std::str::Chars;

use crate::tokenizer::{SyntaxToken, TokenKind, Tokenizer};

/// A node of the declaration syntax tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyntaxNode {
	Whitespace(SyntaxToken),
	Comment(SyntaxToken),
	/// Type keyword of a block header.
	DeclType(SyntaxToken),
	/// Name of a block header.
	DeclName(SyntaxToken),
	Block(BlockSyntax),
}

impl SyntaxNode {
	/// Appends the source text of this node to `out`.
	pub fn write_source(&self, out: &mut String) {
		match self {
			Self::Whitespace(token) | Self::Comment(token) | Self::DeclType(token) | Self::DeclName(token) => out.push_str(&token.value),
			Self::Block(block) => block.write_source(out),
		}
	}

	/// Returns the block payload if this is a block node.
	pub fn as_block(&self) -> Option<&BlockSyntax> {
		match self {
			Self::Block(block) => Some(block),
			_ => None,
		}
	}
}

/// One `[type] name { ... }` entry together with the whitespace and comments
/// of its header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockSyntax {
	header: Vec<SyntaxNode>,
	block: SyntaxToken,
	name_index: Option<usize>,
	type_index: Option<usize>,
}

impl BlockSyntax {
	fn new(block: SyntaxToken, header: Vec<SyntaxNode>, name_index: Option<usize>, type_index: Option<usize>) -> Self {
		debug_assert_eq!(block.kind, TokenKind::BracedBlock);
		Self {
			header,
			block,
			name_index,
			type_index,
		}
	}

	fn header_token(&self, index: Option<usize>) -> Option<&str> {
		match self.header.get(index?)? {
			SyntaxNode::DeclType(token) | SyntaxNode::DeclName(token) => Some(token.value.as_str()),
			_ => None,
		}
	}

	/// Type keyword, if the header carried one.
	pub fn type_name(&self) -> Option<&str> {
		self.header_token(self.type_index)
	}

	/// Block name. `None` only for degenerate blocks without a header.
	pub fn name(&self) -> Option<&str> {
		self.header_token(self.name_index)
	}

	/// Block body with the enclosing braces removed.
	pub fn contents(&self) -> &str {
		let value = self.block.value.as_str();
		let value = value.strip_prefix('{').unwrap_or(value);
		value.strip_suffix('}').unwrap_or(value)
	}

	/// Header nodes preceding the braced block.
	pub fn header(&self) -> &[SyntaxNode] {
		&self.header
	}

	pub fn write_source(&self, out: &mut String) {
		for node in &self.header {
			node.write_source(out);
		}
		out.push_str(&self.block.value);
	}
}

/// Parsed declaration file. The root is a flat list of nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyntaxTree {
	nodes: Vec<SyntaxNode>,
}

impl SyntaxTree {
	pub fn nodes(&self) -> &[SyntaxNode] {
		&self.nodes
	}

	/// Iterates over all block nodes, degenerate ones included.
	pub fn blocks(&self) -> impl Iterator<Item = &BlockSyntax> {
		self.nodes.iter().filter_map(SyntaxNode::as_block)
	}

	/// Reassembles the source text from the tree.
	pub fn to_source(&self) -> String {
		let mut out = String::new();
		for node in &self.nodes {
			node.write_source(&mut out);
		}
		out
	}
}

/// Builds a [`SyntaxTree`] from a token stream.
#[derive(Debug)]
pub struct SyntaxParser<I: Iterator<Item = char>> {
	tokens: Peekable<Tokenizer<I>>,
}

impl<'a> SyntaxParser<Chars<'a>> {
	pub fn new(text: &'a str) -> Self {
		Self::from_tokenizer(Tokenizer::new(text))
	}
}

impl<I: Iterator<Item = char>> SyntaxParser<I> {
	pub fn from_tokenizer(tokenizer: Tokenizer<I>) -> Self {
		Self { tokens: tokenizer.peekable() }
	}

	/// Consumes the token stream. Never fails; irregular input is logged and
	/// kept in the tree as degenerate nodes.
	pub fn parse(mut self) -> SyntaxTree {
		let mut tree = SyntaxTree::default();

		while let Some(token) = self.tokens.next() {
			match token.kind {
				TokenKind::Whitespace => tree.nodes.push(SyntaxNode::Whitespace(token)),
				TokenKind::EolComment | TokenKind::BlockComment => tree.nodes.push(SyntaxNode::Comment(token)),
				TokenKind::BracedBlock => {
					tracing::warn!(block = %preview(&token.value), "decl.syntax.unnamed_block");
					tree.nodes.push(SyntaxNode::Block(BlockSyntax::new(token, Vec::new(), None, None)));
				}
				TokenKind::Token => self.parse_block(token, &mut tree),
			}
		}

		tree
	}

	fn parse_block(&mut self, first: SyntaxToken, tree: &mut SyntaxTree) {
		let mut header = vec![SyntaxNode::DeclName(first)];
		let mut name_index = 0usize;
		let mut type_index: Option<usize> = None;

		for token in self.tokens.by_ref() {
			match token.kind {
				TokenKind::Whitespace => header.push(SyntaxNode::Whitespace(token)),
				TokenKind::EolComment | TokenKind::BlockComment => header.push(SyntaxNode::Comment(token)),
				TokenKind::BracedBlock => {
					tree.nodes.push(SyntaxNode::Block(BlockSyntax::new(token, header, Some(name_index), type_index)));
					return;
				}
				TokenKind::Token if type_index.is_none() => {
					if let SyntaxNode::DeclName(previous) = &header[name_index] {
						header[name_index] = SyntaxNode::DeclType(previous.clone());
					}
					type_index = Some(name_index);
					name_index = header.len();
					header.push(SyntaxNode::DeclName(token));
				}
				TokenKind::Token => {
					tracing::warn!(token = %token.value, "decl.syntax.extra_header_token");
				}
			}
		}

		tracing::warn!(header_nodes = header.len(), "decl.syntax.unterminated_header");
		tree.nodes.extend(header);
	}
}

/// Parses a complete declaration file.
pub fn parse(text: &str) -> SyntaxTree {
	SyntaxParser::new(text).parse()
}

fn preview(value: &str) -> &str {
	match value.char_indices().nth(48) {
		Some((end, _)) => &value[..end],
		None => value,
	}
}
