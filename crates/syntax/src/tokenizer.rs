//! Lossless tokenizer for declaration file text.
//!
//! The tokenizer never fails: unterminated comments and braced blocks at the
//! end of the input are returned as partial tokens, and validating them is
//! left to the [`parser`](crate::parser).

use std::iter::Peekable;
use std::str::Chars;

const OPENING_BRACE: char = '{';
const CLOSING_BRACE: char = '}';
const QUOTE: char = '"';

/// Classification of one [`SyntaxToken`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
	/// A run of spaces, tabs, vertical tabs and line breaks.
	Whitespace,
	/// Everything from an opening `{` up to and including its matching `}`.
	BracedBlock,
	/// A bare word outside of any braced block.
	Token,
	/// A `//` comment running up to (not including) the line break.
	EolComment,
	/// A `/* */` comment.
	BlockComment,
}

/// One slice of the source text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxToken {
	pub kind: TokenKind,
	/// Raw text exactly as it appeared in the source.
	pub value: String,
}

impl SyntaxToken {
	pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
		Self { kind, value: value.into() }
	}

	/// Returns `true` for both comment kinds.
	pub fn is_comment(&self) -> bool {
		matches!(self.kind, TokenKind::EolComment | TokenKind::BlockComment)
	}
}

fn is_whitespace(c: char) -> bool {
	matches!(c, ' ' | '\t' | '\n' | '\x0B' | '\r')
}

/// Lazy token stream over a character source.
///
/// The stream is finite and cannot be restarted; create a new tokenizer to
/// scan the text again.
#[derive(Debug)]
pub struct Tokenizer<I: Iterator<Item = char>> {
	chars: Peekable<I>,
	/// A `/` consumed while probing for a comment opener after a bare token.
	pending: Option<char>,
}

impl<'a> Tokenizer<Chars<'a>> {
	/// Creates a tokenizer over a string slice.
	pub fn new(text: &'a str) -> Self {
		Self::from_chars(text.chars())
	}
}

impl<I: Iterator<Item = char>> Tokenizer<I> {
	/// Creates a tokenizer over any character stream.
	pub fn from_chars(chars: I) -> Self {
		Self {
			chars: chars.peekable(),
			pending: None,
		}
	}

	fn peek(&mut self) -> Option<char> {
		self.pending.or_else(|| self.chars.peek().copied())
	}

	fn bump(&mut self) -> Option<char> {
		self.pending.take().or_else(|| self.chars.next())
	}

	fn whitespace(&mut self, first: char) -> SyntaxToken {
		let mut value = String::from(first);
		while let Some(c) = self.peek().filter(|c| is_whitespace(*c)) {
			value.push(c);
			self.bump();
		}
		SyntaxToken::new(TokenKind::Whitespace, value)
	}

	fn braced_block(&mut self) -> SyntaxToken {
		let mut value = String::from(OPENING_BRACE);
		let mut depth = 1usize;
		let mut in_quotes = false;

		while let Some(c) = self.bump() {
			value.push(c);

			if in_quotes {
				in_quotes = c != QUOTE;
				continue;
			}

			match c {
				OPENING_BRACE => depth += 1,
				CLOSING_BRACE => {
					depth -= 1;
					if depth == 0 {
						break;
					}
				}
				QUOTE => in_quotes = true,
				_ => {}
			}
		}

		SyntaxToken::new(TokenKind::BracedBlock, value)
	}

	fn block_comment(&mut self) -> SyntaxToken {
		let mut value = String::from("/*");
		while let Some(c) = self.bump() {
			value.push(c);
			if c == '*' && self.peek() == Some('/') {
				value.push('/');
				self.bump();
				break;
			}
		}
		SyntaxToken::new(TokenKind::BlockComment, value)
	}

	fn eol_comment(&mut self) -> SyntaxToken {
		let mut value = String::from("//");
		while let Some(c) = self.peek().filter(|c| *c != '\r' && *c != '\n') {
			value.push(c);
			self.bump();
		}
		SyntaxToken::new(TokenKind::EolComment, value)
	}

	fn token(&mut self, first: char) -> SyntaxToken {
		let mut value = String::from(first);
		while let Some(c) = self.peek() {
			if is_whitespace(c) || c == OPENING_BRACE || c == CLOSING_BRACE {
				break;
			}

			self.bump();
			if c == '/' && matches!(self.chars.peek(), Some('*' | '/')) {
				// Comment opener ends the token; replay the slash next time.
				self.pending = Some('/');
				break;
			}
			value.push(c);
		}
		SyntaxToken::new(TokenKind::Token, value)
	}
}

impl<I: Iterator<Item = char>> Iterator for Tokenizer<I> {
	type Item = SyntaxToken;

	fn next(&mut self) -> Option<SyntaxToken> {
		let first = self.bump()?;

		if is_whitespace(first) {
			return Some(self.whitespace(first));
		}

		let token = match first {
			OPENING_BRACE => self.braced_block(),
			'/' => match self.peek() {
				Some('*') => {
					self.bump();
					self.block_comment()
				}
				Some('/') => {
					self.bump();
					self.eol_comment()
				}
				_ => self.token(first),
			},
			_ => self.token(first),
		};
		Some(token)
	}
}
