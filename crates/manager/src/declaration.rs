//! Declaration objects and the creators that produce them.

use std::fmt;
use std::sync::Arc;

use decl_syntax::BlockSyntax;
use parking_lot::RwLock;

use crate::DeclType;

/// Source text of one declaration as found in a declaration file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeclarationBlockSyntax {
	/// Type keyword of the block header; empty when the block had none.
	pub type_name: String,
	pub name: String,
	/// Body of the block without the enclosing braces.
	pub contents: String,
	/// VFS path of the file the block was read from; empty if synthesised.
	pub file_name: String,
}

impl DeclarationBlockSyntax {
	/// Extracts the parts of a parsed block. Returns `None` for unnamed blocks.
	pub fn from_block(block: &BlockSyntax, file_name: &str) -> Option<Self> {
		Some(Self {
			type_name: block.type_name().unwrap_or_default().to_owned(),
			name: block.name()?.to_owned(),
			contents: block.contents().to_owned(),
			file_name: file_name.to_owned(),
		})
	}

	pub fn has_type_name(&self) -> bool {
		!self.type_name.is_empty()
	}
}

/// A named, typed declaration shared between the manager and its users.
///
/// The manager keeps one instance per `(type, name)` for its whole lifetime
/// and hands new source text to it through [`Self::set_block_syntax`], so
/// holders of an `Arc` observe reloads.
pub trait Declaration: Send + Sync {
	fn decl_name(&self) -> &str;

	fn decl_type(&self) -> DeclType;

	fn block_syntax(&self) -> DeclarationBlockSyntax;

	fn set_block_syntax(&self, block: DeclarationBlockSyntax);
}

impl fmt::Debug for dyn Declaration {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Declaration").field("type", &self.decl_type()).field("name", &self.decl_name()).finish()
	}
}

/// Factory for the declarations of one [`DeclType`].
///
/// Called from the merge worker thread. An implementation that blocks delays
/// readers of its own type only.
pub trait DeclarationCreator: Send + Sync {
	fn decl_type(&self) -> DeclType;

	fn create_declaration(&self, name: &str) -> Arc<dyn Declaration>;
}

/// Plain declaration storing its block syntax and nothing else.
#[derive(Debug)]
pub struct DeclarationBase {
	name: String,
	decl_type: DeclType,
	block: RwLock<DeclarationBlockSyntax>,
}

impl DeclarationBase {
	pub fn new(decl_type: DeclType, name: impl Into<String>) -> Self {
		let name = name.into();
		Self {
			block: RwLock::new(DeclarationBlockSyntax {
				name: name.clone(),
				..Default::default()
			}),
			name,
			decl_type,
		}
	}
}

impl Declaration for DeclarationBase {
	fn decl_name(&self) -> &str {
		&self.name
	}

	fn decl_type(&self) -> DeclType {
		self.decl_type
	}

	fn block_syntax(&self) -> DeclarationBlockSyntax {
		self.block.read().clone()
	}

	fn set_block_syntax(&self, block: DeclarationBlockSyntax) {
		*self.block.write() = block;
	}
}

/// Creator producing [`DeclarationBase`] instances.
#[derive(Debug, Clone, Copy)]
pub struct BaseDeclarationCreator {
	decl_type: DeclType,
}

impl BaseDeclarationCreator {
	pub const fn new(decl_type: DeclType) -> Self {
		Self { decl_type }
	}
}

impl DeclarationCreator for BaseDeclarationCreator {
	fn decl_type(&self) -> DeclType {
		self.decl_type
	}

	fn create_declaration(&self, name: &str) -> Arc<dyn Declaration> {
		Arc::new(DeclarationBase::new(self.decl_type, name))
	}
}
