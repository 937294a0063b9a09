// Declaration loading reports through tracing, never stderr
#![deny(clippy::print_stderr)]

//! Typed declarations loaded from declaration folders.
//!
//! A host registers one [`DeclarationCreator`] per type keyword and one or
//! more folders per [`DeclType`]. Folders are parsed in the background; every
//! block becomes a shared [`Declaration`] owned by the [`DeclarationManager`].
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use decl_manager::{BaseDeclarationCreator, DeclManagerOptions, DeclType, DeclarationManager};
//! use decl_vfs::DiskFileSystem;
//!
//! # fn main() -> decl_manager::Result<()> {
//! let manager = DeclarationManager::new(Arc::new(DiskFileSystem::new("base")), DeclManagerOptions::default())?;
//! manager.register_decl_type("table", Arc::new(BaseDeclarationCreator::new(DeclType::Table)))?;
//! manager.register_decl_folder(DeclType::Table, "materials", ".mtr");
//!
//! if let Some(table) = manager.find_declaration(DeclType::Table, "sinTable") {
//! 	println!("{}", table.block_syntax().contents);
//! }
//! # Ok(())
//! # }
//! ```

mod decl_type;
mod declaration;
mod error;
mod folder_parser;
pub mod ledger;
mod manager;
mod options;

pub use decl_type::DeclType;
pub use declaration::{BaseDeclarationCreator, Declaration, DeclarationBase, DeclarationBlockSyntax, DeclarationCreator};
pub use error::{ConfigError, DeclError, Result};
pub use folder_parser::RegisteredFolder;
pub use manager::{DeclarationManager, DeclsReloaded};
pub use options::DeclManagerOptions;
