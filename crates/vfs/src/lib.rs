// Walk and read failures are reported through tracing, never stderr
#![deny(clippy::print_stderr)]

//! Virtual filesystem collaborator.
//!
//! Declaration loading only needs two things from a filesystem: enumerate the
//! files of a folder that carry a given extension, and read one file as text.
//! Paths are VFS-relative and always use forward slashes.
//!
//! * [`DiskFileSystem`]: a directory tree on disk, walked with `ignore`
//! * [`MemoryFileSystem`]: an in-memory tree with revision stamps

mod disk;
mod memory;
pub mod path;

use thiserror::Error;

pub use disk::{DiskFileSystem, FilesystemOptions};
pub use memory::MemoryFileSystem;

/// Change fingerprint of one file. Only ever compared for equality.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct FileStamp {
	/// Modification time in nanoseconds, or a revision counter.
	pub modified: u128,
	pub len: u64,
}

impl FileStamp {
	pub const fn new(modified: u128, len: u64) -> Self {
		Self { modified, len }
	}
}

/// One file found by [`VirtualFileSystem::list_files`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VfsFile {
	/// VFS-relative path with forward slashes.
	pub path: String,
	pub stamp: FileStamp,
}

/// Errors reading from a virtual filesystem.
#[derive(Debug, Error)]
pub enum VfsError {
	#[error("file not found: {0}")]
	NotFound(String),

	#[error("I/O error reading {path}: {error}")]
	Io {
		path: String,
		error: std::io::Error,
	},
}

/// Filesystem collaborator consumed by the declaration manager.
pub trait VirtualFileSystem: Send + Sync {
	/// Lists the files below `folder` whose extension matches `extension`
	/// (case-insensitive, without dot), descending at most `max_depth`
	/// directory levels. Files directly inside `folder` are at depth 1.
	/// The result is sorted by path.
	fn list_files(&self, folder: &str, extension: &str, max_depth: usize) -> Vec<VfsFile>;

	/// Reads the whole file as text.
	fn read_text(&self, path: &str) -> Result<String, VfsError>;
}
