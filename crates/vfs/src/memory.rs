use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::path::{depth_below, has_extension, normalize_extension, normalize_file, normalize_folder};
use crate::{FileStamp, VfsError, VfsFile, VirtualFileSystem};

#[derive(Debug, Clone)]
struct MemoryFile {
	text: Arc<str>,
	revision: u64,
}

#[derive(Debug, Default)]
struct MemoryTree {
	files: BTreeMap<String, MemoryFile>,
	revision: u64,
}

/// Thread-safe in-memory filesystem.
///
/// Every write bumps a global revision counter which becomes the file's
/// stamp, so rewriting a file always changes its fingerprint even when the
/// content length stays the same.
#[derive(Debug, Default)]
pub struct MemoryFileSystem {
	tree: RwLock<MemoryTree>,
}

impl MemoryFileSystem {
	pub fn new() -> Self {
		Self::default()
	}

	/// Creates or replaces a file.
	pub fn write(&self, path: &str, text: impl Into<Arc<str>>) {
		let mut tree = self.tree.write();
		tree.revision += 1;
		let revision = tree.revision;
		tree.files.insert(normalize_file(path), MemoryFile { text: text.into(), revision });
	}

	/// Removes a file, returning whether it existed.
	pub fn remove(&self, path: &str) -> bool {
		self.tree.write().files.remove(&normalize_file(path)).is_some()
	}

	pub fn contains(&self, path: &str) -> bool {
		self.tree.read().files.contains_key(&normalize_file(path))
	}
}

impl VirtualFileSystem for MemoryFileSystem {
	fn list_files(&self, folder: &str, extension: &str, max_depth: usize) -> Vec<VfsFile> {
		let folder = normalize_folder(folder);
		let extension = normalize_extension(extension);
		let tree = self.tree.read();

		tree.files
			.range(folder.clone()..)
			.take_while(|(path, _)| path.starts_with(&folder))
			.filter(|(path, _)| has_extension(path, &extension) && depth_below(&folder, path).is_some_and(|depth| depth <= max_depth))
			.map(|(path, file)| VfsFile {
				path: path.clone(),
				stamp: FileStamp::new(u128::from(file.revision), file.text.len() as u64),
			})
			.collect()
	}

	fn read_text(&self, path: &str) -> Result<String, VfsError> {
		let path = normalize_file(path);
		self.tree.read().files.get(&path).map(|file| file.text.to_string()).ok_or(VfsError::NotFound(path))
	}
}
