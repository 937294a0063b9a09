//! Which files have contributed declarations, and in which state.

use std::collections::{BTreeMap, HashMap};

use decl_vfs::FileStamp;

use crate::DeclType;

/// A file that was parsed for a folder registered against `default_type`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclarationFile {
	pub default_type: DeclType,
	pub file_name: String,
}

impl DeclarationFile {
	pub fn new(default_type: DeclType, file_name: impl Into<String>) -> Self {
		Self {
			default_type,
			file_name: file_name.into(),
		}
	}
}

/// Stamp of every parsed declaration file.
#[derive(Debug, Default)]
pub struct ParsedFileLedger {
	files: BTreeMap<DeclarationFile, FileStamp>,
}

impl ParsedFileLedger {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn contains(&self, file: &DeclarationFile) -> bool {
		self.files.contains_key(file)
	}

	/// Stamps of the files below `folder` (normalized, trailing `/`).
	pub fn files_in_folder(&self, default_type: DeclType, folder: &str) -> HashMap<String, FileStamp> {
		self.folder_entries(default_type, folder).map(|(file, stamp)| (file.file_name.clone(), *stamp)).collect()
	}

	/// Replaces the entries below `folder` with `files` and returns the
	/// entries that are no longer present.
	pub fn replace_folder(&mut self, default_type: DeclType, folder: &str, files: impl IntoIterator<Item = (String, FileStamp)>) -> Vec<DeclarationFile> {
		let mut previous: BTreeMap<DeclarationFile, FileStamp> = self.folder_entries(default_type, folder).map(|(file, stamp)| (file.clone(), *stamp)).collect();
		for file in previous.keys() {
			self.files.remove(file);
		}

		for (file_name, stamp) in files {
			let file = DeclarationFile::new(default_type, file_name);
			previous.remove(&file);
			self.files.insert(file, stamp);
		}

		previous.into_keys().collect()
	}

	pub fn len(&self) -> usize {
		self.files.len()
	}

	pub fn is_empty(&self) -> bool {
		self.files.is_empty()
	}

	pub fn clear(&mut self) {
		self.files.clear();
	}

	fn folder_entries<'a>(&'a self, default_type: DeclType, folder: &'a str) -> impl Iterator<Item = (&'a DeclarationFile, &'a FileStamp)> {
		self.files
			.iter()
			.filter(move |(file, _)| file.default_type == default_type && file.file_name.starts_with(folder))
	}
}
