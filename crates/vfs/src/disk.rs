use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use ignore::{DirEntry, WalkBuilder};
use serde::Deserialize;

use crate::path::{has_extension, normalize_extension, normalize_file, normalize_folder};
use crate::{FileStamp, VfsError, VfsFile, VirtualFileSystem};

/// Walking options for [`DiskFileSystem`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct FilesystemOptions {
	pub follow_symlinks: bool,
	pub include_hidden: bool,
}

/// A directory tree on disk exposed as a virtual filesystem.
///
/// Ignore files (`.gitignore`, `.ignore`) are not honoured: every matching
/// file below the registered folder is a declaration source.
#[derive(Debug, Clone)]
pub struct DiskFileSystem {
	root: PathBuf,
	options: FilesystemOptions,
}

impl DiskFileSystem {
	pub fn new(root: impl Into<PathBuf>) -> Self {
		Self::with_options(root, FilesystemOptions::default())
	}

	pub fn with_options(root: impl Into<PathBuf>, options: FilesystemOptions) -> Self {
		Self { root: root.into(), options }
	}

	pub fn root(&self) -> &Path {
		&self.root
	}

	fn build_walk(&self, dir: &Path, max_depth: usize) -> WalkBuilder {
		let mut walker = WalkBuilder::new(dir);

		walker
			.hidden(!self.options.include_hidden)
			.follow_links(self.options.follow_symlinks)
			.git_ignore(false)
			.git_global(false)
			.git_exclude(false)
			.ignore(false)
			.parents(false)
			.max_depth(Some(max_depth));

		walker
	}

	fn to_vfs_file(&self, entry: &DirEntry) -> Option<VfsFile> {
		let relative = entry.path().strip_prefix(&self.root).ok()?;
		let path = normalize_file(&relative.to_string_lossy());

		let stamp = match entry.metadata() {
			Ok(metadata) => {
				let modified = metadata.modified().ok().and_then(|time| time.duration_since(UNIX_EPOCH).ok()).map_or(0, |since| since.as_nanos());
				FileStamp::new(modified, metadata.len())
			}
			Err(error) => {
				tracing::warn!(path = %path, %error, "vfs.disk.metadata_failed");
				FileStamp::default()
			}
		};

		Some(VfsFile { path, stamp })
	}
}

impl VirtualFileSystem for DiskFileSystem {
	fn list_files(&self, folder: &str, extension: &str, max_depth: usize) -> Vec<VfsFile> {
		let folder = normalize_folder(folder);
		let extension = normalize_extension(extension);
		let dir = self.root.join(&folder);

		if !dir.is_dir() {
			tracing::debug!(dir = %dir.display(), "vfs.disk.missing_folder");
			return Vec::new();
		}

		let mut files = Vec::new();
		for entry in self.build_walk(&dir, max_depth).build() {
			let entry = match entry {
				Ok(entry) => entry,
				Err(error) => {
					tracing::warn!(folder = %folder, %error, "vfs.disk.walk_error");
					continue;
				}
			};

			if !entry.file_type().is_some_and(|ft| ft.is_file()) {
				continue;
			}
			if let Some(file) = self.to_vfs_file(&entry).filter(|file| has_extension(&file.path, &extension)) {
				files.push(file);
			}
		}

		files.sort_by(|a, b| a.path.cmp(&b.path));
		tracing::trace!(folder = %folder, extension = %extension, files = files.len(), "vfs.disk.list");
		files
	}

	fn read_text(&self, path: &str) -> Result<String, VfsError> {
		let path = normalize_file(path);
		let bytes = std::fs::read(self.root.join(&path)).map_err(|error| match error.kind() {
			std::io::ErrorKind::NotFound => VfsError::NotFound(path.clone()),
			_ => VfsError::Io { path: path.clone(), error },
		})?;

		// Non-UTF-8 files are decoded lossily.
		Ok(match String::from_utf8(bytes) {
			Ok(text) => text,
			Err(error) => String::from_utf8_lossy(error.as_bytes()).into_owned(),
		})
	}
}
