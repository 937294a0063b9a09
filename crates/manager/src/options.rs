use std::path::Path;

use decl_vfs::FilesystemOptions;
use serde::Deserialize;

use crate::error::ConfigError;

/// Tuning for [`DeclarationManager`](crate::DeclarationManager).
///
/// ```toml
/// max_depth = 4
/// worker_threads = 1
///
/// [filesystem]
/// include_hidden = true
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DeclManagerOptions {
	/// Directory levels searched below a registered folder.
	pub max_depth: usize,
	/// Worker threads of an owned runtime.
	pub worker_threads: usize,
	pub runtime_thread_name: String,
	pub merge_thread_name: String,
	/// Walking options for [`DiskFileSystem`](decl_vfs::DiskFileSystem).
	pub filesystem: FilesystemOptions,
}

impl Default for DeclManagerOptions {
	fn default() -> Self {
		Self {
			max_depth: 99,
			worker_threads: 2,
			runtime_thread_name: "decl-worker".to_owned(),
			merge_thread_name: "decl-merge".to_owned(),
			filesystem: FilesystemOptions::default(),
		}
	}
}

impl DeclManagerOptions {
	pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
		Ok(toml::from_str(text)?)
	}

	pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io { path: path.to_path_buf(), error })?;
		let options = Self::from_toml_str(&text)?;
		tracing::debug!(path = %path.display(), "decl.options.loaded");
		Ok(options)
	}
}
