//! Error types for declaration management.

use std::path::PathBuf;

use thiserror::Error;

/// Errors returned by [`DeclarationManager`](crate::DeclarationManager).
#[derive(Debug, Error)]
pub enum DeclError {
	/// A creator is already registered under this type name.
	#[error("declaration type already registered: {0}")]
	DuplicateType(String),

	/// No creator is registered under this type name.
	#[error("unknown declaration type: {0}")]
	UnknownType(String),

	/// The worker runtime or merge thread could not be started.
	#[error("failed to start declaration workers: {0}")]
	Runtime(#[source] std::io::Error),

	#[error(transparent)]
	Config(#[from] ConfigError),
}

/// Errors loading [`DeclManagerOptions`](crate::DeclManagerOptions).
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("TOML parse error: {0}")]
	Parse(#[from] toml::de::Error),

	/// Error reading a configuration file.
	#[error("I/O error reading {path}: {error}")]
	Io {
		/// Path to the file that failed to read.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},
}

/// Result type for declaration management.
pub type Result<T> = std::result::Result<T, DeclError>;
