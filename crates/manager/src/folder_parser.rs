use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::mpsc::Sender;
use std::time::Instant;

use decl_vfs::path::{normalize_extension, normalize_folder};
use decl_vfs::{FileStamp, VirtualFileSystem};
use decl_worker::GenerationToken;

use crate::{DeclType, DeclarationBlockSyntax};

/// A folder scanned for declaration files of one extension.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegisteredFolder {
	/// Type of blocks that carry no type keyword.
	pub default_type: DeclType,
	/// Forward slashes, exactly one trailing `/` (empty for the VFS root).
	pub folder: String,
	/// Lower-case, without leading dot.
	pub extension: String,
}

impl RegisteredFolder {
	pub fn new(default_type: DeclType, folder: &str, extension: &str) -> Self {
		Self {
			default_type,
			folder: normalize_folder(folder),
			extension: normalize_extension(extension),
		}
	}
}

/// Everything one folder job found.
pub(crate) struct ParseResult {
	pub slot: usize,
	pub folder: RegisteredFolder,
	pub generation: u64,
	pub blocks: HashMap<DeclType, Vec<DeclarationBlockSyntax>>,
	/// Files read and parsed by this job.
	pub parsed_files: BTreeMap<String, FileStamp>,
	/// Files skipped as unchanged or unreadable, with their previous stamp.
	pub kept_files: BTreeMap<String, FileStamp>,
	pub cancelled: bool,
}

impl ParseResult {
	pub fn block_count(&self) -> usize {
		self.blocks.values().map(Vec::len).sum()
	}
}

pub(crate) enum JobOutcome {
	Finished(ParseResult),
	/// The job was dropped or panicked before it could report.
	Abandoned { slot: usize, default_type: DeclType, generation: u64 },
}

/// Reports the job outcome exactly once, even when the job unwinds.
pub(crate) struct JobCompletion {
	tx: Option<Sender<JobOutcome>>,
	slot: usize,
	default_type: DeclType,
	generation: u64,
}

impl JobCompletion {
	pub fn new(tx: Sender<JobOutcome>, slot: usize, default_type: DeclType, generation: u64) -> Self {
		Self {
			tx: Some(tx),
			slot,
			default_type,
			generation,
		}
	}

	pub fn finish(mut self, result: ParseResult) {
		if let Some(tx) = self.tx.take() {
			let _ = tx.send(JobOutcome::Finished(result));
		}
	}
}

impl Drop for JobCompletion {
	fn drop(&mut self) {
		if let Some(tx) = self.tx.take() {
			let _ = tx.send(JobOutcome::Abandoned {
				slot: self.slot,
				default_type: self.default_type,
				generation: self.generation,
			});
		}
	}
}

/// Scans one registered folder on a blocking worker.
pub(crate) struct DeclarationFolderParser {
	pub slot: usize,
	pub folder: RegisteredFolder,
	pub vfs: Arc<dyn VirtualFileSystem>,
	/// Type keyword to type, as registered when the job was spawned.
	pub type_names: HashMap<String, DeclType>,
	/// Ledger stamps of the folder's files before this job.
	pub previous: HashMap<String, FileStamp>,
	/// Skip files whose stamp equals the previous one.
	pub skip_unchanged: bool,
	pub max_depth: usize,
	pub token: GenerationToken,
}

impl DeclarationFolderParser {
	pub fn run(self) -> ParseResult {
		let start = Instant::now();
		let generation = self.token.generation();
		let mut result = ParseResult {
			slot: self.slot,
			folder: self.folder.clone(),
			generation,
			blocks: HashMap::new(),
			parsed_files: BTreeMap::new(),
			kept_files: BTreeMap::new(),
			cancelled: false,
		};

		let files = self.vfs.list_files(&self.folder.folder, &self.folder.extension, self.max_depth);
		tracing::debug!(decl_type = %self.folder.default_type, folder = %self.folder.folder, generation, files = files.len(), "decl.parse.start");

		for file in files {
			if self.token.is_cancelled() {
				tracing::debug!(decl_type = %self.folder.default_type, folder = %self.folder.folder, generation, "decl.parse.cancelled");
				result.cancelled = true;
				return result;
			}

			let previous = self.previous.get(&file.path).copied();
			if self.skip_unchanged && previous == Some(file.stamp) {
				tracing::trace!(path = %file.path, "decl.parse.unchanged");
				result.kept_files.insert(file.path, file.stamp);
				continue;
			}

			let text = match self.vfs.read_text(&file.path) {
				Ok(text) => text,
				Err(error) => {
					tracing::warn!(path = %file.path, %error, "decl.parse.read_failed");
					if let Some(stamp) = previous {
						result.kept_files.insert(file.path, stamp);
					}
					continue;
				}
			};

			self.parse_file(&file.path, &text, &mut result.blocks);
			result.parsed_files.insert(file.path, file.stamp);
		}

		tracing::debug!(
			decl_type = %self.folder.default_type,
			folder = %self.folder.folder,
			generation,
			parsed = result.parsed_files.len(),
			kept = result.kept_files.len(),
			blocks = result.block_count(),
			elapsed_ms = start.elapsed().as_millis() as u64,
			"decl.parse.complete"
		);
		result
	}

	fn parse_file(&self, path: &str, text: &str, blocks: &mut HashMap<DeclType, Vec<DeclarationBlockSyntax>>) {
		let tree = decl_syntax::parse(text);
		let mut count = 0usize;

		for block in tree.blocks() {
			let Some(syntax) = DeclarationBlockSyntax::from_block(block, path) else {
				tracing::warn!(path, "decl.parse.unnamed_block");
				continue;
			};

			blocks.entry(self.classify(&syntax)).or_default().push(syntax);
			count += 1;
		}

		tracing::trace!(path, blocks = count, "decl.parse.file");
	}

	fn classify(&self, block: &DeclarationBlockSyntax) -> DeclType {
		if !block.has_type_name() {
			return self.folder.default_type;
		}
		self.type_names.get(&block.type_name).copied().unwrap_or(DeclType::Undetermined)
	}
}
