//! Typed declaration registry fed by background folder jobs.
//!
//! Every [`DeclarationManager::register_decl_folder`] call spawns a blocking
//! job on the worker runtime. Jobs post their parse results over a channel
//! to a dedicated merge thread, which applies results one at a time:
//!
//! 1. resolve creators and create new declarations without holding the
//!    declaration lock
//! 2. under the merge lock, update the file ledger, rebuild the
//!    unrecognized-block buffer, then apply all inserts, in-place updates and
//!    removals in one write-lock scope
//! 3. send [`DeclsReloaded`] for the job's default type
//! 4. release readers waiting on that type
//!
//! Readers of a type block while any job for that type is unmerged.

mod creators;
mod merge;

use std::cell::Cell;
use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::JoinHandle;

use decl_vfs::{DiskFileSystem, VirtualFileSystem};
use decl_worker::{GenerationClock, GenerationToken, TaskClass, WorkerRuntime};
use parking_lot::{Condvar, Mutex, RwLock};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use self::creators::CreatorTable;
use crate::folder_parser::{DeclarationFolderParser, JobCompletion, JobOutcome, RegisteredFolder};
use crate::ledger::{DeclarationFile, ParsedFileLedger};
use crate::{DeclError, DeclManagerOptions, DeclType, Declaration, DeclarationBlockSyntax, DeclarationCreator, Result};

/// Buffered reload events per receiver before it lags.
const SIGNAL_CAPACITY: usize = 16;

thread_local! {
	static ON_MERGE_WORKER: Cell<bool> = const { Cell::new(false) };
	/// Set while this thread calls creators for buffered blocks under the
	/// merge lock.
	static CLAIMING: Cell<bool> = const { Cell::new(false) };
}

/// Lookups on the merge thread, or from a creator called while the merge lock
/// is held, read the current state instead of waiting for pending jobs.
fn lookups_skip_wait() -> bool {
	ON_MERGE_WORKER.with(Cell::get) || CLAIMING.with(Cell::get)
}

/// Sent once per merged folder job, to subscribers of the job's default type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeclsReloaded {
	pub decl_type: DeclType,
	/// Generation of the job that was merged.
	pub generation: u64,
}

struct DeclEntry {
	decl: Arc<dyn Declaration>,
	/// File and folder default type the block was last read for.
	source: DeclarationFile,
	/// Generation of the merge that last produced the entry.
	stamp: u64,
}

type NamedDeclarations = HashMap<String, DeclEntry>;

struct UnrecognizedBlock {
	block: DeclarationBlockSyntax,
	/// Type the folder job classified the block as.
	bucket: DeclType,
	source: DeclarationFile,
	stamp: u64,
}

/// Unmerged jobs of one default type.
#[derive(Debug, Default)]
struct RunningParser {
	pending: usize,
}

struct FolderSlot {
	folder: RegisteredFolder,
	/// Token of the newest job; its generation is the only one merged.
	token: GenerationToken,
}

struct Shared {
	vfs: Arc<dyn VirtualFileSystem>,
	options: DeclManagerOptions,
	clock: GenerationClock,
	shutdown: CancellationToken,
	creators: RwLock<CreatorTable>,
	declarations: RwLock<HashMap<DeclType, NamedDeclarations>>,
	unrecognized: Mutex<Vec<UnrecognizedBlock>>,
	ledger: Mutex<ParsedFileLedger>,
	folders: Mutex<Vec<FolderSlot>>,
	signals: Mutex<HashMap<DeclType, broadcast::Sender<DeclsReloaded>>>,
	jobs: Mutex<HashMap<DeclType, RunningParser>>,
	jobs_done: Condvar,
	/// Serializes merge application with creator (un)registration.
	merge: Mutex<()>,
}

/// Registry of typed declarations loaded from declaration folders.
///
/// Construct one per host and share it (`Arc`) where needed. Dropping the
/// manager runs [`Self::shutdown`].
pub struct DeclarationManager {
	shared: Arc<Shared>,
	runtime: WorkerRuntime,
	results: Mutex<Option<Sender<JobOutcome>>>,
	merge_worker: Mutex<Option<JoinHandle<()>>>,
}

impl DeclarationManager {
	/// Creates a manager with its own worker runtime.
	pub fn new(vfs: Arc<dyn VirtualFileSystem>, options: DeclManagerOptions) -> Result<Self> {
		let runtime = WorkerRuntime::new(options.worker_threads, &options.runtime_thread_name).map_err(DeclError::Runtime)?;
		Self::with_runtime(vfs, options, runtime)
	}

	/// Creates a manager reading declaration folders below `root` on disk,
	/// walked with `options.filesystem`.
	pub fn with_disk(root: impl Into<PathBuf>, options: DeclManagerOptions) -> Result<Self> {
		let vfs = DiskFileSystem::with_options(root, options.filesystem.clone());
		Self::new(Arc::new(vfs), options)
	}

	/// Like [`Self::with_disk`], with options loaded from the TOML file at
	/// `config`.
	pub fn load_disk(root: impl Into<PathBuf>, config: impl AsRef<Path>) -> Result<Self> {
		let options = DeclManagerOptions::load(config)?;
		Self::with_disk(root, options)
	}

	/// Creates a manager whose folder jobs run on `runtime`.
	pub fn with_runtime(vfs: Arc<dyn VirtualFileSystem>, options: DeclManagerOptions, runtime: WorkerRuntime) -> Result<Self> {
		let merge_thread_name = options.merge_thread_name.clone();
		let shared = Arc::new(Shared {
			vfs,
			options,
			clock: GenerationClock::new(),
			shutdown: CancellationToken::new(),
			creators: RwLock::new(CreatorTable::default()),
			declarations: RwLock::new(HashMap::new()),
			unrecognized: Mutex::new(Vec::new()),
			ledger: Mutex::new(ParsedFileLedger::new()),
			folders: Mutex::new(Vec::new()),
			signals: Mutex::new(HashMap::new()),
			jobs: Mutex::new(HashMap::new()),
			jobs_done: Condvar::new(),
			merge: Mutex::new(()),
		});

		let (tx, rx) = mpsc::channel();
		let worker_shared = Arc::clone(&shared);
		let merge_worker = runtime
			.spawn_named_thread(TaskClass::Dedicated, merge_thread_name, move || run_merge_worker(worker_shared, rx))
			.map_err(DeclError::Runtime)?;

		tracing::debug!(max_depth = shared.options.max_depth, "decl.manager.start");
		Ok(Self {
			shared,
			runtime,
			results: Mutex::new(Some(tx)),
			merge_worker: Mutex::new(Some(merge_worker)),
		})
	}

	/// Registers `creator` for blocks whose type keyword is `type_name`.
	///
	/// Buffered blocks carrying that keyword become declarations right away.
	pub fn register_decl_type(&self, type_name: &str, creator: Arc<dyn DeclarationCreator>) -> Result<()> {
		let merge = self.shared.merge.lock();
		let decl_type = creator.decl_type();
		{
			let mut creators = self.shared.creators.write();
			if creators.contains_name(type_name) {
				return Err(DeclError::DuplicateType(type_name.to_owned()));
			}
			creators.insert(type_name, creator);
		}

		tracing::debug!(type_name, decl_type = %decl_type, "decl.type.registered");
		self.shared.claim_unrecognized(&merge);
		Ok(())
	}

	/// Removes the creator registered under `type_name`. Declarations it
	/// created stay.
	pub fn unregister_decl_type(&self, type_name: &str) -> Result<()> {
		let _merge = self.shared.merge.lock();
		let creator = self.shared.creators.write().remove(type_name).ok_or_else(|| DeclError::UnknownType(type_name.to_owned()))?;
		tracing::debug!(type_name, decl_type = %creator.decl_type(), "decl.type.unregistered");
		Ok(())
	}

	/// Registers a folder and starts parsing it in the background.
	///
	/// `folder` may use either slash and may omit the trailing one;
	/// `extension` may carry a leading dot and is matched case-insensitively.
	pub fn register_decl_folder(&self, default_type: DeclType, folder: &str, extension: &str) {
		if self.shared.shutdown.is_cancelled() {
			tracing::warn!(decl_type = %default_type, folder, "decl.folder.rejected");
			return;
		}

		let folder = RegisteredFolder::new(default_type, folder, extension);
		let token = self.shared.next_token();
		let slot = {
			let mut folders = self.shared.folders.lock();
			folders.push(FolderSlot {
				folder: folder.clone(),
				token: token.clone(),
			});
			folders.len() - 1
		};

		tracing::debug!(decl_type = %default_type, folder = %folder.folder, extension = %folder.extension, "decl.folder.registered");
		self.spawn_job(slot, folder, token, false);
	}

	/// Looks up a declaration, waiting for pending jobs of `decl_type`.
	pub fn find_declaration(&self, decl_type: DeclType, name: &str) -> Option<Arc<dyn Declaration>> {
		self.ensure_type_finished(decl_type);
		self.shared.declarations.read().get(&decl_type)?.get(name).map(|entry| Arc::clone(&entry.decl))
	}

	/// Calls `visitor` for every declaration of `decl_type`, after pending
	/// jobs of that type are merged. No lock is held while `visitor` runs.
	pub fn foreach_declaration(&self, decl_type: DeclType, mut visitor: impl FnMut(&dyn Declaration)) {
		for decl in self.snapshot(decl_type) {
			visitor(decl.as_ref());
		}
	}

	/// Sorted names of all declarations of `decl_type`.
	pub fn declaration_names(&self, decl_type: DeclType) -> Vec<String> {
		let mut names: Vec<String> = self.snapshot(decl_type).iter().map(|decl| decl.decl_name().to_owned()).collect();
		names.sort_unstable();
		names
	}

	pub fn declaration_count(&self, decl_type: DeclType) -> usize {
		self.ensure_type_finished(decl_type);
		self.shared.declarations.read().get(&decl_type).map_or(0, HashMap::len)
	}

	/// Subscribes to merge completions of folder jobs for `decl_type`.
	///
	/// The event is sent before readers waiting on the type are released.
	/// Receivers that fall behind by more than a few events observe
	/// [`broadcast::error::RecvError::Lagged`].
	pub fn signal_decls_reloaded(&self, decl_type: DeclType) -> broadcast::Receiver<DeclsReloaded> {
		self.shared.signals.lock().entry(decl_type).or_insert_with(|| broadcast::channel(SIGNAL_CAPACITY).0).subscribe()
	}

	/// Re-reads every registered folder from scratch.
	///
	/// In-flight jobs are superseded and their results discarded. Existing
	/// declarations keep their identity and receive the new source text;
	/// declarations no longer found are removed.
	pub fn reload_declarations(&self) {
		tracing::info!(folders = self.shared.folders.lock().len(), "decl.reload.start");
		self.rescan(false);
	}

	/// Like [`Self::reload_declarations`], but files whose stamp did not
	/// change since they were last parsed are skipped.
	pub fn refresh_declarations(&self) {
		tracing::info!(folders = self.shared.folders.lock().len(), "decl.refresh.start");
		self.rescan(true);
	}

	/// Blocks until no job with default type `decl_type` is pending.
	///
	/// Returns immediately on the merge thread and inside creators called
	/// by [`Self::register_decl_type`].
	pub fn ensure_type_finished(&self, decl_type: DeclType) {
		if lookups_skip_wait() {
			return;
		}

		let mut jobs = self.shared.jobs.lock();
		while jobs.contains_key(&decl_type) {
			self.shared.jobs_done.wait(&mut jobs);
		}
	}

	/// Blocks until no job is pending.
	pub fn wait_until_idle(&self) {
		if lookups_skip_wait() {
			return;
		}

		let mut jobs = self.shared.jobs.lock();
		while !jobs.is_empty() {
			self.shared.jobs_done.wait(&mut jobs);
		}
	}

	/// Blocks whose type keyword matched no registered creator.
	pub fn unrecognized_block_count(&self) -> usize {
		self.shared.unrecognized.lock().len()
	}

	pub fn registered_folders(&self) -> Vec<RegisteredFolder> {
		self.shared.folders.lock().iter().map(|slot| slot.folder.clone()).collect()
	}

	/// Number of `(file, default type)` pairs in the file ledger.
	pub fn parsed_file_count(&self) -> usize {
		self.shared.ledger.lock().len()
	}

	/// Cancels pending jobs, waits until every job has reported, stops the
	/// merge thread and clears all state. Later calls do nothing.
	pub fn shutdown(&self) {
		let Some(merge_worker) = self.merge_worker.lock().take() else {
			return;
		};

		self.shared.shutdown.cancel();
		drop(self.results.lock().take());

		if ON_MERGE_WORKER.with(Cell::get) {
			tracing::warn!("decl.manager.shutdown_from_merge_worker");
		} else if merge_worker.join().is_err() {
			tracing::error!("decl.merge.worker_panicked");
		}

		self.shared.clear();
		tracing::debug!("decl.manager.shutdown");
	}

	fn snapshot(&self, decl_type: DeclType) -> Vec<Arc<dyn Declaration>> {
		self.ensure_type_finished(decl_type);
		self.shared
			.declarations
			.read()
			.get(&decl_type)
			.map(|decls| decls.values().map(|entry| Arc::clone(&entry.decl)).collect())
			.unwrap_or_default()
	}

	fn rescan(&self, skip_unchanged: bool) {
		if self.shared.shutdown.is_cancelled() {
			return;
		}

		let restarted: Vec<(usize, RegisteredFolder, GenerationToken)> = {
			let _merge = self.shared.merge.lock();
			if !skip_unchanged {
				self.shared.unrecognized.lock().clear();
			}

			let mut folders = self.shared.folders.lock();
			folders
				.iter_mut()
				.enumerate()
				.map(|(slot, entry)| {
					entry.token.cancel();
					entry.token = self.shared.next_token();
					(slot, entry.folder.clone(), entry.token.clone())
				})
				.collect()
		};

		for (slot, folder, token) in restarted {
			self.spawn_job(slot, folder, token, skip_unchanged);
		}
	}

	fn spawn_job(&self, slot: usize, folder: RegisteredFolder, token: GenerationToken, skip_unchanged: bool) {
		let Some(tx) = self.results.lock().clone() else {
			tracing::debug!(decl_type = %folder.default_type, folder = %folder.folder, "decl.job.rejected");
			return;
		};

		let type_names = self.shared.creators.read().type_names();
		let previous = self.shared.ledger.lock().files_in_folder(folder.default_type, &folder.folder);
		self.shared.jobs.lock().entry(folder.default_type).or_default().pending += 1;

		let generation = token.generation();
		tracing::trace!(decl_type = %folder.default_type, folder = %folder.folder, generation, skip_unchanged, "decl.job.spawn");

		let completion = JobCompletion::new(tx, slot, folder.default_type, generation);
		let parser = DeclarationFolderParser {
			slot,
			folder,
			vfs: Arc::clone(&self.shared.vfs),
			type_names,
			previous,
			skip_unchanged,
			max_depth: self.shared.options.max_depth,
			token,
		};

		drop(self.runtime.spawn_blocking(TaskClass::IoBlocking, move || completion.finish(parser.run())));
	}
}

impl Drop for DeclarationManager {
	fn drop(&mut self) {
		self.shutdown();
	}
}

impl Shared {
	fn next_token(&self) -> GenerationToken {
		GenerationToken::new(self.clock.next(), self.shutdown.child_token())
	}

	/// Whether `generation` is still the newest job of the folder in `slot`.
	fn is_current(&self, slot: usize, generation: u64) -> bool {
		self.folders.lock().get(slot).is_some_and(|entry| entry.token.generation() == generation)
	}

	fn handle_outcome(&self, outcome: JobOutcome) {
		match outcome {
			JobOutcome::Finished(result) if result.cancelled => {
				tracing::debug!(decl_type = %result.folder.default_type, folder = %result.folder.folder, generation = result.generation, "decl.merge.cancelled");
			}
			JobOutcome::Finished(result) => self.on_parser_finished(result),
			JobOutcome::Abandoned { slot, default_type, generation } => {
				tracing::warn!(decl_type = %default_type, slot, generation, "decl.job.abandoned");
			}
		}
	}

	fn emit_reloaded(&self, decl_type: DeclType, generation: u64) {
		if let Some(tx) = self.signals.lock().get(&decl_type) {
			let _ = tx.send(DeclsReloaded { decl_type, generation });
		}
	}

	fn finish_job(&self, decl_type: DeclType) {
		let mut jobs = self.jobs.lock();
		if let Some(running) = jobs.get_mut(&decl_type) {
			running.pending = running.pending.saturating_sub(1);
			if running.pending == 0 {
				jobs.remove(&decl_type);
			}
		}
		self.jobs_done.notify_all();
	}

	fn clear(&self) {
		self.creators.write().clear();
		self.declarations.write().clear();
		self.unrecognized.lock().clear();
		self.ledger.lock().clear();
		self.folders.lock().clear();
		self.signals.lock().clear();
		self.jobs.lock().clear();
		self.jobs_done.notify_all();
	}
}

impl JobOutcome {
	fn default_type(&self) -> DeclType {
		match self {
			Self::Finished(result) => result.folder.default_type,
			Self::Abandoned { default_type, .. } => *default_type,
		}
	}
}

fn run_merge_worker(shared: Arc<Shared>, rx: Receiver<JobOutcome>) {
	ON_MERGE_WORKER.with(|flag| flag.set(true));

	while let Ok(outcome) = rx.recv() {
		let decl_type = outcome.default_type();
		if panic::catch_unwind(AssertUnwindSafe(|| shared.handle_outcome(outcome))).is_err() {
			tracing::error!(decl_type = %decl_type, "decl.merge.panicked");
		}
		shared.finish_job(decl_type);
	}

	tracing::debug!("decl.merge.stopped");
}
