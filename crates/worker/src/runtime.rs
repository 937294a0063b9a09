use std::fmt;
use std::sync::Arc;

use tokio::runtime::{Builder, Handle, Runtime};
use tokio::task::JoinHandle;

use crate::TaskClass;

/// Explicit executor for background work.
///
/// Either owns a dedicated multi-threaded Tokio runtime ([`Self::new`]) or
/// borrows the handle of one the host already runs ([`Self::from_handle`]).
/// Clones share the same runtime; an owned runtime is shut down in the
/// background once the last clone is dropped, so dropping never blocks and is
/// safe from inside async contexts.
#[derive(Clone)]
pub struct WorkerRuntime {
	handle: Handle,
	owned: Option<Arc<OwnedRuntime>>,
}

struct OwnedRuntime(Option<Runtime>);

impl Drop for OwnedRuntime {
	fn drop(&mut self) {
		if let Some(runtime) = self.0.take() {
			runtime.shutdown_background();
		}
	}
}

impl fmt::Debug for WorkerRuntime {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("WorkerRuntime").field("owned", &self.owned.is_some()).finish_non_exhaustive()
	}
}

impl WorkerRuntime {
	/// Builds a runtime with `worker_threads` workers named `thread_name`.
	pub fn new(worker_threads: usize, thread_name: &str) -> std::io::Result<Self> {
		let runtime = Builder::new_multi_thread().worker_threads(worker_threads.max(1)).thread_name(thread_name).build()?;
		tracing::debug!(worker_threads = worker_threads.max(1), thread_name, "worker.runtime.start");
		Ok(Self {
			handle: runtime.handle().clone(),
			owned: Some(Arc::new(OwnedRuntime(Some(runtime)))),
		})
	}

	/// Wraps a runtime owned by the host.
	pub fn from_handle(handle: Handle) -> Self {
		Self { handle, owned: None }
	}

	pub fn handle(&self) -> &Handle {
		&self.handle
	}

	/// Spawns blocking work on the runtime's blocking pool.
	pub fn spawn_blocking<F, R>(&self, class: TaskClass, f: F) -> JoinHandle<R>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		tracing::trace!(worker_class = class.as_str(), "worker.spawn_blocking");
		self.handle.spawn_blocking(f)
	}

	/// Spawns a dedicated named OS thread outside the runtime.
	pub fn spawn_named_thread<F, R>(&self, class: TaskClass, name: impl Into<String>, f: F) -> std::io::Result<std::thread::JoinHandle<R>>
	where
		F: FnOnce() -> R + Send + 'static,
		R: Send + 'static,
	{
		tracing::trace!(worker_class = class.as_str(), "worker.spawn_named_thread");
		std::thread::Builder::new().name(name.into()).spawn(f)
	}
}
