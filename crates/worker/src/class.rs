/// Execution classes for work submitted to a [`WorkerRuntime`](crate::WorkerRuntime).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Filesystem-bound work (folder scans) on the blocking pool.
	IoBlocking,
	/// Long-lived dedicated threads that drain results from other tasks.
	Dedicated,
}

impl TaskClass {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::IoBlocking => "io_blocking",
			Self::Dedicated => "dedicated",
		}
	}
}
