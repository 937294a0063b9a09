//! Worker runtime shared by the declaration crates.
//!
//! * [`TaskClass`]: execution classes used for logging and thread naming
//! * [`WorkerRuntime`]: explicit executor owning (or borrowing) a Tokio runtime
//! * [`GenerationClock`] / [`GenerationToken`]: generation-scoped cancellation

mod class;
mod runtime;
mod token;

pub use class::TaskClass;
pub use runtime::WorkerRuntime;
pub use token::{GenerationClock, GenerationToken};
