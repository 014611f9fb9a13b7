use std::future::Future;

use tokio::task::JoinHandle;

/// Scheduling class of engine work, used for prioritization and tracing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskClass {
	/// Work on the document the user is looking at.
	Interactive,
	/// Work that can trail behind, e.g. hidden or merely visible documents.
	Background,
}

impl TaskClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Interactive => "interactive",
			Self::Background => "background",
		}
	}
}

/// Spawns engine work on the current Tokio runtime.
///
/// Panics outside a runtime, like [`tokio::spawn`].
pub(crate) fn spawn<F>(class: TaskClass, fut: F) -> JoinHandle<F::Output>
where
	F: Future + Send + 'static,
	F::Output: Send + 'static,
{
	tracing::trace!(task_class = class.as_str(), "engine.spawn");
	tokio::spawn(fut)
}
