//! Per-document annotation lifecycle.
//!
//! Each tracked document moves through:
//!
//! ```text
//! absent ──ensure──▶ building ──commit──▶ built
//!   ▲                   │ abort              │
//!   └───────────────────┴──── close ─────────┘
//!
//! edit (debounced) / settings change: built|building ──teardown──▶ absent ──▶ building
//! ```
//!
//! # Single-flight builds
//!
//! An empty `building` entry is registered before the first suspension
//! point of a build, so a second `ensure` for the same document while the
//! first is in flight is a no-op. Presence of the entry, not the number of
//! annotations, is the guard: a document whose annotations were all dismissed
//! stays `built` and is not rebuilt until explicitly torn down.
//!
//! # Staleness
//!
//! Every entry carries the generation of the build that created it. A
//! completed build commits only if the entry for its document still carries
//! its generation; a close or a teardown in the meantime discards the result.

use std::collections::HashMap;
use std::sync::Arc;

use codespex_tokens::Canonicalizer;
use futures::future::join_all;
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::annotation::{Annotation, AnnotationHandle, AnnotationId};
use crate::build::{BuildOutcome, Builder};
use crate::config::EngineConfig;
use crate::host::{DocumentKey, Host};
use crate::tasks::{self, TaskClass};
use crate::{Error, Result};

mod exclude;
mod resolution;


/// Observable lifecycle state of one document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentState {
	Absent,
	Building,
	Built,
}

#[derive(Debug)]
struct DocumentEntry {
	generation: u64,
	language_id: String,
	built: bool,
	annotations: Vec<Annotation>,
}

/// Pending edit-triggered rebuild of one document.
#[derive(Debug)]
struct DebounceTimer {
	seq: u64,
	cancel: CancellationToken,
}

#[derive(Debug, Default)]
struct Registry {
	documents: HashMap<DocumentKey, DocumentEntry>,
	timers: HashMap<DocumentKey, DebounceTimer>,
	next_generation: u64,
	next_timer: u64,
	next_annotation: u64,
	commenting_hidden: bool,
}

impl Registry {
	fn annotation_mut(&mut self, handle: &AnnotationHandle) -> Result<&mut Annotation> {
		self.documents
			.get_mut(&handle.document)
			.and_then(|entry| entry.annotations.iter_mut().find(|a| a.id == handle.id))
			.ok_or_else(|| unknown(handle))
	}

	fn cancel_timer(&mut self, key: &DocumentKey) {
		if let Some(timer) = self.timers.remove(key) {
			timer.cancel.cancel();
			trace!(doc = %key, seq = timer.seq, "debounce.cancelled");
		}
	}
}

fn unknown(handle: &AnnotationHandle) -> Error {
	Error::UnknownAnnotation {
		document: handle.document.clone(),
		id: handle.id,
	}
}

struct Inner {
	config: EngineConfig,
	canonicalizer: Canonicalizer,
	host: Host,
	state: Mutex<Registry>,
}

/// Owns the document → annotations and document → pending rebuild registries.
///
/// Cheap to clone; clones share state. Independent instances share nothing.
#[derive(Clone)]
pub struct AnnotationManager {
	inner: Arc<Inner>,
}

impl std::fmt::Debug for AnnotationManager {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let state = self.inner.state.lock();
		f.debug_struct("AnnotationManager")
			.field("documents", &state.documents.len())
			.field("pending_rebuilds", &state.timers.len())
			.finish()
	}
}

impl AnnotationManager {
	pub fn new(config: EngineConfig, host: Host) -> Self {
		let canonicalizer = config.canonicalizer();
		Self {
			inner: Arc::new(Inner {
				config,
				canonicalizer,
				host,
				state: Mutex::new(Registry::default()),
			}),
		}
	}

	pub fn config(&self) -> &EngineConfig {
		&self.inner.config
	}

	pub fn document_state(&self, key: &DocumentKey) -> DocumentState {
		match self.inner.state.lock().documents.get(key) {
			None => DocumentState::Absent,
			Some(entry) if entry.built => DocumentState::Built,
			Some(_) => DocumentState::Building,
		}
	}

	/// Snapshot of a document's live annotations, in build order.
	pub fn annotations(&self, key: &DocumentKey) -> Vec<Annotation> {
		self.inner
			.state
			.lock()
			.documents
			.get(key)
			.map(|entry| entry.annotations.clone())
			.unwrap_or_default()
	}

	/// Documents with a registry entry, in no particular order.
	pub fn tracked_documents(&self) -> Vec<DocumentKey> {
		self.inner.state.lock().documents.keys().cloned().collect()
	}

	pub fn has_pending_rebuild(&self, key: &DocumentKey) -> bool {
		self.inner.state.lock().timers.contains_key(key)
	}

	/// Schedules annotation of the documents visible at startup.
	///
	/// # Panics
	///
	/// Panics when called outside a Tokio runtime.
	pub fn start(&self) -> JoinHandle<()> {
		let manager = self.clone();
		let delay = self.inner.config.startup_delay();
		tasks::spawn(TaskClass::Background, async move {
			tokio::time::sleep(delay).await;
			let visible = manager.inner.host.workspace.visible_documents();
			info!(documents = visible.len(), "lifecycle.startup");
			manager.visible_documents_changed(visible).await;
		})
	}

	/// Builds annotations for every newly visible document, concurrently.
	pub async fn visible_documents_changed(&self, documents: Vec<DocumentKey>) {
		join_all(documents.iter().map(|key| self.ensure_document(key))).await;
	}

	/// Builds a document's annotations unless it already has a registry entry.
	pub async fn ensure_document(&self, key: &DocumentKey) -> DocumentState {
		let Some(doc) = self.inner.host.workspace.snapshot(key) else {
			trace!(doc = %key, "lifecycle.no_snapshot");
			return self.document_state(key);
		};

		let generation = {
			let mut state = self.inner.state.lock();
			if let Some(entry) = state.documents.get(key) {
				trace!(doc = %key, generation = entry.generation, "lifecycle.already_tracked");
				return if entry.built { DocumentState::Built } else { DocumentState::Building };
			}
			state.next_generation += 1;
			let generation = state.next_generation;
			state.documents.insert(
				key.clone(),
				DocumentEntry {
					generation,
					language_id: doc.language_id.clone(),
					built: false,
					annotations: Vec::new(),
				},
			);
			generation
		};
		debug!(doc = %key, generation, language = %doc.language_id, "lifecycle.build_started");

		let builder = Builder {
			config: &self.inner.config,
			canonicalizer: &self.inner.canonicalizer,
			services: self.inner.host.services.as_ref(),
			settings: self.inner.host.settings.as_ref(),
		};
		let outcome = builder.run(&doc).await;
		self.commit(key, generation, outcome)
	}

	fn commit(&self, key: &DocumentKey, generation: u64, outcome: Result<BuildOutcome>) -> DocumentState {
		let mut state = self.inner.state.lock();
		let current = state.documents.get(key).map(|entry| entry.generation);
		if current != Some(generation) {
			debug!(doc = %key, generation, ?current, "lifecycle.stale_build_discarded");
			return match state.documents.get(key) {
				None => DocumentState::Absent,
				Some(entry) if entry.built => DocumentState::Built,
				Some(_) => DocumentState::Building,
			};
		}

		let drafts = match outcome {
			Ok(BuildOutcome::Built(drafts)) => drafts,
			Ok(BuildOutcome::Aborted(reason)) => {
				state.documents.remove(key);
				debug!(doc = %key, generation, reason = reason.as_str(), "lifecycle.build_aborted");
				return DocumentState::Absent;
			}
			Err(error) => {
				state.documents.remove(key);
				warn!(doc = %key, generation, %error, "lifecycle.build_failed");
				return DocumentState::Absent;
			}
		};

		let first_id = state.next_annotation;
		state.next_annotation += drafts.len() as u64;
		let annotations: Vec<Annotation> = drafts
			.into_iter()
			.enumerate()
			.map(|(offset, draft)| Annotation::from_draft(AnnotationId(first_id + offset as u64 + 1), key.clone(), draft))
			.collect();

		let author = &self.inner.config.author;
		for annotation in &annotations {
			self.inner.host.surface.show(&annotation.view(author));
		}
		info!(doc = %key, generation, annotations = annotations.len(), "lifecycle.build_committed");

		if let Some(entry) = state.documents.get_mut(key) {
			entry.built = true;
			entry.annotations = annotations;
		}
		DocumentState::Built
	}

	/// Disposes a document's annotations and forgets it, making the next
	/// `ensure` rebuild from scratch. Any in-flight build becomes stale.
	fn teardown(&self, key: &DocumentKey) {
		let mut state = self.inner.state.lock();
		if let Some(entry) = state.documents.remove(key) {
			for annotation in &entry.annotations {
				self.inner.host.surface.dispose(annotation);
			}
			debug!(doc = %key, generation = entry.generation, disposed = entry.annotations.len(), "lifecycle.teardown");
		}
	}

	/// Tears down and rebuilds one document, whatever its current state.
	pub async fn rebuild_document(&self, key: &DocumentKey) -> DocumentState {
		self.teardown(key);
		self.ensure_document(key).await
	}

	/// Records an edit. Non-empty edits to a tracked document (re)start its
	/// debounce timer; the rebuild runs once edits stop for the quiet period.
	///
	/// # Panics
	///
	/// Panics when a timer has to be started outside a Tokio runtime.
	pub fn document_changed(&self, key: &DocumentKey, content_changes: usize) {
		if content_changes == 0 {
			return;
		}

		let (seq, cancel) = {
			let mut state = self.inner.state.lock();
			if !state.documents.contains_key(key) {
				return;
			}
			state.cancel_timer(key);
			state.next_timer += 1;
			let seq = state.next_timer;
			let cancel = CancellationToken::new();
			state.timers.insert(
				key.clone(),
				DebounceTimer {
					seq,
					cancel: cancel.clone(),
				},
			);
			(seq, cancel)
		};

		let quiet = self.inner.config.debounce();
		trace!(doc = %key, seq, quiet_ms = self.inner.config.debounce_ms, "debounce.scheduled");

		let manager = self.clone();
		let key = key.clone();
		tasks::spawn(TaskClass::Background, async move {
			tokio::select! {
				_ = cancel.cancelled() => return,
				_ = tokio::time::sleep(quiet) => {}
			}
			if !manager.take_timer(&key, seq) {
				return;
			}
			debug!(doc = %key, seq, "debounce.fired");
			manager.rebuild_document(&key).await;
		});
	}

	/// Removes the timer for `key` if it is still the one numbered `seq`.
	fn take_timer(&self, key: &DocumentKey, seq: u64) -> bool {
		let mut state = self.inner.state.lock();
		if state.timers.get(key).is_some_and(|timer| timer.seq == seq) {
			state.timers.remove(key);
			true
		} else {
			false
		}
	}

	/// Forgets a closed document: cancels its pending rebuild and disposes
	/// its annotations. A build still in flight is discarded on completion.
	pub fn document_closed(&self, key: &DocumentKey) {
		self.inner.state.lock().cancel_timer(key);
		self.teardown(key);
	}

	/// Rebuild order after a settings change: the active document, then the
	/// other visible documents, then every other tracked document.
	pub(crate) fn refresh_order(&self) -> Vec<(TaskClass, DocumentKey)> {
		let workspace = &self.inner.host.workspace;
		let active = workspace.active_document();
		let mut order: Vec<(TaskClass, DocumentKey)> = Vec::new();
		let mut push = |class: TaskClass, key: DocumentKey| {
			if !order.iter().any(|(_, k)| *k == key) {
				order.push((class, key));
			}
		};

		if let Some(active) = active {
			push(TaskClass::Interactive, active);
		}
		for key in workspace.visible_documents() {
			push(TaskClass::Background, key);
		}
		let mut tracked = self.tracked_documents();
		tracked.sort();
		for key in tracked {
			push(TaskClass::Background, key);
		}
		order
	}

	/// Rebuilds every relevant document immediately after a settings change.
	///
	/// Each document is rebuilt on its own task so a slow one does not hold
	/// back the others.
	pub async fn configuration_changed(&self) {
		let order = self.refresh_order();
		info!(documents = order.len(), "lifecycle.configuration_changed");

		let handles: Vec<_> = order
			.into_iter()
			.map(|(class, key)| {
				let manager = self.clone();
				tasks::spawn(class, async move {
					manager.inner.state.lock().cancel_timer(&key);
					manager.rebuild_document(&key).await;
				})
			})
			.collect();

		for result in join_all(handles).await {
			if let Err(error) = result {
				warn!(%error, "lifecycle.refresh_task_failed");
			}
		}
	}
}
