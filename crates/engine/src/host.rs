//! Interfaces to the editor hosting the engine.
//!
//! The engine never touches the document model, the language service, the
//! settings backend or the comment UI directly; each is reached through one
//! of the traits below, shared as `Arc<dyn …>`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lsp_types::{Hover, Position, Range, SemanticTokensLegend};
use ropey::Rope;

use crate::Result;
use crate::annotation::{Annotation, CommentView, TokenIdentity};
use crate::position::{OffsetEncoding, line_content_end, lsp_position_to_char};
use crate::settings::SettingsStore;

/// Stable identity of an open document, derived from its location.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentKey(Arc<str>);

impl DocumentKey {
	pub fn new(key: impl Into<Arc<str>>) -> Self {
		Self(key.into())
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}
}

impl fmt::Display for DocumentKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.0)
	}
}

impl From<&str> for DocumentKey {
	fn from(key: &str) -> Self {
		Self::new(key)
	}
}

impl From<String> for DocumentKey {
	fn from(key: String) -> Self {
		Self::new(key)
	}
}

/// Point-in-time view of a document's text.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
	pub key: DocumentKey,
	/// Language ID for the document (e.g., "objectscript").
	pub language_id: String,
	pub text: Rope,
}

impl DocumentSnapshot {
	pub fn new(key: DocumentKey, language_id: impl Into<String>, text: impl AsRef<str>) -> Self {
		Self {
			key,
			language_id: language_id.into(),
			text: Rope::from_str(text.as_ref()),
		}
	}

	/// Returns the text under `range`, truncated to its first line.
	///
	/// `range` is in `encoding` units. Columns past the end of the line are
	/// clamped; a start line beyond the document yields an empty string.
	pub fn text_in(&self, range: Range, encoding: OffsetEncoding) -> String {
		let Some(start) = lsp_position_to_char(&self.text, range.start, encoding) else {
			return String::new();
		};
		let line_end = line_content_end(&self.text, range.start.line as usize);
		let end = if range.end.line == range.start.line {
			lsp_position_to_char(&self.text, range.end, encoding).unwrap_or(line_end)
		} else {
			line_end
		};
		self.text.slice(start..end.max(start)).to_string()
	}
}

/// Language analysis queries, typically forwarded to a language server.
#[async_trait]
pub trait LanguageServices: Send + Sync {
	/// Semantic token legend the document's token stream is encoded against.
	async fn legend(&self, doc: &DocumentKey) -> Result<Option<SemanticTokensLegend>>;

	/// Flat stride-5 semantic token stream for the whole document.
	async fn semantic_tokens(&self, doc: &DocumentKey) -> Result<Vec<u32>>;

	/// Hover documentation at `position`, if any.
	async fn hover(&self, doc: &DocumentKey, position: Position) -> Result<Option<Hover>>;
}

/// Editor document model queries.
pub trait Workspace: Send + Sync {
	fn snapshot(&self, doc: &DocumentKey) -> Option<DocumentSnapshot>;

	fn active_document(&self) -> Option<DocumentKey>;

	fn visible_documents(&self) -> Vec<DocumentKey>;
}

/// Comment-thread UI the annotations are rendered into.
///
/// The synchronous methods are called while the engine's registry is locked
/// so the UI observes changes in registry order. Implementations must not
/// call back into the [`AnnotationManager`](crate::AnnotationManager) from
/// them.
#[async_trait]
pub trait CommentSurface: Send + Sync {
	/// Creates the read-only comment thread for a new annotation.
	fn show(&self, view: &CommentView);

	/// Refreshes an existing thread after a resolution change.
	fn update(&self, view: &CommentView);

	/// Releases the thread of an annotation that no longer exists.
	fn dispose(&self, annotation: &Annotation);

	fn set_commenting_visible(&self, visible: bool);

	/// Asks the user to pick one exclusion rule; `None` when dismissed.
	async fn pick_exclusion(&self, identity: &TokenIdentity, candidates: &[String]) -> Option<String>;

	/// Surfaces a non-fatal failure on the host's diagnostic channel.
	fn report(&self, message: &str);
}

/// Bundle of host services handed to the manager.
#[derive(Clone)]
pub struct Host {
	pub services: Arc<dyn LanguageServices>,
	pub workspace: Arc<dyn Workspace>,
	pub settings: Arc<dyn SettingsStore>,
	pub surface: Arc<dyn CommentSurface>,
}

impl fmt::Debug for Host {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Host").finish_non_exhaustive()
	}
}
