//! Hover documentation extraction and the per-build hover cache.

use std::collections::HashMap;
use std::sync::Arc;

use codespex_tokens::TokenTypeId;
use lsp_types::{Hover, HoverContents, MarkedString};

/// Markdown fragments of a hover, in provider order.
pub fn hover_fragments(hover: &Hover) -> Vec<String> {
	match &hover.contents {
		HoverContents::Scalar(marked) => vec![marked_to_markdown(marked)],
		HoverContents::Array(items) => items.iter().map(marked_to_markdown).collect(),
		HoverContents::Markup(markup) => vec![markup.value.clone()],
	}
}

/// Joins all fragments with a blank line; `None` when there are none.
pub fn hover_body(hover: &Hover) -> Option<String> {
	let fragments = hover_fragments(hover);
	if fragments.is_empty() {
		return None;
	}
	Some(fragments.join("\n\n"))
}

fn marked_to_markdown(marked: &MarkedString) -> String {
	match marked {
		MarkedString::String(text) => text.clone(),
		MarkedString::LanguageString(code) => format!("```{}\n{}\n```", code.language, code.value),
	}
}

/// Memoizes documentation bodies by `(token type id, canonical value)`.
///
/// Scoped to one build pass of one document, so legend ids cannot collide.
/// Only successful lookups are cached; a miss is retried next time the same
/// identity is met.
#[derive(Debug, Default)]
pub struct HoverCache {
	entries: HashMap<(TokenTypeId, String), Arc<str>>,
	hits: usize,
	misses: usize,
}

impl HoverCache {
	pub fn new() -> Self {
		Self::default()
	}

	/// Returns the cached body, counting a hit or a miss.
	pub fn get(&mut self, type_id: TokenTypeId, canonical: &str) -> Option<Arc<str>> {
		// Tuple keys can't borrow-lookup, so this allocates once per probe.
		match self.entries.get(&(type_id, canonical.to_owned())) {
			Some(body) => {
				self.hits += 1;
				Some(body.clone())
			}
			None => {
				self.misses += 1;
				None
			}
		}
	}

	pub fn insert(&mut self, type_id: TokenTypeId, canonical: &str, body: Arc<str>) {
		self.entries.insert((type_id, canonical.to_owned()), body);
	}

	pub fn len(&self) -> usize {
		self.entries.len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.is_empty()
	}

	pub fn hits(&self) -> usize {
		self.hits
	}

	pub fn misses(&self) -> usize {
		self.misses
	}
}
