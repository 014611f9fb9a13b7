//! One annotation build pass for one document.
//!
//! ```text
//! settings ─▶ legend ─▶ tokens ─▶ decode + merge ─▶ canonicalize ─▶ exclude ─▶ hover (cached)
//! ```
//!
//! A pass never mutates shared state; the manager decides whether its result
//! is still wanted once it completes.

use std::sync::Arc;

use codespex_tokens::{Canonicalizer, TargetTypes, decode, first_line};
use lsp_types::Range;
use tracing::{debug, trace, warn};

use crate::Result;
use crate::annotation::{AnnotationDraft, TokenIdentity};
use crate::config::EngineConfig;
use crate::host::{DocumentSnapshot, LanguageServices};
use crate::hover::{HoverCache, hover_body};
use crate::settings::{LanguageSettings, SettingsStore};

/// Why a pass produced nothing worth keeping a registry entry for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AbortReason {
	NoTargets,
	NoLegend,
	NoMatchingTypes,
	NoTokens,
}

impl AbortReason {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::NoTargets => "no_targets",
			Self::NoLegend => "no_legend",
			Self::NoMatchingTypes => "no_matching_types",
			Self::NoTokens => "no_tokens",
		}
	}
}

#[derive(Debug)]
pub(crate) enum BuildOutcome {
	Aborted(AbortReason),
	/// Annotations in token-type discovery order, then range order.
	Built(Vec<AnnotationDraft>),
}

pub(crate) struct Builder<'a> {
	pub config: &'a EngineConfig,
	pub canonicalizer: &'a Canonicalizer,
	pub services: &'a dyn LanguageServices,
	pub settings: &'a dyn SettingsStore,
}

impl Builder<'_> {
	pub async fn run(&self, doc: &DocumentSnapshot) -> Result<BuildOutcome> {
		let section = self.config.tokens_section(&doc.language_id);
		let settings = LanguageSettings::load(self.settings, &section, &doc.key).await?;
		let targets = settings.targets();
		if targets.is_empty() {
			return Ok(BuildOutcome::Aborted(AbortReason::NoTargets));
		}

		let Some(legend) = self.services.legend(&doc.key).await?.filter(|l| !l.token_types.is_empty()) else {
			return Ok(BuildOutcome::Aborted(AbortReason::NoLegend));
		};
		let target_types = TargetTypes::from_legend(&legend, &targets);
		if target_types.is_empty() {
			return Ok(BuildOutcome::Aborted(AbortReason::NoMatchingTypes));
		}

		let data = self.services.semantic_tokens(&doc.key).await?;
		if data.is_empty() {
			return Ok(BuildOutcome::Aborted(AbortReason::NoTokens));
		}

		let mut decoded = decode(&data, &target_types, self.config.decode);
		decoded.merge_adjacent();
		trace!(doc = %doc.key, types = decoded.type_count(), ranges = decoded.range_count(), "build.decoded");

		let mut cache = HoverCache::new();
		let mut drafts = Vec::with_capacity(decoded.range_count());
		let mut excluded = 0usize;

		for (token_type, entry) in decoded.iter() {
			let exclusions = settings.exclusions(token_type);
			for &range in &entry.ranges {
				let text = first_line(&doc.text_in(range, self.config.offset_encoding)).to_owned();
				let canonical = self.canonicalizer.canonicalize(token_type, &text);
				if exclusions.is_excluded(&canonical) {
					excluded += 1;
					continue;
				}

				let body = match cache.get(entry.type_id, &canonical) {
					Some(body) => body,
					None => {
						let Some(body) = self.lookup(doc, range).await else {
							trace!(doc = %doc.key, token_type, canonical = %canonical, "build.hover_miss");
							continue;
						};
						cache.insert(entry.type_id, &canonical, body.clone());
						body
					}
				};

				drafts.push(AnnotationDraft {
					identity: TokenIdentity {
						token_type: token_type.to_owned(),
						canonical_value: canonical,
					},
					text,
					range,
					body: body.to_string(),
				});
			}
		}

		debug!(
			doc = %doc.key,
			annotations = drafts.len(),
			excluded,
			cache_hits = cache.hits(),
			cache_misses = cache.misses(),
			"build.pass_complete"
		);
		Ok(BuildOutcome::Built(drafts))
	}

	/// Asks for the hover at the end of `range`, which providers answer more
	/// reliably than the start.
	async fn lookup(&self, doc: &DocumentSnapshot, range: Range) -> Option<Arc<str>> {
		match self.services.hover(&doc.key, range.end).await {
			Ok(hover) => hover.as_ref().and_then(hover_body).map(Arc::from),
			Err(error) => {
				warn!(doc = %doc.key, line = range.end.line, character = range.end.character, %error, "build.hover_failed");
				None
			}
		}
	}
}
