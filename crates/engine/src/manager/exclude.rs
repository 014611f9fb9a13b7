//! Persisting exclusion rules picked from an annotation.

use codespex_tokens::exclusion_candidates;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::AnnotationManager;
use crate::annotation::{AnnotationHandle, TokenIdentity};
use crate::settings::{ExclusionScope, SettingsScope};
use crate::{Error, Result};

impl AnnotationManager {
	/// Offers exclusion rules for the annotation's identity, most specific
	/// first, and appends the picked one to the rule list at `scope`.
	///
	/// Returns the persisted rule, or `None` when the pick was dismissed. The
	/// new rule takes effect on the next rebuild, which the host triggers
	/// through its configuration-change notification.
	pub async fn exclude(&self, handle: &AnnotationHandle, scope: ExclusionScope) -> Result<Option<String>> {
		let (identity, language_id) = {
			let mut state = self.inner.state.lock();
			let language_id = state
				.documents
				.get(&handle.document)
				.map(|entry| entry.language_id.clone())
				.ok_or_else(|| super::unknown(handle))?;
			(state.annotation_mut(handle)?.identity.clone(), language_id)
		};

		let marker = self.inner.canonicalizer.marker_for(&identity.token_type, &identity.canonical_value);
		let candidates = exclusion_candidates(&identity.canonical_value, marker);
		debug!(doc = %handle.document, candidates = candidates.len(), "exclusion.candidates");

		let Some(rule) = self.inner.host.surface.pick_exclusion(&identity, &candidates).await else {
			debug!(doc = %handle.document, "exclusion.pick_dismissed");
			return Ok(None);
		};

		let settings_scope = match scope {
			ExclusionScope::Local => SettingsScope::Document(handle.document.clone()),
			ExclusionScope::Global => SettingsScope::Global,
		};
		match self.persist_rule(&settings_scope, &language_id, &identity, &rule).await {
			Ok(()) => {
				info!(doc = %handle.document, ?scope, token_type = %identity.token_type, rule = %rule, "exclusion.persisted");
				Ok(Some(rule))
			}
			Err(error) => {
				warn!(doc = %handle.document, ?scope, rule = %rule, %error, "exclusion.persist_failed");
				self.inner.host.surface.report(&format!("Failed to save exclusion rule \"{rule}\": {error}"));
				Err(error)
			}
		}
	}

	/// Appends `rule` to the stored list, keeping every existing entry as is.
	async fn persist_rule(&self, scope: &SettingsScope, language_id: &str, identity: &TokenIdentity, rule: &str) -> Result<()> {
		let config = &self.inner.config;
		let section = config.tokens_section(language_id);
		let key = config.exclusions_key(language_id, &identity.token_type);
		let current = self.inner.host.settings.read(scope, &section).await?;

		let stored = current
			.as_ref()
			.and_then(|tokens| tokens.get(&identity.token_type))
			.and_then(|settings| settings.get("exclusions"));
		let mut rules = match stored {
			None | Some(Value::Null) => Vec::new(),
			Some(Value::Array(rules)) => rules.clone(),
			Some(other) => {
				return Err(Error::Settings {
					key,
					message: format!("expected a list of rules, found {other}"),
				});
			}
		};

		if rules.iter().any(|existing| existing.as_str() == Some(rule)) {
			debug!(rule, "exclusion.already_present");
			return Ok(());
		}
		rules.push(Value::String(rule.to_owned()));

		self.inner
			.host
			.settings
			.write(scope, &key, Value::Array(rules))
			.await
			.map_err(|error| match error {
				Error::Settings { .. } => error,
				other => Error::Settings {
					key: key.clone(),
					message: other.to_string(),
				},
			})
	}
}
