//! Per-language token settings.
//!
//! Settings are read through the host at two scopes, document-local and
//! global, as JSON of the shape:
//!
//! ```json
//! { "CLS_ClassName": { "enabled": true, "exclusions": ["%Library.*"] } }
//! ```
//!
//! A section that is missing, not an object, or malformed contributes no
//! token types.

use async_trait::async_trait;
use codespex_tokens::ExclusionSet;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::Result;
use crate::host::DocumentKey;

/// Where a setting is read from or written to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SettingsScope {
	/// Settings resolved for one document (workspace/folder level).
	Document(DocumentKey),
	Global,
}

/// Scope chosen when persisting an exclusion rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusionScope {
	Local,
	Global,
}

/// Settings backend of the host.
#[async_trait]
pub trait SettingsStore: Send + Sync {
	/// Reads the value of `section` at `scope`, `None` when unset.
	async fn read(&self, scope: &SettingsScope, section: &str) -> Result<Option<Value>>;

	/// Persists `value` under the dotted `key` at `scope`.
	async fn write(&self, scope: &SettingsScope, key: &str, value: Value) -> Result<()>;
}

/// Settings of one token type at one scope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenSettings {
	pub enabled: Option<bool>,
	pub exclusions: Vec<String>,
}

/// Parses a token settings section, treating any malformed shape as empty.
pub(crate) fn parse_tokens(section: &str, value: Option<Value>) -> IndexMap<String, TokenSettings> {
	let Some(value) = value else {
		return IndexMap::new();
	};
	if !value.is_object() {
		warn!(section, "settings.tokens.not_an_object");
		return IndexMap::new();
	}
	match serde_json::from_value(value) {
		Ok(tokens) => tokens,
		Err(error) => {
			warn!(section, %error, "settings.tokens.malformed");
			IndexMap::new()
		}
	}
}

/// Effective token settings for one language, combining both scopes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LanguageSettings {
	local: IndexMap<String, TokenSettings>,
	global: IndexMap<String, TokenSettings>,
}

impl LanguageSettings {
	pub fn new(local: IndexMap<String, TokenSettings>, global: IndexMap<String, TokenSettings>) -> Self {
		Self { local, global }
	}

	/// Reads and combines both scopes for `doc` from `store`.
	pub async fn load(store: &dyn SettingsStore, section: &str, doc: &DocumentKey) -> Result<Self> {
		let local = store.read(&SettingsScope::Document(doc.clone()), section).await?;
		let global = store.read(&SettingsScope::Global, section).await?;
		Ok(Self::new(parse_tokens(section, local), parse_tokens(section, global)))
	}

	/// Enabled token types in declaration order, local declarations first.
	///
	/// A local `enabled` value overrides the global one.
	pub fn targets(&self) -> Vec<String> {
		let declared = self.local.keys().chain(self.global.keys().filter(|name| !self.local.contains_key(*name)));
		declared.filter(|name| self.is_enabled(name)).cloned().collect()
	}

	pub fn is_enabled(&self, token_type: &str) -> bool {
		let local = self.local.get(token_type).and_then(|t| t.enabled);
		let global = self.global.get(token_type).and_then(|t| t.enabled);
		local.or(global).unwrap_or(false)
	}

	/// Local rules followed by global rules, without duplicates.
	pub fn exclusions(&self, token_type: &str) -> ExclusionSet {
		let local = self.local.get(token_type).map(|t| t.exclusions.as_slice()).unwrap_or_default();
		let global = self.global.get(token_type).map(|t| t.exclusions.as_slice()).unwrap_or_default();
		local.iter().chain(global).collect()
	}
}
