//! Engine configuration.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration:
//!
//! ```toml
//! namespace = "codeSpex.languages"
//! author = "codeSpex"
//! debounce-ms = 1000
//! startup-delay-ms = 1000
//! decode = "mirrored-half"
//! offset-encoding = "utf-16"
//!
//! [[canonical]]
//! token-types = ["CLS_Class*", "COS_Objectname"]
//! marker = "%"
//! namespace = "%Library."
//! ```

use std::time::Duration;

use codespex_tokens::{CanonicalRule, Canonicalizer, DecodeStrategy};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::position::OffsetEncoding;

/// Returns the default settings namespace.
fn default_namespace() -> String {
	"codeSpex.languages".into()
}

/// Returns the default comment author.
fn default_author() -> String {
	"codeSpex".into()
}

/// Returns the default edit debounce in milliseconds.
fn default_debounce_ms() -> u64 {
	1000
}

/// Returns the default delay before the startup pass in milliseconds.
fn default_startup_delay_ms() -> u64 {
	1000
}

fn default_canonical() -> Vec<CanonicalRule> {
	vec![CanonicalRule::default_namespace()]
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct EngineConfig {
	/// Settings namespace; per-language token settings live under
	/// `<namespace>.<languageId>.tokens`.
	#[serde(default = "default_namespace")]
	pub namespace: String,
	/// Author identity shown on every comment.
	#[serde(default = "default_author")]
	pub author: String,
	/// Quiet period after the last edit before a document is rebuilt.
	#[serde(default = "default_debounce_ms")]
	pub debounce_ms: u64,
	/// Delay before annotating the documents visible at startup, giving the
	/// language service time to come up.
	#[serde(default = "default_startup_delay_ms")]
	pub startup_delay_ms: u64,
	#[serde(default)]
	pub decode: DecodeStrategy,
	/// Unit of token and hover positions exchanged with the language service.
	#[serde(default)]
	pub offset_encoding: OffsetEncoding,
	#[serde(default = "default_canonical")]
	pub canonical: Vec<CanonicalRule>,
}

impl Default for EngineConfig {
	fn default() -> Self {
		Self {
			namespace: default_namespace(),
			author: default_author(),
			debounce_ms: default_debounce_ms(),
			startup_delay_ms: default_startup_delay_ms(),
			decode: DecodeStrategy::default(),
			offset_encoding: OffsetEncoding::default(),
			canonical: default_canonical(),
		}
	}
}

impl EngineConfig {
	pub fn from_toml(text: &str) -> Result<Self> {
		Ok(toml::from_str(text)?)
	}

	pub fn debounce(&self) -> Duration {
		Duration::from_millis(self.debounce_ms)
	}

	pub fn startup_delay(&self) -> Duration {
		Duration::from_millis(self.startup_delay_ms)
	}

	pub fn canonicalizer(&self) -> Canonicalizer {
		Canonicalizer::new(self.canonical.clone())
	}

	/// Settings section holding the token settings of one language.
	pub fn tokens_section(&self, language_id: &str) -> String {
		format!("{}.{language_id}.tokens", self.namespace)
	}

	/// Settings key of one token type's persisted exclusion list.
	pub fn exclusions_key(&self, language_id: &str, token_type: &str) -> String {
		format!("{}.{token_type}.exclusions", self.tokens_section(language_id))
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		assert_eq!(EngineConfig::from_toml("").expect("valid"), EngineConfig::default());
	}

	#[test]
	fn overrides_are_applied() {
		let config = EngineConfig::from_toml(
			r#"
			debounce-ms = 250
			decode = "full"
			offset-encoding = "utf-32"

			[[canonical]]
			token-types = ["Macro*"]
			marker = "$$$"
			namespace = "$$$Sys."
			"#,
		)
		.expect("valid");

		assert_eq!(config.debounce(), Duration::from_millis(250));
		assert_eq!(config.decode, DecodeStrategy::Full);
		assert_eq!(config.offset_encoding, OffsetEncoding::Utf32);
		assert_eq!(config.namespace, "codeSpex.languages");
		assert_eq!(config.canonicalizer().canonicalize("MacroName", "$$$OK"), "$$$Sys.OK");
	}

	#[test]
	fn unknown_decode_strategy_is_an_error() {
		assert!(matches!(EngineConfig::from_toml("decode = \"sideways\""), Err(crate::Error::Config(_))));
	}

	#[test]
	fn settings_keys() {
		let config = EngineConfig::default();
		assert_eq!(config.tokens_section("objectscript"), "codeSpex.languages.objectscript.tokens");
		assert_eq!(
			config.exclusions_key("objectscript", "CLS_ClassName"),
			"codeSpex.languages.objectscript.tokens.CLS_ClassName.exclusions"
		);
	}
}
