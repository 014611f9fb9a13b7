//! Canonical identity of token text.
//!
//! Two spellings of the same entity must group, cache and exclude together.
//! The rules are table-driven by token type name so new equivalences can be
//! configured rather than hardcoded per language.

use serde::{Deserialize, Serialize};

/// Expands a shorthand marker into a default namespace for matching token types.
///
/// A value that starts with `marker` and contains no `.` has the marker
/// replaced by `namespace`: with marker `%` and namespace `%Library.`, the
/// value `%Integer` becomes `%Library.Integer`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CanonicalRule {
	/// Token type names the rule applies to. A trailing `*` matches by prefix.
	pub token_types: Vec<String>,
	pub marker: String,
	pub namespace: String,
}

impl CanonicalRule {
	/// InterSystems class references: `%Name` is shorthand for `%Library.Name`.
	pub fn default_namespace() -> Self {
		Self {
			token_types: vec!["CLS_Class*".into(), "COS_Objectname".into()],
			marker: "%".into(),
			namespace: "%Library.".into(),
		}
	}

	pub fn applies_to(&self, token_type: &str) -> bool {
		self.token_types.iter().any(|pattern| match pattern.strip_suffix('*') {
			Some(prefix) => token_type.starts_with(prefix),
			None => token_type == pattern,
		})
	}

	fn rewrite(&self, value: &str) -> Option<String> {
		let rest = value.strip_prefix(self.marker.as_str())?;
		if value.contains('.') {
			return None;
		}
		Some(format!("{}{rest}", self.namespace))
	}
}

/// Ordered set of [`CanonicalRule`]s; the first rewriting rule wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canonicalizer {
	rules: Vec<CanonicalRule>,
}

impl Default for Canonicalizer {
	fn default() -> Self {
		Self::new(vec![CanonicalRule::default_namespace()])
	}
}

impl Canonicalizer {
	pub fn new(rules: Vec<CanonicalRule>) -> Self {
		Self { rules }
	}

	pub fn rules(&self) -> &[CanonicalRule] {
		&self.rules
	}

	/// Returns the canonical value for the text under a token.
	///
	/// Only the first line of `text` takes part in the identity.
	pub fn canonicalize(&self, token_type: &str, text: &str) -> String {
		let value = first_line(text);
		self.rules
			.iter()
			.filter(|rule| rule.applies_to(token_type))
			.find_map(|rule| rule.rewrite(value))
			.unwrap_or_else(|| value.to_owned())
	}

	/// Returns the shorthand marker a canonical value of `token_type` starts
	/// with, if any rule for that type defines one.
	pub fn marker_for(&self, token_type: &str, canonical: &str) -> Option<&str> {
		self.rules
			.iter()
			.filter(|rule| rule.applies_to(token_type) && !rule.marker.is_empty())
			.map(|rule| rule.marker.as_str())
			.find(|marker| canonical.starts_with(marker))
	}
}

/// First line of `text`, without a trailing carriage return.
pub fn first_line(text: &str) -> &str {
	let line = text.split('\n').next().unwrap_or_default();
	line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn shorthand_expands_for_class_types() {
		let canon = Canonicalizer::default();
		assert_eq!(canon.canonicalize("CLS_ClassName", "%Integer"), "%Library.Integer");
		assert_eq!(canon.canonicalize("COS_Objectname", "%String"), "%Library.String");
	}

	#[test]
	fn dotted_values_are_untouched() {
		let canon = Canonicalizer::default();
		assert_eq!(canon.canonicalize("CLS_ClassName", "MyApp.Foo"), "MyApp.Foo");
		assert_eq!(canon.canonicalize("CLS_ClassName", "%SYS.Task"), "%SYS.Task");
	}

	#[test]
	fn other_types_are_untouched() {
		let canon = Canonicalizer::default();
		assert_eq!(canon.canonicalize("OtherType", "%Integer"), "%Integer");
		assert_eq!(canon.canonicalize("COS_Objectnames", "%Integer"), "%Integer");
	}

	#[test]
	fn multi_line_text_keeps_first_line() {
		let canon = Canonicalizer::default();
		assert_eq!(canon.canonicalize("CLS_ClassName", "%Integer\r\n(more)"), "%Library.Integer");
	}

	#[test]
	fn first_matching_rule_wins() {
		let canon = Canonicalizer::new(vec![
			CanonicalRule {
				token_types: vec!["T".into()],
				marker: "$".into(),
				namespace: "$Sys.".into(),
			},
			CanonicalRule {
				token_types: vec!["T".into()],
				marker: "$".into(),
				namespace: "$Other.".into(),
			},
		]);
		assert_eq!(canon.canonicalize("T", "$Now"), "$Sys.Now");
	}

	#[test]
	fn marker_lookup() {
		let canon = Canonicalizer::default();
		assert_eq!(canon.marker_for("CLS_ClassName", "%Library.Integer"), Some("%"));
		assert_eq!(canon.marker_for("CLS_ClassName", "MyApp.Foo"), None);
		assert_eq!(canon.marker_for("OtherType", "%Library.Integer"), None);
	}

	#[test]
	fn rules_deserialize_from_kebab_case() {
		let rule: CanonicalRule = serde_json::from_str(r#"{"token-types":["X*"],"marker":"@","namespace":"@Core."}"#).expect("valid rule");
		assert!(rule.applies_to("Xyz"));
		assert_eq!(rule.rewrite("@Thing").as_deref(), Some("@Core.Thing"));
	}
}
