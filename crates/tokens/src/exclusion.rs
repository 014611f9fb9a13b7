//! Exclusion rules suppressing annotations for matching canonical values.
//!
//! A rule ending in `*` matches every value starting with the rest of the
//! rule (`MyApp.*`, `%*`); any other rule matches one value exactly.

use std::fmt;

/// One parsed exclusion rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ExclusionRule {
	Exact(String),
	Prefix(String),
}

impl ExclusionRule {
	pub fn parse(rule: &str) -> Self {
		match rule.strip_suffix('*') {
			Some(prefix) => Self::Prefix(prefix.to_owned()),
			None => Self::Exact(rule.to_owned()),
		}
	}

	pub fn matches(&self, value: &str) -> bool {
		match self {
			Self::Exact(exact) => value == exact,
			Self::Prefix(prefix) => value.starts_with(prefix.as_str()),
		}
	}
}

impl fmt::Display for ExclusionRule {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Exact(exact) => f.write_str(exact),
			Self::Prefix(prefix) => write!(f, "{prefix}*"),
		}
	}
}

/// Rules for one token type, evaluated in order with any-match semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExclusionSet {
	rules: Vec<ExclusionRule>,
}

impl ExclusionSet {
	/// Appends `rule` unless an identical rule is already present.
	pub fn push(&mut self, rule: ExclusionRule) {
		if !self.rules.contains(&rule) {
			self.rules.push(rule);
		}
	}

	pub fn is_excluded(&self, value: &str) -> bool {
		self.rules.iter().any(|rule| rule.matches(value))
	}

	pub fn len(&self) -> usize {
		self.rules.len()
	}

	pub fn is_empty(&self) -> bool {
		self.rules.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = &ExclusionRule> {
		self.rules.iter()
	}
}

impl<S: AsRef<str>> FromIterator<S> for ExclusionSet {
	fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
		let mut set = Self::default();
		set.extend(iter);
		set
	}
}

impl<S: AsRef<str>> Extend<S> for ExclusionSet {
	fn extend<I: IntoIterator<Item = S>>(&mut self, iter: I) {
		for rule in iter {
			self.push(ExclusionRule::parse(rule.as_ref()));
		}
	}
}

/// Candidate rules for excluding `canonical`, most specific first.
///
/// The exact value comes first, then each shorter dot-separated prefix as a
/// `prefix.*` wildcard, then `<marker>*` when the value starts with the
/// default-namespace `marker`.
pub fn exclusion_candidates(canonical: &str, marker: Option<&str>) -> Vec<String> {
	let mut candidates = vec![canonical.to_owned()];
	let mut prefix = canonical;
	while let Some((head, _)) = prefix.rsplit_once('.') {
		candidates.push(format!("{head}.*"));
		prefix = head;
	}
	if let Some(marker) = marker.filter(|m| !m.is_empty() && canonical.starts_with(m)) {
		candidates.push(format!("{marker}*"));
	}
	candidates.dedup();
	candidates
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn wildcard_matches_by_prefix_only() {
		let rules: ExclusionSet = ["MyApp.*"].into_iter().collect();
		assert!(rules.is_excluded("MyApp.Foo"));
		assert!(!rules.is_excluded("MyAppX.Foo"));
	}

	#[test]
	fn exact_rule_matches_whole_value() {
		let rules: ExclusionSet = ["MyApp.Foo"].into_iter().collect();
		assert!(rules.is_excluded("MyApp.Foo"));
		assert!(!rules.is_excluded("MyApp.Foo.Bar"));
	}

	#[test]
	fn marker_wildcard_before_and_after_canonicalization() {
		let canon = crate::Canonicalizer::default();
		let rules: ExclusionSet = ["%*"].into_iter().collect();

		// raw shorthand and its canonical expansion both start with the marker
		assert!(rules.is_excluded("%Integer"));
		let canonical = canon.canonicalize("CLS_ClassName", "%Integer");
		assert_eq!(canonical, "%Library.Integer");
		assert!(rules.is_excluded(&canonical));

		// a rule written against the expanded namespace only catches the canonical form
		let library: ExclusionSet = ["%Library.*"].into_iter().collect();
		assert!(!library.is_excluded("%Integer"));
		assert!(library.is_excluded(&canonical));
	}

	#[test]
	fn set_deduplicates() {
		let rules: ExclusionSet = ["A.*", "B", "A.*"].into_iter().collect();
		assert_eq!(rules.len(), 2);
		let rendered: Vec<String> = rules.iter().map(ToString::to_string).collect();
		assert_eq!(rendered, vec!["A.*", "B"]);
	}

	#[test]
	fn candidates_run_from_specific_to_general() {
		assert_eq!(exclusion_candidates("%Library.Integer", Some("%")), vec!["%Library.Integer", "%Library.*", "%*"]);
		assert_eq!(exclusion_candidates("MyApp.Sub.Foo", Some("%")), vec!["MyApp.Sub.Foo", "MyApp.Sub.*", "MyApp.*"]);
		assert_eq!(exclusion_candidates("Plain", None), vec!["Plain"]);
	}
}
