//! Annotation records and their UI boundary representation.

use std::fmt;
use std::str::FromStr;

use lsp_types::Range;

use crate::Error;
use crate::host::DocumentKey;

/// Engine-assigned identity of one annotation, unique per manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnnotationId(pub(crate) u64);

impl AnnotationId {
	pub const fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for AnnotationId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "#{}", self.0)
	}
}

/// Locates an annotation from a UI action.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotationHandle {
	pub document: DocumentKey,
	pub id: AnnotationId,
}

impl AnnotationHandle {
	pub fn new(document: DocumentKey, id: AnnotationId) -> Self {
		Self { document, id }
	}
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ResolutionState {
	#[default]
	Unresolved,
	Resolved,
}

impl ResolutionState {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Unresolved => "unresolved",
			Self::Resolved => "resolved",
		}
	}
}

impl FromStr for ResolutionState {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"unresolved" => Ok(Self::Unresolved),
			"resolved" => Ok(Self::Resolved),
			other => Err(Error::InvalidTag(other.to_owned())),
		}
	}
}

/// Grouping identity shared by every annotation about the same entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TokenIdentity {
	pub token_type: String,
	pub canonical_value: String,
}

/// Context value carried by a comment thread: `state:tokenType:canonicalValue`.
///
/// Only built and parsed at the UI boundary. The canonical value may itself
/// contain `:`; parsing splits at the first two separators only.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AnnotationTag {
	pub state: ResolutionState,
	pub identity: TokenIdentity,
}

impl fmt::Display for AnnotationTag {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}:{}:{}", self.state.as_str(), self.identity.token_type, self.identity.canonical_value)
	}
}

impl FromStr for AnnotationTag {
	type Err = Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut parts = s.splitn(3, ':');
		let (Some(state), Some(token_type), Some(canonical_value)) = (parts.next(), parts.next(), parts.next()) else {
			return Err(Error::InvalidTag(s.to_owned()));
		};
		Ok(Self {
			state: state.parse()?,
			identity: TokenIdentity {
				token_type: token_type.to_owned(),
				canonical_value: canonical_value.to_owned(),
			},
		})
	}
}

/// One documentation overlay anchored to a token range.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
	pub id: AnnotationId,
	pub document: DocumentKey,
	pub identity: TokenIdentity,
	/// Literal token text (first line).
	pub text: String,
	pub range: Range,
	/// Markdown documentation body.
	pub body: String,
	pub state: ResolutionState,
	/// Threads start collapsed; unresolving expands them.
	pub collapsed: bool,
}

/// Annotation content produced by a build, before the manager assigns an id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct AnnotationDraft {
	pub identity: TokenIdentity,
	pub text: String,
	pub range: Range,
	pub body: String,
}

impl Annotation {
	pub(crate) fn from_draft(id: AnnotationId, document: DocumentKey, draft: AnnotationDraft) -> Self {
		Self {
			id,
			document,
			identity: draft.identity,
			text: draft.text,
			range: draft.range,
			body: draft.body,
			state: ResolutionState::Unresolved,
			collapsed: true,
		}
	}

	pub fn handle(&self) -> AnnotationHandle {
		AnnotationHandle::new(self.document.clone(), self.id)
	}

	pub fn tag(&self) -> AnnotationTag {
		AnnotationTag {
			state: self.state,
			identity: self.identity.clone(),
		}
	}

	/// `text (tokenType) [span]` with 1-based line and column numbers.
	pub fn label(&self) -> String {
		let start = self.range.start;
		let end = self.range.end;
		let span = if start.line == end.line {
			format!("Ln {}, Col {}-{}", start.line + 1, start.character + 1, end.character + 1)
		} else {
			format!("Ln {}, Col {} to Ln {}, Col {}", start.line + 1, start.character + 1, end.line + 1, end.character + 1)
		};
		format!("{} ({}) [{span}]", self.text, self.identity.token_type)
	}

	pub fn view(&self, author: &str) -> CommentView {
		CommentView {
			handle: self.handle(),
			range: self.range,
			label: self.label(),
			body: self.body.clone(),
			author: author.to_owned(),
			context_value: self.tag().to_string(),
			resolved: self.state == ResolutionState::Resolved,
			collapsed: self.collapsed,
			can_reply: false,
		}
	}

	/// Unresolved → resolved. Returns `false` when already resolved.
	pub(crate) fn resolve(&mut self) -> bool {
		if self.state == ResolutionState::Resolved {
			return false;
		}
		self.state = ResolutionState::Resolved;
		true
	}

	/// Unconditionally reverts to unresolved and expands the thread.
	pub(crate) fn unresolve(&mut self) {
		self.state = ResolutionState::Unresolved;
		self.collapsed = false;
	}
}

/// Everything the host needs to render one annotation as a comment thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentView {
	pub handle: AnnotationHandle,
	pub range: Range,
	pub label: String,
	pub body: String,
	pub author: String,
	/// Serialized [`AnnotationTag`], for correlating UI actions.
	pub context_value: String,
	pub resolved: bool,
	pub collapsed: bool,
	/// Annotations are read-only previews.
	pub can_reply: bool,
}

#[cfg(test)]
mod tests {
	use lsp_types::Position;
	use pretty_assertions::assert_eq;

	use super::*;

	fn annotation(range: Range) -> Annotation {
		Annotation::from_draft(
			AnnotationId(7),
			"file:///a.cls".into(),
			AnnotationDraft {
				identity: TokenIdentity {
					token_type: "CLS_ClassName".into(),
					canonical_value: "%Library.Integer".into(),
				},
				text: "%Integer".into(),
				range,
				body: "An integer.".into(),
			},
		)
	}

	fn single_line() -> Range {
		Range {
			start: Position { line: 3, character: 16 },
			end: Position { line: 3, character: 24 },
		}
	}

	#[test]
	fn tag_round_trips_values_containing_separators() {
		let tag: AnnotationTag = "resolved:COS_Objectname:Ns:Thing".parse().expect("valid tag");
		assert_eq!(tag.state, ResolutionState::Resolved);
		assert_eq!(tag.identity.canonical_value, "Ns:Thing");
		assert_eq!(tag.to_string(), "resolved:COS_Objectname:Ns:Thing");
	}

	#[test]
	fn malformed_tags_are_rejected() {
		assert!(matches!("unresolved:OnlyType".parse::<AnnotationTag>(), Err(Error::InvalidTag(_))));
		assert!(matches!("maybe:T:V".parse::<AnnotationTag>(), Err(Error::InvalidTag(_))));
	}

	#[test]
	fn labels_use_one_based_spans() {
		assert_eq!(annotation(single_line()).label(), "%Integer (CLS_ClassName) [Ln 4, Col 17-25]");

		let multi = Range {
			start: Position { line: 0, character: 2 },
			end: Position { line: 1, character: 0 },
		};
		assert_eq!(annotation(multi).label(), "%Integer (CLS_ClassName) [Ln 1, Col 3 to Ln 2, Col 1]");
	}

	#[test]
	fn new_annotations_are_unresolved_collapsed_previews() {
		let view = annotation(single_line()).view("codeSpex");
		assert_eq!(view.context_value, "unresolved:CLS_ClassName:%Library.Integer");
		assert!(!view.resolved);
		assert!(view.collapsed);
		assert!(!view.can_reply);
	}

	#[test]
	fn resolution_transitions() {
		let mut a = annotation(single_line());
		assert!(a.resolve());
		assert!(!a.resolve());
		assert_eq!(a.tag().to_string(), "resolved:CLS_ClassName:%Library.Integer");

		a.unresolve();
		assert_eq!(a.state, ResolutionState::Unresolved);
		assert!(!a.collapsed);
		a.unresolve();
		assert_eq!(a.state, ResolutionState::Unresolved);
	}
}
