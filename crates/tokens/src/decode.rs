//! Semantic token stream decoding.
//!
//! The LSP semantic token format is a flat array of `u32` values in groups of 5:
//! `[deltaLine, deltaStartChar, length, tokenType, tokenModifiersBitset]`.
//! A non-zero `deltaLine` resets the running character cursor, otherwise the
//! cursor accumulates across records on the same line.
//!
//! Decoding keeps only the token types the caller targets and groups their
//! ranges per type name, ordered by `(line, character)`. Types are kept in the
//! order they are first discovered in the stream.

use std::collections::HashMap;

use indexmap::IndexMap;
use lsp_types::{Position, Range, SemanticTokensLegend};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Number of integers per encoded token record.
pub const STRIDE: usize = 5;

/// Position of a token type in the provider's legend.
pub type TokenTypeId = u32;

/// How much of a raw token stream carries real records.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecodeStrategy {
	/// Only the first half of the stream is decoded.
	///
	/// Some providers send the whole sequence twice, the second copy offset by
	/// a line number near `2^32`. Records starting in the second half are
	/// ignored.
	#[default]
	MirroredHalf,
	/// The whole stream is decoded.
	Full,
}

impl DecodeStrategy {
	/// Returns the number of leading integers of a `len`-long stream in which
	/// a record may start.
	pub const fn logical_len(self, len: usize) -> usize {
		match self {
			Self::MirroredHalf => len / 2,
			Self::Full => len,
		}
	}
}

/// One decoded token with absolute coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawToken {
	pub line: u32,
	pub start: u32,
	pub length: u32,
	pub token_type: TokenTypeId,
	pub modifiers: u32,
}

impl RawToken {
	/// Single-line range covered by the token.
	pub fn range(&self) -> Range {
		Range {
			start: Position {
				line: self.line,
				character: self.start,
			},
			end: Position {
				line: self.line,
				character: self.start.saturating_add(self.length),
			},
		}
	}
}

/// Iterator accumulating absolute positions over an encoded stream.
///
/// Trailing integers that do not form a complete record are ignored.
#[derive(Debug, Clone)]
pub struct RawTokens<'a> {
	data: &'a [u32],
	logical_len: usize,
	index: usize,
	line: u32,
	character: u32,
}

impl<'a> RawTokens<'a> {
	pub fn new(data: &'a [u32], strategy: DecodeStrategy) -> Self {
		Self {
			data,
			logical_len: strategy.logical_len(data.len()),
			index: 0,
			line: 0,
			character: 0,
		}
	}
}

impl Iterator for RawTokens<'_> {
	type Item = RawToken;

	fn next(&mut self) -> Option<RawToken> {
		if self.index >= self.logical_len {
			return None;
		}
		let Some(record) = self.data.get(self.index..self.index + STRIDE) else {
			trace!(index = self.index, len = self.data.len(), "tokens.decode.truncated_record");
			self.index = self.logical_len;
			return None;
		};
		self.index += STRIDE;

		let delta_line = record[0];
		self.line = self.line.saturating_add(delta_line);
		if delta_line > 0 {
			self.character = 0;
		}
		self.character = self.character.saturating_add(record[1]);

		Some(RawToken {
			line: self.line,
			start: self.character,
			length: record[2],
			token_type: record[3],
			modifiers: record[4],
		})
	}
}

/// Legend ids of the targeted token types, mapped to their names.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetTypes {
	names: HashMap<TokenTypeId, String>,
}

impl TargetTypes {
	/// Selects the legend entries whose names appear in `targets`.
	pub fn from_legend<S: AsRef<str>>(legend: &SemanticTokensLegend, targets: &[S]) -> Self {
		let names = legend
			.token_types
			.iter()
			.enumerate()
			.filter(|(_, ty)| targets.iter().any(|t| t.as_ref() == ty.as_str()))
			.map(|(index, ty)| (index as TokenTypeId, ty.as_str().to_owned()))
			.collect();
		Self { names }
	}

	pub fn name(&self, id: TokenTypeId) -> Option<&str> {
		self.names.get(&id).map(String::as_str)
	}

	pub fn len(&self) -> usize {
		self.names.len()
	}

	pub fn is_empty(&self) -> bool {
		self.names.is_empty()
	}
}

impl FromIterator<(TokenTypeId, String)> for TargetTypes {
	fn from_iter<I: IntoIterator<Item = (TokenTypeId, String)>>(iter: I) -> Self {
		Self {
			names: iter.into_iter().collect(),
		}
	}
}

/// Ordered ranges found for one token type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRanges {
	/// Legend id of the first record seen for this type.
	pub type_id: TokenTypeId,
	pub ranges: Vec<Range>,
}

impl TokenRanges {
	fn new(type_id: TokenTypeId) -> Self {
		Self { type_id, ranges: Vec::new() }
	}

	/// Inserts `range` before the first range that sorts strictly after it.
	fn insert_ordered(&mut self, range: Range) {
		let key = (range.start.line, range.start.character);
		let at = self
			.ranges
			.iter()
			.position(|r| (r.start.line, r.start.character) > key)
			.unwrap_or(self.ranges.len());
		self.ranges.insert(at, range);
	}
}

/// Decoded ranges keyed by token type name, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedTokens {
	types: IndexMap<String, TokenRanges>,
}

impl DecodedTokens {
	pub fn get(&self, token_type: &str) -> Option<&TokenRanges> {
		self.types.get(token_type)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, &TokenRanges)> {
		self.types.iter().map(|(name, ranges)| (name.as_str(), ranges))
	}

	pub fn is_empty(&self) -> bool {
		self.types.is_empty()
	}

	/// Number of token types with at least one range.
	pub fn type_count(&self) -> usize {
		self.types.len()
	}

	/// Total ranges across all token types.
	pub fn range_count(&self) -> usize {
		self.types.values().map(|t| t.ranges.len()).sum()
	}

	/// Coalesces touching ranges of every token type.
	///
	/// Must run after the whole stream is decoded: adjacency is only known
	/// once a type's ranges are complete and ordered.
	pub fn merge_adjacent(&mut self) {
		for entry in self.types.values_mut() {
			crate::merge_adjacent(&mut entry.ranges);
		}
	}
}

/// Decodes `data`, keeping records whose type is targeted.
///
/// Records with untargeted type ids are skipped, not errors.
pub fn decode(data: &[u32], targets: &TargetTypes, strategy: DecodeStrategy) -> DecodedTokens {
	decode_with(data, targets, strategy, |_, _| true)
}

/// Like [`decode`], additionally filtering on `(token type name, modifier bits)`.
pub fn decode_with(data: &[u32], targets: &TargetTypes, strategy: DecodeStrategy, mut accept: impl FnMut(&str, u32) -> bool) -> DecodedTokens {
	let mut decoded = DecodedTokens::default();
	if targets.is_empty() {
		return decoded;
	}

	for token in RawTokens::new(data, strategy) {
		let Some(name) = targets.name(token.token_type) else {
			continue;
		};
		if !accept(name, token.modifiers) {
			continue;
		}
		decoded
			.types
			.entry(name.to_owned())
			.or_insert_with(|| TokenRanges::new(token.token_type))
			.insert_ordered(token.range());
	}

	decoded
}
