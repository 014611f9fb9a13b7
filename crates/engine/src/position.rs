//! LSP position to rope index conversion.

use lsp_types::Position;
use ropey::{Rope, RopeSlice};
use serde::{Deserialize, Serialize};

/// Unit of `Position::character` as negotiated with the language service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OffsetEncoding {
	/// UTF-8 byte offsets.
	#[serde(rename = "utf-8")]
	Utf8,
	/// UTF-16 code unit offsets (LSP default).
	#[default]
	#[serde(rename = "utf-16")]
	Utf16,
	/// Unicode codepoint offsets.
	#[serde(rename = "utf-32")]
	Utf32,
}

impl OffsetEncoding {
	/// Parses an LSP position encoding kind.
	pub fn from_lsp(kind: &lsp_types::PositionEncodingKind) -> Option<Self> {
		match kind.as_str() {
			"utf-8" => Some(Self::Utf8),
			"utf-16" => Some(Self::Utf16),
			"utf-32" => Some(Self::Utf32),
			_ => None,
		}
	}
}

/// Converts an LSP position to an absolute char index into `text`.
///
/// Columns past the end of the line clamp to the end of its content, before
/// any line break. Returns `None` when the line does not exist.
pub fn lsp_position_to_char(text: &Rope, position: Position, encoding: OffsetEncoding) -> Option<usize> {
	let line_idx = position.line as usize;
	if line_idx >= text.len_lines() {
		return None;
	}
	let line = content(text.line(line_idx));
	let column = position.character as usize;
	let offset = match encoding {
		OffsetEncoding::Utf8 => line.byte_to_char(column.min(line.len_bytes())),
		OffsetEncoding::Utf16 => line.utf16_cu_to_char(column.min(line.len_utf16_cu())),
		OffsetEncoding::Utf32 => column.min(line.len_chars()),
	};
	Some(text.line_to_char(line_idx) + offset)
}

/// Absolute char index of the end of a line's content.
pub(crate) fn line_content_end(text: &Rope, line_idx: usize) -> usize {
	text.line_to_char(line_idx) + content(text.line(line_idx)).len_chars()
}

/// `line` without its trailing `\n` or `\r\n`.
fn content(line: RopeSlice<'_>) -> RopeSlice<'_> {
	let mut end = line.len_chars();
	if end > 0 && line.char(end - 1) == '\n' {
		end -= 1;
		if end > 0 && line.char(end - 1) == '\r' {
			end -= 1;
		}
	}
	line.slice(..end)
}
