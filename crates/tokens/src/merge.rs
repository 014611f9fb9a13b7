use lsp_types::Range;

/// Coalesces ranges that touch exactly at a boundary.
///
/// `ranges` must already be ordered. Scanning runs from the end backward so a
/// chain `a|b|c` collapses into one range spanning `a.start..c.end`. Running
/// it again on merged output is a no-op.
pub fn merge_adjacent(ranges: &mut Vec<Range>) {
	let mut index = ranges.len();
	while index > 1 {
		index -= 1;
		if ranges[index - 1].end == ranges[index].start {
			let removed = ranges.remove(index);
			ranges[index - 1].end = removed.end;
		}
	}
}
