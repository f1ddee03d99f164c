//! Explanation markup and the built-in comparator.
//!
//! Explanations travel as a single string. Lines after the first start with a
//! marker character:
//!
//! - `~` continues the explanation as a new, indented line
//! - `>` continues at the enclosing level
//! - `{` opens a nested "where" clause
//! - `}` closes it, appending the remainder to the line that opened it
//!
//! Any other line is glued to the previous one with a visible `\n`, which is
//! why the comparison pipeline escapes raw newlines before joining.

use std::fmt;

use crate::compare::{CompareContext, CompareOp, Comparator, ComparatorError, Explanation};
use crate::error::{DiagnosticsError, Result};

/// Separator between joined explanation lines.
pub const LINE_SEPARATOR: &str = "\n~";

/// Formats explanation markup into display text.
pub fn format_explanation(explanation: &str) -> Result<String> {
	let lines = split_explanation(explanation);
	Ok(format_lines(&lines)?.join("\n"))
}

fn split_explanation(explanation: &str) -> Vec<String> {
	let mut raw = explanation.split('\n');
	let mut lines = vec![raw.next().unwrap_or_default().to_string()];
	for line in raw {
		if line.starts_with(['{', '}', '~', '>']) {
			lines.push(line.to_string());
		} else if let Some(last) = lines.last_mut() {
			last.push_str("\\n");
			last.push_str(line);
		}
	}
	lines
}

fn format_lines(lines: &[String]) -> Result<Vec<String>> {
	let mut result: Vec<String> = lines.iter().take(1).cloned().collect();
	// Index of the result line owning each open group, and how many
	// "where" clauses each group has seen.
	let mut stack = vec![0usize];
	let mut counts = vec![0usize];

	for line in &lines[1.min(lines.len())..] {
		let rest = &line[1..];
		if line.starts_with('{') {
			let depth_count = counts.last_mut().ok_or_else(unbalanced)?;
			let word = if *depth_count > 0 { "and   " } else { "where " };
			*depth_count += 1;
			stack.push(result.len());
			counts.push(0);
			result.push(format!(" +{}{word}{rest}", "  ".repeat(stack.len() - 1)));
		} else if line.starts_with('}') {
			if stack.len() < 2 {
				return Err(unbalanced());
			}
			stack.pop();
			counts.pop();
			let owner = *stack.last().ok_or_else(unbalanced)?;
			result[owner].push_str(rest);
		} else {
			// '~' or '>', the only other markers split_explanation keeps.
			let top = stack.last_mut().ok_or_else(unbalanced)?;
			*top += 1;
			let indent = if line.starts_with('~') { stack.len() } else { stack.len() - 1 };
			result.push(format!("{}{rest}", "  ".repeat(indent)));
		}
	}

	if stack.len() != 1 {
		return Err(DiagnosticsError::MalformedExplanation(format!(
			"{} unclosed where-clause group(s)",
			stack.len() - 1
		)));
	}
	Ok(result)
}

fn unbalanced() -> DiagnosticsError {
	DiagnosticsError::MalformedExplanation("closing '}' without matching '{'".to_string())
}

/// Width budget for one operand in the summary header.
fn header_budget(op: CompareOp) -> usize {
	(80 - 15 - op.as_str().len() - 2) / 2
}

/// Single-line `Debug` rendering cut down to `max` characters.
fn short_repr(value: &dyn fmt::Debug, max: usize) -> String {
	let full = format!("{value:?}");
	let len = full.chars().count();
	if len <= max {
		return full;
	}
	let keep = max.saturating_sub(3);
	let head = keep / 2;
	let tail = keep - head;
	let start: String = full.chars().take(head).collect();
	let end: String = full.chars().skip(len - tail).collect();
	format!("{start}...{end}")
}

/// Built-in comparator: line diff of the pretty `Debug` renderings of both
/// operands of a failed `==`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DebugDiff;

impl Comparator for DebugDiff {
	fn name(&self) -> &str {
		"debug-diff"
	}

	fn compare(
		&self,
		ctx: &CompareContext,
		op: CompareOp,
		left: &dyn fmt::Debug,
		right: &dyn fmt::Debug,
	) -> std::result::Result<Option<Explanation>, ComparatorError> {
		if op != CompareOp::Eq {
			return Ok(None);
		}
		let left_pretty = format!("{left:#?}");
		let right_pretty = format!("{right:#?}");
		if left_pretty == right_pretty {
			return Ok(None);
		}

		let budget = header_budget(op);
		let mut lines = vec![format!("{} {op} {}", short_repr(left, budget), short_repr(right, budget))];

		let left_lines: Vec<&str> = left_pretty.lines().collect();
		let right_lines: Vec<&str> = right_pretty.lines().collect();
		let diff = line_diff(&left_lines, &right_lines);

		if ctx.verbose == 0 {
			lines.push("Differing lines:".to_string());
			lines.extend(diff.iter().filter(|d| !matches!(d, DiffLine::Same(_))).map(DiffLine::render));
			lines.push("Use -v to get the full diff".to_string());
		} else {
			lines.push("Full diff:".to_string());
			lines.extend(diff.iter().map(DiffLine::render));
		}
		Ok(Some(lines))
	}
}

/// Largest LCS table (in cells) built for the lines left after trimming the
/// common prefix and suffix.
const MAX_DIFF_CELLS: usize = 1 << 20;

#[derive(Debug, Clone, PartialEq, Eq)]
enum DiffLine<'a> {
	Same(&'a str),
	Left(&'a str),
	Right(&'a str),
	/// Lines past the first difference that were too many to align.
	Skipped { left: usize, right: usize },
}

impl DiffLine<'_> {
	fn render(&self) -> String {
		match self {
			Self::Same(l) => format!("  {l}"),
			Self::Left(l) => format!("- {l}"),
			Self::Right(l) => format!("+ {l}"),
			Self::Skipped { left, right } => format!("? {left} left and {right} right lines not compared"),
		}
	}
}

/// Line diff of `left` against `right`.
///
/// Shared leading and trailing lines are matched directly. The rest is
/// aligned with a longest-common-subsequence table when that table stays
/// under [`MAX_DIFF_CELLS`], otherwise only its first differing pair is shown.
fn line_diff<'a>(left: &[&'a str], right: &[&'a str]) -> Vec<DiffLine<'a>> {
	let prefix = left.iter().zip(right).take_while(|(l, r)| l == r).count();
	let (left_rest, right_rest) = (&left[prefix..], &right[prefix..]);
	let suffix = left_rest
		.iter()
		.rev()
		.zip(right_rest.iter().rev())
		.take_while(|(l, r)| l == r)
		.count();
	let left_mid = &left_rest[..left_rest.len() - suffix];
	let right_mid = &right_rest[..right_rest.len() - suffix];

	let mut out = Vec::with_capacity(left.len().max(right.len()));
	out.extend(left[..prefix].iter().map(|l| DiffLine::Same(*l)));
	let cells = (left_mid.len() + 1).saturating_mul(right_mid.len() + 1);
	if cells <= MAX_DIFF_CELLS {
		lcs_diff(left_mid, right_mid, &mut out);
	} else {
		tracing::debug!(left = left_mid.len(), right = right_mid.len(), "diff too large to align, showing first difference");
		out.extend(left_mid.first().map(|l| DiffLine::Left(*l)));
		out.extend(right_mid.first().map(|r| DiffLine::Right(*r)));
		out.push(DiffLine::Skipped {
			left: left_mid.len().saturating_sub(1),
			right: right_mid.len().saturating_sub(1),
		});
	}
	out.extend(left_rest[left_mid.len()..].iter().map(|l| DiffLine::Same(*l)));
	out
}

fn lcs_diff<'a>(left: &[&'a str], right: &[&'a str], out: &mut Vec<DiffLine<'a>>) {
	let (n, m) = (left.len(), right.len());
	let width = m + 1;
	// lcs[i * width + j] = LCS length of left[i..] and right[j..]
	let mut lcs = vec![0usize; (n + 1) * width];
	for i in (0..n).rev() {
		for j in (0..m).rev() {
			lcs[i * width + j] = if left[i] == right[j] {
				lcs[(i + 1) * width + j + 1] + 1
			} else {
				lcs[(i + 1) * width + j].max(lcs[i * width + j + 1])
			};
		}
	}

	let (mut i, mut j) = (0, 0);
	while i < n && j < m {
		if left[i] == right[j] {
			out.push(DiffLine::Same(left[i]));
			i += 1;
			j += 1;
		} else if lcs[(i + 1) * width + j] >= lcs[i * width + j + 1] {
			out.push(DiffLine::Left(left[i]));
			i += 1;
		} else {
			out.push(DiffLine::Right(right[j]));
			j += 1;
		}
	}
	out.extend(left[i..].iter().map(|l| DiffLine::Left(*l)));
	out.extend(right[j..].iter().map(|r| DiffLine::Right(*r)));
}
