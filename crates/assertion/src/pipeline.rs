//! Comparison pipeline: turns a comparator explanation into a single string
//! the assertion reporter can format later.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::compare::{CompareContext, CompareOp, ComparatorRegistry, Explanation};
use crate::error::Result;
use crate::explain::LINE_SEPARATOR;
use crate::mode::Mode;

/// Environment variables whose presence marks a CI run.
pub const DEFAULT_CI_ENV_VARS: &[&str] = &["CI", "BUILD_NUMBER"];

/// Detail characters allowed before an explanation is truncated.
pub const DEFAULT_TRUNCATION_BUDGET: usize = 800;

/// Detail lines kept when an explanation is truncated.
pub const DEFAULT_TRUNCATION_MAX_LINES: usize = 10;

/// Verbosity at which truncation is disabled.
const FULL_OUTPUT_VERBOSITY: u8 = 2;

/// Returns true if any of `vars` is set in the process environment, whatever its value.
pub fn running_on_ci<S: AsRef<str>>(vars: &[S]) -> bool {
	running_on_ci_with(vars, |name| std::env::var_os(name).is_some())
}

/// [`running_on_ci`] against an arbitrary lookup.
pub fn running_on_ci_with<S: AsRef<str>>(vars: &[S], is_set: impl Fn(&str) -> bool) -> bool {
	vars.iter().any(|var| is_set(var.as_ref()))
}

/// Size and escaping policy applied to a chosen explanation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplanationPolicy {
	pub mode: Mode,
	pub verbose: u8,
	pub ci: bool,
	pub budget: usize,
	pub max_lines: usize,
}

impl Default for ExplanationPolicy {
	fn default() -> Self {
		Self {
			mode: Mode::Rewrite,
			verbose: 0,
			ci: false,
			budget: DEFAULT_TRUNCATION_BUDGET,
			max_lines: DEFAULT_TRUNCATION_MAX_LINES,
		}
	}
}

impl ExplanationPolicy {
	/// Truncates, escapes and joins `lines` into one string.
	pub fn render(&self, mut lines: Explanation) -> String {
		self.truncate(&mut lines);
		let joined = lines
			.iter()
			.map(|line| line.replace('\n', "\\n"))
			.collect::<Vec<_>>()
			.join(LINE_SEPARATOR);
		if self.mode == Mode::Rewrite {
			// The rewritten assertion interpolates this with %-formatting.
			joined.replace('%', "%%")
		} else {
			joined
		}
	}

	fn truncate(&self, lines: &mut Explanation) {
		if self.verbose >= FULL_OUTPUT_VERBOSITY || self.ci {
			return;
		}
		let details = lines.len().saturating_sub(1);
		let detail_chars: usize = lines.iter().skip(1).map(|l| l.chars().count()).sum();
		if detail_chars <= self.budget || details <= self.max_lines {
			return;
		}
		let hidden = details - self.max_lines;
		lines.truncate(1 + self.max_lines);
		lines.push(format!(
			"Detailed information truncated ({hidden} more lines), use \"-vv\" to show"
		));
	}
}

/// Callback consulted by instrumented assertions.
pub type ReprCompare = Arc<dyn Fn(CompareOp, &dyn fmt::Debug, &dyn fmt::Debug) -> Result<Option<String>> + Send + Sync>;

/// Single slot holding the comparison callback of the running test.
#[derive(Clone, Default)]
pub struct ReprCompareSlot {
	slot: Arc<RwLock<Option<ReprCompare>>>,
}

impl ReprCompareSlot {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn set(&self, callback: ReprCompare) {
		*self.slot.write() = Some(callback);
	}

	pub fn clear(&self) {
		*self.slot.write() = None;
	}

	pub fn is_active(&self) -> bool {
		self.slot.read().is_some()
	}

	/// Explains `left op right` with the active callback; `Ok(None)` when no
	/// test is running or nothing had an explanation.
	pub fn call(&self, op: CompareOp, left: &dyn fmt::Debug, right: &dyn fmt::Debug) -> Result<Option<String>> {
		// Clone out so the callback runs without holding the lock.
		let callback = self.slot.read().clone();
		match callback {
			Some(callback) => callback(op, left, right),
			None => Ok(None),
		}
	}
}

impl fmt::Debug for ReprCompareSlot {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("ReprCompareSlot").field("active", &self.is_active()).finish()
	}
}

/// Comparator chain plus policy for one test.
#[derive(Debug, Clone)]
pub struct ComparisonPipeline {
	comparators: ComparatorRegistry,
	policy: ExplanationPolicy,
}

impl ComparisonPipeline {
	pub fn new(comparators: ComparatorRegistry, policy: ExplanationPolicy) -> Self {
		Self { comparators, policy }
	}

	pub fn policy(&self) -> &ExplanationPolicy {
		&self.policy
	}

	/// First comparator explanation for `left op right`, rendered.
	pub fn explain(&self, op: CompareOp, left: &dyn fmt::Debug, right: &dyn fmt::Debug) -> Result<Option<String>> {
		let ctx = CompareContext {
			mode: self.policy.mode,
			verbose: self.policy.verbose,
		};
		let lines = self.comparators.first_explanation(&ctx, op, left, right)?;
		Ok(lines.map(|lines| self.policy.render(lines)))
	}

	/// Installs this pipeline into `slot`. The caller must clear the slot.
	pub fn install(self, slot: &ReprCompareSlot) {
		let pipeline = Arc::new(self);
		slot.set(Arc::new(move |op: CompareOp, left: &dyn fmt::Debug, right: &dyn fmt::Debug| {
			pipeline.explain(op, left, right)
		}));
	}

	/// Installs this pipeline into `slot` until the returned guard is dropped
	/// or explicitly deactivated.
	pub fn activate(self, slot: &ReprCompareSlot) -> ActiveComparison {
		self.install(slot);
		ActiveComparison { slot: slot.clone() }
	}
}

/// Keeps a pipeline installed; clears the slot on drop, including while
/// unwinding out of a failed test body.
#[must_use = "dropping the guard deactivates the comparison pipeline"]
#[derive(Debug)]
pub struct ActiveComparison {
	slot: ReprCompareSlot,
}

impl ActiveComparison {
	pub fn deactivate(self) {}
}

impl Drop for ActiveComparison {
	fn drop(&mut self) {
		self.slot.clear();
	}
}
