//! Comparator extensions and their registry.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use thiserror::Error;

use crate::mode::Mode;

/// Binary comparison operator of a failed assertion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompareOp {
	Eq,
	Ne,
	Lt,
	Le,
	Gt,
	Ge,
}

impl CompareOp {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Eq => "==",
			Self::Ne => "!=",
			Self::Lt => "<",
			Self::Le => "<=",
			Self::Gt => ">",
			Self::Ge => ">=",
		}
	}
}

impl fmt::Display for CompareOp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// Explanation lines: a short header followed by detail lines.
pub type Explanation = Vec<String>;

/// Run settings visible to comparators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompareContext {
	pub mode: Mode,
	pub verbose: u8,
}

/// A comparator could not build its explanation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ComparatorError(pub String);

impl ComparatorError {
	pub fn new(reason: impl Into<String>) -> Self {
		Self(reason.into())
	}
}

/// Pluggable explanation of a failed comparison.
pub trait Comparator: Send + Sync {
	/// Name used in logs and errors.
	fn name(&self) -> &str;

	/// Explains why `left op right` failed.
	///
	/// `Ok(None)` and `Ok(Some(vec![]))` both mean "nothing to add".
	fn compare(
		&self,
		ctx: &CompareContext,
		op: CompareOp,
		left: &dyn fmt::Debug,
		right: &dyn fmt::Debug,
	) -> Result<Option<Explanation>, ComparatorError>;
}

/// Closure comparators, mostly for hosts wiring ad-hoc explanations.
pub struct FnComparator<F> {
	name: String,
	f: F,
}

impl<F> FnComparator<F>
where
	F: Fn(CompareOp, &dyn fmt::Debug, &dyn fmt::Debug) -> Result<Option<Explanation>, ComparatorError> + Send + Sync,
{
	pub fn new(name: impl Into<String>, f: F) -> Self {
		Self { name: name.into(), f }
	}
}

impl<F> Comparator for FnComparator<F>
where
	F: Fn(CompareOp, &dyn fmt::Debug, &dyn fmt::Debug) -> Result<Option<Explanation>, ComparatorError> + Send + Sync,
{
	fn name(&self) -> &str {
		&self.name
	}

	fn compare(
		&self,
		_ctx: &CompareContext,
		op: CompareOp,
		left: &dyn fmt::Debug,
		right: &dyn fmt::Debug,
	) -> Result<Option<Explanation>, ComparatorError> {
		(self.f)(op, left, right)
	}
}

/// Ordered comparator registry.
///
/// Registration appends to a copy-on-write snapshot, so callers iterating a
/// snapshot never observe a half-applied registration.
#[derive(Clone)]
pub struct ComparatorRegistry {
	entries: Arc<ArcSwap<Vec<Arc<dyn Comparator>>>>,
}

impl Default for ComparatorRegistry {
	fn default() -> Self {
		Self {
			entries: Arc::new(ArcSwap::from_pointee(Vec::new())),
		}
	}
}

impl ComparatorRegistry {
	/// Empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Registry holding the built-in [`DebugDiff`](crate::explain::DebugDiff) comparator.
	pub fn with_builtins() -> Self {
		let registry = Self::new();
		registry.register(Arc::new(crate::explain::DebugDiff));
		registry
	}

	/// Appends `comparator`; it is consulted after every earlier registration.
	pub fn register(&self, comparator: Arc<dyn Comparator>) {
		tracing::debug!(comparator = comparator.name(), "registering comparator");
		self.entries.rcu(|cur| {
			let mut next: Vec<_> = (**cur).clone();
			next.push(comparator.clone());
			next
		});
	}

	pub fn snapshot(&self) -> Arc<Vec<Arc<dyn Comparator>>> {
		self.entries.load_full()
	}

	pub fn len(&self) -> usize {
		self.entries.load().len()
	}

	pub fn is_empty(&self) -> bool {
		self.entries.load().is_empty()
	}

	pub fn names(&self) -> Vec<String> {
		self.entries.load().iter().map(|c| c.name().to_string()).collect()
	}

	/// Returns the first non-empty explanation, in registration order.
	///
	/// Comparators after the first match are not invoked. A comparator error
	/// aborts the search.
	pub fn first_explanation(
		&self,
		ctx: &CompareContext,
		op: CompareOp,
		left: &dyn fmt::Debug,
		right: &dyn fmt::Debug,
	) -> crate::Result<Option<Explanation>> {
		for comparator in self.snapshot().iter() {
			let result = comparator
				.compare(ctx, op, left, right)
				.map_err(|source| crate::DiagnosticsError::Comparator {
					comparator: comparator.name().to_string(),
					source,
				})?;
			if let Some(lines) = result
				&& !lines.is_empty()
			{
				tracing::trace!(comparator = comparator.name(), lines = lines.len(), "comparator explained failure");
				return Ok(Some(lines));
			}
		}
		Ok(None)
	}
}

impl fmt::Debug for ComparatorRegistry {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_list().entries(self.names()).finish()
	}
}
