//! Slot naming the failure type raised by failing assertions.

use std::sync::Arc;

use parking_lot::RwLock;

/// Failure type name used when nothing has replaced it.
pub const NATIVE_FAILURE: &str = "AssertionError";

/// Shared, swappable failure type.
#[derive(Debug, Clone)]
pub struct FailureSlot {
	current: Arc<RwLock<Arc<str>>>,
}

impl Default for FailureSlot {
	fn default() -> Self {
		Self {
			current: Arc::new(RwLock::new(Arc::from(NATIVE_FAILURE))),
		}
	}
}

impl FailureSlot {
	pub fn current(&self) -> Arc<str> {
		self.current.read().clone()
	}

	/// Installs `failure` and returns the previous value for later restoration.
	pub fn replace(&self, failure: impl Into<Arc<str>>) -> Arc<str> {
		std::mem::replace(&mut *self.current.write(), failure.into())
	}
}
