//! Tagged tracer handed to plugins.
//!
//! Messages always go to `tracing` at debug level. A processor may be
//! attached to the root to observe them as well; child tracers share it.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

type Processor = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// Tracer scoped to a tag path such as `assertion`.
#[derive(Clone, Default)]
pub struct Tracer {
	tags: Vec<&'static str>,
	processor: Arc<RwLock<Option<Processor>>>,
}

impl Tracer {
	/// Root tracer with no tags.
	pub fn root() -> Self {
		Self::default()
	}

	/// Child tracer with `tag` appended.
	pub fn get(&self, tag: &'static str) -> Self {
		let mut tags = self.tags.clone();
		tags.push(tag);
		Self {
			tags,
			processor: self.processor.clone(),
		}
	}

	/// Colon-joined tag path.
	pub fn tags(&self) -> String {
		self.tags.join(":")
	}

	/// Installs a processor receiving `(tags, message)` for this tracer tree.
	pub fn set_processor(&self, processor: impl Fn(&str, &str) + Send + Sync + 'static) {
		*self.processor.write() = Some(Arc::new(processor));
	}

	pub fn trace(&self, message: impl fmt::Display) {
		let tags = self.tags();
		let message = message.to_string();
		tracing::debug!(target: "vouch::trace", tags = %tags, "{message}");
		let processor = self.processor.read().clone();
		if let Some(processor) = processor {
			processor(&tags, &message);
		}
	}
}

impl fmt::Debug for Tracer {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Tracer").field("tags", &self.tags).finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests {
	use parking_lot::Mutex;
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn children_share_root_processor() {
		let root = Tracer::root();
		let seen = Arc::new(Mutex::new(Vec::new()));
		let sink = seen.clone();
		root.set_processor(move |tags, msg| sink.lock().push(format!("[{tags}] {msg}")));

		let child = root.get("assertion");
		child.trace("configured with mode set to \"rewrite\"");
		child.get("hook").trace("installed");

		assert_eq!(
			*seen.lock(),
			vec![
				"[assertion] configured with mode set to \"rewrite\"".to_string(),
				"[assertion:hook] installed".to_string(),
			]
		);
	}

	#[test]
	fn trace_without_processor_is_silent() {
		Tracer::root().get("assertion").trace("nothing listens");
	}
}
