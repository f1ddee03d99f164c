//! Per-run diagnostics state.

use std::fmt;
use std::sync::Arc;

use vouch_host::{ImportChain, Tracer};

use crate::hook::{HookLifecycle, HookState, RewriteHook};
use crate::mode::Mode;

/// Resolved mode, rewrite hook and tracer of one run.
///
/// Built once by [`RunConfig::configure`](crate::RunConfig::configure); only
/// the hook lifecycle mutates it afterwards.
#[derive(Debug)]
pub struct DiagnosticsState {
	mode: Mode,
	hooks: HookLifecycle,
	tracer: Tracer,
}

impl DiagnosticsState {
	pub(crate) fn new(mode: Mode, chain: ImportChain, tracer: Tracer) -> Self {
		Self {
			mode,
			hooks: HookLifecycle::new(chain),
			tracer,
		}
	}

	pub fn mode(&self) -> Mode {
		self.mode
	}

	/// The installed rewrite hook, if any.
	pub fn hook(&self) -> Option<Arc<RewriteHook>> {
		self.hooks.hook()
	}

	pub fn hook_state(&self) -> HookState {
		self.hooks.state()
	}

	pub fn tracer(&self) -> &Tracer {
		&self.tracer
	}

	pub fn trace(&self, message: impl fmt::Display) {
		self.tracer.trace(message);
	}

	pub(crate) fn hooks(&self) -> &HookLifecycle {
		&self.hooks
	}
}
