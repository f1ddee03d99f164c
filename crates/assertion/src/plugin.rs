//! Run-level entry points the host calls at each phase.
//!
//! ```text
//! configure ──> collection ──> (runtest_setup ─ body ─ runtest_teardown)* ──> session_finish ──> cleanup
//! ```
//!
//! [`RunConfig`] owns everything that would otherwise be process-wide: the
//! diagnostics state, the comparison callback slot and the cleanup stack.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use vouch_host::{Host, Session};

use crate::compare::ComparatorRegistry;
use crate::error::{DiagnosticsError, Result};
use crate::hook::{HookConfig, ModuleRewriter};
use crate::mode::{Mode, RuntimeCapabilities, resolve};
use crate::options::{AssertOptions, DiagnosticsSettings, ResolvedOptions};
use crate::pipeline::{ComparisonPipeline, ExplanationPolicy, ReprCompareSlot, running_on_ci};
use crate::state::DiagnosticsState;
use crate::warning::warn_about_missing_assertion;

/// Fallback evaluator used when assertions are not rewritten.
pub trait Reinterpreter: Send + Sync {
	/// Failure type that replaces the native one while diagnostics are active.
	fn failure_type(&self) -> &str;
}

/// Runtime descriptor plus the optional external capabilities.
#[derive(Clone, Default)]
pub struct Capabilities {
	pub runtime: RuntimeCapabilities,
	pub rewriter: Option<Arc<dyn ModuleRewriter>>,
	pub reinterpreter: Option<Arc<dyn Reinterpreter>>,
}

impl Capabilities {
	/// Runtime capabilities with rewriting only claimed when a rewriter exists.
	fn effective_runtime(&self) -> RuntimeCapabilities {
		RuntimeCapabilities {
			ast_capable: self.runtime.ast_capable && self.rewriter.is_some(),
			..self.runtime
		}
	}
}

impl fmt::Debug for Capabilities {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Capabilities")
			.field("runtime", &self.runtime)
			.field("rewriter", &self.rewriter.is_some())
			.field("reinterpreter", &self.reinterpreter.is_some())
			.finish()
	}
}

type Cleanup = Box<dyn FnOnce() -> Result<()> + Send>;

/// Configuration object of one test run.
pub struct RunConfig {
	host: Host,
	settings: DiagnosticsSettings,
	options: ResolvedOptions,
	capabilities: Capabilities,
	comparators: ComparatorRegistry,
	reprcompare: ReprCompareSlot,
	configured: AtomicBool,
	state: Mutex<Option<Arc<DiagnosticsState>>>,
	cleanups: Mutex<Vec<Cleanup>>,
}

impl RunConfig {
	pub fn new(host: Host, settings: DiagnosticsSettings, options: &AssertOptions, capabilities: Capabilities) -> Self {
		let options = settings.resolve(options);
		Self {
			host,
			settings,
			options,
			capabilities,
			comparators: ComparatorRegistry::with_builtins(),
			reprcompare: ReprCompareSlot::new(),
			configured: AtomicBool::new(false),
			state: Mutex::new(None),
			cleanups: Mutex::new(Vec::new()),
		}
	}

	pub fn host(&self) -> &Host {
		&self.host
	}

	pub fn options(&self) -> &ResolvedOptions {
		&self.options
	}

	/// Comparator extensions; register more before tests run.
	pub fn comparators(&self) -> &ComparatorRegistry {
		&self.comparators
	}

	/// Slot consulted by instrumented assertions.
	pub fn reprcompare(&self) -> &ReprCompareSlot {
		&self.reprcompare
	}

	/// Diagnostics state between `configure` and `cleanup`.
	pub fn state(&self) -> Option<Arc<DiagnosticsState>> {
		self.state.lock().clone()
	}

	/// Effective mode, [`Mode::Plain`] before configuration.
	pub fn mode(&self) -> Mode {
		self.state().map_or(Mode::Plain, |s| s.mode())
	}

	/// Pushes `f` onto the cleanup stack run by [`cleanup`](Self::cleanup).
	pub fn add_cleanup(&self, f: impl FnOnce() -> Result<()> + Send + 'static) {
		self.cleanups.lock().push(Box::new(f));
	}

	/// Resolves the mode, warns about unenforced assertions, swaps in the
	/// reinterpreter's failure type and installs the rewrite hook.
	///
	/// Hook removal is registered for cleanup before anything that can fail.
	pub fn configure(&self) -> Result<Arc<DiagnosticsState>> {
		if self.configured.swap(true, Ordering::AcqRel) {
			return Err(DiagnosticsError::AlreadyConfigured);
		}

		let runtime = self.capabilities.effective_runtime();
		let opts = self.options;
		let mode = resolve(opts.requested, opts.no_assert, opts.no_magic, runtime);
		if mode != opts.requested {
			tracing::debug!(requested = %opts.requested, effective = %mode, "assertion mode adjusted");
		}

		let tracer = self.host.tracer.get("assertion");
		let state = Arc::new(DiagnosticsState::new(mode, self.host.imports.clone(), tracer.clone()));
		*self.state.lock() = Some(state.clone());
		let teardown = state.clone();
		self.add_cleanup(move || {
			teardown.hooks().teardown();
			Ok(())
		});

		warn_about_missing_assertion(mode, runtime, &*self.host.capture, &self.host.terminal)?;

		if mode != Mode::Plain
			&& let Some(reinterpreter) = &self.capabilities.reinterpreter
		{
			let previous = self.host.failure.replace(reinterpreter.failure_type());
			let slot = self.host.failure.clone();
			self.add_cleanup(move || {
				slot.replace(previous);
				Ok(())
			});
		}

		let hook_config = HookConfig {
			tracer: tracer.get("rewrite"),
			rewrite_modules: self.settings.rewrite_modules.clone(),
		};
		state
			.hooks()
			.configure(mode, self.capabilities.rewriter.as_ref(), Arc::new(hook_config));

		state.trace(format_args!("configured with mode set to {:?}", mode.as_str()));
		tracing::info!(mode = %mode, hook = ?state.hook_state(), "assertion diagnostics configured");
		Ok(state)
	}

	/// Collection started. Only fires when this process collects tests itself.
	pub fn collection(&self, session: &Arc<Session>) -> bool {
		self.state().is_some_and(|state| state.hooks().bind_session(session))
	}

	/// Comparison pipeline for the next test under the current settings.
	pub fn pipeline(&self) -> ComparisonPipeline {
		let policy = ExplanationPolicy {
			mode: self.mode(),
			verbose: self.options.verbose,
			ci: running_on_ci(&self.settings.ci_env_vars),
			budget: self.settings.truncation_budget,
			max_lines: self.settings.truncation_max_lines,
		};
		ComparisonPipeline::new(self.comparators.clone(), policy)
	}

	/// Activates comparison explanations for one test.
	pub fn runtest_setup(&self) {
		self.pipeline().install(&self.reprcompare);
	}

	/// Deactivates comparison explanations, whatever the test outcome.
	pub fn runtest_teardown(&self) {
		self.reprcompare.clear();
	}

	/// Runs `body` between setup and teardown. Teardown also runs when
	/// `body` panics.
	pub fn run_test<R>(&self, body: impl FnOnce() -> R) -> R {
		let _active = self.pipeline().activate(&self.reprcompare);
		body()
	}

	/// Session finished: the hook forgets the session but stays installed.
	pub fn session_finish(&self) {
		if let Some(state) = self.state() {
			state.hooks().release_session();
		}
	}

	/// Runs every registered cleanup, newest first, and drops the state.
	///
	/// All cleanups run even if one fails; the first error is returned.
	pub fn cleanup(&self) -> Result<()> {
		let cleanups = std::mem::take(&mut *self.cleanups.lock());
		let mut first_error = None;
		for cleanup in cleanups.into_iter().rev() {
			if let Err(err) = cleanup() {
				tracing::warn!(error = %err, "cleanup failed");
				if first_error.is_none() {
					first_error = Some(err);
				}
			}
		}
		self.reprcompare.clear();
		*self.state.lock() = None;
		first_error.map_or(Ok(()), Err)
	}
}

impl fmt::Debug for RunConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RunConfig")
			.field("options", &self.options)
			.field("capabilities", &self.capabilities)
			.field("comparators", &self.comparators)
			.field("state", &self.state())
			.finish_non_exhaustive()
	}
}

#[cfg(test)]
mod tests;
