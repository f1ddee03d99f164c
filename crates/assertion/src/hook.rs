//! Assertion rewriting import hook and its lifecycle.
//!
//! At most one [`RewriteHook`] sits in a host's [`ImportChain`]. The
//! [`HookLifecycle`] installs it for [`Mode::Rewrite`], lets the collection
//! session attach to it, and removes it again at run end. Removal tolerates a
//! hook that something else already took out of the chain.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, RwLock};
use vouch_host::{ImportChain, ImportInterceptor, ImportRequest, LoadedModule, ModuleSource, Session, Tracer};

use crate::mode::Mode;

/// Loader name reported for rewritten modules.
pub const REWRITE_LOADER: &str = "assertion-rewrite";

/// Module stem rewritten even before a session is bound.
const CONFTEST_STEM: &str = "conftest";

/// Source transformer that instruments assertions.
pub trait ModuleRewriter: Send + Sync {
	/// Returns the instrumented source of `source`.
	fn rewrite(&self, source: &ModuleSource) -> vouch_host::Result<String>;
}

/// Configuration the hook reads while deciding what to rewrite.
#[derive(Debug, Clone, Default)]
pub struct HookConfig {
	pub tracer: Tracer,
	/// Module names rewritten regardless of their file name.
	pub rewrite_modules: Vec<String>,
}

/// The import interceptor that rewrites test modules.
pub struct RewriteHook {
	rewriter: Arc<dyn ModuleRewriter>,
	config: RwLock<Arc<HookConfig>>,
	session: RwLock<Weak<Session>>,
}

impl RewriteHook {
	pub fn new(rewriter: Arc<dyn ModuleRewriter>) -> Self {
		Self {
			rewriter,
			config: RwLock::new(Arc::new(HookConfig::default())),
			session: RwLock::new(Weak::new()),
		}
	}

	pub fn set_config(&self, config: Arc<HookConfig>) {
		*self.config.write() = config;
	}

	/// Points the hook at `session`, or detaches it with `None`.
	///
	/// Only a weak reference is kept.
	pub fn set_session(&self, session: Option<&Arc<Session>>) {
		*self.session.write() = session.map(Arc::downgrade).unwrap_or_default();
	}

	/// The bound session, if it is still alive.
	pub fn session(&self) -> Option<Arc<Session>> {
		self.session.read().upgrade()
	}

	/// Returns true if `source` should have its assertions rewritten.
	pub fn should_rewrite(&self, source: &ModuleSource) -> bool {
		if source.stem() == CONFTEST_STEM {
			return true;
		}
		if self.config.read().rewrite_modules.iter().any(|m| *m == source.name) {
			return true;
		}
		let file_name = source.path.file_name().and_then(|f| f.to_str()).unwrap_or_default();
		self.session().is_some_and(|session| session.is_test_file(file_name))
	}
}

impl ImportInterceptor for RewriteHook {
	fn name(&self) -> &str {
		REWRITE_LOADER
	}

	fn find_module(&self, request: ImportRequest<'_>) -> vouch_host::Result<Option<LoadedModule>> {
		if !self.should_rewrite(request.source) {
			return Ok(None);
		}
		let code = self.rewriter.rewrite(request.source)?;
		self.config.read().tracer.trace(format_args!("rewriting {}", request.name()));
		Ok(Some(LoadedModule {
			name: request.name().to_string(),
			code,
			loader: REWRITE_LOADER.to_string(),
		}))
	}
}

impl fmt::Debug for RewriteHook {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RewriteHook")
			.field("session", &self.session().map(|s| s.name().to_string()))
			.finish_non_exhaustive()
	}
}

/// Whether the rewrite hook is in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
	Uninstalled,
	Installed,
}

/// Owns the process's rewrite hook for one import chain.
#[derive(Debug)]
pub struct HookLifecycle {
	chain: ImportChain,
	hook: Mutex<Option<Arc<RewriteHook>>>,
}

impl HookLifecycle {
	pub fn new(chain: ImportChain) -> Self {
		Self {
			chain,
			hook: Mutex::new(None),
		}
	}

	pub fn state(&self) -> HookState {
		if self.hook.lock().is_some() { HookState::Installed } else { HookState::Uninstalled }
	}

	/// The installed hook, if any.
	pub fn hook(&self) -> Option<Arc<RewriteHook>> {
		self.hook.lock().clone()
	}

	/// Installs the hook at the front of the chain when `mode` is
	/// [`Mode::Rewrite`] and no hook is installed yet.
	pub fn configure(&self, mode: Mode, rewriter: Option<&Arc<dyn ModuleRewriter>>, config: Arc<HookConfig>) -> HookState {
		if mode != Mode::Rewrite {
			return self.state();
		}
		let mut slot = self.hook.lock();
		if slot.is_some() {
			return HookState::Installed;
		}
		let Some(rewriter) = rewriter else {
			tracing::warn!("rewrite mode requested without a module rewriter, hook not installed");
			return HookState::Uninstalled;
		};

		let hook = Arc::new(RewriteHook::new(rewriter.clone()));
		hook.set_config(config);
		self.chain.install_front(hook.clone());
		*slot = Some(hook);
		tracing::debug!("assertion rewrite hook installed");
		HookState::Installed
	}

	/// Lets the hook see the collection session. Returns false when no hook
	/// is installed.
	pub fn bind_session(&self, session: &Arc<Session>) -> bool {
		let Some(hook) = self.hook() else {
			return false;
		};
		hook.set_session(Some(session));
		tracing::debug!(session = session.name(), "rewrite hook bound to session");
		true
	}

	/// Drops the hook's session reference while leaving it installed.
	pub fn release_session(&self) {
		if let Some(hook) = self.hook() {
			hook.set_session(None);
		}
	}

	/// Removes the hook from the chain. Safe to call repeatedly; returns
	/// true only when a hook was installed.
	pub fn teardown(&self) -> bool {
		let Some(hook) = self.hook.lock().take() else {
			return false;
		};
		hook.set_session(None);
		let entry: Arc<dyn ImportInterceptor> = hook;
		if self.chain.remove_if_present(&entry) {
			tracing::debug!("assertion rewrite hook removed");
		} else {
			tracing::debug!("assertion rewrite hook was already gone from the import chain");
		}
		true
	}
}
