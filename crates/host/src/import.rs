//! Module-loading facade with an ordered chain of import interceptors.
//!
//! Interceptors are consulted front to back before the default loader. The
//! first interceptor that claims a module produces it; the rest are skipped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::Result;

/// Loader name reported for modules no interceptor claimed.
pub const DEFAULT_LOADER: &str = "default";

/// Source of a module about to be imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleSource {
	/// Dotted module name.
	pub name: String,
	/// Path the source was read from.
	pub path: PathBuf,
	/// Module source text.
	pub code: String,
}

impl ModuleSource {
	pub fn new(name: impl Into<String>, path: impl Into<PathBuf>, code: impl Into<String>) -> Self {
		Self {
			name: name.into(),
			path: path.into(),
			code: code.into(),
		}
	}

	/// Final path component without extension, e.g. `test_parser` for `tests/test_parser.py`.
	pub fn stem(&self) -> &str {
		self.path.file_stem().and_then(|s| s.to_str()).unwrap_or(&self.name)
	}
}

/// One import request passed down the chain.
#[derive(Debug, Clone, Copy)]
pub struct ImportRequest<'a> {
	pub source: &'a ModuleSource,
}

impl<'a> ImportRequest<'a> {
	pub fn new(source: &'a ModuleSource) -> Self {
		Self { source }
	}

	pub fn name(&self) -> &'a str {
		&self.source.name
	}

	pub fn path(&self) -> &'a Path {
		&self.source.path
	}
}

/// A module produced by the facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedModule {
	pub name: String,
	pub code: String,
	/// Name of the interceptor that produced the module, or [`DEFAULT_LOADER`].
	pub loader: String,
}

/// Import-time interceptor able to claim and transform modules.
pub trait ImportInterceptor: Send + Sync {
	/// Short name used in logs and [`LoadedModule::loader`].
	fn name(&self) -> &str;

	/// Returns `Ok(None)` to pass the module on to the next interceptor.
	fn find_module(&self, request: ImportRequest<'_>) -> Result<Option<LoadedModule>>;
}

/// Ordered interceptor chain owned by one host.
///
/// Cloning yields another handle onto the same chain.
#[derive(Clone, Default)]
pub struct ImportChain {
	inner: Arc<RwLock<Vec<Arc<dyn ImportInterceptor>>>>,
}

impl ImportChain {
	/// Creates an empty chain.
	pub fn new() -> Self {
		Self::default()
	}

	/// Inserts `interceptor` ahead of every existing entry.
	pub fn install_front(&self, interceptor: Arc<dyn ImportInterceptor>) {
		tracing::debug!(interceptor = interceptor.name(), "installing import interceptor");
		self.inner.write().insert(0, interceptor);
	}

	/// Removes `interceptor` by identity. Returns false if it was not present.
	pub fn remove_if_present(&self, interceptor: &Arc<dyn ImportInterceptor>) -> bool {
		let mut guard = self.inner.write();
		let Some(pos) = guard.iter().position(|i| same_interceptor(i, interceptor)) else {
			return false;
		};
		guard.remove(pos);
		tracing::debug!(interceptor = interceptor.name(), "removed import interceptor");
		true
	}

	pub fn len(&self) -> usize {
		self.inner.read().len()
	}

	pub fn is_empty(&self) -> bool {
		self.inner.read().is_empty()
	}

	/// Interceptor names, front first.
	pub fn names(&self) -> Vec<String> {
		self.inner.read().iter().map(|i| i.name().to_string()).collect()
	}

	/// Imports `source`, letting the first claiming interceptor produce it.
	pub fn import(&self, source: &ModuleSource) -> Result<LoadedModule> {
		// Snapshot so interceptors may touch the chain while loading.
		let snapshot: Vec<_> = self.inner.read().clone();
		let request = ImportRequest::new(source);
		for interceptor in snapshot {
			if let Some(module) = interceptor.find_module(request)? {
				tracing::trace!(module = %source.name, loader = %module.loader, "module intercepted");
				return Ok(module);
			}
		}
		Ok(LoadedModule {
			name: source.name.clone(),
			code: source.code.clone(),
			loader: DEFAULT_LOADER.to_string(),
		})
	}
}

impl std::fmt::Debug for ImportChain {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_list().entries(self.names()).finish()
	}
}

fn same_interceptor(a: &Arc<dyn ImportInterceptor>, b: &Arc<dyn ImportInterceptor>) -> bool {
	std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}
