//! Host-side surfaces for the vouch assertion diagnostics.
//!
//! The diagnostics core never reaches into the test runner directly. It talks
//! to a [`Host`] through a handful of narrow pieces:
//!
//! - [`ImportChain`]: ordered module interceptors consulted before the default loader
//! - [`CaptureManager`]: suspend/resume of buffered test output
//! - [`Terminal`]: the real stdout/stderr the user sees
//! - [`FailureSlot`]: the failure type raised by failing assertions
//! - [`Session`] and [`Tracer`]: collection session handle and tagged tracing
//!
//! Every piece is owned by a `Host` value rather than living in process-wide
//! statics, so independent hosts can coexist in one process.

pub mod capture;
pub mod error;
pub mod failure;
pub mod import;
pub mod session;
pub mod terminal;
pub mod trace;

use std::sync::Arc;

pub use capture::{BufferedCapture, CaptureManager, Captured, NoCapture};
pub use error::{CaptureError, HostError, Result};
pub use failure::FailureSlot;
pub use import::{ImportChain, ImportInterceptor, ImportRequest, LoadedModule, ModuleSource};
pub use session::Session;
pub use terminal::{SharedBuffer, Terminal};
pub use trace::Tracer;

/// Bundle of host surfaces handed to the diagnostics core at configuration time.
#[derive(Clone)]
pub struct Host {
	/// Module interception chain for this process.
	pub imports: ImportChain,
	/// Active output capture layer.
	pub capture: Arc<dyn CaptureManager>,
	/// Uncaptured terminal streams.
	pub terminal: Terminal,
	/// Failure type used by failing assertions.
	pub failure: FailureSlot,
	/// Root tracer of the run.
	pub tracer: Tracer,
}

impl Host {
	/// Creates a host writing to the process stdio with capture disabled.
	pub fn stdio() -> Self {
		Self::new(Arc::new(NoCapture), Terminal::stdio())
	}

	/// Creates a host around an explicit capture layer and terminal.
	pub fn new(capture: Arc<dyn CaptureManager>, terminal: Terminal) -> Self {
		Self {
			imports: ImportChain::new(),
			capture,
			terminal,
			failure: FailureSlot::default(),
			tracer: Tracer::root(),
		}
	}
}

impl std::fmt::Debug for Host {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Host")
			.field("imports", &self.imports)
			.field("failure", &self.failure)
			.field("tracer", &self.tracer)
			.finish_non_exhaustive()
	}
}
