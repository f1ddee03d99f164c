//! Error types for host surfaces.

use thiserror::Error;

/// Errors raised by an output capture layer.
#[derive(Debug, Error)]
pub enum CaptureError {
	/// `suspend` was called while capture was already suspended.
	#[error("capture is already suspended")]
	AlreadySuspended,

	/// `resume` was called while capture was active.
	#[error("capture is not suspended")]
	NotSuspended,

	/// The capture layer could not flush or read its buffers.
	#[error("capture I/O error: {0}")]
	Io(#[from] std::io::Error),
}

/// Errors raised by host surfaces.
#[derive(Debug, Error)]
pub enum HostError {
	/// Capture layer failure.
	#[error(transparent)]
	Capture(#[from] CaptureError),

	/// A test file pattern failed to compile.
	#[error("invalid test file pattern {pattern:?}: {reason}")]
	Pattern {
		/// Offending pattern.
		pattern: String,
		/// Glob compiler message.
		reason: String,
	},

	/// An interceptor claimed a module but failed to produce it.
	#[error("interceptor {interceptor} failed to load {module}: {reason}")]
	Intercept {
		/// Name of the interceptor that claimed the module.
		interceptor: String,
		/// Module being imported.
		module: String,
		/// Human readable failure.
		reason: String,
	},
}

/// Result type for host operations.
pub type Result<T> = std::result::Result<T, HostError>;
