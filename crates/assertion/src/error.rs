//! Error types for assertion diagnostics.

use thiserror::Error;
use vouch_host::{CaptureError, HostError};

use crate::compare::ComparatorError;

/// Errors raised by the diagnostics core.
///
/// Downgrades (missing AST support, an already removed hook, assertions that
/// are compiled out) are handled locally and never show up here.
#[derive(Debug, Error)]
pub enum DiagnosticsError {
	/// A comparator failed to produce a usable explanation.
	#[error("comparator {comparator} produced malformed output: {source}")]
	Comparator {
		/// Name of the failing comparator.
		comparator: String,
		/// What the comparator reported.
		#[source]
		source: ComparatorError,
	},

	/// Explanation markup with unbalanced `{`/`}` groups or stray lines.
	#[error("malformed explanation: {0}")]
	MalformedExplanation(String),

	/// The output capture layer failed.
	#[error("capture failure: {0}")]
	Capture(#[from] CaptureError),

	/// Writing to the terminal failed.
	#[error("failed to write to terminal: {0}")]
	Terminal(#[source] std::io::Error),

	/// `configure` ran twice on one run configuration.
	#[error("assertion diagnostics are already configured for this run")]
	AlreadyConfigured,

	/// Settings file could not be parsed.
	#[error("invalid assertion settings: {0}")]
	Settings(#[from] toml::de::Error),

	/// Host surface failure.
	#[error(transparent)]
	Host(#[from] HostError),
}

/// Result type for diagnostics operations.
pub type Result<T> = std::result::Result<T, DiagnosticsError>;
