//! Assertion diagnostics for a test runner.
//!
//! A [`RunConfig`] drives one run through its phases:
//!
//! - `configure` resolves the [`Mode`] (rewrite, reinterp or plain), warns when
//!   the build does not enforce assertions and installs the [`RewriteHook`]
//!   at the front of the host's import chain
//! - `collection` hands the collection [`Session`](vouch_host::Session) to the hook
//! - `runtest_setup`/`runtest_teardown` activate and clear the comparison
//!   callback in the [`ReprCompareSlot`]
//! - `cleanup` unwinds everything `configure` did
//!
//! Failed comparisons are explained by the first [`Comparator`] in the
//! [`ComparatorRegistry`] with something to say. The explanation is then
//! truncated and joined into one string by the [`ExplanationPolicy`].

pub mod compare;
pub mod error;
pub mod explain;
pub mod hook;
pub mod mode;
pub mod options;
pub mod pipeline;
pub mod plugin;
pub mod state;
pub mod warning;

pub use compare::{CompareContext, CompareOp, Comparator, ComparatorError, ComparatorRegistry, Explanation, FnComparator};
pub use error::{DiagnosticsError, Result};
pub use explain::{DebugDiff, LINE_SEPARATOR, format_explanation};
pub use hook::{HookConfig, HookLifecycle, HookState, ModuleRewriter, REWRITE_LOADER, RewriteHook};
pub use mode::{Mode, RuntimeCapabilities, resolve};
pub use options::{AssertOptions, DiagnosticsSettings, ResolvedOptions};
pub use pipeline::{ActiveComparison, ComparisonPipeline, ExplanationPolicy, ReprCompare, ReprCompareSlot, running_on_ci};
pub use plugin::{Capabilities, Reinterpreter, RunConfig};
pub use state::DiagnosticsState;
pub use warning::{missing_assertion_message, warn_about_missing_assertion};

// Used only by the integration tests.
#[cfg(test)]
use serial_test as _;
#[cfg(test)]
use tracing_subscriber as _;
