//! Instrumentation mode selection.

use std::fmt;

use serde::Deserialize;

/// How failing assertions are instrumented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize, clap::ValueEnum)]
pub enum Mode {
	/// Assertions in test modules are rewritten on import.
	#[default]
	#[serde(rename = "rewrite")]
	Rewrite,
	/// Failed assertions are re-evaluated after the fact.
	#[value(name = "reinterp", alias = "reinterpret")]
	#[serde(rename = "reinterp", alias = "reinterpret")]
	Reinterpret,
	/// No assertion debugging.
	#[serde(rename = "plain")]
	Plain,
}

impl Mode {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Rewrite => "rewrite",
			Self::Reinterpret => "reinterp",
			Self::Plain => "plain",
		}
	}
}

impl fmt::Display for Mode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl std::str::FromStr for Mode {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"rewrite" => Ok(Self::Rewrite),
			"reinterp" | "reinterpret" => Ok(Self::Reinterpret),
			"plain" => Ok(Self::Plain),
			_ => Err(format!("unknown assertion mode: {s} (expected rewrite, reinterp or plain)")),
		}
	}
}

/// What the runtime can do, computed once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuntimeCapabilities {
	/// Source can be parsed and rewritten before import.
	pub ast_capable: bool,
	/// The runtime is a variant known to miscompile rewritten modules.
	pub buggy_runtime: bool,
	/// Failing assertions actually fail (they are not compiled out).
	pub assertions_enforced: bool,
}

impl Default for RuntimeCapabilities {
	fn default() -> Self {
		Self::detect()
	}
}

impl RuntimeCapabilities {
	/// A runtime that supports everything.
	pub const fn full() -> Self {
		Self {
			ast_capable: true,
			buggy_runtime: false,
			assertions_enforced: true,
		}
	}

	/// Capabilities of the current build. Assertions are enforced when debug
	/// assertions are compiled in.
	pub const fn detect() -> Self {
		Self {
			assertions_enforced: cfg!(debug_assertions),
			..Self::full()
		}
	}
}

/// Resolves the effective mode.
///
/// The deprecated `no_assert`/`no_magic` flags force [`Mode::Plain`]. A
/// rewrite request on a runtime that cannot rewrite falls back to
/// [`Mode::Reinterpret`]. Everything else passes through.
pub fn resolve(requested: Mode, no_assert: bool, no_magic: bool, caps: RuntimeCapabilities) -> Mode {
	if no_assert || no_magic {
		return Mode::Plain;
	}
	if requested != Mode::Rewrite {
		return requested;
	}
	if !caps.ast_capable {
		tracing::debug!("runtime cannot rewrite modules, falling back to reinterp");
		return Mode::Reinterpret;
	}
	if caps.buggy_runtime {
		tracing::debug!("runtime has known rewrite bugs, falling back to reinterp");
		return Mode::Reinterpret;
	}
	Mode::Rewrite
}
