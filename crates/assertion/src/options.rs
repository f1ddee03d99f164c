//! Command-line options and file settings for assertion diagnostics.
//!
//! [`AssertOptions`] is a `clap` argument group the host flattens into its own
//! parser. [`DiagnosticsSettings`] comes from the `[assertion]` table of a TOML
//! settings file:
//!
//! ```toml
//! [assertion]
//! mode = "reinterp"
//! verbose = 1
//! ci-env-vars = ["CI", "BUILD_NUMBER", "JENKINS_URL"]
//! truncation-budget = 800
//! truncation-max-lines = 10
//! rewrite-modules = ["pkg.checks"]
//! ```
//!
//! Explicit command-line values win over file values.

use clap::{ArgAction, Args};
use serde::Deserialize;

use crate::error::Result;
use crate::mode::Mode;
use crate::pipeline::{DEFAULT_CI_ENV_VARS, DEFAULT_TRUNCATION_BUDGET, DEFAULT_TRUNCATION_MAX_LINES};

/// Assertion debugging flags.
#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
#[command(next_help_heading = "Debug configuration")]
pub struct AssertOptions {
	/// Control assertion debugging tools. 'plain' performs no assertion
	/// debugging, 'reinterp' reinterprets assert statements after they failed,
	/// 'rewrite' (the default) rewrites assert statements in test modules on
	/// import.
	#[arg(long = "assert", value_name = "MODE", value_enum)]
	pub mode: Option<Mode>,

	/// DEPRECATED equivalent to --assert=plain
	#[arg(long = "no-assert")]
	pub no_assert: bool,

	/// DEPRECATED equivalent to --assert=plain
	#[arg(long = "nomagic", visible_alias = "no-magic")]
	pub no_magic: bool,

	/// Increase verbosity; -vv shows explanations untruncated.
	#[arg(short = 'v', long = "verbose", action = ArgAction::Count)]
	pub verbose: u8,
}

/// File-level diagnostics settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct DiagnosticsSettings {
	pub mode: Mode,
	pub verbose: u8,
	pub ci_env_vars: Vec<String>,
	pub truncation_budget: usize,
	pub truncation_max_lines: usize,
	pub rewrite_modules: Vec<String>,
}

impl Default for DiagnosticsSettings {
	fn default() -> Self {
		Self {
			mode: Mode::default(),
			verbose: 0,
			ci_env_vars: DEFAULT_CI_ENV_VARS.iter().map(|v| v.to_string()).collect(),
			truncation_budget: DEFAULT_TRUNCATION_BUDGET,
			truncation_max_lines: DEFAULT_TRUNCATION_MAX_LINES,
			rewrite_modules: Vec::new(),
		}
	}
}

#[derive(Debug, Deserialize)]
struct SettingsFile {
	#[serde(default)]
	assertion: DiagnosticsSettings,
}

impl DiagnosticsSettings {
	/// Parses the `[assertion]` table of a TOML document. A document without
	/// the table yields defaults; other tables are ignored.
	pub fn from_toml_str(input: &str) -> Result<Self> {
		let file: SettingsFile = toml::from_str(input)?;
		Ok(file.assertion)
	}

	/// Folds explicit command-line values over these settings.
	pub fn resolve(&self, options: &AssertOptions) -> ResolvedOptions {
		ResolvedOptions {
			requested: options.mode.unwrap_or(self.mode),
			no_assert: options.no_assert,
			no_magic: options.no_magic,
			verbose: if options.verbose > 0 { options.verbose } else { self.verbose },
		}
	}
}

/// Options after merging the command line over file settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedOptions {
	pub requested: Mode,
	pub no_assert: bool,
	pub no_magic: bool,
	pub verbose: u8,
}
