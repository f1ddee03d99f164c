//! Collection session handle.

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::error::{HostError, Result};

/// File name patterns recognized as test modules when none are configured.
pub const DEFAULT_TEST_FILE_PATTERNS: &[&str] = &["test_*.py", "*_test.py"];

/// A test collection session.
///
/// Sessions own themselves; other components refer to them through
/// `Weak<Session>` and must cope with the session being gone.
#[derive(Debug)]
pub struct Session {
	name: String,
	patterns: Vec<String>,
	test_files: GlobSet,
}

impl Session {
	/// Creates a session recognizing [`DEFAULT_TEST_FILE_PATTERNS`].
	pub fn new(name: impl Into<String>) -> Result<Self> {
		Self::with_patterns(name, DEFAULT_TEST_FILE_PATTERNS.iter().copied())
	}

	/// Creates a session with explicit test file patterns.
	pub fn with_patterns<I, S>(name: impl Into<String>, patterns: I) -> Result<Self>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut builder = GlobSetBuilder::new();
		let mut kept = Vec::new();
		for pattern in patterns {
			let pattern = pattern.as_ref();
			let glob = Glob::new(pattern).map_err(|e| HostError::Pattern {
				pattern: pattern.to_string(),
				reason: e.to_string(),
			})?;
			builder.add(glob);
			kept.push(pattern.to_string());
		}
		let test_files = builder.build().map_err(|e| HostError::Pattern {
			pattern: kept.join(", "),
			reason: e.to_string(),
		})?;
		Ok(Self {
			name: name.into(),
			patterns: kept,
			test_files,
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn patterns(&self) -> &[String] {
		&self.patterns
	}

	/// Returns true if `file_name` (no directory) names a test module.
	pub fn is_test_file(&self, file_name: &str) -> bool {
		self.test_files.is_match(file_name)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn default_patterns_match_test_modules() {
		let session = Session::new("run").unwrap();
		assert!(session.is_test_file("test_parser.py"));
		assert!(session.is_test_file("parser_test.py"));
		assert!(!session.is_test_file("parser.py"));
		assert!(!session.is_test_file("conftest.py"));
	}

	#[test]
	fn custom_patterns_replace_defaults() {
		let session = Session::with_patterns("run", ["check_*.py"]).unwrap();
		assert!(session.is_test_file("check_io.py"));
		assert!(!session.is_test_file("test_io.py"));
		assert_eq!(session.patterns(), ["check_*.py".to_string()]);
	}

	#[test]
	fn invalid_pattern_is_rejected() {
		let err = Session::with_patterns("run", ["test_[.py"]).unwrap_err();
		assert!(matches!(err, HostError::Pattern { .. }), "unexpected error: {err}");
	}
}
