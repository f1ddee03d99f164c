//! Warning for runtimes that do not enforce assertions.

use vouch_host::{CaptureManager, Terminal};

use crate::error::{DiagnosticsError, Result};
use crate::mode::{Mode, RuntimeCapabilities};

/// Full warning line for `mode`, including the trailing newline.
pub fn missing_assertion_message(mode: Mode) -> String {
	let specifically = match mode {
		Mode::Rewrite => "assertions which are not in test modules will be ignored",
		Mode::Reinterpret | Mode::Plain => "failing tests may report as passing",
	};
	format!(
		"WARNING: {specifically} because assert statements are not executed by the underlying runtime \
		 (are debug assertions disabled?)\n"
	)
}

/// Warns on the real terminal when `caps` says assertions are compiled out.
///
/// Capture is suspended around the write so the warning is never swallowed.
/// Capture is resumed even if the write fails, and output buffered before the
/// suspension is handed back to the capture layer afterwards. Returns whether
/// a warning was emitted.
pub fn warn_about_missing_assertion(
	mode: Mode,
	caps: RuntimeCapabilities,
	capture: &dyn CaptureManager,
	terminal: &Terminal,
) -> Result<bool> {
	if caps.assertions_enforced {
		return Ok(false);
	}

	let message = missing_assertion_message(mode);
	let buffered = capture.suspend()?;
	let written = terminal.write_err(&message);
	capture.resume()?;
	capture.replay(buffered)?;
	written.map_err(DiagnosticsError::Terminal)?;

	tracing::warn!(mode = %mode, "assertions are not enforced by this runtime");
	Ok(true)
}

#[cfg(test)]
mod tests;
