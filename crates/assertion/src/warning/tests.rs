use std::io;

use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use vouch_host::{BufferedCapture, CaptureError, Captured, NoCapture, SharedBuffer};

use super::*;

const UNENFORCED: RuntimeCapabilities = RuntimeCapabilities {
	assertions_enforced: false,
	..RuntimeCapabilities::full()
};

/// Capture layer recording the calls it receives.
#[derive(Default)]
struct Recording {
	calls: Mutex<Vec<String>>,
	fail_suspend: bool,
}

impl CaptureManager for Recording {
	fn suspend(&self) -> std::result::Result<Captured, CaptureError> {
		if self.fail_suspend {
			return Err(CaptureError::AlreadySuspended);
		}
		self.calls.lock().push("suspend".into());
		Ok(Captured {
			out: "buffered out".into(),
			err: "buffered err".into(),
		})
	}

	fn resume(&self) -> std::result::Result<(), CaptureError> {
		self.calls.lock().push("resume".into());
		Ok(())
	}

	fn replay(&self, captured: Captured) -> std::result::Result<(), CaptureError> {
		self.calls.lock().push(format!("replay {}|{}", captured.out, captured.err));
		Ok(())
	}
}

struct BrokenPipe;

impl io::Write for BrokenPipe {
	fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
		Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}

#[test]
fn messages_depend_on_mode() {
	assert_eq!(
		missing_assertion_message(Mode::Rewrite),
		"WARNING: assertions which are not in test modules will be ignored because assert statements are not \
		 executed by the underlying runtime (are debug assertions disabled?)\n"
	);
	for mode in [Mode::Reinterpret, Mode::Plain] {
		assert!(missing_assertion_message(mode).starts_with("WARNING: failing tests may report as passing because"));
	}
}

#[test]
fn enforced_runtime_stays_quiet() {
	let (terminal, screen) = Terminal::buffered();
	let emitted = warn_about_missing_assertion(Mode::Rewrite, RuntimeCapabilities::full(), &NoCapture, &terminal).unwrap();
	assert!(!emitted);
	assert_eq!(screen.contents(), "");
}

#[test]
fn warning_bypasses_capture_and_replays_buffer() {
	let (terminal, screen) = Terminal::buffered();
	let capture = BufferedCapture::new(terminal.clone());
	capture.write_out("before\n").unwrap();

	let emitted = warn_about_missing_assertion(Mode::Plain, UNENFORCED, &capture, &terminal).unwrap();

	assert!(emitted);
	assert_eq!(screen.contents(), missing_assertion_message(Mode::Plain));
	assert!(!capture.is_suspended());
	assert_eq!(capture.suspend().unwrap().out, "before\n");
}

#[test]
fn call_order_is_suspend_write_resume_replay() {
	let recording = Recording::default();
	let (terminal, _) = Terminal::buffered();
	warn_about_missing_assertion(Mode::Rewrite, UNENFORCED, &recording, &terminal).unwrap();
	assert_eq!(
		*recording.calls.lock(),
		vec![
			"suspend".to_string(),
			"resume".to_string(),
			"replay buffered out|buffered err".to_string(),
		]
	);
}

#[test]
fn failed_write_still_resumes_capture() {
	let recording = Recording::default();
	let terminal = Terminal::from_writers(SharedBuffer::default(), BrokenPipe);

	let err = warn_about_missing_assertion(Mode::Rewrite, UNENFORCED, &recording, &terminal).unwrap_err();

	assert!(matches!(err, DiagnosticsError::Terminal(_)), "unexpected error: {err}");
	assert!(recording.calls.lock().contains(&"resume".to_string()));
}

#[test]
fn suspend_failure_propagates() {
	let recording = Recording {
		fail_suspend: true,
		..Recording::default()
	};
	let (terminal, screen) = Terminal::buffered();
	let err = warn_about_missing_assertion(Mode::Rewrite, UNENFORCED, &recording, &terminal).unwrap_err();
	assert!(matches!(err, DiagnosticsError::Capture(_)), "unexpected error: {err}");
	assert_eq!(screen.contents(), "");
}
