//! Output capture layer.

use parking_lot::Mutex;

use crate::error::CaptureError;
use crate::terminal::Terminal;

/// Output buffered by a capture layer up to the moment it was suspended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Captured {
	pub out: String,
	pub err: String,
}

/// Capture layer that buffers test output.
pub trait CaptureManager: Send + Sync {
	/// Stops capturing and hands back everything buffered so far.
	fn suspend(&self) -> Result<Captured, CaptureError>;

	/// Resumes capturing.
	fn resume(&self) -> Result<(), CaptureError>;

	/// Hands output drained by [`suspend`](Self::suspend) back to the layer,
	/// after anything written since.
	fn replay(&self, captured: Captured) -> Result<(), CaptureError>;
}

/// Capture disabled: nothing is ever buffered.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCapture;

impl CaptureManager for NoCapture {
	fn suspend(&self) -> Result<Captured, CaptureError> {
		Ok(Captured::default())
	}

	fn resume(&self) -> Result<(), CaptureError> {
		Ok(())
	}

	fn replay(&self, _captured: Captured) -> Result<(), CaptureError> {
		Ok(())
	}
}

#[derive(Debug, Default)]
struct CaptureState {
	suspended: bool,
	buffered: Captured,
}

/// In-memory capture: writes are buffered while active and passed to the
/// terminal while suspended.
pub struct BufferedCapture {
	terminal: Terminal,
	state: Mutex<CaptureState>,
}

impl BufferedCapture {
	pub fn new(terminal: Terminal) -> Self {
		Self {
			terminal,
			state: Mutex::new(CaptureState::default()),
		}
	}

	pub fn write_out(&self, text: &str) -> std::io::Result<()> {
		let mut state = self.state.lock();
		if state.suspended {
			drop(state);
			return self.terminal.write_out(text);
		}
		state.buffered.out.push_str(text);
		Ok(())
	}

	pub fn write_err(&self, text: &str) -> std::io::Result<()> {
		let mut state = self.state.lock();
		if state.suspended {
			drop(state);
			return self.terminal.write_err(text);
		}
		state.buffered.err.push_str(text);
		Ok(())
	}

	pub fn is_suspended(&self) -> bool {
		self.state.lock().suspended
	}
}

impl CaptureManager for BufferedCapture {
	fn suspend(&self) -> Result<Captured, CaptureError> {
		let mut state = self.state.lock();
		if state.suspended {
			return Err(CaptureError::AlreadySuspended);
		}
		state.suspended = true;
		Ok(std::mem::take(&mut state.buffered))
	}

	fn resume(&self) -> Result<(), CaptureError> {
		let mut state = self.state.lock();
		if !state.suspended {
			return Err(CaptureError::NotSuspended);
		}
		state.suspended = false;
		Ok(())
	}

	fn replay(&self, captured: Captured) -> Result<(), CaptureError> {
		self.write_out(&captured.out)?;
		self.write_err(&captured.err)?;
		Ok(())
	}
}
