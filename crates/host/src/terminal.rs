//! Uncaptured output streams.

use std::io::{self, Write};
use std::sync::Arc;

use parking_lot::Mutex;

type Stream = Arc<Mutex<Box<dyn Write + Send>>>;

/// The user's real stdout/stderr, bypassing any capture layer.
#[derive(Clone)]
pub struct Terminal {
	out: Stream,
	err: Stream,
}

impl Terminal {
	/// Terminal writing to the process stdout and stderr.
	pub fn stdio() -> Self {
		Self::from_writers(io::stdout(), io::stderr())
	}

	pub fn from_writers(out: impl Write + Send + 'static, err: impl Write + Send + 'static) -> Self {
		Self {
			out: Arc::new(Mutex::new(Box::new(out))),
			err: Arc::new(Mutex::new(Box::new(err))),
		}
	}

	/// Terminal whose streams both land in one shared buffer, in write order.
	pub fn buffered() -> (Self, SharedBuffer) {
		let buf = SharedBuffer::default();
		(Self::from_writers(buf.clone(), buf.clone()), buf)
	}

	pub fn write_out(&self, text: &str) -> io::Result<()> {
		let mut out = self.out.lock();
		out.write_all(text.as_bytes())?;
		out.flush()
	}

	pub fn write_err(&self, text: &str) -> io::Result<()> {
		let mut err = self.err.lock();
		err.write_all(text.as_bytes())?;
		err.flush()
	}
}

/// Cloneable in-memory sink.
#[derive(Debug, Clone, Default)]
pub struct SharedBuffer {
	inner: Arc<Mutex<Vec<u8>>>,
}

impl SharedBuffer {
	/// Buffer contents, lossily decoded.
	pub fn contents(&self) -> String {
		String::from_utf8_lossy(&self.inner.lock()).into_owned()
	}
}

impl Write for SharedBuffer {
	fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
		self.inner.lock().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn flush(&mut self) -> io::Result<()> {
		Ok(())
	}
}
