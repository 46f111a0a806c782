/*!
# Byte source

spec.md §4.1: the leaf of the input stack. A [`ByteSource`] wraps a file
handle (or, in tests, any in-memory byte slice) and delivers raw bytes one at
a time to the [`crate::decoder::Decoder`] sitting on top of it.

This is new relative to the teacher crate, which only ever read from a
single `io::BufRead` supplied by the caller and never needed to open files
of its own (the teacher is restricted to a single UTF-8 source with no
external entities or DTD). Modeled on the teacher's `DecodingReader` in
`lexer/read.rs` for the shape of a pull-one-unit-at-a-time adapter over a
buffered reader.
*/

use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

use crate::error::TokenizeError;

/// Delivers raw bytes from an underlying resource, one at a time.
///
/// Implementations must report EOF via `is_eof()` returning `true` only
/// *after* an attempted read has found no more bytes. A read failure other
/// than EOF is reported as [`TokenizeError::IoError`] and is fatal for the
/// containing frame.
pub trait ByteSource {
	/// Read a single byte. Returns `Ok(None)` at end of stream.
	fn read_byte(&mut self) -> Result<Option<u8>, TokenizeError>;

	/// Whether the source is known to be exhausted. Only meaningful after
	/// at least one call to `read_byte` has returned `Ok(None)`.
	fn is_eof(&self) -> bool;
}

/// A [`ByteSource`] backed by an open file, read through a [`BufReader`] so
/// that byte-at-a-time reads do not each incur a syscall.
pub struct FileByteSource {
	reader: BufReader<File>,
	eof: bool,
}

impl FileByteSource {
	pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, TokenizeError> {
		let file = File::open(path.as_ref())
			.map_err(|e| TokenizeError::IoError(format!("{}: {}", path.as_ref().display(), e)))?;
		Ok(Self { reader: BufReader::new(file), eof: false })
	}
}

impl ByteSource for FileByteSource {
	fn read_byte(&mut self) -> Result<Option<u8>, TokenizeError> {
		let mut buf = [0u8; 1];
		loop {
			match self.reader.read(&mut buf) {
				Ok(0) => {
					self.eof = true;
					return Ok(None);
				}
				Ok(_) => return Ok(Some(buf[0])),
				Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
				Err(e) => return Err(TokenizeError::from(e)),
			}
		}
	}

	fn is_eof(&self) -> bool {
		self.eof
	}
}

/// A [`ByteSource`] backed by an in-memory byte vector. Used by tests and by
/// any caller that already has the document in memory.
pub struct MemoryByteSource {
	data: Vec<u8>,
	pos: usize,
}

impl MemoryByteSource {
	pub fn new(data: Vec<u8>) -> Self {
		Self { data, pos: 0 }
	}
}

impl ByteSource for MemoryByteSource {
	fn read_byte(&mut self) -> Result<Option<u8>, TokenizeError> {
		if self.pos >= self.data.len() {
			return Ok(None);
		}
		let b = self.data[self.pos];
		self.pos += 1;
		Ok(Some(b))
	}

	fn is_eof(&self) -> bool {
		self.pos >= self.data.len()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn memory_source_reports_eof_after_exhaustion() {
		let mut src = MemoryByteSource::new(vec![1, 2]);
		assert_eq!(src.read_byte().unwrap(), Some(1));
		assert!(!src.is_eof());
		assert_eq!(src.read_byte().unwrap(), Some(2));
		assert_eq!(src.read_byte().unwrap(), None);
		assert!(src.is_eof());
	}

	#[test]
	fn file_source_round_trips_bytes() {
		let mut f = tempfile::NamedTempFile::new().unwrap();
		use std::io::Write;
		f.write_all(b"abc").unwrap();
		f.flush().unwrap();
		let mut src = FileByteSource::open(f.path()).unwrap();
		assert_eq!(src.read_byte().unwrap(), Some(b'a'));
		assert_eq!(src.read_byte().unwrap(), Some(b'b'));
		assert_eq!(src.read_byte().unwrap(), Some(b'c'));
		assert_eq!(src.read_byte().unwrap(), None);
		assert!(src.is_eof());
	}
}
