/*!
# Input frame

A single input source -- either a byte source plus decoder, or an
in-memory replacement-text buffer -- with its own line/column, putback
buffer, EOF tracking and newline-normalization state.

Pumps the decoder until a byte comes out, serving either from a file-backed
byte source or an in-memory buffer, and performs newline normalization on
the way out.
*/

use crate::bufq::ScratchBuffer;
use crate::decoder::Decoder;
use crate::error::TokenizeError;
use crate::source::ByteSource;

/// The two kinds of backing storage an [`InputFrame`] can have.
pub enum FrameSource {
	/// A byte source plus the decoder installed for it.
	File { source: Box<dyn ByteSource>, decoder: Decoder },
	/// An in-memory replacement text (entity expansion, or a parameter
	/// entity's surrounding spaces). Consumed front-to-back.
	Memory { text: Vec<u8>, pos: usize },
}

/// One entry in the input stack.
pub struct InputFrame {
	/// Source identifier: a file path for files, `&NAME;`/`%NAME;` for
	/// entity frames. Used for human-facing location reporting and for
	/// entity-recursion detection.
	pub name: String,
	/// 1-based line of the last character returned by `next_char`.
	pub line: u64,
	/// 0-based column of the last character returned by `next_char`.
	pub column: u64,
	/// XML major version: 1 for XML 1.0, 2 for XML 1.1. `0` means
	/// "not yet known" (filled in once `<?xml version="..."?>` is parsed).
	pub version: u8,
	putback: ScratchBuffer,
	source: FrameSource,
	/// Set once the source is exhausted *and* `putback` is empty.
	eof: bool,
	/// When true, this frame is popped automatically by the input stack
	/// once it reaches EOF (parameter-entity inclusion in the DTD).
	pub auto_pop: bool,
	/// True until the XML declaration has been parsed for this frame;
	/// disables XML 1.1 NEL/LS newline folding until cleared.
	pub preinit: bool,
}

impl InputFrame {
	pub fn new_file(name: String, source: Box<dyn ByteSource>, decoder: Decoder, version: u8) -> Self {
		Self {
			name,
			line: 1,
			column: 0,
			version,
			putback: ScratchBuffer::new(),
			source: FrameSource::File { source, decoder },
			eof: false,
			auto_pop: false,
			preinit: true,
		}
	}

	pub fn new_memory(name: String, text: Vec<u8>, version: u8) -> Self {
		let eof = text.is_empty();
		Self {
			name,
			line: 1,
			column: 0,
			version,
			putback: ScratchBuffer::new(),
			source: FrameSource::Memory { text, pos: 0 },
			eof,
			auto_pop: false,
			// Entity replacement text never contains its own XML
			// declaration, so NEL/LS folding should follow the inherited
			// version immediately.
			preinit: false,
		}
	}

	/// Replace the active decoder on a file frame (used after the XML
	/// declaration's `encoding="..."` is parsed and found compatible with
	/// the sniffed encoding but naming a variant, e.g. exact codepage).
	/// No-op for memory frames.
	pub fn set_decoder(&mut self, new_decoder: Decoder) {
		if let FrameSource::File { decoder, .. } = &mut self.source {
			*decoder = new_decoder;
		}
	}

	pub fn decoder_name(&self) -> Option<&'static str> {
		match &self.source {
			FrameSource::File { decoder, .. } => Some(decoder.name()),
			FrameSource::Memory { .. } => None,
		}
	}

	fn raw_next(&mut self) -> Result<Option<u8>, TokenizeError> {
		if let Some(b) = self.putback.pop() {
			return Ok(Some(b));
		}
		match &mut self.source {
			FrameSource::File { source, decoder } => {
				loop {
					let produced = decoder.next(source.as_mut())?;
					if !produced.is_empty() {
						// A decoder step can produce up to 4 bytes (a
						// single codepoint's UTF-8 encoding); queue any
						// extra bytes for subsequent raw reads.
						let mut iter = produced.into_iter();
						let first = iter.next().unwrap();
						let rest: Vec<u8> = iter.collect();
						if !rest.is_empty() {
							self.putback.reverse_append(&rest);
						}
						return Ok(Some(first));
					}
					if source.is_eof() {
						return Ok(None);
					}
				}
			}
			FrameSource::Memory { text, pos } => {
				if *pos >= text.len() {
					Ok(None)
				} else {
					let b = text[*pos];
					*pos += 1;
					Ok(Some(b))
				}
			}
		}
	}

	/// Look ahead up to `n` raw bytes (bypassing normalization), used only
	/// internally by newline-normalization lookahead. Bytes that are
	/// consumed but not used are pushed back via `putback` in the order
	/// they must be re-read.
	fn lookahead(&mut self, n: usize) -> Result<Vec<u8>, TokenizeError> {
		let mut got = Vec::with_capacity(n);
		for _ in 0..n {
			match self.raw_next()? {
				Some(b) => got.push(b),
				None => break,
			}
		}
		Ok(got)
	}

	/// Return one normalized UTF-8 byte and update line/column. Returns
	/// `None` at EOF.
	pub fn next_char(&mut self) -> Result<Option<u8>, TokenizeError> {
		let served_from_putback = !self.putback.is_empty();
		let b = match self.raw_next()? {
			None => {
				self.eof = self.putback.is_empty();
				return Ok(None);
			}
            Some(b) => b,
		};

		let out = if served_from_putback {
			// Bytes already normalized once (lookahead that was pushed
			// back, or raw entity-replacement content) are never
			// re-normalized -- this is what keeps normalization
			// idempotent.
			b
		} else {
			self.normalize(b)?
		};

		if out == b'\n' {
			self.line += 1;
			self.column = 0;
		} else {
			self.column += 1;
		}
		self.eof = false;
		Ok(Some(out))
	}

	/// Apply CR/LF, lone-CR, and (XML 1.1, post-declaration) NEL/LS
	/// folding to a freshly-decoded byte. `b` is the first byte of what may
	/// be a multi-byte UTF-8 sequence; only ASCII bytes (`CR`) trigger
	/// lookahead, so non-ASCII lead bytes pass straight through.
	fn normalize(&mut self, b: u8) -> Result<u8, TokenizeError> {
		if b == b'\r' {
			// CR LF -> LF; lone CR -> LF. In XML 1.1, CR U+0085 -> LF too.
			let ahead = self.lookahead(1)?;
			if ahead.first() == Some(&b'\n') {
				return Ok(b'\n');
			}
			if !ahead.is_empty() && self.xml11_active() && ahead[0] == 0xC2 {
				let ahead2 = self.lookahead(1)?;
				if ahead2.first() == Some(&0x85) {
					return Ok(b'\n');
				}
				self.putback.reverse_append(&ahead2);
			}
			if !ahead.is_empty() {
				self.putback.reverse_append(&ahead);
			}
			return Ok(b'\n');
		}
		if self.xml11_active() {
			if b == 0xC2 {
				let ahead = self.lookahead(1)?;
				if ahead.first() == Some(&0x85) {
					return Ok(b'\n');
				}
				if !ahead.is_empty() {
					self.putback.reverse_append(&ahead);
				}
				return Ok(b);
			}
			if b == 0xE2 {
				let ahead = self.lookahead(2)?;
				if ahead.len() == 2 && ahead[0] == 0x80 && ahead[1] == 0xA8 {
					return Ok(b'\n');
				}
				if !ahead.is_empty() {
					self.putback.reverse_append(&ahead);
				}
				return Ok(b);
			}
		}
		Ok(b)
	}

	fn xml11_active(&self) -> bool {
		!self.preinit && self.version >= 2
	}

	/// `is_eof` is only accurate once `next_char` has been called at least
	/// once past the last real byte; it is true only when both the
	/// underlying source is exhausted *and* the putback buffer is empty.
	pub fn is_eof(&self) -> bool {
		self.eof && self.putback.is_empty()
	}

	/// Push a single byte back onto this frame's putback buffer, to be
	/// re-served (without re-normalization) by the next `next_char` call.
	/// Used by `include_pe`'s leading/trailing space insertion.
	pub fn push_byte(&mut self, b: u8) {
		self.putback.push(b);
		self.eof = false;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::source::MemoryByteSource;

	#[test]
	fn crlf_normalizes_to_single_lf() {
		let mut f = InputFrame::new_file(
			"t".to_string(),
			Box::new(MemoryByteSource::new(b"a\r\nb".to_vec())),
			Decoder::Utf8,
			1,
		);
		f.preinit = false;
		let mut out = Vec::new();
		while let Some(b) = f.next_char().unwrap() {
			out.push(b);
		}
		assert_eq!(out, b"a\nb");
	}

	#[test]
	fn lone_cr_normalizes_to_lf() {
		let mut f = InputFrame::new_file(
			"t".to_string(),
			Box::new(MemoryByteSource::new(b"a\rb".to_vec())),
			Decoder::Utf8,
			1,
		);
		f.preinit = false;
		let mut out = Vec::new();
		while let Some(b) = f.next_char().unwrap() {
			out.push(b);
		}
		assert_eq!(out, b"a\nb");
	}

	#[test]
	fn xml11_nel_normalizes_to_lf_only_after_preinit() {
		let mut bytes = b"a".to_vec();
		bytes.extend_from_slice(&[0xC2, 0x85]);
		bytes.push(b'b');
		let mut f = InputFrame::new_file(
			"t".to_string(),
			Box::new(MemoryByteSource::new(bytes)),
			Decoder::Utf8,
			2,
		);
		f.preinit = false;
		let mut out = Vec::new();
		while let Some(b) = f.next_char().unwrap() {
			out.push(b);
		}
		assert_eq!(out, b"a\nb");
	}

	#[test]
	fn xml11_nel_not_folded_while_preinit() {
		let mut bytes = b"a".to_vec();
		bytes.extend_from_slice(&[0xC2, 0x85]);
		bytes.push(b'b');
		let mut f = InputFrame::new_file(
			"t".to_string(),
			Box::new(MemoryByteSource::new(bytes.clone())),
			Decoder::Utf8,
			2,
		);
		assert!(f.preinit);
		let mut out = Vec::new();
		while let Some(b) = f.next_char().unwrap() {
			out.push(b);
		}
		assert_eq!(out, bytes);
	}

	#[test]
	fn memory_frame_does_not_renormalize_content() {
		// Entity replacement text containing a literal CRLF sequence is
		// still folded on its *own* first read (it's freshly decoded from
		// the frame's perspective), but once served it is never folded
		// again even if re-read via putback.
		let mut f = InputFrame::new_memory("&x;".to_string(), b"p\r\nq".to_vec(), 1);
		let mut out = Vec::new();
		while let Some(b) = f.next_char().unwrap() {
			out.push(b);
		}
		assert_eq!(out, b"p\nq");
	}

	#[test]
	fn is_eof_false_until_exhausted() {
		let mut f = InputFrame::new_memory("&x;".to_string(), b"ab".to_vec(), 1);
		assert!(!f.is_eof());
		f.next_char().unwrap();
		assert!(!f.is_eof());
		f.next_char().unwrap();
		assert!(!f.is_eof());
		assert_eq!(f.next_char().unwrap(), None);
		assert!(f.is_eof());
	}
}
