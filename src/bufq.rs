/*!
# Scratch buffer

A growable byte buffer used by the lexer in two roles: as a per-frame
putback stack (bytes looked ahead during newline/BOM detection that must be
re-served before fresh input) and as the token accumulator (the bytes of the
token currently being recognized, cleared each time a token is emitted).

This module is the descendant of the teacher crate's `BufferQueue`: where
that type was a FIFO adapter for feeding chunks of bytes into a push-based
parser, [`ScratchBuffer`] is a plain LIFO byte stack sized for the narrower
job spec.md §4.3 describes. The push/clear vocabulary carries over; the
queue-of-borrowed-chunks machinery does not, since every byte here is
produced or consumed one at a time by the frame and lexer layers.
*/

/// A mutable byte buffer supporting stack (putback) and accumulator use.
///
/// An empty buffer is a valid, distinguishable state from "no buffer exists"
/// -- callers that need to tell "nothing was ever pushed" from "everything
/// pushed has been popped" should track that separately; `ScratchBuffer`
/// itself only ever reports its current length.
#[derive(Debug, Clone, Default)]
pub struct ScratchBuffer {
	data: Vec<u8>,
}

impl ScratchBuffer {
	pub fn new() -> Self {
		Self { data: Vec::new() }
	}

	pub fn with_capacity(cap: usize) -> Self {
		Self { data: Vec::with_capacity(cap) }
	}

	/// Push a single byte onto the top of the buffer.
	pub fn push(&mut self, b: u8) {
		self.data.push(b);
	}

	/// Pop a single byte from the top of the buffer, if any.
	pub fn pop(&mut self) -> Option<u8> {
		self.data.pop()
	}

	/// Peek the top byte without removing it.
	pub fn peek(&self) -> Option<u8> {
		self.data.last().copied()
	}

	/// Append bytes so that they pop off in the same order they were
	/// appended (i.e. append extends the stack top-down, like
	/// [`Vec::extend`]).
	pub fn append<I: IntoIterator<Item = u8>>(&mut self, bytes: I) {
		self.data.extend(bytes);
	}

	/// Push `bytes` one at a time in reverse order, so that a subsequent
	/// sequence of `pop()` calls yields them back in forward (original)
	/// order.
	///
	/// Used when lookahead consumed bytes that turned out not to match
	/// (e.g. a `CR` that is not immediately followed by `U+0085`): the
	/// looked-ahead bytes are returned to the buffer in forward order so the
	/// next read re-observes them in the sequence they appeared in the
	/// source.
	pub fn reverse_append(&mut self, bytes: &[u8]) {
		self.data.reserve(bytes.len());
		for b in bytes.iter().rev() {
			self.data.push(*b);
		}
	}

	pub fn is_empty(&self) -> bool {
		self.data.is_empty()
	}

	pub fn len(&self) -> usize {
		self.data.len()
	}

	pub fn clear(&mut self) {
		self.data.clear();
	}

	/// Atomically return and empty the buffer's contents.
	pub fn take(&mut self) -> Vec<u8> {
		std::mem::take(&mut self.data)
	}

	/// Borrow the current contents without consuming them.
	pub fn as_slice(&self) -> &[u8] {
		&self.data
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn push_pop_is_lifo() {
		let mut buf = ScratchBuffer::new();
		buf.push(b'a');
		buf.push(b'b');
		assert_eq!(buf.pop(), Some(b'b'));
		assert_eq!(buf.pop(), Some(b'a'));
		assert_eq!(buf.pop(), None);
	}

	#[test]
	fn reverse_append_restores_forward_order() {
		let mut buf = ScratchBuffer::new();
		buf.reverse_append(b"xy");
		assert_eq!(buf.pop(), Some(b'x'));
		assert_eq!(buf.pop(), Some(b'y'));
	}

	#[test]
	fn take_empties_and_returns_contents() {
		let mut buf = ScratchBuffer::new();
		buf.append(b"hello".iter().copied());
		let taken = buf.take();
		assert_eq!(&taken, b"hello");
		assert!(buf.is_empty());
	}

	#[test]
	fn empty_buffer_is_a_valid_state() {
		let buf = ScratchBuffer::new();
		assert!(buf.is_empty());
		assert_eq!(buf.len(), 0);
		assert_eq!(buf.as_slice(), &[] as &[u8]);
	}
}
