/*!
# Input stack

The LIFO of input frames the tokenizer reads from. Frames are pushed to
begin entity replacement and popped at EOF; the DTD external subset is
pushed once the internal subset (and the declarations it contains) have
been fully consumed.

Frames are owned outright in a plain `Vec` rather than reference-counted,
so cycles in the stack are impossible by construction; entity-recursion
detection only has to check frame names, never pointer identity.
*/

use crate::error::TokenizeError;
use crate::lexer::frame::InputFrame;

/// LIFO of input frames.
pub struct InputStack {
	frames: Vec<InputFrame>,
}

impl InputStack {
	pub fn new(root: InputFrame) -> Self {
		Self { frames: vec![root] }
	}

	/// The top (currently active) frame.
	pub fn current(&self) -> &InputFrame {
		self.frames.last().expect("input stack is never empty")
	}

	pub fn current_mut(&mut self) -> &mut InputFrame {
		self.frames.last_mut().expect("input stack is never empty")
	}

	pub fn depth(&self) -> usize {
		self.frames.len()
	}

	/// Entity-recursion check: before pushing a frame named `name`, walk
	/// the *entire* stack (file frames and memory frames alike) looking for
	/// an existing frame with the same name.
	pub fn would_recurse(&self, name: &str) -> bool {
		self.frames.iter().any(|f| f.name == name)
	}

	/// Push a new frame onto the stack. Callers are responsible for having
	/// performed the recursion check first (`would_recurse`) and for
	/// setting `auto_pop`/`version` on `frame` as appropriate before
	/// calling this.
	pub fn push(&mut self, frame: InputFrame) {
		self.frames.push(frame);
	}

	/// Pop and drop the top frame, restoring the previous one. Panics if
	/// called on a stack with only the root frame left; callers must not
	/// pop the root (the pull interface treats root EOF as end-of-document,
	/// not a pop).
	pub fn pop(&mut self) {
		if self.frames.len() <= 1 {
			panic!("attempted to pop the root input frame");
		}
		self.frames.pop();
	}

	pub fn is_root(&self) -> bool {
		self.frames.len() == 1
	}

	/// Read one normalized UTF-8 byte from the top of the stack, applying
	/// the pop-on-EOF rule: after a read from the (non-root) top frame finds
	/// EOF, if that frame has `auto_pop` set, pop it and retry on the new
	/// top. This is transparent parameter-entity inclusion in the DTD;
	/// content-entity inclusion requires an explicit pop driven by the
	/// lexer observing `None` itself.
	pub fn next_char(&mut self) -> Result<Option<u8>, TokenizeError> {
		loop {
			let got = self.current_mut().next_char()?;
			match got {
				Some(b) => return Ok(Some(b)),
				None => {
					if !self.is_root() && self.current().auto_pop {
						self.pop();
						continue;
					}
					return Ok(None);
				}
			}
		}
	}

	/// Walk down from the top to find the nearest frame that has a file
	/// (not memory) source, used for `get_line`/`get_column`/error location
	/// reporting -- entity frames do not have meaningful column/line for
	/// user reports.
	pub fn nearest_file_frame(&self) -> &InputFrame {
		for f in self.frames.iter().rev() {
			if f.decoder_name().is_some() {
				return f;
			}
		}
		// Fallback: no file frame at all (e.g. a document built purely from
		// an in-memory root for testing) -- report from the top frame.
		self.current()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::lexer::frame::InputFrame;

	fn mem(name: &str, text: &[u8]) -> InputFrame {
		InputFrame::new_memory(name.to_string(), text.to_vec(), 1)
	}

	#[test]
	fn recursion_check_sees_whole_stack() {
		let mut stack = InputStack::new(mem("root", b"x"));
		stack.push(mem("&a;", b"y"));
		assert!(stack.would_recurse("&a;"));
		assert!(stack.would_recurse("root"));
		assert!(!stack.would_recurse("&b;"));
	}

	#[test]
	fn auto_pop_frame_is_transparently_popped_on_eof() {
		let mut stack = InputStack::new(mem("root", b"ab"));
		let mut pe = mem("%p;", b"X");
		pe.auto_pop = true;
		stack.push(pe);
		assert_eq!(stack.next_char().unwrap(), Some(b'X'));
		// PE frame is now at EOF; next read should auto-pop to root and
		// continue serving root's bytes.
		assert_eq!(stack.next_char().unwrap(), Some(b'a'));
		assert_eq!(stack.next_char().unwrap(), Some(b'b'));
		assert_eq!(stack.next_char().unwrap(), None);
	}

	#[test]
	fn non_auto_pop_frame_surfaces_eof_without_popping() {
		let mut stack = InputStack::new(mem("root", b"ab"));
		stack.push(mem("&a;", b"X"));
		assert_eq!(stack.next_char().unwrap(), Some(b'X'));
		assert_eq!(stack.next_char().unwrap(), None);
		assert_eq!(stack.depth(), 2);
		stack.pop();
		assert_eq!(stack.next_char().unwrap(), Some(b'a'));
	}

	#[test]
	#[should_panic]
	fn popping_root_panics() {
		let mut stack = InputStack::new(mem("root", b"a"));
		stack.pop();
	}
}
