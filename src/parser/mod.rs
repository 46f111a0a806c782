/*!
# Tokenizer facade

The public entry point callers construct and drive.

This is a thin wrapper over [`crate::lexer::Lexer`]: this crate performs
no namespace processing at all, so there is no second transformation pass
to author on top of the lexer's token stream. [`Tokenizer`] exists only to
give callers a stable, documented construction surface (`open` a file,
`from_bytes` an in-memory document) independent of the lexer's internal
state-machine types.
*/

use std::path::Path;

pub use crate::error::{DefaultResolver, Error, Location, UrlResolver};
use crate::error::TokenizeError;
use crate::lexer::Lexer;
pub use crate::lexer::{Token, TokenKind, TokenizerOptions};

/// # XML 1.0/1.1 pull tokenizer
///
/// Constructed once per document (a root file path, or an in-memory buffer
/// for callers that already hold the bytes), then driven by repeatedly
/// calling [`Tokenizer::next_token`] until it returns [`TokenKind::End`] or
/// [`TokenKind::Error`]; both are sticky -- once either is seen, every
/// subsequent call returns the same token again and the tokenizer should be
/// discarded.
///
/// # Example
///
/// ```
/// use xtok::{Tokenizer, TokenKind};
///
/// let mut tok = Tokenizer::from_bytes("<doc>", b"<a b=\"1\">hi</a>".to_vec());
/// let mut kinds = Vec::new();
/// loop {
///     let t = tok.next_token();
///     kinds.push(t.kind);
///     if matches!(t.kind, TokenKind::End | TokenKind::Error) {
///         break;
///     }
/// }
/// assert_eq!(kinds, vec![
///     TokenKind::ElementStart,
///     TokenKind::AttributeName,
///     TokenKind::AttributeValue,
///     TokenKind::Text,
///     TokenKind::ElementEnd,
///     TokenKind::End,
/// ]);
/// ```
pub struct Tokenizer {
	lexer: Lexer,
}

impl Tokenizer {
	/// Open `path` as the root document, with default [`TokenizerOptions`]
	/// and the [`DefaultResolver`] for external identifiers.
	pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, TokenizeError> {
		Self::with_options(path, TokenizerOptions::default())
	}

	/// Open `path` as the root document with caller-supplied
	/// [`TokenizerOptions`] and the [`DefaultResolver`].
	pub fn with_options<P: AsRef<Path>>(path: P, options: TokenizerOptions) -> Result<Self, TokenizeError> {
		Self::with_resolver(path, options, Box::new(DefaultResolver))
	}

	/// Open `path` as the root document with caller-supplied options and a
	/// custom [`UrlResolver`] for `PUBLIC`/`SYSTEM` identifiers encountered
	/// in DTDs and external entities.
	pub fn with_resolver<P: AsRef<Path>>(path: P, options: TokenizerOptions, resolver: Box<dyn UrlResolver>) -> Result<Self, TokenizeError> {
		Ok(Self { lexer: Lexer::open(path.as_ref(), options, resolver)? })
	}

	/// Tokenize an in-memory document (no file, no BOM sniffing beyond the
	/// bytes already given), with default options and resolver. `name` is
	/// used purely for location reporting and entity-recursion naming.
	pub fn from_bytes<S: Into<String>, D: Into<Vec<u8>>>(name: S, data: D) -> Self {
		Self::from_bytes_with_options(name, data, TokenizerOptions::default())
	}

	/// Like [`Tokenizer::from_bytes`], with caller-supplied options.
	pub fn from_bytes_with_options<S: Into<String>, D: Into<Vec<u8>>>(name: S, data: D, options: TokenizerOptions) -> Self {
		Self {
			lexer: Lexer::from_bytes(name.into(), data.into(), options, Box::new(DefaultResolver)),
		}
	}

	/// Drive the lexer until a token is ready. Sticky on
	/// [`TokenKind::End`]/[`TokenKind::Error`].
	pub fn next_token(&mut self) -> Token {
		self.lexer.next_token()
	}

	/// 1-based line of the last character consumed from the nearest
	/// enclosing *file* frame (entity frames carry no meaningful location of
	/// their own).
	pub fn get_line(&self) -> u64 {
		self.lexer.get_line()
	}

	/// 0-based column of the last character consumed from the nearest
	/// enclosing file frame.
	pub fn get_column(&self) -> u64 {
		self.lexer.get_column()
	}

	/// Full location (frame name, line, column) of the last character
	/// consumed.
	pub fn get_location(&self) -> Location {
		self.lexer.get_location()
	}

	/// The XML major version of the document currently being read: `1` for
	/// XML 1.0, `2` for XML 1.1.
	pub fn get_version(&self) -> u8 {
		self.lexer.get_version()
	}

	/// The error that put this tokenizer into its sticky [`TokenKind::Error`]
	/// state, if any.
	pub fn last_error(&self) -> Option<&Error> {
		self.lexer.last_error()
	}
}

/// # Read individual tokens from a source
///
/// A tokenizer failure is itself a [`TokenKind::Error`] token, not a
/// separate error channel, so driving a [`Tokenizer`] to completion never
/// needs a `Result` wrapper.
pub trait TokenRead {
	/// Pull the next token; see [`Tokenizer::next_token`].
	fn next_token(&mut self) -> Token;

	/// Drive `next_token` to completion, invoking `cb` with every token
	/// including the terminal [`TokenKind::End`]/[`TokenKind::Error`].
	fn for_each_token<F: FnMut(Token)>(&mut self, mut cb: F) {
		loop {
			let t = self.next_token();
			let done = matches!(t.kind, TokenKind::End | TokenKind::Error);
			cb(t);
			if done {
				return;
			}
		}
	}
}

impl TokenRead for Tokenizer {
	fn next_token(&mut self) -> Token {
		Tokenizer::next_token(self)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn for_each_token_collects_the_full_stream_including_end() {
		let mut tok = Tokenizer::from_bytes("<test>", b"<a/>".to_vec());
		let mut kinds = Vec::new();
		tok.for_each_token(|t| kinds.push(t.kind));
		assert_eq!(kinds, vec![TokenKind::ElementStart, TokenKind::ElementEnd, TokenKind::End]);
	}

	#[test]
	fn location_tracks_line_and_column_in_a_file_document() {
		let mut tok = Tokenizer::from_bytes("<test>", b"<a>\n<b/></a>".to_vec());
		loop {
			let t = tok.next_token();
			if t.kind == TokenKind::ElementStart && t.data == b"b" {
				assert_eq!(tok.get_line(), 2);
				break;
			}
			if matches!(t.kind, TokenKind::End | TokenKind::Error) {
				panic!("did not find inner element start");
			}
		}
	}

	#[test]
	fn sticky_error_keeps_reporting_the_same_error() {
		let mut tok = Tokenizer::from_bytes("<test>", b"<a></b>".to_vec());
		loop {
			let t = tok.next_token();
			if t.kind == TokenKind::Error {
				break;
			}
		}
		let first = tok.last_error().unwrap().clone();
		tok.next_token();
		assert_eq!(tok.last_error().unwrap(), &first);
	}

	#[test]
	fn opening_a_nonexistent_file_reports_io_error() {
		let err = Tokenizer::new("/nonexistent/path/does-not-exist.xml").unwrap_err();
		assert!(matches!(err, TokenizeError::IoError(_)));
	}
}
