/*!
# Lexer state machine

The regular-grammar core that recognizes XML productions and drives the
[`crate::lexer::stack::InputStack`] / [`crate::entities::EntityTables`] to
implement entity expansion, DTD handling and the pull interface.

This module owns everything "below" the public [`crate::parser::Tokenizer`]
facade: the input stack, the entity tables, and the grammar recognizer
itself. There is no namespace layer on top of it -- namespace processing is
not performed -- so [`crate::parser::Tokenizer`] is a thin facade over this
module rather than a second transformation pass.

The lexer reads through the multi-frame [`InputStack`] rather than a single
byte stream, which is what makes entity expansion, DTD external subsets and
non-UTF-8 encodings possible at all.
*/

pub mod frame;
pub mod stack;

use std::collections::VecDeque;
use std::path::PathBuf;

use crate::decoder::{self, Decoder};
use crate::entities::EntityTables;
use crate::error::*;
use crate::selectors::CharSelector;
use crate::source::FileByteSource;
use crate::strings::{CData, Name};

pub use frame::InputFrame;
pub use stack::InputStack;

/// The token kinds emitted by [`Lexer::next_token`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
	Error,
	End,
	DocTypeStart,
	DocTypeEnd,
	ElementStart,
	ElementEnd,
	AttributeName,
	AttributeValue,
	Text,
	PiTarget,
	PiData,
	Comment,
	CData,
}

/// A single emitted token: its kind plus its UTF-8 text payload.
///
/// `End` and `Error` carry no payload (`Error`'s detail lives on
/// [`crate::parser::Tokenizer::last_error`], not on the token itself, since
/// the token stream's wire format is just kind + bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
	pub kind: TokenKind,
	pub data: Vec<u8>,
}

impl Token {
	fn new<T: Into<Vec<u8>>>(kind: TokenKind, data: T) -> Self {
		Self { kind, data: data.into() }
	}

	fn bare(kind: TokenKind) -> Self {
		Self { kind, data: Vec::new() }
	}
}

/// Tunable limits and policy knobs.
///
/// Covers the ambient concerns a tokenizer that accepts untrusted external
/// entities and DTDs needs: a depth cap against entity-expansion blow-up,
/// and a policy choice for encodings this crate cannot decode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenizerOptions {
	/// Maximum number of bytes accumulated for a single token before
	/// [`TokenizeError::TokenTooLong`] is raised.
	pub max_token_length: usize,
	/// Maximum input-stack depth reachable through entity expansion before
	/// [`TokenizeError::EntityDepthExceeded`] is raised. Distinct from
	/// `RecursiveEntity`, which only rejects literal cycles; this guards
	/// against expansion that never revisits a name but still blows up
	/// (e.g. a long chain of distinct entities, or "billion laughs"-style
	/// fan-out caught one level at a time).
	pub max_entity_depth: usize,
	/// When `true` (the default), a declared `encoding="..."` this crate
	/// cannot decode fails the document with
	/// [`TokenizeError::UnsupportedEncoding`]. When `false`, such an
	/// encoding is accepted and decoded best-effort as the sniffed
	/// byte-order-mark encoding (or pass-through if none was sniffed).
	pub fail_on_unsupported_encoding: bool,
}

impl Default for TokenizerOptions {
	fn default() -> Self {
		Self {
			max_token_length: 1 << 24,
			max_entity_depth: 64,
			fail_on_unsupported_encoding: true,
		}
	}
}

impl TokenizerOptions {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_max_token_length(mut self, v: usize) -> Self {
		self.max_token_length = v;
		self
	}

	pub fn with_max_entity_depth(mut self, v: usize) -> Self {
		self.max_entity_depth = v;
		self
	}

	pub fn with_fail_on_unsupported_encoding(mut self, v: bool) -> Self {
		self.fail_on_unsupported_encoding = v;
		self
	}
}

/// Where a `&name;` reference is being expanded, which determines lookup
/// rules and which errors apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefContext {
	Content,
	AttributeValue,
}

/// Which part of the document the lexer is currently producing tokens for.
/// Drives what `advance()` dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
	/// Before the root element: XML declaration, DOCTYPE, Misc*.
	BeforeRoot,
	/// Inside the document element tree.
	Content,
	/// Misc* after the root element has closed.
	AfterRoot,
}

fn is_xml_space(b: u8) -> bool {
	matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

/// The lexical core: input stack, entity tables, and the grammar
/// recognizer, producing a stream of [`Token`]s.
pub struct Lexer {
	stack: InputStack,
	entities: EntityTables,
	options: TokenizerOptions,
	resolver: Box<dyn UrlResolver>,
	pending: VecDeque<Token>,
	sticky: Option<Token>,
	last_error: Option<Error>,
	phase: Phase,
	standalone: bool,
	open_elements: Vec<String>,
	doctype_seen: bool,
	/// Whether the document's own (optional, but position-fixed) XML
	/// declaration has already been looked for. Tracked separately from
	/// [`InputFrame::preinit`], which governs XML 1.1 NEL/LS folding and is
	/// `false` from construction on memory-backed roots -- the document
	/// prolog can still open with `<?xml ...?>` even when the root frame is
	/// an in-memory buffer rather than a file.
	xmldecl_checked: bool,
}

impl Lexer {
	/// Construct a lexer reading the file at `path` as the root document.
	pub fn open(path: &std::path::Path, options: TokenizerOptions, resolver: Box<dyn UrlResolver>) -> Result<Self> {
		let name = path.to_string_lossy().into_owned();
		let mut byte_source = FileByteSource::open(path)?;
		let sniffed = decoder::sniff(&mut byte_source)?;
		let mut root = InputFrame::new_file(name, Box::new(byte_source), sniffed.decoder, 1);
		for b in sniffed.putback.iter().rev() {
			root.push_byte(*b);
		}
		Ok(Self {
			stack: InputStack::new(root),
			entities: EntityTables::new(),
			options,
			resolver,
			pending: VecDeque::new(),
			sticky: None,
			last_error: None,
			phase: Phase::BeforeRoot,
			standalone: false,
			open_elements: Vec::new(),
			doctype_seen: false,
			xmldecl_checked: false,
		})
	}

	/// Construct a lexer reading an in-memory buffer as the root document
	/// (no BOM sniffing is meaningful here beyond what the bytes already
	/// are -- used primarily by tests).
	pub fn from_bytes(name: String, data: Vec<u8>, options: TokenizerOptions, resolver: Box<dyn UrlResolver>) -> Self {
		let root = InputFrame::new_memory(name, data, 1);
		Self {
			stack: InputStack::new(root),
			entities: EntityTables::new(),
			options,
			resolver,
			pending: VecDeque::new(),
			sticky: None,
			last_error: None,
			phase: Phase::BeforeRoot,
			standalone: false,
			open_elements: Vec::new(),
			doctype_seen: false,
			xmldecl_checked: false,
		}
	}

	pub fn get_line(&self) -> u64 {
		self.stack.nearest_file_frame().line
	}

	pub fn get_column(&self) -> u64 {
		self.stack.nearest_file_frame().column
	}

	pub fn get_location(&self) -> Location {
		let f = self.stack.nearest_file_frame();
		Location { frame: f.name.clone(), line: f.line, column: f.column }
	}

	pub fn get_version(&self) -> u8 {
		self.stack.current().version
	}

	/// Drive the state machine until a token is ready, EOF,
	/// or a syntax/semantic error occurs. Sticky on `Error`/`End`.
	pub fn next_token(&mut self) -> Token {
		if let Some(t) = &self.sticky {
			return t.clone();
		}
		loop {
			if let Some(t) = self.pending.pop_front() {
				if matches!(t.kind, TokenKind::Error | TokenKind::End) {
					self.sticky = Some(t.clone());
				}
				return t;
			}
			if let Err(e) = self.advance() {
				let loc = self.get_location();
				self.last_error = Some(Error { kind: e, location: loc });
				let t = Token::bare(TokenKind::Error);
				self.sticky = Some(t.clone());
				return t;
			}
		}
	}

	pub fn last_error(&self) -> Option<&Error> {
		self.last_error.as_ref()
	}

	// ---- low-level byte/codepoint access -------------------------------

	/// Read one raw (already decoded-to-UTF-8, newline-normalized) byte,
	/// transparently popping non-`auto_pop` frames at their EOF (this is the
	/// explicit, lexer-driven return for content-entity inclusion).
	/// `auto_pop` frames (parameter entities) are already popped
	/// transparently inside [`InputStack::next_char`].
	fn read_byte(&mut self) -> Result<Option<u8>> {
		loop {
			match self.stack.next_char()? {
				Some(b) => return Ok(Some(b)),
				None => {
					if self.stack.is_root() {
						return Ok(None);
					}
					self.stack.pop();
					continue;
				}
			}
		}
	}

	fn read_byte_req(&mut self, ctx: &'static str) -> Result<u8> {
		self.read_byte()?.ok_or_else(|| TokenizeError::SyntaxError(ctx, "unexpected end of input".to_string()))
	}

	fn peek_byte(&mut self) -> Result<Option<u8>> {
		match self.read_byte()? {
			None => Ok(None),
			Some(b) => {
				self.stack.current_mut().push_byte(b);
				Ok(Some(b))
			}
		}
	}

	fn unread_bytes(&mut self, bytes: &[u8]) {
		for b in bytes.iter().rev() {
			self.stack.current_mut().push_byte(*b);
		}
	}

	/// Read one full UTF-8 codepoint (1-4 bytes) off the (already
	/// transcoded) byte stream.
	fn read_codepoint(&mut self, ctx: &'static str) -> Result<Option<(char, Vec<u8>)>> {
		let b0 = match self.read_byte()? {
			None => return Ok(None),
			Some(b) => b,
		};
		if b0 & 0x80 == 0 {
			return Ok(Some((b0 as char, vec![b0])));
		}
		let (mut acc, len) = if b0 & 0xE0 == 0xC0 {
			((b0 & 0x1F) as u32, 2usize)
		} else if b0 & 0xF0 == 0xE0 {
			((b0 & 0x0F) as u32, 3usize)
		} else if b0 & 0xF8 == 0xF0 {
			((b0 & 0x07) as u32, 4usize)
		} else {
			return Err(TokenizeError::SyntaxError(ctx, format!("invalid UTF-8 start byte 0x{:02x}", b0)));
		};
		let mut bytes = vec![b0];
		for _ in 1..len {
			let b = self.read_byte_req(ctx)?;
			if b & 0xC0 != 0x80 {
				return Err(TokenizeError::SyntaxError(ctx, "invalid UTF-8 continuation byte".to_string()));
			}
			acc = (acc << 6) | (b & 0x3F) as u32;
			bytes.push(b);
		}
		let ch = char::from_u32(acc).ok_or_else(|| TokenizeError::SyntaxError(ctx, "invalid UTF-8 codepoint".to_string()))?;
		Ok(Some((ch, bytes)))
	}

	fn expect_byte(&mut self, want: u8, ctx: &'static str) -> Result<()> {
		let got = self.read_byte_req(ctx)?;
		if got != want {
			return Err(TokenizeError::SyntaxError(ctx, format!("expected '{}', got 0x{:02x}", want as char, got)));
		}
		Ok(())
	}

	fn skip_spaces(&mut self) -> Result<usize> {
		let mut n = 0;
		loop {
			match self.peek_byte()? {
				Some(b) if is_xml_space(b) => {
					self.read_byte()?;
					n += 1;
				}
				_ => return Ok(n),
			}
		}
	}

	fn check_token_length(&self, len: usize) -> Result<()> {
		if len > self.options.max_token_length {
			return Err(TokenizeError::TokenTooLong);
		}
		Ok(())
	}

	/// Read a `Name` production, validating codepoints as they're read.
	fn read_name(&mut self, ctx: &'static str) -> Result<Name> {
		let mut buf: Vec<u8> = Vec::new();
		let mut first = true;
		loop {
			let (ch, bytes) = match self.read_codepoint(ctx)? {
				None => break,
				Some(v) => v,
			};
			let ok = if first {
				crate::selectors::CLASS_XML_NAMESTART.select(ch)
			} else {
				crate::selectors::CLASS_XML_NAME.select(ch)
			};
			if !ok {
				self.unread_bytes(&bytes);
				break;
			}
			first = false;
			buf.extend_from_slice(&bytes);
			self.check_token_length(buf.len())?;
		}
		if buf.is_empty() {
			return Err(TokenizeError::SyntaxError(ctx, "expected a Name".to_string()));
		}
		let s = String::from_utf8(buf).map_err(|_| TokenizeError::SyntaxError(ctx, "Name is not valid UTF-8".to_string()))?;
		Name::from_str(&s).map_err(|_| TokenizeError::SyntaxError(ctx, "invalid Name".to_string()))
	}

	fn read_until_terminator(&mut self, term: &'static [u8], ctx: &'static str) -> Result<Vec<u8>> {
		let mut acc: Vec<u8> = Vec::new();
		let mut window: Vec<u8> = Vec::new();
		loop {
			let b = self.read_byte_req(ctx)?;
			acc.push(b);
			window.push(b);
			if window.len() > term.len() {
				window.remove(0);
			}
			self.check_token_length(acc.len())?;
			if window.as_slice() == term {
				acc.truncate(acc.len() - term.len());
				return Ok(acc);
			}
		}
	}

	fn read_comment_body(&mut self) -> Result<Vec<u8>> {
		let mut acc = Vec::new();
		loop {
			let b = self.read_byte_req(ERRCTX_COMMENT)?;
			if b == b'-' {
				let b2 = self.read_byte_req(ERRCTX_COMMENT)?;
				if b2 == b'-' {
					let b3 = self.read_byte_req(ERRCTX_COMMENT)?;
					if b3 == b'>' {
						return Ok(acc);
					}
					return Err(TokenizeError::SyntaxError(ERRCTX_COMMENT, "'--' not allowed inside a comment".to_string()));
				}
				acc.push(b'-');
				acc.push(b2);
			} else {
				acc.push(b);
			}
			self.check_token_length(acc.len())?;
		}
	}

	fn bytes_to_cdata(&self, bytes: Vec<u8>, ctx: &'static str) -> Result<Vec<u8>> {
		let s = String::from_utf8(bytes).map_err(|_| TokenizeError::SyntaxError(ctx, "token is not valid UTF-8".to_string()))?;
		let version = self.stack.current().version.max(1);
		CData::from_string(s, version)
			.map(|c| c.as_string().into_bytes())
			.map_err(|_| TokenizeError::SyntaxError(ctx, "illegal character".to_string()))
	}

	// ---- character & entity reference expansion ------------------------

	/// `&...;` has already been consumed up through `&`. Decide char-ref vs
	/// entity-ref and handle it.
	///
	/// For [`RefContext::Content`], entity expansion pushes an input frame
	/// and returns -- the caller's read loop will transparently continue
	/// accumulating from the new frame. For [`RefContext::AttributeValue`],
	/// entity expansion also pushes a frame (attribute values may reference
	/// only internal general entities, whose content is itself plain
	/// CharData/references, reparsed the same way). Character references
	/// append directly to `out` in both contexts.
	fn expand_reference(&mut self, out: &mut Vec<u8>, ctx: RefContext) -> Result<()> {
		let first = self.read_byte_req(ERRCTX_REF)?;
		if first == b'#' {
			let cp = self.read_char_ref_digits()?;
			let version = self.stack.current().version.max(1);
			if !crate::selectors::is_legal_codepoint(cp, version) {
				return Err(TokenizeError::IllegalChar(cp));
			}
			let ch = char::from_u32(cp).ok_or(TokenizeError::IllegalChar(cp))?;
			let mut buf = [0u8; 4];
			let encoded = ch.encode_utf8(&mut buf);
			if ctx == RefContext::AttributeValue && matches!(cp, 0x20 | 0x09 | 0x0A | 0x0D) {
				out.push(b' ');
			} else {
				out.extend_from_slice(encoded.as_bytes());
			}
			return Ok(());
		}
		// General entity name reference: first byte already consumed, read
		// the rest of the name.
		self.unread_bytes(&[first]);
		let name = self.read_name(ERRCTX_REF)?;
		self.expect_byte(b';', ERRCTX_REF)?;
		let name_str = name.as_string();
		self.expand_general_entity(&name_str, ctx)
	}

	fn read_char_ref_digits(&mut self) -> Result<u32> {
		let is_hex = matches!(self.peek_byte()?, Some(b'x'));
		if is_hex {
			self.read_byte()?;
		}
		let mut digits = String::new();
		loop {
			match self.peek_byte()? {
				Some(b';') => {
					self.read_byte()?;
					break;
				}
				Some(b) if (is_hex && b.is_ascii_hexdigit()) || (!is_hex && b.is_ascii_digit()) => {
					self.read_byte()?;
					digits.push(b as char);
				}
				_ => return Err(TokenizeError::SyntaxError(ERRCTX_REF, "malformed character reference".to_string())),
			}
		}
		if digits.is_empty() {
			return Err(TokenizeError::SyntaxError(ERRCTX_REF, "empty character reference".to_string()));
		}
		u32::from_str_radix(&digits, if is_hex { 16 } else { 10 })
			.map_err(|_| TokenizeError::SyntaxError(ERRCTX_REF, "character reference out of range".to_string()))
	}

	fn expand_general_entity(&mut self, name: &str, ctx: RefContext) -> Result<()> {
		let frame_name = format!("&{};", name);
		match ctx {
			RefContext::AttributeValue => {
				if self.entities.lookup_external_general(name).is_some() {
					return Err(TokenizeError::ExternalEntityInAttribute(name.to_string()));
				}
				let entry = self.entities.lookup_internal_general(name).cloned();
				match entry {
					None => Err(TokenizeError::UnknownEntity(name.to_string())),
					Some(e) => {
						if e.from_external_subset && self.standalone {
							return Err(TokenizeError::ExternalInStandalone(name.to_string()));
						}
						self.push_entity_frame(frame_name, e.replacement_text.into_bytes())
					}
				}
			}
			RefContext::Content => {
				if let Some(e) = self.entities.lookup_internal_general(name).cloned() {
					if e.from_external_subset && self.standalone {
						return Err(TokenizeError::ExternalInStandalone(name.to_string()));
					}
					return self.push_entity_frame(frame_name, e.replacement_text.into_bytes());
				}
				if let Some(ext) = self.entities.lookup_external_general(name).cloned() {
					if ext.ndata.is_some() {
						return Err(TokenizeError::UnparsedEntityRef(name.to_string()));
					}
					if self.standalone {
						return Err(TokenizeError::ExternalInStandalone(name.to_string()));
					}
					return self.push_external_entity_frame(frame_name, ext.public_id, ext.system_id);
				}
				Err(TokenizeError::UnknownEntity(name.to_string()))
			}
		}
	}

	fn push_entity_frame(&mut self, frame_name: String, replacement_text: Vec<u8>) -> Result<()> {
		if replacement_text.is_empty() {
			return Ok(());
		}
		if self.stack.would_recurse(&frame_name) {
			return Err(TokenizeError::RecursiveEntity(frame_name));
		}
		if self.stack.depth() >= self.options.max_entity_depth {
			return Err(TokenizeError::EntityDepthExceeded);
		}
		let version = self.stack.current().version;
		let frame = InputFrame::new_memory(frame_name, replacement_text, version);
		self.stack.push(frame);
		Ok(())
	}

	fn push_external_entity_frame(&mut self, frame_name: String, public_id: Option<String>, system_id: String) -> Result<()> {
		if self.stack.would_recurse(&frame_name) {
			return Err(TokenizeError::RecursiveEntity(frame_name));
		}
		if self.stack.depth() >= self.options.max_entity_depth {
			return Err(TokenizeError::EntityDepthExceeded);
		}
		let version = self.stack.current().version;
		let base = PathBuf::from(&self.stack.nearest_file_frame().name);
		let path = self.resolver.resolve_url(&base, public_id.as_deref(), &system_id);
		let mut byte_source = FileByteSource::open(&path)?;
		let sniffed = decoder::sniff(&mut byte_source)?;
		self.check_encoding_supported(&sniffed.decoder)?;
		let mut frame = InputFrame::new_file(frame_name, Box::new(byte_source), sniffed.decoder, version);
		for b in sniffed.putback.iter().rev() {
			frame.push_byte(*b);
		}
		self.stack.push(frame);
		self.try_parse_text_decl()?;
		Ok(())
	}

	fn check_encoding_supported(&self, decoder: &Decoder) -> Result<()> {
		if !decoder.is_supported() && self.options.fail_on_unsupported_encoding {
			return Err(TokenizeError::UnsupportedEncoding(decoder.name().to_string()));
		}
		Ok(())
	}

	/// Parameter-entity inclusion (`include_pe`): surround the
	/// replacement text with single spaces, pushed via the same scratch
	/// buffer primitive used for putback, so the leading/trailing space
	/// becomes part of whichever buffer is read next.
	fn include_pe(&mut self, name: &str) -> Result<()> {
		let frame_name = format!("%{};", name);
		if self.stack.would_recurse(&frame_name) {
			return Err(TokenizeError::RecursiveEntity(frame_name));
		}
		if self.stack.depth() >= self.options.max_entity_depth {
			return Err(TokenizeError::EntityDepthExceeded);
		}
		let version = self.stack.current().version;
		if let Some(text) = self.entities.lookup_internal_parameter(name).map(|s| s.to_string()) {
			self.stack.current_mut().push_byte(b' ');
			let mut frame = InputFrame::new_memory(frame_name, text.into_bytes(), version);
			frame.auto_pop = true;
			frame.push_byte(b' ');
			self.stack.push(frame);
			return Ok(());
		}
		if let Some(ext) = self.entities.lookup_external_parameter(name).cloned() {
			let base = PathBuf::from(&self.stack.nearest_file_frame().name);
			let path = self.resolver.resolve_url(&base, ext.public_id.as_deref(), &ext.system_id);
			let mut byte_source = FileByteSource::open(&path)?;
			let sniffed = decoder::sniff(&mut byte_source)?;
			self.check_encoding_supported(&sniffed.decoder)?;
			self.stack.current_mut().push_byte(b' ');
			let mut frame = InputFrame::new_file(frame_name, Box::new(byte_source), sniffed.decoder, version);
			frame.auto_pop = true;
			for b in sniffed.putback.iter().rev() {
				frame.push_byte(*b);
			}
			frame.push_byte(b' ');
			self.stack.push(frame);
			return Ok(());
		}
		Err(TokenizeError::UnknownEntity(name.to_string()))
	}

	// ---- XML / text declaration -----------------------------------------

	/// Parse an optional `<?xml ...?>` at the very start of the current
	/// (just-pushed) external-entity frame. Text declarations allow
	/// `VersionInfo?` (unlike the document's XMLDecl, where it is
	/// mandatory) and never carry `SDDecl`.
	fn try_parse_text_decl(&mut self) -> Result<()> {
		let probe = self.try_consume_literal(b"<?xml")?;
		if !probe {
			self.stack.current_mut().preinit = false;
			return Ok(());
		}
		self.parse_decl_body(false)?;
		self.stack.current_mut().preinit = false;
		Ok(())
	}

	fn try_consume_literal(&mut self, lit: &'static [u8]) -> Result<bool> {
		let mut consumed = Vec::with_capacity(lit.len());
		for &want in lit {
			match self.read_byte()? {
				Some(b) if b == want => consumed.push(b),
				Some(b) => {
					consumed.push(b);
					self.unread_bytes(&consumed);
					return Ok(false);
				}
				None => {
					self.unread_bytes(&consumed);
					return Ok(false);
				}
			}
		}
		Ok(true)
	}

	/// Parse the XML/text declaration body (the part after `<?xml`) through
	/// and including the closing `?>`. When `mandatory_version` is set
	/// (the document's own `XMLDecl`), `version` must be present.
	fn parse_decl_body(&mut self, mandatory_version: bool) -> Result<()> {
		let mut version: Option<String> = None;
		let mut encoding: Option<String> = None;
		let mut standalone: Option<bool> = None;

		let n = self.skip_spaces()?;
		if mandatory_version && n == 0 {
			return Err(TokenizeError::SyntaxError(ERRCTX_XML_DECL, "expected whitespace before 'version'".to_string()));
		}
		if self.try_consume_literal(b"version")? {
			self.skip_spaces()?;
			self.expect_byte(b'=', ERRCTX_XML_DECL)?;
			self.skip_spaces()?;
			version = Some(self.read_quoted_literal()?);
		} else if mandatory_version {
			return Err(TokenizeError::SyntaxError(ERRCTX_XML_DECL, "missing mandatory 'version'".to_string()));
		}

		self.skip_spaces()?;
		if self.try_consume_literal(b"encoding")? {
			self.skip_spaces()?;
			self.expect_byte(b'=', ERRCTX_XML_DECL)?;
			self.skip_spaces()?;
			encoding = Some(self.read_quoted_literal()?);
		}

		self.skip_spaces()?;
		if mandatory_version && self.try_consume_literal(b"standalone")? {
			self.skip_spaces()?;
			self.expect_byte(b'=', ERRCTX_XML_DECL)?;
			self.skip_spaces()?;
			let v = self.read_quoted_literal()?;
			standalone = Some(match v.as_str() {
				"yes" => true,
				"no" => false,
				_ => return Err(TokenizeError::SyntaxError(ERRCTX_XML_DECL, "standalone must be 'yes' or 'no'".to_string())),
			});
		}

		self.skip_spaces()?;
		self.expect_byte(b'?', ERRCTX_XML_DECL)?;
		self.expect_byte(b'>', ERRCTX_XML_DECL)?;

		if let Some(v) = version {
			let major = if v == "1.0" { 1 } else if v.starts_with("1.") && v != "1.0" { 2 } else {
				return Err(TokenizeError::SyntaxError(ERRCTX_XML_DECL, format!("unsupported XML version '{}'", v)));
			};
			self.stack.current_mut().version = major;
		} else if self.stack.current().version == 0 {
			self.stack.current_mut().version = 1;
		}
		if let Some(s) = standalone {
			self.standalone = s;
		}
		if let Some(enc) = encoding {
			self.cross_check_encoding(&enc)?;
		}
		Ok(())
	}

	fn cross_check_encoding(&mut self, declared: &str) -> Result<()> {
		let declared_upper = declared.to_ascii_uppercase();
		let sniffed = self.stack.current().decoder_name();
		let Some(sniffed) = sniffed else { return Ok(()) };
		let compatible = match sniffed {
			"UTF-8" => true, // declared encoding is believed, sniff was only a heuristic default
			"UTF-16LE" | "UTF-16BE" => declared_upper.starts_with("UTF-16") || declared_upper == "UTF16",
			"UTF-32LE" | "UTF-32BE" => declared_upper.starts_with("UTF-32") || declared_upper == "UTF32",
			"EBCDIC" => declared_upper.contains("EBCDIC"),
			_ => true,
		};
		if !compatible {
			return Err(TokenizeError::EncodingMismatch(format!(
				"declared encoding '{}' is incompatible with sniffed encoding '{}'",
				declared, sniffed,
			)));
		}
		if sniffed == "UTF-8" && !declared_upper.starts_with("UTF-8") && !declared_upper.starts_with("UTF8") {
			// A non-UTF-8, non-UTF-16/32/EBCDIC encoding was declared on a
			// plain byte stream: this crate cannot decode arbitrary
			// charsets, only the six variants above.
			if !matches!(declared_upper.as_str(), "ASCII" | "US-ASCII") {
				if !self.options.fail_on_unsupported_encoding {
					return Ok(());
				}
				return Err(TokenizeError::UnsupportedEncoding(declared.to_string()));
			}
		}
		Ok(())
	}

	fn read_quoted_literal(&mut self) -> Result<String> {
		let quote = self.read_byte_req(ERRCTX_XML_DECL)?;
		if quote != b'"' && quote != b'\'' {
			return Err(TokenizeError::SyntaxError(ERRCTX_XML_DECL, "expected quoted literal".to_string()));
		}
		let mut buf = Vec::new();
		loop {
			let b = self.read_byte_req(ERRCTX_XML_DECL)?;
			if b == quote {
				break;
			}
			buf.push(b);
		}
		String::from_utf8(buf).map_err(|_| TokenizeError::SyntaxError(ERRCTX_XML_DECL, "literal is not valid UTF-8".to_string()))
	}

	// ---- top-level dispatch ---------------------------------------------

	fn advance(&mut self) -> Result<()> {
		match self.phase {
			Phase::BeforeRoot => self.lex_before_root(),
			Phase::Content => self.lex_content(),
			Phase::AfterRoot => self.lex_after_root(),
		}
	}

	fn lex_before_root(&mut self) -> Result<()> {
		if !self.xmldecl_checked && self.stack.is_root() {
			self.xmldecl_checked = true;
			if self.try_consume_literal(b"<?xml")? {
				self.parse_decl_body(true)?;
			}
			self.stack.current_mut().preinit = false;
			return Ok(());
		}
		self.skip_spaces()?;
		match self.peek_byte()? {
			None => Err(TokenizeError::SyntaxError(ERRCTX_DOCBEGIN, "unexpected end of document before root element".to_string())),
			Some(b'<') => {
				self.read_byte()?;
				match self.peek_byte()? {
					Some(b'!') => {
						self.read_byte()?;
						if self.try_consume_literal(b"--")? {
							let body = self.read_comment_body()?;
							let data = self.bytes_to_cdata(body, ERRCTX_COMMENT)?;
							self.pending.push_back(Token::new(TokenKind::Comment, data));
							Ok(())
						} else if self.try_consume_literal(b"DOCTYPE")? {
							if self.doctype_seen {
								return Err(TokenizeError::SyntaxError(ERRCTX_DOCTYPE, "only one DOCTYPE declaration is allowed".to_string()));
							}
							self.doctype_seen = true;
							self.lex_doctype()
						} else {
							Err(TokenizeError::SyntaxError(ERRCTX_DOCBEGIN, "expected '<!--' or '<!DOCTYPE'".to_string()))
						}
					}
					Some(b'?') => {
						self.read_byte()?;
						self.lex_pi()
					}
					Some(_) => {
						self.phase = Phase::Content;
						self.lex_stag()
					}
					None => Err(TokenizeError::SyntaxError(ERRCTX_DOCBEGIN, "unexpected end of document".to_string())),
				}
			}
			Some(b) => Err(TokenizeError::SyntaxError(ERRCTX_DOCBEGIN, format!("unexpected byte 0x{:02x} before root element", b))),
		}
	}

	fn lex_after_root(&mut self) -> Result<()> {
		self.skip_spaces()?;
		match self.peek_byte()? {
			None => {
				self.pending.push_back(Token::bare(TokenKind::End));
				Ok(())
			}
			Some(b'<') => {
				self.read_byte()?;
				match self.peek_byte()? {
					Some(b'!') => {
						self.read_byte()?;
						if !self.try_consume_literal(b"--")? {
							return Err(TokenizeError::SyntaxError(
								ERRCTX_DOCEND,
								"only comments and processing instructions are allowed after the root element".to_string(),
							));
						}
						let body = self.read_comment_body()?;
						let data = self.bytes_to_cdata(body, ERRCTX_COMMENT)?;
						self.pending.push_back(Token::new(TokenKind::Comment, data));
						Ok(())
					}
					Some(b'?') => {
						self.read_byte()?;
						self.lex_pi()
					}
					_ => Err(TokenizeError::SyntaxError(ERRCTX_DOCEND, "only comments and processing instructions are allowed after the root element".to_string())),
				}
			}
			Some(b) => Err(TokenizeError::SyntaxError(ERRCTX_DOCEND, format!("unexpected byte 0x{:02x} after root element", b))),
		}
	}

	fn lex_pi(&mut self) -> Result<()> {
		let target = self.read_name(ERRCTX_PI)?;
		if target.as_ref().eq_ignore_ascii_case("xml") {
			return Err(TokenizeError::SyntaxError(ERRCTX_PI, "'xml' is a reserved processing instruction target".to_string()));
		}
		self.skip_spaces()?;
		let data = self.read_until_terminator(b"?>", ERRCTX_PI)?;
		let data = self.bytes_to_cdata(data, ERRCTX_PI)?;
		self.pending.push_back(Token::new(TokenKind::PiTarget, target.as_string().into_bytes()));
		self.pending.push_back(Token::new(TokenKind::PiData, data));
		Ok(())
	}

	fn lex_content(&mut self) -> Result<()> {
		let mut text_acc: Vec<u8> = Vec::new();
		loop {
			match self.peek_byte()? {
				None => {
					if !text_acc.is_empty() {
						return self.flush_text(text_acc);
					}
					return Err(TokenizeError::SyntaxError(ERRCTX_TEXT, "unexpected end of document inside element content".to_string()));
				}
				Some(b'<') => {
					if !text_acc.is_empty() {
						return self.flush_text(text_acc);
					}
					self.read_byte()?;
					return self.lex_markup();
				}
				Some(b'&') => {
					self.read_byte()?;
					self.expand_reference(&mut text_acc, RefContext::Content)?;
					self.check_token_length(text_acc.len())?;
				}
				Some(_) => {
					let (_, bytes) = self.read_codepoint(ERRCTX_TEXT)?.expect("peek guaranteed a byte");
					text_acc.extend_from_slice(&bytes);
					self.check_token_length(text_acc.len())?;
					if text_acc.ends_with(b"]]>") {
						return Err(TokenizeError::SyntaxError(ERRCTX_TEXT, "literal ']]>' is not allowed in text".to_string()));
					}
				}
			}
		}
	}

	fn flush_text(&mut self, bytes: Vec<u8>) -> Result<()> {
		let data = self.bytes_to_cdata(bytes, ERRCTX_TEXT)?;
		self.pending.push_back(Token::new(TokenKind::Text, data));
		Ok(())
	}

	/// `<` has just been consumed while inside element content: dispatch to
	/// `STag`/`ETag`/`EmptyElemTag`/`CDSect`/`Comment`/`PI`.
	fn lex_markup(&mut self) -> Result<()> {
		match self.peek_byte()? {
			Some(b'/') => {
				self.read_byte()?;
				self.lex_etag()
			}
			Some(b'!') => {
				self.read_byte()?;
				if self.try_consume_literal(b"--")? {
					let body = self.read_comment_body()?;
					let data = self.bytes_to_cdata(body, ERRCTX_COMMENT)?;
					self.pending.push_back(Token::new(TokenKind::Comment, data));
					Ok(())
				} else if self.try_consume_literal(b"[CDATA[")? {
					let body = self.read_until_terminator(b"]]>", ERRCTX_CDATA_SECTION)?;
					let data = self.bytes_to_cdata(body, ERRCTX_CDATA_SECTION)?;
					self.pending.push_back(Token::new(TokenKind::CData, data));
					Ok(())
				} else {
					Err(TokenizeError::SyntaxError(ERRCTX_ELEMENT, "expected '<!--' or '<![CDATA['".to_string()))
				}
			}
			Some(b'?') => {
				self.read_byte()?;
				self.lex_pi()
			}
			Some(_) => self.lex_stag(),
			None => Err(TokenizeError::SyntaxError(ERRCTX_ELEMENT, "unexpected end of document after '<'".to_string())),
		}
	}

	fn lex_etag(&mut self) -> Result<()> {
		let name = self.read_name(ERRCTX_ELEMENT_FOOT)?;
		self.skip_spaces()?;
		self.expect_byte(b'>', ERRCTX_ELEMENT_FOOT)?;
		self.close_element(name)
	}

	/// Checks the end-tag name against the innermost open element (XML's
	/// `GIMatch` well-formedness constraint) before emitting `ElementEnd`.
	fn close_element(&mut self, name: Name) -> Result<()> {
		match self.open_elements.pop() {
			Some(open) if open == name.as_ref() => {}
			Some(open) => {
				return Err(TokenizeError::SyntaxError(
					ERRCTX_ELEMENT_FOOT,
					format!("end tag '{}' does not match start tag '{}'", name.as_ref(), open),
				));
			}
			None => {
				return Err(TokenizeError::SyntaxError(ERRCTX_ELEMENT_FOOT, "end tag without a matching start tag".to_string()));
			}
		}
		self.pending.push_back(Token::new(TokenKind::ElementEnd, name.as_string().into_bytes()));
		if self.open_elements.is_empty() {
			self.phase = Phase::AfterRoot;
		}
		Ok(())
	}

	fn lex_stag(&mut self) -> Result<()> {
		let name = self.read_name(ERRCTX_ELEMENT)?;
		let name_str = name.as_string();
		self.pending.push_back(Token::new(TokenKind::ElementStart, name_str.clone().into_bytes()));
		self.open_elements.push(name_str.clone());
		let mut seen_attrs: Vec<String> = Vec::new();
		loop {
			let spaced = self.skip_spaces()? > 0;
			match self.peek_byte()? {
				Some(b'>') => {
					self.read_byte()?;
					self.phase = Phase::Content;
					return Ok(());
				}
				Some(b'/') => {
					self.read_byte()?;
					self.expect_byte(b'>', ERRCTX_ELEMENT)?;
					let closing = Name::from_str(&name_str).expect("name_str was already validated as a Name");
					return self.close_element(closing);
				}
				Some(_) if spaced => {
					let attr_name = self.read_name(ERRCTX_NAME)?;
					let attr_name_str = attr_name.as_string();
					if seen_attrs.iter().any(|a| a == &attr_name_str) {
						return Err(TokenizeError::SyntaxError(
							ERRCTX_ELEMENT,
							format!("attribute '{}' specified twice (WFC: Unique Att Spec)", attr_name_str),
						));
					}
					self.skip_spaces()?;
					self.expect_byte(b'=', ERRCTX_ELEMENT)?;
					self.skip_spaces()?;
					let value = self.lex_attr_value()?;
					self.pending.push_back(Token::new(TokenKind::AttributeName, attr_name_str.clone().into_bytes()));
					self.pending.push_back(Token::new(TokenKind::AttributeValue, value));
					seen_attrs.push(attr_name_str);
				}
				Some(b) => return Err(TokenizeError::SyntaxError(ERRCTX_ELEMENT, format!("unexpected byte 0x{:02x} in element header", b))),
				None => return Err(TokenizeError::SyntaxError(ERRCTX_ELEMENT, "unexpected end of document in element header".to_string())),
			}
		}
	}

	fn lex_attr_value(&mut self) -> Result<Vec<u8>> {
		let quote = self.read_byte_req(ERRCTX_ATTVAL)?;
		if quote != b'"' && quote != b'\'' {
			return Err(TokenizeError::SyntaxError(ERRCTX_ATTVAL, "attribute value must start with a quote".to_string()));
		}
		let mut acc = Vec::new();
		loop {
			let (ch, bytes) = self.read_codepoint(ERRCTX_ATTVAL)?
				.ok_or_else(|| TokenizeError::SyntaxError(ERRCTX_ATTVAL, "unexpected end of document in attribute value".to_string()))?;
			if bytes.len() == 1 && bytes[0] == quote {
				break;
			}
			match ch {
				'<' => return Err(TokenizeError::SyntaxError(ERRCTX_ATTVAL, "'<' not allowed in attribute value".to_string())),
				'&' => self.expand_reference(&mut acc, RefContext::AttributeValue)?,
				'\x20' | '\x09' | '\x0A' | '\x0D' => acc.push(b' '),
				_ => acc.extend_from_slice(&bytes),
			}
			self.check_token_length(acc.len())?;
		}
		self.bytes_to_cdata(acc, ERRCTX_ATTVAL)
	}

	// ---- DOCTYPE ----------------------------------------------------------

	fn lex_doctype(&mut self) -> Result<()> {
		self.skip_spaces()?;
		let root_name = self.read_name(ERRCTX_DOCTYPE)?;
		self.pending.push_back(Token::new(TokenKind::DocTypeStart, root_name.as_string().into_bytes()));

		let mut external: Option<(Option<String>, String)> = None;
		let n = self.skip_spaces()?;
		if n > 0 {
			if let Some(ext) = self.try_parse_external_id()? {
				external = Some(ext);
				self.skip_spaces()?;
			}
		}

		if matches!(self.peek_byte()?, Some(b'[')) {
			self.read_byte()?;
			self.lex_internal_subset()?;
			self.expect_byte(b']', ERRCTX_DOCTYPE)?;
			self.skip_spaces()?;
		}
		self.expect_byte(b'>', ERRCTX_DOCTYPE)?;

		if let Some((public_id, system_id)) = external {
			self.lex_external_subset(public_id, system_id)?;
		}

		self.pending.push_back(Token::bare(TokenKind::DocTypeEnd));
		self.phase = Phase::BeforeRoot;
		Ok(())
	}

	fn try_parse_external_id(&mut self) -> Result<Option<(Option<String>, String)>> {
		if self.try_consume_literal(b"SYSTEM")? {
			self.skip_spaces()?;
			let system_id = self.read_quoted_literal()?;
			return Ok(Some((None, system_id)));
		}
		if self.try_consume_literal(b"PUBLIC")? {
			self.skip_spaces()?;
			let public_id = self.read_quoted_literal()?;
			self.skip_spaces()?;
			let system_id = self.read_quoted_literal()?;
			return Ok(Some((Some(public_id), system_id)));
		}
		Ok(None)
	}

	/// Parse the internal DTD subset (between `[` and `]`). Parameter
	/// references are illegal here (`PEInInternalSubset`); markup
	/// declarations other than `<!ENTITY ...>` are recognized and skipped
	/// as balanced constructs.
	fn lex_internal_subset(&mut self) -> Result<()> {
		loop {
			self.skip_spaces()?;
			match self.peek_byte()? {
				Some(b']') | None => return Ok(()),
				Some(b'%') => return Err(TokenizeError::PEInInternalSubset("parameter entity reference".to_string())),
				Some(b'<') => {
					self.read_byte()?;
					self.lex_markup_decl(false)?;
				}
				Some(b) => return Err(TokenizeError::SyntaxError(ERRCTX_DOCTYPE, format!("unexpected byte 0x{:02x} in internal subset", b))),
			}
		}
	}

	/// Parse the external DTD subset, consuming until the file backing it
	/// is exhausted (detected as the stack depth returning to the depth
	/// before this frame was pushed). Parameter references are legal and
	/// expanded transparently here.
	fn lex_external_subset(&mut self, public_id: Option<String>, system_id: String) -> Result<()> {
		let base_depth = self.stack.depth();
		let base = PathBuf::from(&self.stack.nearest_file_frame().name);
		let path = self.resolver.resolve_url(&base, public_id.as_deref(), &system_id);
		let mut byte_source = FileByteSource::open(&path)?;
		let sniffed = decoder::sniff(&mut byte_source)?;
		self.check_encoding_supported(&sniffed.decoder)?;
		let version = self.stack.current().version;
		let mut frame = InputFrame::new_file(format!("%{{external-dtd}}:{}", system_id), Box::new(byte_source), sniffed.decoder, version);
		for b in sniffed.putback.iter().rev() {
			frame.push_byte(*b);
		}
		self.stack.push(frame);
		self.try_parse_text_decl()?;

		loop {
			self.skip_external_subset_spaces(base_depth)?;
			if self.stack.depth() <= base_depth {
				return Ok(());
			}
			match self.peek_or_pop(base_depth)? {
				None => return Ok(()),
				Some(b'%') => {
					self.read_byte()?;
					let name = self.read_name(ERRCTX_DOCTYPE)?;
					self.expect_byte(b';', ERRCTX_DOCTYPE)?;
					self.include_pe(&name)?;
				}
				Some(b'<') => {
					self.read_byte()?;
					self.lex_markup_decl(true)?;
				}
				Some(b) => return Err(TokenizeError::SyntaxError(ERRCTX_DOCTYPE, format!("unexpected byte 0x{:02x} in external subset", b))),
			}
		}
	}

	/// Like `skip_spaces`, but stops (without erroring) once the external
	/// subset's own frame is exhausted and popped back to `base_depth`.
	fn skip_external_subset_spaces(&mut self, base_depth: usize) -> Result<()> {
		loop {
			if self.stack.depth() <= base_depth {
				return Ok(());
			}
			match self.stack.next_char()? {
				Some(b) if is_xml_space(b) => continue,
				Some(b) => {
					self.stack.current_mut().push_byte(b);
					return Ok(());
				}
				None => {
					if self.stack.depth() > base_depth {
						self.stack.pop();
						continue;
					}
					return Ok(());
				}
			}
		}
	}

	fn peek_or_pop(&mut self, base_depth: usize) -> Result<Option<u8>> {
		if self.stack.depth() <= base_depth {
			return Ok(None);
		}
		match self.stack.next_char()? {
			Some(b) => {
				self.stack.current_mut().push_byte(b);
				Ok(Some(b))
			}
			None => {
				if self.stack.depth() > base_depth {
					self.stack.pop();
					self.peek_or_pop(base_depth)
				} else {
					Ok(None)
				}
			}
		}
	}

	/// `<` has been consumed, we're inside a DTD subset: dispatch
	/// `<!ENTITY`, `<!ELEMENT`/`<!ATTLIST`/`<!NOTATION` (skipped),
	/// `<!--...-->`, or `<?...?>`.
	fn lex_markup_decl(&mut self, in_external_subset: bool) -> Result<()> {
		match self.peek_byte()? {
			Some(b'?') => {
				self.read_byte()?;
				let _target = self.read_name(ERRCTX_DOCTYPE)?;
				self.skip_spaces()?;
				self.read_until_terminator(b"?>", ERRCTX_DOCTYPE)?;
				Ok(())
			}
			Some(b'!') => {
				self.read_byte()?;
				if self.try_consume_literal(b"--")? {
					self.read_comment_body()?;
					return Ok(());
				}
				if self.try_consume_literal(b"ENTITY")? {
					return self.lex_entity_decl(in_external_subset);
				}
				if self.try_consume_literal(b"ELEMENT")?
					|| self.try_consume_literal(b"ATTLIST")?
					|| self.try_consume_literal(b"NOTATION")?
				{
					return self.skip_balanced_decl();
				}
				Err(TokenizeError::SyntaxError(ERRCTX_DOCTYPE, "unrecognized markup declaration".to_string()))
			}
			_ => Err(TokenizeError::SyntaxError(ERRCTX_DOCTYPE, "expected a markup declaration after '<'".to_string())),
		}
	}

	/// Consume a `<!ELEMENT ...>`/`<!ATTLIST ...>`/`<!NOTATION ...>` body
	/// up to its closing `>`, tracking quote state so a `>` inside a
	/// quoted default value does not end the declaration early. The
	/// semantic content is out of scope; only the lexical
	/// shape matters here.
	fn skip_balanced_decl(&mut self) -> Result<()> {
		let mut in_quote: Option<u8> = None;
		loop {
			let b = self.read_byte_req(ERRCTX_DOCTYPE)?;
			match in_quote {
				Some(q) if b == q => in_quote = None,
				Some(_) => {}
				None => match b {
					b'"' | b'\'' => in_quote = Some(b),
					b'>' => return Ok(()),
					_ => {}
				},
			}
		}
	}

	fn lex_entity_decl(&mut self, in_external_subset: bool) -> Result<()> {
		self.skip_spaces()?;
		let is_parameter = matches!(self.peek_byte()?, Some(b'%'));
		if is_parameter {
			self.read_byte()?;
			self.skip_spaces()?;
		}
		let name = self.read_name(ERRCTX_DOCTYPE)?.as_string();
		self.skip_spaces()?;

		if let Some((public_id, system_id)) = self.try_parse_external_id()? {
			self.skip_spaces()?;
			let ndata = if self.try_consume_literal(b"NDATA")? {
				self.skip_spaces()?;
				Some(self.read_name(ERRCTX_DOCTYPE)?.as_string())
			} else {
				None
			};
			self.skip_spaces()?;
			self.expect_byte(b'>', ERRCTX_DOCTYPE)?;
			if is_parameter {
				self.entities.declare_external_parameter(name, public_id, system_id);
			} else {
				self.entities.declare_external_general(name, public_id, system_id, ndata);
			}
			return Ok(());
		}

		let value = self.read_entity_value()?;
		self.skip_spaces()?;
		self.expect_byte(b'>', ERRCTX_DOCTYPE)?;
		if is_parameter {
			self.entities.declare_internal_parameter(name, value);
		} else {
			self.entities.declare_internal_general(name, value, in_external_subset);
		}
		Ok(())
	}

	/// `EntityValue`: a quoted literal in which character references and
	/// general-entity references are passed through literally (stored, not
	/// expanded at declaration time) but parameter-entity references are
	/// expanded immediately, per XML's entity-value grammar.
	fn read_entity_value(&mut self) -> Result<String> {
		let quote = self.read_byte_req(ERRCTX_DOCTYPE)?;
		if quote != b'"' && quote != b'\'' {
			return Err(TokenizeError::SyntaxError(ERRCTX_DOCTYPE, "entity value must be quoted".to_string()));
		}
		let mut buf = Vec::new();
		loop {
			let b = self.read_byte_req(ERRCTX_DOCTYPE)?;
			if b == quote {
				break;
			}
			if b == b'%' {
				let name = self.read_name(ERRCTX_DOCTYPE)?.as_string();
				self.expect_byte(b';', ERRCTX_DOCTYPE)?;
				self.include_pe(&name)?;
				continue;
			}
			buf.push(b);
			self.check_token_length(buf.len())?;
		}
		String::from_utf8(buf).map_err(|_| TokenizeError::SyntaxError(ERRCTX_DOCTYPE, "entity value is not valid UTF-8".to_string()))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::DefaultResolver;

	fn lexer(data: &[u8]) -> Lexer {
		Lexer::from_bytes("<test>".to_string(), data.to_vec(), TokenizerOptions::default(), Box::new(DefaultResolver))
	}

	fn tokenize(data: &[u8]) -> Vec<Token> {
		let mut lex = lexer(data);
		let mut out = Vec::new();
		loop {
			let t = lex.next_token();
			let done = matches!(t.kind, TokenKind::End | TokenKind::Error);
			out.push(t);
			if done {
				break;
			}
		}
		out
	}

	fn text(s: &str) -> Vec<u8> {
		s.as_bytes().to_vec()
	}

	#[test]
	fn minimal_document_tokenizes_start_text_end() {
		let toks = tokenize(b"<a>hi</a>");
		assert_eq!(toks[0].kind, TokenKind::ElementStart);
		assert_eq!(toks[0].data, text("a"));
		assert_eq!(toks[1].kind, TokenKind::Text);
		assert_eq!(toks[1].data, text("hi"));
		assert_eq!(toks[2].kind, TokenKind::ElementEnd);
		assert_eq!(toks[2].data, text("a"));
		assert_eq!(toks[3].kind, TokenKind::End);
	}

	#[test]
	fn mismatched_end_tag_is_an_error() {
		let toks = tokenize(b"<a><b></c></a>");
		assert!(matches!(toks.last().unwrap().kind, TokenKind::Error));
	}

	#[test]
	fn unbalanced_end_tag_is_an_error() {
		let toks = tokenize(b"<a></a></a>");
		assert!(matches!(toks.last().unwrap().kind, TokenKind::Error));
	}

	#[test]
	fn error_token_is_sticky() {
		let mut lex = lexer(b"<a></b>");
		loop {
			let t = lex.next_token();
			if t.kind == TokenKind::Error {
				break;
			}
		}
		let first_error = lex.last_error().unwrap().clone();
		let t2 = lex.next_token();
		assert_eq!(t2.kind, TokenKind::Error);
		assert_eq!(lex.last_error().unwrap(), &first_error);
	}

	#[test]
	fn empty_element_emits_matching_start_and_end() {
		let toks = tokenize(b"<a/>");
		assert_eq!(toks[0].kind, TokenKind::ElementStart);
		assert_eq!(toks[1].kind, TokenKind::ElementEnd);
		assert_eq!(toks[2].kind, TokenKind::End);
	}

	#[test]
	fn nested_elements_balance_independently() {
		let toks = tokenize(b"<a><b/><c><d/></c></a>");
		let names: Vec<&[u8]> = toks.iter().map(|t| t.data.as_slice()).collect();
		assert_eq!(names, vec![
			b"a".as_slice(), b"b".as_slice(), b"b".as_slice(),
			b"c".as_slice(), b"d".as_slice(), b"d".as_slice(), b"c".as_slice(), b"a".as_slice(), b"".as_slice(),
		]);
	}

	#[test]
	fn attribute_name_and_value_are_emitted_in_order() {
		let toks = tokenize(br#"<a x="1" y="2"/>"#);
		assert_eq!(toks[1].kind, TokenKind::AttributeName);
		assert_eq!(toks[1].data, text("x"));
		assert_eq!(toks[2].kind, TokenKind::AttributeValue);
		assert_eq!(toks[2].data, text("1"));
		assert_eq!(toks[3].kind, TokenKind::AttributeName);
		assert_eq!(toks[3].data, text("y"));
		assert_eq!(toks[4].kind, TokenKind::AttributeValue);
		assert_eq!(toks[4].data, text("2"));
	}

	#[test]
	fn attribute_value_whitespace_collapses_to_single_space() {
		let toks = tokenize(b"<a x=\"1\t2\n3\r4\"/>");
		assert_eq!(toks[2].kind, TokenKind::AttributeValue);
		assert_eq!(toks[2].data, text("1 2 3 4"));
	}

	#[test]
	fn character_reference_whitespace_also_collapses_in_attribute_value() {
		let toks = tokenize(b"<a x=\"1&#9;2\"/>");
		assert_eq!(toks[2].data, text("1 2"));
	}

	#[test]
	fn predefined_entity_expands_in_content() {
		let toks = tokenize(b"<a>1 &lt; 2</a>");
		assert_eq!(toks[1].kind, TokenKind::Text);
		assert_eq!(toks[1].data, text("1 < 2"));
	}

	#[test]
	fn unknown_entity_is_an_error() {
		let toks = tokenize(b"<a>&bogus;</a>");
		assert!(matches!(toks.last().unwrap().kind, TokenKind::Error));
	}

	#[test]
	fn decimal_and_hex_char_refs_decode() {
		let toks = tokenize(b"<a>&#65;&#x42;</a>");
		assert_eq!(toks[1].data, text("AB"));
	}

	#[test]
	fn directly_recursive_general_entity_is_rejected() {
		let mut lex = lexer(b"<a>&x;</a>");
		lex.entities.declare_internal_general("x".to_string(), "&x;".to_string(), false);
		loop {
			let t = lex.next_token();
			if t.kind == TokenKind::Error {
				let err = lex.last_error().unwrap();
				assert!(matches!(err.kind, TokenizeError::RecursiveEntity(_)));
				return;
			}
			if t.kind == TokenKind::End {
				panic!("expected a recursive-entity error");
			}
		}
	}

	#[test]
	fn internal_general_entity_expands_transparently() {
		let mut lex = lexer(b"<a>&greeting;</a>");
		lex.entities.declare_internal_general("greeting".to_string(), "hello".to_string(), false);
		let toks = (0..4).map(|_| lex.next_token()).collect::<Vec<_>>();
		assert_eq!(toks[1].kind, TokenKind::Text);
		assert_eq!(toks[1].data, text("hello"));
	}

	#[test]
	fn comment_token_carries_body_without_delimiters() {
		let toks = tokenize(b"<a><!-- hi --></a>");
		assert_eq!(toks[1].kind, TokenKind::Comment);
		assert_eq!(toks[1].data, text(" hi "));
	}

	#[test]
	fn literal_double_hyphen_in_comment_is_an_error() {
		let toks = tokenize(b"<a><!-- -- --></a>");
		assert!(matches!(toks.last().unwrap().kind, TokenKind::Error));
	}

	#[test]
	fn cdata_section_is_not_parsed_for_markup() {
		let toks = tokenize(b"<a><![CDATA[<b>&not-an-entity;</b>]]></a>");
		assert_eq!(toks[1].kind, TokenKind::CData);
		assert_eq!(toks[1].data, text("<b>&not-an-entity;</b>"));
	}

	#[test]
	fn processing_instruction_splits_target_and_data() {
		let toks = tokenize(b"<a><?pi some data?></a>");
		assert_eq!(toks[1].kind, TokenKind::PiTarget);
		assert_eq!(toks[1].data, text("pi"));
		assert_eq!(toks[2].kind, TokenKind::PiData);
		assert_eq!(toks[2].data, text("some data"));
	}

	#[test]
	fn xml_reserved_pi_target_is_rejected() {
		let toks = tokenize(b"<a><?xml version=\"1.0\"?></a>");
		assert!(matches!(toks.last().unwrap().kind, TokenKind::Error));
	}

	#[test]
	fn bare_close_bracket_sequence_in_text_is_rejected() {
		let toks = tokenize(b"<a>]]></a>");
		assert!(matches!(toks.last().unwrap().kind, TokenKind::Error));
	}

	#[test]
	fn xml_declaration_before_root_is_consumed_without_a_token() {
		let toks = tokenize(b"<?xml version=\"1.0\" encoding=\"UTF-8\"?><a/>");
		assert_eq!(toks[0].kind, TokenKind::ElementStart);
	}

	#[test]
	fn xml_declaration_sets_document_version() {
		let mut lex = lexer(b"<?xml version=\"1.1\"?><a/>");
		lex.next_token();
		assert_eq!(lex.get_version(), 2);
	}

	#[test]
	fn doctype_without_subset_emits_start_and_end() {
		let toks = tokenize(b"<!DOCTYPE a><a/>");
		assert_eq!(toks[0].kind, TokenKind::DocTypeStart);
		assert_eq!(toks[0].data, text("a"));
		assert_eq!(toks[1].kind, TokenKind::DocTypeEnd);
		assert_eq!(toks[2].kind, TokenKind::ElementStart);
	}

	#[test]
	fn second_doctype_declaration_is_rejected() {
		let toks = tokenize(b"<!DOCTYPE a><!DOCTYPE a><a/>");
		assert!(matches!(toks.last().unwrap().kind, TokenKind::Error));
	}

	#[test]
	fn internal_subset_entity_declaration_is_usable_in_content() {
		let toks = tokenize(b"<!DOCTYPE a [<!ENTITY e \"expanded\">]><a>&e;</a>");
		let text_tok = toks.iter().find(|t| t.kind == TokenKind::Text).unwrap();
		assert_eq!(text_tok.data, text("expanded"));
	}

	#[test]
	fn parameter_entity_reference_in_internal_subset_is_rejected() {
		let toks = tokenize(b"<!DOCTYPE a [<!ENTITY % p \"x\">%p;]><a/>");
		assert!(matches!(toks.last().unwrap().kind, TokenKind::Error));
	}

	#[test]
	fn element_declarations_in_internal_subset_are_skipped_lexically() {
		let toks = tokenize(b"<!DOCTYPE a [<!ELEMENT a (#PCDATA)>]><a/>");
		assert_eq!(toks[0].kind, TokenKind::DocTypeStart);
		assert_eq!(toks[1].kind, TokenKind::DocTypeEnd);
		assert_eq!(toks[2].kind, TokenKind::ElementStart);
	}

	#[test]
	fn char_ref_to_illegal_codepoint_is_an_error() {
		let toks = tokenize(b"<a>&#0;</a>");
		assert!(matches!(toks.last().unwrap().kind, TokenKind::Error));
	}

	#[test]
	fn external_general_entity_reference_in_attribute_value_is_rejected() {
		let mut lex = lexer(br#"<a x="&e;"/>"#);
		lex.entities.declare_external_general("e".to_string(), None, "e.ent".to_string(), None);
		loop {
			let t = lex.next_token();
			if t.kind == TokenKind::Error {
				let err = lex.last_error().unwrap();
				assert!(matches!(err.kind, TokenizeError::ExternalEntityInAttribute(_)));
				return;
			}
			if t.kind == TokenKind::End {
				panic!("expected an ExternalEntityInAttribute error");
			}
		}
	}

	#[test]
	fn unparsed_entity_reference_in_content_is_rejected() {
		let mut lex = lexer(b"<a>&e;</a>");
		lex.entities.declare_external_general("e".to_string(), None, "e.dat".to_string(), Some("png".to_string()));
		loop {
			let t = lex.next_token();
			if t.kind == TokenKind::Error {
				let err = lex.last_error().unwrap();
				assert!(matches!(err.kind, TokenizeError::UnparsedEntityRef(_)));
				return;
			}
			if t.kind == TokenKind::End {
				panic!("expected an UnparsedEntityRef error");
			}
		}
	}

	#[test]
	fn misc_after_root_allows_only_comments_and_pis() {
		let toks = tokenize(b"<a/><!-- trailing --><?pi data?>");
		assert_eq!(toks[2].kind, TokenKind::Comment);
		assert_eq!(toks[3].kind, TokenKind::PiTarget);
		assert_eq!(toks[5].kind, TokenKind::End);
	}

	#[test]
	fn stray_text_after_root_is_rejected() {
		let toks = tokenize(b"<a/>stray");
		assert!(matches!(toks.last().unwrap().kind, TokenKind::Error));
	}

	#[test]
	fn non_comment_markup_declaration_after_root_is_rejected() {
		let toks = tokenize(b"<a/><!FOO>");
		assert!(matches!(toks.last().unwrap().kind, TokenKind::Error));
	}

	#[test]
	fn duplicate_attribute_name_is_rejected() {
		let toks = tokenize(br#"<a x="1" x="2"/>"#);
		assert!(matches!(toks.last().unwrap().kind, TokenKind::Error));
	}

	#[test]
	fn distinct_attribute_names_are_accepted() {
		let toks = tokenize(br#"<a x="1" y="2"/>"#);
		assert!(!toks.iter().any(|t| t.kind == TokenKind::Error));
	}
}
