/*!
# Error types

This module holds the error taxonomy returned by the tokenizer. Unlike a
well-formedness checker built on top, the tokenizer itself only needs one
flat enum: every fault it can detect turns the tokenizer sticky and is
surfaced to the caller as an [`crate::token::TokenKind::Error`] token on the
next call to [`crate::Tokenizer::next_token`].
*/
use std::fmt;
use std::error;
use std::io;
use std::path::PathBuf;
use std::result::Result as StdResult;

pub const ERRCTX_UNKNOWN: &'static str = "in unknown context";
pub const ERRCTX_TEXT: &'static str = "in text node";
pub const ERRCTX_ATTVAL: &'static str = "in attribute value";
pub const ERRCTX_NAME: &'static str = "in name";
pub const ERRCTX_ELEMENT: &'static str = "in element header";
pub const ERRCTX_ELEMENT_FOOT: &'static str = "in element footer";
pub const ERRCTX_CDATA_SECTION: &'static str = "in CDATA section";
pub const ERRCTX_COMMENT: &'static str = "in comment";
pub const ERRCTX_PI: &'static str = "in processing instruction";
pub const ERRCTX_XML_DECL: &'static str = "in XML declaration";
pub const ERRCTX_DOCTYPE: &'static str = "in DOCTYPE declaration";
pub const ERRCTX_REF: &'static str = "in entity or character reference";
pub const ERRCTX_DOCBEGIN: &'static str = "at beginning of document";
pub const ERRCTX_DOCEND: &'static str = "at end of document";

/// A single point in the document at which an error was detected.
///
/// Per spec, entity (memory) frames do not carry meaningful line/column
/// information; when the top frame at the time of the fault was a memory
/// frame, `line`/`column` are taken from the nearest enclosing file frame
/// and `frame` still names the entity frame in which the fault occurred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Location {
	pub frame: String,
	pub line: u64,
	pub column: u64,
}

impl fmt::Display for Location {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}:{} (in {})", self.line, self.column, self.frame)
	}
}

/// The error taxonomy from spec §7.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenizeError {
	/// The lexer entered a dead state: the input does not conform to the
	/// XML grammar at this point.
	SyntaxError(&'static str, String),
	/// A character reference resolved to a codepoint outside the Char
	/// production for the active XML version.
	IllegalChar(u32),
	/// Expanding an entity would create a cycle in the input stack.
	RecursiveEntity(String),
	/// `WFC: Entity Declared` — reference to an entity with no declaration.
	UnknownEntity(String),
	/// `&X;` at content position where `X` was declared with `NDATA`.
	UnparsedEntityRef(String),
	/// An external general entity was referenced from inside an attribute
	/// value.
	ExternalEntityInAttribute(String),
	/// An externally declared entity was referenced from a document
	/// declared `standalone="yes"`.
	ExternalInStandalone(String),
	/// A `%name;` parameter-entity reference was found inside the internal
	/// DTD subset, where it is never legal.
	PEInInternalSubset(String),
	/// The byte source backing the active frame failed.
	IoError(String),
	/// The declared `encoding="..."` in the XML declaration disagrees with
	/// the encoding sniffed from the byte-order mark.
	EncodingMismatch(String),
	/// The declared (or otherwise required) encoding cannot be decoded by
	/// this tokenizer.
	UnsupportedEncoding(String),
	/// The configured entity-expansion depth limit was exceeded. Distinct
	/// from `RecursiveEntity`: this guards against expansion blow-up that
	/// never literally revisits a frame name.
	EntityDepthExceeded,
	/// The configured maximum token length was exceeded while accumulating
	/// a single token.
	TokenTooLong,
}

impl fmt::Display for TokenizeError {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self {
			Self::SyntaxError(ctx, msg) => write!(f, "syntax error {}: {}", ctx, msg),
			Self::IllegalChar(cp) => write!(f, "character reference to illegal codepoint U+{:x}", cp),
			Self::RecursiveEntity(name) => write!(f, "recursive entity expansion of {}", name),
			Self::UnknownEntity(name) => write!(f, "reference to undeclared entity {} (WFC: Entity Declared)", name),
			Self::UnparsedEntityRef(name) => write!(f, "reference to unparsed entity {} at content position", name),
			Self::ExternalEntityInAttribute(name) => write!(f, "reference to external entity {} inside attribute value", name),
			Self::ExternalInStandalone(name) => write!(f, "reference to externally declared entity {} in standalone document", name),
			Self::PEInInternalSubset(name) => write!(f, "parameter entity reference {} inside internal subset", name),
			Self::IoError(msg) => write!(f, "I/O error: {}", msg),
			Self::EncodingMismatch(msg) => write!(f, "encoding mismatch: {}", msg),
			Self::UnsupportedEncoding(msg) => write!(f, "unsupported encoding: {}", msg),
			Self::EntityDepthExceeded => write!(f, "maximum entity expansion depth exceeded"),
			Self::TokenTooLong => write!(f, "token exceeded the configured maximum length"),
		}
	}
}

impl error::Error for TokenizeError {}

impl From<io::Error> for TokenizeError {
	fn from(e: io::Error) -> Self {
		TokenizeError::IoError(e.to_string())
	}
}

/// A [`TokenizeError`] together with the [`Location`] at which it was
/// detected.
#[derive(Debug, Clone, PartialEq)]
pub struct Error {
	pub kind: TokenizeError,
	pub location: Location,
}

impl fmt::Display for Error {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{} at {}", self.kind, self.location)
	}
}

impl error::Error for Error {
	fn source(&self) -> Option<&(dyn error::Error + 'static)> {
		Some(&self.kind)
	}
}

pub type Result<T> = StdResult<T, TokenizeError>;

/// Resolve a `PUBLIC`/`SYSTEM` identifier pair relative to a containing
/// document's path.
///
/// The default implementation (see [`DefaultResolver`]) ignores the public
/// identifier and concatenates the directory of `base` with `system_id`,
/// exactly as the reference implementation this crate was modeled on does;
/// callers that need catalog-based `PUBLIC` resolution should supply their
/// own [`UrlResolver`].
pub trait UrlResolver {
	fn resolve_url(&self, base: &std::path::Path, public_id: Option<&str>, system_id: &str) -> PathBuf;
}

/// The reference [`UrlResolver`]: directory-of-base joined with `system_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResolver;

impl UrlResolver for DefaultResolver {
	fn resolve_url(&self, base: &std::path::Path, _public_id: Option<&str>, system_id: &str) -> PathBuf {
		match base.parent() {
			Some(dir) if dir.as_os_str().len() > 0 => dir.join(system_id),
			_ => PathBuf::from(system_id),
		}
	}
}
