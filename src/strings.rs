/*!
# Strongly-typed strings for use with XML 1.0/1.1 documents

This module defines various string- and str-like types which represent pieces
of text as they may occur in XML documents. These types are checked to contain
only text which conforms to the respective grammar in the XML specifications.

This allows the lexer to carry information about the checking which already
took place to the application, avoiding the need to execute checks multiple
times.

## Type Overview

- [`Name`] and [`NameStr`] represent the `Name` production and are used for
  element names, attribute names, entity and notation names, and PI targets.
- [`NCName`] represents the `Name` production but without a colon inside.
  Since this crate performs no namespace processing, no code path actually
  splits a [`Name`] into a prefix/localname pair; the type is kept because
  the corpus this crate was modeled on treats colon-free names as a
  distinct, independently checkable production (e.g. an `NDATA` notation
  name), and a future namespace layer built on top of this tokenizer would
  want it.
- [`CData`] and [`CDataStr`] represent strings of XML `Char`s (for the active
  XML version), slightly more restrictive than Rust `char`. They are used for
  attribute values, text, comments, PI data and CDATA sections.

  Note that [`CData`] strings do not contain references or CDATA section
  delimiters; those are expanded or stripped by the lexer before the bytes
  are wrapped.
*/

use std::ops::Deref;
use std::borrow::Borrow;
use crate::selectors;
use crate::selectors::CharSelector;

/// Reason a string failed to conform to a production checked by this
/// module. Carries no context tag of its own -- callers in the lexer attach
/// the active [`crate::error::ERRCTX_*`] constant when they convert this into
/// a [`crate::error::TokenizeError::SyntaxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StringError {
	/// The string had no characters at all.
	Empty,
	/// `at` is the byte offset of the offending char within the checked
	/// string.
	UnexpectedChar { at: usize },
}

impl std::fmt::Display for StringError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Empty => write!(f, "must not be empty"),
			Self::UnexpectedChar { at } => write!(f, "disallowed character at byte offset {}", at),
		}
	}
}

fn validate_name(s: &str) -> Result<(), StringError> {
	let mut chars = s.char_indices();
	match chars.next() {
		None => return Err(StringError::Empty),
		Some((_, c)) => if !selectors::CLASS_XML_NAMESTART.select(c) {
			return Err(StringError::UnexpectedChar { at: 0 })
		}
	}
	for (at, ch) in chars {
		if !selectors::CLASS_XML_NAME.select(ch) {
			return Err(StringError::UnexpectedChar { at })
		}
	}
	Ok(())
}

fn validate_ncname(s: &str) -> Result<(), StringError> {
	let mut chars = s.char_indices();
	match chars.next() {
		None => return Err(StringError::Empty),
		Some((_, c)) => if !selectors::CLASS_XML_NAMESTART.select(c) || c == ':' {
			return Err(StringError::UnexpectedChar { at: 0 })
		}
	}
	for (at, ch) in chars {
		if !selectors::CLASS_XML_NAME.select(ch) || ch == ':' {
			return Err(StringError::UnexpectedChar { at })
		}
	}
	Ok(())
}

fn validate_cdata(s: &str, version: u8) -> Result<(), StringError> {
	for (at, ch) in s.char_indices() {
		if !selectors::is_legal_char(ch, version) {
			return Err(StringError::UnexpectedChar { at })
		}
	}
	Ok(())
}

/// String which conforms to the `Name` production of XML 1.0/1.1.
///
/// [`Name`] corresponds to a (restricted) [`String`]. For a [`str`]-like type
/// with the same restrictions, see [`NameStr`].
///
/// Since [`Name`] derefs to [`String`], all (non-mutable) methods from
/// [`String`] are available.
///
/// # Formal definition
///
/// ```text
/// [4]  NameStartChar ::= ":" | [A-Z] | "_" | [a-z] | [#xC0-#xD6]
///                        | [#xD8-#xF6] | [#xF8-#x2FF] | [#x370-#x37D]
///                        | [#x37F-#x1FFF] | [#x200C-#x200D]
///                        | [#x2070-#x218F] | [#x2C00-#x2FEF]
///                        | [#x3001-#xD7FF] | [#xF900-#xFDCF]
///                        | [#x10000-#xEFFFF]
/// [4a] NameChar      ::= NameStartChar | "-" | "." | [0-9] | #xB7
///                        | [#x0300-#x036F] | [#x203F-#x2040]
/// [5]  Name          ::= NameStartChar (NameChar)*
/// ```
#[derive(Hash, PartialEq, Debug, Clone)]
pub struct Name(String);

impl Name {
	/// Wrap a given [`String`] in a [`Name`], enforcing the `Name`
	/// production.
	pub fn from_string(s: String) -> Result<Name, StringError> {
		validate_name(s.as_str())?;
		Ok(Name(s))
	}

	/// Copy a given [`str`]-like into a new [`Name`], enforcing the `Name`
	/// production.
	pub fn from_str<T: AsRef<str>>(s: T) -> Result<Name, StringError> {
		let s = s.as_ref();
		validate_name(s)?;
		Ok(Name(s.to_string()))
	}

	/// Consume the Name and return the internal String.
	pub fn as_string(self) -> String {
		self.0
	}

	/// Construct a Name without enforcing anything.
	#[doc(hidden)]
	pub unsafe fn from_string_unchecked(s: String) -> Name {
		Name(s)
	}
}

impl Eq for Name {}

impl PartialEq<Name> for &str {
	fn eq(&self, other: &Name) -> bool {
		*self == other.0.as_str()
	}
}

impl PartialEq<str> for Name {
	fn eq(&self, other: &str) -> bool {
		self.0.as_str() == other
	}
}

impl PartialEq<&str> for Name {
	fn eq(&self, other: &&str) -> bool {
		self.0.as_str() == *other
	}
}

impl Deref for Name {
	type Target = String;

	fn deref(&self) -> &String {
		&self.0
	}
}

impl AsRef<str> for Name {
	fn as_ref(&self) -> &str {
		self.0.as_str()
	}
}

impl Borrow<str> for Name {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl From<Name> for String {
	fn from(other: Name) -> String {
		other.0
	}
}

impl std::fmt::Display for Name {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		f.write_str(&self.0)
	}
}

/// str which conforms to the `Name` production of XML 1.0/1.1.
///
/// See [`Name`] for the formal definition.
#[derive(Hash, PartialEq)]
#[repr(transparent)]
pub struct NameStr(str);

impl NameStr {
	/// Wrap a given `str` in a [`NameStr`], enforcing the `Name` production.
	pub fn from_str<'x>(s: &'x str) -> Result<&'x NameStr, StringError> {
		validate_name(s)?;
		Ok(unsafe { std::mem::transmute(s) })
	}

	/// Copy the NameStr into a new Name.
	pub fn to_name(&self) -> Name {
		unsafe { Name::from_string_unchecked(self.to_string()) }
	}

	/// Construct a NameStr without enforcing anything.
	#[doc(hidden)]
	pub unsafe fn from_str_unchecked<'x>(s: &'x str) -> &'x NameStr {
		std::mem::transmute(s)
	}
}

impl Eq for NameStr {}

impl Deref for NameStr {
	type Target = str;

	fn deref(&self) -> &str {
		&self.0
	}
}

impl AsRef<str> for NameStr {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

/// String which conforms to the `Name` production minus any colon (the
/// `NCName` production of Namespaces in XML 1.0).
#[derive(Hash, PartialEq, Debug, Clone)]
pub struct NCName(String);

impl NCName {
	/// Wrap a given [`String`] in a [`NCName`], enforcing the `NCName`
	/// production.
	pub fn from_string(s: String) -> Result<NCName, StringError> {
		validate_ncname(s.as_str())?;
		Ok(NCName(s))
	}

	/// Copy a given [`str`]-like into a new [`NCName`], enforcing the
	/// `NCName` production.
	pub fn from_str<T: AsRef<str>>(s: T) -> Result<NCName, StringError> {
		let s = s.as_ref();
		validate_ncname(s)?;
		Ok(NCName(s.to_string()))
	}

	pub fn as_name(self) -> Name {
		unsafe { Name::from_string_unchecked(self.0) }
	}

	/// Consume the NCName and return the internal String.
	pub fn as_string(self) -> String {
		self.0
	}

	/// Construct an NCName without enforcing anything.
	#[doc(hidden)]
	pub unsafe fn from_string_unchecked(s: String) -> NCName {
		NCName(s)
	}
}

impl Eq for NCName {}

impl Deref for NCName {
	type Target = String;

	fn deref(&self) -> &String {
		&self.0
	}
}

impl AsRef<str> for NCName {
	fn as_ref(&self) -> &str {
		self.0.as_str()
	}
}

impl From<NCName> for Name {
	fn from(other: NCName) -> Name {
		Name(other.0)
	}
}

/// String which consists only of `Char`s legal for the active XML version.
///
/// [`CData`] corresponds to a (restricted) [`String`]. For a [`str`]-like
/// type with the same restrictions, see [`CDataStr`].
///
/// # Formal definition
///
/// For XML 1.0:
///
/// ```text
/// [2] Char ::= #x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD]
///              | [#x10000-#x10FFFF]
/// ```
///
/// XML 1.1 additionally admits `[#x1-#x1F]` (see [`crate::selectors`]).
#[derive(Hash, PartialEq, Debug, Clone)]
pub struct CData(String);

impl CData {
	/// Wrap a given [`String`] in a [`CData`], enforcing `Char` for the
	/// given XML major version (1 or 2, matching the crate-wide convention
	/// that 2 denotes XML 1.1).
	pub fn from_string(s: String, version: u8) -> Result<CData, StringError> {
		validate_cdata(s.as_str(), version)?;
		Ok(CData(s))
	}

	/// Copy a given [`str`]-like into a new [`CData`], enforcing `Char`.
	pub fn from_str<T: AsRef<str>>(s: T, version: u8) -> Result<CData, StringError> {
		let s = s.as_ref();
		validate_cdata(s, version)?;
		Ok(CData(s.to_string()))
	}

	pub fn as_cdata_str(&self) -> &CDataStr {
		unsafe { CDataStr::from_str_unchecked(&self.0) }
	}

	/// Consume the CData and return the internal String.
	pub fn as_string(self) -> String {
		self.0
	}

	/// Construct a CData without checking anything.
	#[doc(hidden)]
	pub unsafe fn from_string_unchecked(s: String) -> CData {
		CData(s)
	}
}

impl Eq for CData {}

impl PartialEq<str> for CData {
	fn eq(&self, other: &str) -> bool {
		self.0.as_str() == other
	}
}

impl PartialEq<&str> for CData {
	fn eq(&self, other: &&str) -> bool {
		self.0.as_str() == *other
	}
}

impl Deref for CData {
	type Target = String;

	fn deref(&self) -> &String {
		&self.0
	}
}

impl AsRef<str> for CData {
	fn as_ref(&self) -> &str {
		self.0.as_str()
	}
}

impl Borrow<str> for CData {
	fn borrow(&self) -> &str {
		&self.0
	}
}

impl From<CData> for String {
	fn from(other: CData) -> String {
		other.0
	}
}

/// str which consists only of `Char`s legal for the active XML version.
#[derive(Hash, PartialEq)]
#[repr(transparent)]
pub struct CDataStr(str);

impl CDataStr {
	/// Wrap a str in a CDataStr, enforcing `Char` for the given XML major
	/// version.
	pub fn from_str<'x>(s: &'x str, version: u8) -> Result<&'x CDataStr, StringError> {
		validate_cdata(s, version)?;
		Ok(unsafe { std::mem::transmute(s) })
	}

	/// Copy the CDataStr into a new CData.
	pub fn to_cdata(&self) -> CData {
		unsafe { CData::from_string_unchecked(self.0.to_string()) }
	}

	#[doc(hidden)]
	pub unsafe fn from_str_unchecked<'x>(s: &'x str) -> &'x CDataStr {
		std::mem::transmute(s)
	}
}

impl Eq for CDataStr {}

impl Deref for CDataStr {
	type Target = str;

	fn deref(&self) -> &str {
		&self.0
	}
}

impl AsRef<str> for CDataStr {
	fn as_ref(&self) -> &str {
		&self.0
	}
}

impl PartialEq<str> for CDataStr {
	fn eq(&self, other: &str) -> bool {
		&self.0 == other
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn name_rejects_empty_string() {
		assert_eq!(Name::from_str("").unwrap_err(), StringError::Empty);
	}

	#[test]
	fn name_rejects_leading_digit() {
		assert!(Name::from_str("1foo").is_err());
	}

	#[test]
	fn name_accepts_colon_and_underscore() {
		assert!(Name::from_str("xml:lang").is_ok());
		assert!(Name::from_str("_foo-bar.baz").is_ok());
	}

	#[test]
	fn ncname_rejects_colon() {
		assert!(NCName::from_str("foo:bar").is_err());
		assert!(NCName::from_str("foobar").is_ok());
	}

	#[test]
	fn cdata_rejects_c0_control_in_xml10() {
		assert!(CData::from_str("a\x01b", 1).is_err());
	}

	#[test]
	fn cdata_accepts_c0_control_in_xml11() {
		assert!(CData::from_str("a\x01b", 2).is_ok());
	}

	#[test]
	fn cdata_rejects_null_in_both_versions() {
		assert!(CData::from_str("a\0b", 1).is_err());
		assert!(CData::from_str("a\0b", 2).is_err());
	}
}
