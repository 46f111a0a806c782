use std::io::Write;

use xtok::{TokenKind, Tokenizer, TokenizeError, TokenRead};

fn collect(tok: &mut Tokenizer) -> Vec<(TokenKind, Vec<u8>)> {
	let mut out = Vec::new();
	tok.for_each_token(|t| out.push((t.kind, t.data)));
	out
}

#[test]
fn full_document_with_attributes_and_nested_elements() {
	let mut tok = Tokenizer::from_bytes(
		"<memory>",
		br#"<?xml version="1.0" encoding="UTF-8"?>
<root a="1" b='two'>
  <child>hello</child>
</root>"#.to_vec(),
	);
	let toks = collect(&mut tok);
	let kinds: Vec<_> = toks.iter().map(|(k, _)| *k).collect();
	assert_eq!(kinds, vec![
		TokenKind::ElementStart,
		TokenKind::AttributeName,
		TokenKind::AttributeValue,
		TokenKind::AttributeName,
		TokenKind::AttributeValue,
		TokenKind::Text,
		TokenKind::ElementStart,
		TokenKind::Text,
		TokenKind::ElementEnd,
		TokenKind::Text,
		TokenKind::ElementEnd,
		TokenKind::End,
	]);
}

#[test]
fn internal_dtd_entity_is_expanded_in_content() {
	let mut tok = Tokenizer::from_bytes(
		"<memory>",
		b"<!DOCTYPE a [<!ENTITY who \"world\">]><a>hello &who;!</a>".to_vec(),
	);
	let toks = collect(&mut tok);
	let text: Vec<u8> = toks
		.iter()
		.filter(|(k, _)| *k == TokenKind::Text)
		.flat_map(|(_, d)| d.clone())
		.collect();
	assert_eq!(text, b"hello world!");
}

#[test]
fn predefined_entities_round_trip_through_content_and_attributes() {
	let mut tok = Tokenizer::from_bytes(
		"<memory>",
		b"<a x=\"&lt;&amp;&gt;\">&apos;&quot;</a>".to_vec(),
	);
	let toks = collect(&mut tok);
	let attr_value = &toks
		.iter()
		.find(|(k, _)| *k == TokenKind::AttributeValue)
		.unwrap()
		.1;
	assert_eq!(attr_value.as_slice(), b"<&>");
	let text = &toks.iter().find(|(k, _)| *k == TokenKind::Text).unwrap().1;
	assert_eq!(text.as_slice(), b"'\"");
}

#[test]
fn recursive_entity_reference_is_rejected() {
	let mut tok = Tokenizer::from_bytes(
		"<memory>",
		b"<!DOCTYPE a [<!ENTITY a \"&b;\"><!ENTITY b \"&a;\">]><x>&a;</x>".to_vec(),
	);
	let toks = collect(&mut tok);
	assert_eq!(toks.last().unwrap().0, TokenKind::Error);
	assert!(matches!(tok.last_error().unwrap().kind, TokenizeError::RecursiveEntity(_)));
}

#[test]
fn unknown_entity_reference_is_rejected() {
	let mut tok = Tokenizer::from_bytes("<memory>", b"<a>&nope;</a>".to_vec());
	let toks = collect(&mut tok);
	assert_eq!(toks.last().unwrap().0, TokenKind::Error);
	assert!(matches!(tok.last_error().unwrap().kind, TokenizeError::UnknownEntity(_)));
}

#[test]
fn comments_pis_and_cdata_are_tokenized() {
	let mut tok = Tokenizer::from_bytes(
		"<memory>",
		b"<a><!-- note --><?pi data?><![CDATA[<raw>]]></a>".to_vec(),
	);
	let toks = collect(&mut tok);
	let kinds: Vec<_> = toks.iter().map(|(k, _)| *k).collect();
	assert_eq!(kinds, vec![
		TokenKind::ElementStart,
		TokenKind::Comment,
		TokenKind::PiTarget,
		TokenKind::PiData,
		TokenKind::CData,
		TokenKind::ElementEnd,
		TokenKind::End,
	]);
	let cdata = &toks.iter().find(|(k, _)| *k == TokenKind::CData).unwrap().1;
	assert_eq!(cdata.as_slice(), b"<raw>");
}

#[test]
fn malformed_document_yields_a_sticky_error_token() {
	let mut tok = Tokenizer::from_bytes("<memory>", b"<a></b>".to_vec());
	let first = tok.next_token();
	let mut last = first;
	loop {
		let t = tok.next_token();
		if t.kind == TokenKind::Error {
			last = t;
			break;
		}
		if t.kind == TokenKind::End {
			panic!("mismatched end tag should not tokenize cleanly");
		}
	}
	assert_eq!(last.kind, TokenKind::Error);
	let again = tok.next_token();
	assert_eq!(again.kind, TokenKind::Error);
	assert_eq!(again.data, last.data);
}

#[test]
fn reading_a_document_from_disk_tracks_location() {
	let mut file = tempfile::NamedTempFile::new().unwrap();
	write!(file, "<root>\n  <child/>\n</root>").unwrap();

	let mut tok = Tokenizer::new(file.path()).unwrap();
	loop {
		let t = tok.next_token();
		if t.kind == TokenKind::ElementStart && t.data == b"child" {
			assert_eq!(tok.get_line(), 2);
			break;
		}
		assert_ne!(t.kind, TokenKind::Error);
		assert_ne!(t.kind, TokenKind::End);
	}
}

#[test]
fn opening_a_missing_file_is_reported_as_an_io_error() {
	let err = Tokenizer::new("/no/such/file/for-xtok-tests.xml").unwrap_err();
	assert!(matches!(err, TokenizeError::IoError(_)));
}
