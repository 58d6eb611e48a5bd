use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};
use std::io::Cursor;
use thiserror::Error;

use super::model::{Entry, Feed, Text, DEFAULT_TEXT_TYPE};

/// Atom namespace declared on every document this module writes.
pub const ATOM_NAMESPACE: &str = "http://www.w3.org/2005/Atom";

/// Errors produced while decoding an inbound entry document.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The document is not well-formed XML.
    #[error("{0}")]
    Xml(String),

    /// The root element is something other than `<entry>`.
    #[error("expected <entry> root element, found <{0}>")]
    UnexpectedRoot(String),

    /// A required child element is absent.
    #[error("entry is missing required <{0}> element")]
    MissingElement(&'static str),

    /// A required child element has no text.
    #[error("<{0}> element must not be empty")]
    EmptyElement(&'static str),

    /// A child element appears more than once.
    #[error("entry has more than one <{0}> element")]
    DuplicateElement(&'static str),

    /// A text construct contains child elements.
    #[error("unexpected markup inside <{0}>")]
    UnexpectedMarkup(&'static str),
}

/// Errors produced while writing a document.
#[derive(Debug, Error)]
#[error("failed to write Atom document: {0}")]
pub struct EncodeError(String);

/// Entry children this module understands.
#[derive(Clone, Copy)]
enum Field {
    Id,
    Title,
    Content,
}

impl Field {
    fn from_local_name(name: &[u8]) -> Option<Self> {
        match name {
            b"id" => Some(Field::Id),
            b"title" => Some(Field::Title),
            b"content" => Some(Field::Content),
            _ => None,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Title => "title",
            Field::Content => "content",
        }
    }
}

/// Collected children of the `<entry>` element.
#[derive(Default)]
struct EntryParts {
    id: Option<String>,
    title: Option<Text>,
    content: Option<Text>,
}

impl EntryParts {
    fn set(&mut self, field: Field, text: Text) -> Result<(), DecodeError> {
        let slot_taken = match field {
            Field::Id => self.id.replace(text.raw.trim().to_string()).is_some(),
            Field::Title => self.title.replace(text).is_some(),
            Field::Content => self.content.replace(text).is_some(),
        };
        if slot_taken {
            return Err(DecodeError::DuplicateElement(field.name()));
        }
        Ok(())
    }

    fn into_entry(self) -> Result<Entry, DecodeError> {
        let title = self.title.ok_or(DecodeError::MissingElement("title"))?;
        let content = self
            .content
            .ok_or(DecodeError::MissingElement("content"))?;
        if title.raw.is_empty() {
            return Err(DecodeError::EmptyElement("title"));
        }
        if content.raw.is_empty() {
            return Err(DecodeError::EmptyElement("content"));
        }
        Ok(Entry {
            id: self.id.unwrap_or_default(),
            feed_title: String::new(),
            title,
            content,
        })
    }
}

fn xml_error(e: impl std::fmt::Display) -> DecodeError {
    DecodeError::Xml(e.to_string())
}

/// Decodes an Atom `<entry>` document.
///
/// The root may or may not carry the Atom namespace; elements are matched on
/// their local name. `title` and `content` are required and must hold
/// non-empty text. Nothing but comments, processing instructions and
/// whitespace may follow the closing `</entry>`. A missing `type` attribute defaults to `"text"`. An `id`
/// child is read when present. Other children are skipped.
///
/// # Security
///
/// quick-xml (0.37) never expands DOCTYPE entity declarations; anything other
/// than the five predefined entities fails to unescape and surfaces as
/// [`DecodeError::Xml`].
pub fn decode_entry(bytes: &[u8]) -> Result<Entry, DecodeError> {
    let mut reader = Reader::from_reader(bytes);
    let mut buf = Vec::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => {
                if e.local_name().as_ref() != b"entry" {
                    let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                    return Err(DecodeError::UnexpectedRoot(name));
                }
                break;
            }
            Event::Empty(e) => {
                if e.local_name().as_ref() == b"entry" {
                    return Err(DecodeError::MissingElement("title"));
                }
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                return Err(DecodeError::UnexpectedRoot(name));
            }
            Event::Text(t) => {
                if !t.iter().all(u8::is_ascii_whitespace) {
                    return Err(DecodeError::Xml(
                        "text content outside of the root element".to_string(),
                    ));
                }
            }
            Event::CData(_) => {
                return Err(DecodeError::Xml(
                    "CDATA section outside of the root element".to_string(),
                ));
            }
            Event::Eof => {
                return Err(DecodeError::Xml("document has no root element".to_string()));
            }
            _ => {}
        }
        buf.clear();
    }

    let mut parts = EntryParts::default();
    let mut skip_buf = Vec::new();

    loop {
        buf.clear();
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Start(e) => match Field::from_local_name(e.local_name().as_ref()) {
                Some(field) => {
                    let kind = type_attribute(&e, &reader)?;
                    let raw = read_text(&mut reader, field)?;
                    parts.set(field, Text { raw, kind })?;
                }
                None => {
                    skip_buf.clear();
                    reader
                        .read_to_end_into(e.name(), &mut skip_buf)
                        .map_err(xml_error)?;
                }
            },
            Event::Empty(e) => {
                if let Some(field) = Field::from_local_name(e.local_name().as_ref()) {
                    let kind = type_attribute(&e, &reader)?;
                    parts.set(
                        field,
                        Text {
                            raw: String::new(),
                            kind,
                        },
                    )?;
                }
            }
            // The only unmatched end tag left is </entry>; quick-xml checks the name.
            Event::End(_) => break,
            Event::Eof => {
                return Err(DecodeError::Xml(
                    "unexpected end of document: <entry> is not closed".to_string(),
                ));
            }
            _ => {}
        }
    }

    expect_epilog(&mut reader, &mut buf)?;
    parts.into_entry()
}

/// Reads the rest of the document after the root element has closed.
/// Only comments, processing instructions and whitespace may follow it.
fn expect_epilog(reader: &mut Reader<&[u8]>, buf: &mut Vec<u8>) -> Result<(), DecodeError> {
    loop {
        buf.clear();
        match reader.read_event_into(buf).map_err(xml_error)? {
            Event::Eof => return Ok(()),
            Event::Comment(_) | Event::PI(_) => {}
            Event::Text(t) if t.iter().all(u8::is_ascii_whitespace) => {}
            _ => {
                return Err(DecodeError::Xml(
                    "content after the root element".to_string(),
                ));
            }
        }
    }
}

/// Reads the optional `type` attribute of a text construct.
fn type_attribute(e: &BytesStart<'_>, reader: &Reader<&[u8]>) -> Result<String, DecodeError> {
    for attr_result in e.attributes() {
        let attr = attr_result.map_err(xml_error)?;
        if attr.key.local_name().as_ref() == b"type" {
            let value = attr
                .decode_and_unescape_value(reader.decoder())
                .map_err(xml_error)?;
            return Ok(value.into_owned());
        }
    }
    Ok(DEFAULT_TEXT_TYPE.to_string())
}

/// Reads character data up to the end tag of `field`.
fn read_text(reader: &mut Reader<&[u8]>, field: Field) -> Result<String, DecodeError> {
    let mut buf = Vec::new();
    let mut raw = String::new();

    loop {
        match reader.read_event_into(&mut buf).map_err(xml_error)? {
            Event::Text(t) => raw.push_str(&t.unescape().map_err(xml_error)?),
            Event::CData(c) => {
                let bytes = c.into_inner();
                raw.push_str(std::str::from_utf8(&bytes).map_err(xml_error)?);
            }
            Event::Start(_) | Event::Empty(_) => {
                return Err(DecodeError::UnexpectedMarkup(field.name()));
            }
            Event::End(_) => return Ok(raw),
            Event::Eof => {
                return Err(DecodeError::Xml(format!(
                    "unexpected end of document: <{}> is not closed",
                    field.name()
                )));
            }
            _ => {}
        }
        buf.clear();
    }
}

// ============================================================================
// Encoding
// ============================================================================

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn write(writer: &mut XmlWriter, event: Event<'_>) -> Result<(), EncodeError> {
    writer
        .write_event(event)
        .map_err(|e| EncodeError(e.to_string()))
}

fn write_declaration(writer: &mut XmlWriter) -> Result<(), EncodeError> {
    write(
        writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )
}

/// `<name [type="kind"]>text</name>`
fn write_text_element(
    writer: &mut XmlWriter,
    name: &str,
    text: &str,
    kind: Option<&str>,
) -> Result<(), EncodeError> {
    let mut start = BytesStart::new(name);
    if let Some(kind) = kind {
        start.push_attribute(("type", kind));
    }
    write(writer, Event::Start(start))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

/// Writes an `<entry>` element. The namespace is only declared when the entry
/// is the document root.
fn write_entry(writer: &mut XmlWriter, entry: &Entry, as_root: bool) -> Result<(), EncodeError> {
    let mut start = BytesStart::new("entry");
    if as_root {
        start.push_attribute(("xmlns", ATOM_NAMESPACE));
    }
    write(writer, Event::Start(start))?;
    write_text_element(writer, "id", &entry.id, None)?;
    write_text_element(
        writer,
        "title",
        &entry.title.raw,
        Some(entry.title.kind.as_str()),
    )?;
    write_text_element(
        writer,
        "content",
        &entry.content.raw,
        Some(entry.content.kind.as_str()),
    )?;
    write(writer, Event::End(BytesEnd::new("entry")))
}

/// Encodes a feed and its entries, in the order given, as an Atom feed document.
pub fn encode_feed(feed: &Feed) -> Result<Vec<u8>, EncodeError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_declaration(&mut writer)?;

    let mut root = BytesStart::new("feed");
    root.push_attribute(("xmlns", ATOM_NAMESPACE));
    write(&mut writer, Event::Start(root))?;
    write_text_element(&mut writer, "id", &feed.id, None)?;
    write_text_element(&mut writer, "title", &feed.title, None)?;
    for entry in &feed.entries {
        write_entry(&mut writer, entry, false)?;
    }
    write(&mut writer, Event::End(BytesEnd::new("feed")))?;

    Ok(writer.into_inner().into_inner())
}

/// Encodes a single entry as a standalone Atom entry document.
pub fn encode_entry(entry: &Entry) -> Result<Vec<u8>, EncodeError> {
    let mut writer = Writer::new(Cursor::new(Vec::new()));
    write_declaration(&mut writer)?;
    write_entry(&mut writer, entry, true)?;
    Ok(writer.into_inner().into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn entry(id: &str, title: Text, content: Text) -> Entry {
        Entry {
            id: id.to_string(),
            feed_title: String::new(),
            title,
            content,
        }
    }

    #[test]
    fn test_decode_minimal_entry_defaults_types() {
        let decoded =
            decode_entry(b"<entry><title>Hello</title><content>World</content></entry>").unwrap();
        assert_eq!(decoded.title, Text::plain("Hello"));
        assert_eq!(decoded.content, Text::plain("World"));
        assert_eq!(decoded.id, "");
        assert_eq!(decoded.feed_title, "");
    }

    #[test]
    fn test_decode_explicit_types() {
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<entry xmlns="http://www.w3.org/2005/Atom">
  <title type="html">&lt;b&gt;Bold&lt;/b&gt;</title>
  <content type="html"><![CDATA[<p>Body</p>]]></content>
</entry>"#;
        let decoded = decode_entry(xml.as_bytes()).unwrap();
        assert_eq!(decoded.title, Text::with_kind("<b>Bold</b>", "html"));
        assert_eq!(decoded.content, Text::with_kind("<p>Body</p>", "html"));
    }

    #[test]
    fn test_decode_defaults_only_missing_type() {
        let xml = r#"<entry><title type="html">T</title><content>C</content></entry>"#;
        let decoded = decode_entry(xml.as_bytes()).unwrap();
        assert_eq!(decoded.title.kind, "html");
        assert_eq!(decoded.content.kind, "text");
    }

    #[test]
    fn test_decode_prefixed_namespace() {
        let xml = r#"<a:entry xmlns:a="http://www.w3.org/2005/Atom"><a:title>T</a:title><a:content>C</a:content></a:entry>"#;
        let decoded = decode_entry(xml.as_bytes()).unwrap();
        assert_eq!(decoded.title.raw, "T");
        assert_eq!(decoded.content.raw, "C");
    }

    #[test]
    fn test_decode_reads_id_and_skips_unknown_elements() {
        let xml = r#"<entry>
  <id> urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a </id>
  <author><name>Someone</name></author>
  <link href="https://example.com/post"/>
  <title>T</title>
  <content>C</content>
</entry>"#;
        let decoded = decode_entry(xml.as_bytes()).unwrap();
        assert_eq!(decoded.id, "urn:uuid:1225c695-cfb8-4ebb-aaaa-80da344efa6a");
        assert_eq!(decoded.title.raw, "T");
    }

    #[test]
    fn test_decode_keeps_surrounding_whitespace() {
        let decoded =
            decode_entry(b"<entry><title> padded </title><content>a\nb</content></entry>").unwrap();
        assert_eq!(decoded.title.raw, " padded ");
        assert_eq!(decoded.content.raw, "a\nb");
    }

    #[test]
    fn test_decode_truncated_document() {
        let err = decode_entry(b"<entry><title>").unwrap_err();
        assert!(matches!(err, DecodeError::Xml(_)), "got {:?}", err);
    }

    #[test]
    fn test_decode_mismatched_end_tag() {
        let err = decode_entry(b"<entry><title>T</content></entry>").unwrap_err();
        assert!(matches!(err, DecodeError::Xml(_)), "got {:?}", err);
    }

    #[test]
    fn test_decode_empty_body() {
        assert_eq!(
            decode_entry(b"").unwrap_err(),
            DecodeError::Xml("document has no root element".to_string())
        );
    }

    #[test]
    fn test_decode_missing_title() {
        assert_eq!(
            decode_entry(b"<entry><content>C</content></entry>").unwrap_err(),
            DecodeError::MissingElement("title")
        );
    }

    #[test]
    fn test_decode_missing_content() {
        assert_eq!(
            decode_entry(b"<entry><title>T</title></entry>").unwrap_err(),
            DecodeError::MissingElement("content")
        );
    }

    #[test]
    fn test_decode_empty_content() {
        assert_eq!(
            decode_entry(b"<entry><title>T</title><content></content></entry>").unwrap_err(),
            DecodeError::EmptyElement("content")
        );
        assert_eq!(
            decode_entry(b"<entry><title>T</title><content/></entry>").unwrap_err(),
            DecodeError::EmptyElement("content")
        );
    }

    #[test]
    fn test_decode_whitespace_only_text_is_kept() {
        let decoded =
            decode_entry(b"<entry><title> </title><content>\n\t</content></entry>").unwrap();
        assert_eq!(decoded.title, Text::plain(" "));
        assert_eq!(decoded.content, Text::plain("\n\t"));
    }

    #[test]
    fn test_decode_rejects_content_after_root() {
        let after_root = DecodeError::Xml("content after the root element".to_string());
        for xml in [
            "<entry><title>T</title><content>C</content></entry><entry><bogus",
            "<entry><title>T</title><content>C</content></entry>junk text",
            "<entry><title>T</title><content>C</content></entry><![CDATA[x]]>",
            "<entry><title>T</title><content>C</content></entry><extra/>",
        ] {
            assert_eq!(decode_entry(xml.as_bytes()).unwrap_err(), after_root, "input: {}", xml);
        }
    }

    #[test]
    fn test_decode_allows_comments_after_root() {
        let xml = "<entry><title>T</title><content>C</content></entry>\n<!-- end -->\n<?pi x?>\n";
        let decoded = decode_entry(xml.as_bytes()).unwrap();
        assert_eq!(decoded.title.raw, "T");
    }

    #[test]
    fn test_decode_rejects_cdata_before_root() {
        let err =
            decode_entry(b"<![CDATA[x]]><entry><title>T</title><content>C</content></entry>")
                .unwrap_err();
        assert!(matches!(err, DecodeError::Xml(_)), "got {:?}", err);
    }

    #[test]
    fn test_decode_wrong_root() {
        assert_eq!(
            decode_entry(b"<feed><title>T</title></feed>").unwrap_err(),
            DecodeError::UnexpectedRoot("feed".to_string())
        );
    }

    #[test]
    fn test_decode_duplicate_title() {
        assert_eq!(
            decode_entry(b"<entry><title>A</title><title>B</title><content>C</content></entry>")
                .unwrap_err(),
            DecodeError::DuplicateElement("title")
        );
    }

    #[test]
    fn test_decode_rejects_markup_in_text() {
        assert_eq!(
            decode_entry(b"<entry><title>T</title><content><div>x</div></content></entry>")
                .unwrap_err(),
            DecodeError::UnexpectedMarkup("content")
        );
    }

    #[test]
    fn test_decode_rejects_custom_entities() {
        let xml = r#"<?xml version="1.0"?>
<!DOCTYPE entry [<!ENTITY xxe SYSTEM "file:///etc/passwd">]>
<entry><title>&xxe;</title><content>C</content></entry>"#;
        let err = decode_entry(xml.as_bytes()).unwrap_err();
        assert!(matches!(err, DecodeError::Xml(_)), "got {:?}", err);
    }

    #[test]
    fn test_encode_feed_with_entries() {
        let feed = Feed {
            id: "urn:uuid:feed".to_string(),
            title: "tech".to_string(),
            entries: vec![
                entry("urn:uuid:1", Text::plain("First"), Text::plain("One")),
                entry(
                    "urn:uuid:2",
                    Text::with_kind("Second", "html"),
                    Text::with_kind("<p>Two & more</p>", "html"),
                ),
            ],
        };

        let xml = String::from_utf8(encode_feed(&feed).unwrap()).unwrap();
        assert_eq!(
            xml,
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<feed xmlns="http://www.w3.org/2005/Atom">"#,
                r#"<id>urn:uuid:feed</id><title>tech</title>"#,
                r#"<entry><id>urn:uuid:1</id><title type="text">First</title><content type="text">One</content></entry>"#,
                r#"<entry><id>urn:uuid:2</id><title type="html">Second</title><content type="html">&lt;p&gt;Two &amp; more&lt;/p&gt;</content></entry>"#,
                r#"</feed>"#,
            )
        );
    }

    #[test]
    fn test_encode_empty_feed() {
        let feed = Feed::new("urn:uuid:feed", "empty");
        let xml = String::from_utf8(encode_feed(&feed).unwrap()).unwrap();
        assert!(xml.contains(r#"<feed xmlns="http://www.w3.org/2005/Atom">"#));
        assert!(xml.contains("<title>empty</title>"));
        assert!(!xml.contains("<entry"));
    }

    #[test]
    fn test_encode_entry_declares_namespace() {
        let e = entry("urn:uuid:1", Text::plain("Hello"), Text::plain("World"));
        let xml = String::from_utf8(encode_entry(&e).unwrap()).unwrap();
        assert_eq!(
            xml,
            concat!(
                r#"<?xml version="1.0" encoding="UTF-8"?>"#,
                r#"<entry xmlns="http://www.w3.org/2005/Atom">"#,
                r#"<id>urn:uuid:1</id><title type="text">Hello</title><content type="text">World</content>"#,
                r#"</entry>"#,
            )
        );
    }

    fn text_strategy() -> impl Strategy<Value = Text> {
        (
            "[a-zA-Z0-9 <>&'\"]{1,40}",
            prop_oneof![Just("text"), Just("html"), Just("xhtml")],
        )
            .prop_map(|(raw, kind)| Text::with_kind(raw, kind))
    }

    proptest! {
        #[test]
        fn prop_entry_round_trip(
            id in "urn:uuid:[0-9a-f]{8}-[0-9a-f]{4}",
            title in text_strategy(),
            content in text_strategy(),
        ) {
            let original = entry(&id, title, content);
            let bytes = encode_entry(&original).unwrap();
            let decoded = decode_entry(&bytes).unwrap();
            prop_assert_eq!(decoded, original);
        }
    }
}
