//! XML codec.
//!
//! A record serializes as a document: an XML declaration naming the
//! requested encoding, a root element named after the record's type name
//! carrying `xmlns:xsd` and `xmlns:xsi` declarations, and one child element
//! per member in declaration order. Null members write as empty elements,
//! nested records as nested element blocks, and sequences as a wrapper
//! element whose item elements are named after the item kind (the record
//! type name for records, `string`/`long`/`double`/… for scalars). With
//! indentation on, nesting indents by one tab per level.
//!
//! Decode is lenient about content: unknown child elements are skipped and
//! members without a matching element keep their defaults. Text inside a
//! value element is kept verbatim, surrounding whitespace included;
//! whitespace-only text between markup is layout and is dropped. Decode is
//! strict about structure: a root element that does not carry the expected
//! type name, or any syntax error, fails with [`Error::MalformedInput`].
//!
//! The decode entry points take the caller's [`Encoding`] and first convert
//! the input string to bytes with it. The bytes are then decoded honoring a
//! byte-order mark first, the encoding declared in the document second and
//! the caller's encoding last. When the declared encoding disagrees with
//! the actual one the text comes out garbled but stable, never an error;
//! callers rely on that exact behavior surviving.

use std::any::Any;
use std::io::Write;

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::encoding::{self, Encoding};
use crate::error::{Error, Result};
use crate::registry;
use crate::schema::{MatchMode, Reflected};
use crate::value::Value;

const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";
const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const MAX_DEPTH: usize = 128;

/// Write-side options. Defaults: no indentation, UTF-8.
#[derive(Debug, Clone, Copy, Default)]
pub struct XmlWriteOptions {
    pub indent: bool,
    pub encoding: Encoding,
}

/// Serializes a record with default options. `None` serializes to `None`.
pub fn to_string<T: Reflected>(value: Option<&T>) -> Result<Option<String>> {
    to_string_with(value, XmlWriteOptions::default())
}

pub fn to_string_with<T: Reflected>(
    value: Option<&T>,
    options: XmlWriteOptions,
) -> Result<Option<String>> {
    let value = match value {
        Some(value) => value,
        None => return Ok(None),
    };
    let schema = T::schema();
    let fields = match schema.to_value(value) {
        Value::Record { fields, .. } => fields,
        other => {
            return Err(Error::InvalidArgument(format!(
                "cannot write {} as an XML document",
                other.kind_label()
            )))
        }
    };

    let mut writer = if options.indent {
        Writer::new_with_indent(Vec::new(), b'\t', 1)
    } else {
        Writer::new(Vec::new())
    };
    writer.write_event(Event::Decl(BytesDecl::new(
        "1.0",
        Some(options.encoding.label()),
        None,
    )))?;
    let mut root = BytesStart::new(schema.type_name());
    root.push_attribute(("xmlns:xsd", XSD_NAMESPACE));
    root.push_attribute(("xmlns:xsi", XSI_NAMESPACE));
    writer.write_event(Event::Start(root))?;
    for (name, field) in &fields {
        write_member(&mut writer, name, field)?;
    }
    writer.write_event(Event::End(BytesEnd::new(schema.type_name())))?;

    let mut text = String::from_utf8_lossy(&writer.into_inner()).into_owned();
    if let Some(bom) = options.encoding.bom_char() {
        text.insert(0, bom);
    }
    Ok(Some(text))
}

/// Deserializes a record, assuming UTF-8 input. `None` and blank input
/// decode to `None`.
pub fn from_str<T: Reflected + Default>(source: Option<&str>) -> Result<Option<T>> {
    from_str_with(source, Encoding::default())
}

pub fn from_str_with<T: Reflected + Default>(
    source: Option<&str>,
    caller_encoding: Encoding,
) -> Result<Option<T>> {
    let source = match source {
        Some(source) => source,
        None => return Ok(None),
    };
    if source.trim().is_empty() {
        return Ok(None);
    }
    let text = recode_source(source, caller_encoding);
    let schema = T::schema();
    let (root_name, value) = parse_document(&text)?;
    if root_name != schema.type_name() {
        return Err(Error::MalformedInput(format!(
            "unexpected root element `{root_name}`, expected `{}`",
            schema.type_name()
        )));
    }
    match value {
        Value::Null => Ok(Some(T::default())),
        other => Ok(Some(schema.from_value(other, MatchMode::Exact)?)),
    }
}

/// Deserializes by runtime type name through the registry. Fails with
/// [`Error::InvalidArgument`] when the name was never registered.
pub fn from_str_as(
    type_name: &str,
    source: Option<&str>,
    caller_encoding: Encoding,
) -> Result<Option<Box<dyn Any>>> {
    if !registry::is_registered(type_name) {
        return Err(Error::InvalidArgument(format!(
            "unknown type name `{type_name}`"
        )));
    }
    let source = match source {
        Some(source) => source,
        None => return Ok(None),
    };
    if source.trim().is_empty() {
        return Ok(None);
    }
    let text = recode_source(source, caller_encoding);
    let (root_name, value) = parse_document(&text)?;
    if root_name != type_name {
        return Err(Error::MalformedInput(format!(
            "unexpected root element `{root_name}`, expected `{type_name}`"
        )));
    }
    let value = match value {
        Value::Null => Value::Map(Vec::new()),
        other => other,
    };
    registry::decode_erased(type_name, value, MatchMode::Exact).map(Some)
}

fn write_member<W: Write>(writer: &mut Writer<W>, name: &str, value: &Value) -> Result<()> {
    match value {
        Value::Null => {
            writer.write_event(Event::Empty(BytesStart::new(name)))?;
        }
        Value::Seq(items) => {
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            for item in items {
                write_member(writer, item_element_name(item), item)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        Value::Map(entries) | Value::Record { fields: entries, .. } => {
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            for (child_name, child) in entries {
                write_member(writer, child_name, child)?;
            }
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
        scalar => {
            writer.write_event(Event::Start(BytesStart::new(name)))?;
            writer.write_event(Event::Text(BytesText::new(&scalar.to_string())))?;
            writer.write_event(Event::End(BytesEnd::new(name)))?;
        }
    }
    Ok(())
}

fn item_element_name(item: &Value) -> &str {
    match item {
        Value::Record { name, .. } => name,
        Value::Bool(_) => "boolean",
        Value::Int(_) => "long",
        Value::UInt(_) => "unsignedLong",
        Value::Float(_) => "double",
        Value::Str(_) => "string",
        Value::Bytes(_) => "base64Binary",
        Value::Null | Value::Seq(_) | Value::Map(_) => "anyType",
    }
}

/// Decode-side counterpart of [`item_element_name`]: whether `name` is one
/// of the kind-named item elements a scalar sequence wrapper is made of.
pub(crate) fn is_item_element_name(name: &str) -> bool {
    matches!(
        name,
        "boolean" | "long" | "unsignedLong" | "double" | "string" | "base64Binary" | "anyType"
    )
}

/// Converts the caller's string to bytes and decodes them back honoring, in
/// order: a byte-order mark, the declared encoding, the caller's encoding.
fn recode_source(source: &str, caller_encoding: Encoding) -> String {
    let bytes = caller_encoding.encode(source);
    let (actual, offset) = match encoding::sniff_bom(&bytes) {
        Some((encoding, bom_len)) => (encoding, bom_len),
        None => (declared_encoding(&bytes).unwrap_or(caller_encoding), 0),
    };
    let text = actual.decode(&bytes[offset..]);
    match text.strip_prefix('\u{FEFF}') {
        Some(stripped) => stripped.to_string(),
        None => text,
    }
}

/// Scans the XML declaration for an `encoding` attribute. The head bytes
/// are inspected as Latin-1, which reads any ASCII-compatible declaration;
/// wide encodings are caught earlier by their byte-order mark.
fn declared_encoding(bytes: &[u8]) -> Option<Encoding> {
    let head_len = bytes.len().min(256);
    let head: String = bytes[..head_len].iter().map(|&b| char::from(b)).collect();
    let trimmed = head.trim_start();
    if !trimmed.starts_with("<?xml") {
        return None;
    }
    let decl = &trimmed[..trimmed.find("?>").unwrap_or(trimmed.len())];
    let after = &decl[decl.find("encoding=")? + "encoding=".len()..];
    let mut chars = after.chars();
    let quote = chars.next()?;
    if quote != '"' && quote != '\'' {
        return None;
    }
    let rest = chars.as_str();
    let end = rest.find(quote)?;
    Encoding::for_label(&rest[..end])
}

/// True for text made of nothing but XML whitespace, the indentation and
/// line breaks between markup.
fn is_layout_whitespace(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

/// Parses a document into its root element name and the generic value tree
/// under it: elements with children become mappings (duplicate names
/// preserved, which is how sequences arrive), elements with only text
/// become strings and empty elements become null. Text is kept verbatim;
/// whitespace-only text nodes are layout and are dropped.
fn parse_document(text: &str) -> Result<(String, Value)> {
    let mut reader = Reader::from_str(text);
    let root = loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = element_name(&e)?;
                let value = read_element(&mut reader, 0)?;
                break (name, value);
            }
            Event::Empty(e) => break (element_name(&e)?, Value::Null),
            Event::Decl(_) | Event::DocType(_) | Event::Comment(_) | Event::PI(_) => continue,
            Event::Text(t) => {
                if !is_layout_whitespace(&t.unescape()?) {
                    return Err(Error::MalformedInput(
                        "text before document root".to_string(),
                    ));
                }
            }
            Event::CData(_) => {
                return Err(Error::MalformedInput(
                    "text before document root".to_string(),
                ))
            }
            Event::End(_) => {
                return Err(Error::MalformedInput(
                    "unexpected closing element".to_string(),
                ))
            }
            Event::Eof => return Err(Error::MalformedInput("missing root element".to_string())),
        }
    };
    loop {
        match reader.read_event()? {
            Event::Eof => break,
            Event::Comment(_) | Event::PI(_) => continue,
            Event::Text(t) => {
                if !is_layout_whitespace(&t.unescape()?) {
                    return Err(Error::MalformedInput(
                        "content after document root".to_string(),
                    ));
                }
            }
            _ => {
                return Err(Error::MalformedInput(
                    "content after document root".to_string(),
                ))
            }
        }
    }
    Ok(root)
}

fn read_element(reader: &mut Reader<&[u8]>, depth: usize) -> Result<Value> {
    if depth > MAX_DEPTH {
        return Err(Error::MalformedInput(
            "element nesting too deep".to_string(),
        ));
    }
    let mut children: Vec<(String, Value)> = Vec::new();
    let mut text: Option<String> = None;
    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let name = element_name(&e)?;
                let value = read_element(reader, depth + 1)?;
                children.push((name, value));
            }
            Event::Empty(e) => children.push((element_name(&e)?, Value::Null)),
            Event::Text(t) => {
                let chunk = t.unescape()?;
                if !is_layout_whitespace(&chunk) {
                    text.get_or_insert_with(String::new).push_str(&chunk);
                }
            }
            Event::CData(t) => {
                let bytes = t.into_inner();
                match std::str::from_utf8(&bytes) {
                    Ok(chunk) => text.get_or_insert_with(String::new).push_str(chunk),
                    Err(_) => {
                        return Err(Error::MalformedInput(
                            "invalid utf-8 in CDATA section".to_string(),
                        ))
                    }
                }
            }
            Event::Comment(_) | Event::PI(_) => continue,
            Event::End(_) => break,
            Event::Eof => {
                return Err(Error::MalformedInput(
                    "unexpected end of document".to_string(),
                ))
            }
            Event::Decl(_) | Event::DocType(_) => {
                return Err(Error::MalformedInput(
                    "unexpected markup inside element".to_string(),
                ))
            }
        }
    }
    if !children.is_empty() {
        Ok(Value::Map(children))
    } else if let Some(text) = text {
        Ok(Value::Str(text))
    } else {
        Ok(Value::Null)
    }
}

fn element_name(start: &BytesStart<'_>) -> Result<String> {
    match std::str::from_utf8(start.name().as_ref()) {
        Ok(name) => Ok(name.to_string()),
        Err(_) => Err(Error::MalformedInput(
            "invalid utf-8 in element name".to_string(),
        )),
    }
}
