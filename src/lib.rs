//! Multi-format payload codecs over registered record schemas.
//!
//! The crate converts in-memory records to and from four wire
//! representations behind one surface:
//!
//! - a self-describing binary format ([`binary`]), gated by explicit type
//!   registration;
//! - an XML document form ([`xml`]) with a namespace-carrying root element
//!   and a caller-chosen text [`Encoding`];
//! - a strict JSON dialect ([`json::strict`]) that writes declared member
//!   names in declaration order and always omits nulls;
//! - a permissive JSON dialect ([`json::flex`]) that honors member
//!   annotations, decodes case-insensitively and can parse arbitrary JSON
//!   into a dynamic [`Value`] tree.
//!
//! Record types opt in by implementing [`Reflected`], assembling a
//! [`Schema`] that names the type and lists its members with typed
//! accessors. Types that should travel in the binary format additionally
//! register through [`registry::register`], which is also what enables
//! decoding by runtime type name.
//!
//! Null propagates instead of erroring: every entry point takes its value
//! or source as an `Option` and maps `None`, blank text and the JSON
//! `null` literal to `Ok(None)`. Everything else that goes wrong surfaces
//! as one of the four [`Error`] variants.
//!
//! ```
//! use payload_codecs::{json, Reflected, Schema};
//!
//! #[derive(Debug, Clone, Default, PartialEq)]
//! struct Invoice {
//!     number: String,
//!     total: i64,
//! }
//!
//! impl Reflected for Invoice {
//!     fn schema() -> Schema<Self> {
//!         Schema::builder("Invoice")
//!             .field("Number", |i: &Invoice| i.number.clone(), |i, v| i.number = v)
//!             .field("Total", |i: &Invoice| i.total, |i, v| i.total = v)
//!             .build()
//!     }
//! }
//!
//! # fn main() -> payload_codecs::Result<()> {
//! let invoice = Invoice { number: "F-0001".to_string(), total: 125 };
//! let text = json::strict::to_string(Some(&invoice))?.unwrap();
//! assert_eq!(text, r#"{"Number":"F-0001","Total":125}"#);
//!
//! let back: Option<Invoice> = json::strict::from_str(Some(&text))?;
//! assert_eq!(back, Some(invoice));
//! # Ok(())
//! # }
//! ```

pub mod binary;
pub mod encoding;
pub mod error;
pub mod json;
pub mod registry;
pub mod schema;
pub mod utils;
pub mod value;
pub mod xml;

pub use encoding::Encoding;
pub use error::{Error, Result};
pub use schema::{MatchMode, Reflected, Schema, SchemaBuilder, WireValue};
pub use value::Value;

use tracing::trace;

/// Wire representation selector for [`encode`] and [`decode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Binary,
    Xml,
    JsonStrict,
    JsonFlex,
}

/// An encoded buffer: bytes for the binary format, text for the rest.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    Bytes(Vec<u8>),
    Text(String),
}

impl Payload {
    pub fn kind_label(&self) -> &'static str {
        match self {
            Payload::Bytes(_) => "byte",
            Payload::Text(_) => "text",
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Payload::Bytes(bytes) => Some(bytes),
            Payload::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Bytes(_) => None,
        }
    }
}

/// Per-call options shared by all formats. Each format reads only the
/// options that apply to it.
#[derive(Debug, Clone, Copy)]
pub struct CodecOptions {
    /// Text encoding for XML and strict JSON. Defaults to UTF-8.
    pub encoding: Encoding,
    /// Tab indentation for XML. Defaults to off.
    pub indent: bool,
    /// Null-member omission for permissive JSON. Defaults to on.
    pub ignore_nulls: bool,
}

impl Default for CodecOptions {
    fn default() -> Self {
        CodecOptions {
            encoding: Encoding::Utf8,
            indent: false,
            ignore_nulls: true,
        }
    }
}

/// Encodes a record in the selected format. `None` encodes to `None`.
pub fn encode<T: Reflected>(
    format: Format,
    value: Option<&T>,
    options: &CodecOptions,
) -> Result<Option<Payload>> {
    trace!(?format, "encoding payload");
    match format {
        Format::Binary => Ok(binary::to_bytes(value)?.map(Payload::Bytes)),
        Format::Xml => Ok(xml::to_string_with(
            value,
            xml::XmlWriteOptions {
                indent: options.indent,
                encoding: options.encoding,
            },
        )?
        .map(Payload::Text)),
        Format::JsonStrict => {
            Ok(json::strict::to_string_with(value, options.encoding)?.map(Payload::Text))
        }
        Format::JsonFlex => Ok(json::flex::to_string_with(
            value,
            json::flex::FlexOptions {
                ignore_nulls: options.ignore_nulls,
            },
        )?
        .map(Payload::Text)),
    }
}

/// Decodes a record from the selected format. `None` decodes to `None`; a
/// payload kind that does not fit the format fails with
/// [`Error::InvalidArgument`].
pub fn decode<T: Reflected + Default>(
    format: Format,
    payload: Option<&Payload>,
    options: &CodecOptions,
) -> Result<Option<T>> {
    trace!(?format, "decoding payload");
    let payload = match payload {
        Some(payload) => payload,
        None => return Ok(None),
    };
    match (format, payload) {
        (Format::Binary, Payload::Bytes(bytes)) => binary::from_bytes(Some(bytes)),
        (Format::Xml, Payload::Text(text)) => xml::from_str_with(Some(text), options.encoding),
        (Format::JsonStrict, Payload::Text(text)) => {
            json::strict::from_str_with(Some(text), options.encoding)
        }
        (Format::JsonFlex, Payload::Text(text)) => json::flex::from_str(Some(text)),
        (format, payload) => Err(Error::InvalidArgument(format!(
            "`{format:?}` format cannot decode a {} payload",
            payload.kind_label()
        ))),
    }
}
