//! Small helpers shared across codecs.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::ValueTypeError;
use crate::schema::WireValue;
use crate::value::Value;

/// Owned byte buffer usable as a record member.
///
/// `Display` and `TryFrom<&str>` speak hex for human-facing output. As a
/// member the blob travels as [`Value::Bytes`], which the textual codecs
/// render as base64.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Blob(Vec<u8>);

impl Blob {
    pub fn new(bytes: Vec<u8>) -> Self {
        Blob(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.0)
    }

    pub fn from_base64(text: &str) -> core::result::Result<Self, base64::DecodeError> {
        BASE64.decode(text.trim()).map(Blob)
    }
}

impl fmt::Display for Blob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(&self.0))
    }
}

impl TryFrom<&str> for Blob {
    type Error = hex::FromHexError;

    fn try_from(value: &str) -> core::result::Result<Self, Self::Error> {
        hex::decode(value.trim()).map(Blob)
    }
}

impl From<Vec<u8>> for Blob {
    fn from(bytes: Vec<u8>) -> Self {
        Blob(bytes)
    }
}

impl AsRef<[u8]> for Blob {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl WireValue for Blob {
    fn kind() -> &'static str {
        "bytes"
    }

    fn into_value(self) -> Value {
        Value::Bytes(self.0)
    }

    fn from_value(value: Value) -> core::result::Result<Self, ValueTypeError> {
        match value {
            Value::Bytes(bytes) => Ok(Blob(bytes)),
            Value::Str(text) => BASE64
                .decode(text.trim())
                .map(Blob)
                .map_err(|_| ValueTypeError::new("bytes", "unparsable base64 string")),
            other => Err(ValueTypeError::new("bytes", other.kind_label())),
        }
    }
}

/// Joins `Display` items with a separator.
pub fn join<I>(items: I, separator: &str) -> String
where
    I: IntoIterator,
    I::Item: fmt::Display,
{
    let mut out = String::new();
    for (i, item) in items.into_iter().enumerate() {
        if i > 0 {
            out.push_str(separator);
        }
        out.push_str(&item.to_string());
    }
    out
}
