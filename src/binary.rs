//! Self-describing binary codec.
//!
//! The wire form is a 3-byte header (2 magic bytes plus a format version)
//! followed by one tagged value. Each value starts with a 1-byte tag;
//! integers and floats travel as fixed-width little-endian payloads,
//! strings and byte buffers as a `u32` little-endian length prefix plus
//! contents, sequences and mappings as a `u32` element count plus their
//! elements. A record embeds its type name before its members, which is
//! what makes the buffer self-describing: decode can verify that the
//! embedded type matches the requested one before rebuilding anything.
//!
//! Records are gated by [`crate::registry`]: every record type name in the
//! graph, the root included, must be registered or encoding fails with
//! [`Error::NotSerializable`]. Primitive values, byte buffers and
//! sequences of them need no marker and can go through
//! [`to_bytes_value`] / [`from_bytes_value`] directly.

use crate::error::{Error, Result};
use crate::registry;
use crate::schema::{MatchMode, Reflected};
use crate::value::Value;

const MAGIC: [u8; 2] = [0xC0, 0xDC];
const FORMAT_VERSION: u8 = 1;

const TAG_NULL: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_UINT: u8 = 0x03;
const TAG_FLOAT: u8 = 0x04;
const TAG_STR: u8 = 0x05;
const TAG_BYTES: u8 = 0x06;
const TAG_SEQ: u8 = 0x07;
const TAG_MAP: u8 = 0x08;
const TAG_RECORD: u8 = 0x09;

const MAX_DEPTH: usize = 128;

/// Encodes a record. `None` encodes to `None`.
pub fn to_bytes<T: Reflected>(value: Option<&T>) -> Result<Option<Vec<u8>>> {
    let value = match value {
        Some(value) => value,
        None => return Ok(None),
    };
    let lowered = T::schema().to_value(value);
    Ok(Some(encode_value(&lowered)?))
}

/// Decodes a record, verifying the embedded type name. `None` and empty
/// buffers decode to `None`.
pub fn from_bytes<T: Reflected + Default>(bytes: Option<&[u8]>) -> Result<Option<T>> {
    let bytes = match bytes {
        Some(bytes) => bytes,
        None => return Ok(None),
    };
    if bytes.is_empty() {
        return Ok(None);
    }
    let schema = T::schema();
    if !registry::is_registered(schema.type_name()) {
        return Err(Error::NotSerializable(schema.type_name().to_string()));
    }
    let value = decode_value(bytes)?;
    match value {
        Value::Record { ref name, .. } => {
            if name != schema.type_name() {
                return Err(Error::TypeMismatch {
                    expected: schema.type_name().to_string(),
                    found: name.clone(),
                });
            }
            Ok(Some(schema.from_value(value, MatchMode::Exact)?))
        }
        other => Err(Error::TypeMismatch {
            expected: schema.type_name().to_string(),
            found: other.kind_label().to_string(),
        }),
    }
}

/// Encodes a bare value. Record graphs still require registration;
/// everything else is always eligible.
pub fn to_bytes_value(value: &Value) -> Result<Vec<u8>> {
    encode_value(value)
}

/// Decodes a bare value.
pub fn from_bytes_value(bytes: &[u8]) -> Result<Value> {
    decode_value(bytes)
}

fn encode_value(value: &Value) -> Result<Vec<u8>> {
    ensure_registered(value)?;
    let mut out = Vec::with_capacity(64);
    out.extend_from_slice(&MAGIC);
    out.push(FORMAT_VERSION);
    write_value(&mut out, value)?;
    Ok(out)
}

fn decode_value(bytes: &[u8]) -> Result<Value> {
    let mut reader = ByteReader::new(bytes);
    if reader.take(MAGIC.len())? != &MAGIC[..] {
        return Err(Error::MalformedInput("bad magic bytes".to_string()));
    }
    let version = reader.read_u8()?;
    if version != FORMAT_VERSION {
        return Err(Error::MalformedInput(format!(
            "unsupported format version `{version}`"
        )));
    }
    let value = reader.read_value(0)?;
    if reader.remaining() > 0 {
        return Err(Error::MalformedInput(format!(
            "{} trailing bytes after value",
            reader.remaining()
        )));
    }
    Ok(value)
}

fn ensure_registered(value: &Value) -> Result<()> {
    match value {
        Value::Record { name, fields } => {
            if !registry::is_registered(name) {
                return Err(Error::NotSerializable(name.clone()));
            }
            fields
                .iter()
                .try_for_each(|(_, field)| ensure_registered(field))
        }
        Value::Seq(items) => items.iter().try_for_each(ensure_registered),
        Value::Map(entries) => entries
            .iter()
            .try_for_each(|(_, entry)| ensure_registered(entry)),
        _ => Ok(()),
    }
}

fn write_value(out: &mut Vec<u8>, value: &Value) -> Result<()> {
    match value {
        Value::Null => out.push(TAG_NULL),
        Value::Bool(b) => {
            out.push(TAG_BOOL);
            out.push(u8::from(*b));
        }
        Value::Int(i) => {
            out.push(TAG_INT);
            out.extend_from_slice(&i.to_le_bytes());
        }
        Value::UInt(u) => {
            out.push(TAG_UINT);
            out.extend_from_slice(&u.to_le_bytes());
        }
        Value::Float(f) => {
            out.push(TAG_FLOAT);
            out.extend_from_slice(&f.to_le_bytes());
        }
        Value::Str(s) => {
            out.push(TAG_STR);
            write_chunk(out, s.as_bytes())?;
        }
        Value::Bytes(b) => {
            out.push(TAG_BYTES);
            write_chunk(out, b)?;
        }
        Value::Seq(items) => {
            out.push(TAG_SEQ);
            write_count(out, items.len())?;
            for item in items {
                write_value(out, item)?;
            }
        }
        Value::Map(entries) => {
            out.push(TAG_MAP);
            write_count(out, entries.len())?;
            for (key, entry) in entries {
                write_chunk(out, key.as_bytes())?;
                write_value(out, entry)?;
            }
        }
        Value::Record { name, fields } => {
            out.push(TAG_RECORD);
            write_chunk(out, name.as_bytes())?;
            write_count(out, fields.len())?;
            for (key, field) in fields {
                write_chunk(out, key.as_bytes())?;
                write_value(out, field)?;
            }
        }
    }
    Ok(())
}

fn write_chunk(out: &mut Vec<u8>, bytes: &[u8]) -> Result<()> {
    write_count(out, bytes.len())?;
    out.extend_from_slice(bytes);
    Ok(())
}

fn write_count(out: &mut Vec<u8>, count: usize) -> Result<()> {
    let count = u32::try_from(count)
        .map_err(|_| Error::InvalidArgument("value exceeds the 4 GiB chunk limit".to_string()))?;
    out.extend_from_slice(&count.to_le_bytes());
    Ok(())
}

struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        ByteReader { data, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(Error::MalformedInput(
                "unexpected end of buffer".to_string(),
            ));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.take(4)?;
        let mut buf = [0u8; 4];
        buf.copy_from_slice(bytes);
        Ok(u32::from_le_bytes(buf))
    }

    fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.take(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(buf))
    }

    fn read_chunk(&mut self) -> Result<&'a [u8]> {
        let len = self.read_u32()? as usize;
        self.take(len)
    }

    fn read_str(&mut self) -> Result<String> {
        let bytes = self.read_chunk()?;
        match std::str::from_utf8(bytes) {
            Ok(s) => Ok(s.to_string()),
            Err(_) => Err(Error::MalformedInput(
                "invalid utf-8 in string".to_string(),
            )),
        }
    }

    fn read_value(&mut self, depth: usize) -> Result<Value> {
        if depth > MAX_DEPTH {
            return Err(Error::MalformedInput("value nesting too deep".to_string()));
        }
        let tag = self.read_u8()?;
        match tag {
            TAG_NULL => Ok(Value::Null),
            TAG_BOOL => match self.read_u8()? {
                0 => Ok(Value::Bool(false)),
                1 => Ok(Value::Bool(true)),
                other => Err(Error::MalformedInput(format!(
                    "invalid boolean byte `0x{other:02x}`"
                ))),
            },
            TAG_INT => Ok(Value::Int(self.read_u64()? as i64)),
            TAG_UINT => Ok(Value::UInt(self.read_u64()?)),
            TAG_FLOAT => Ok(Value::Float(f64::from_bits(self.read_u64()?))),
            TAG_STR => Ok(Value::Str(self.read_str()?)),
            TAG_BYTES => Ok(Value::Bytes(self.read_chunk()?.to_vec())),
            TAG_SEQ => {
                let count = self.read_u32()?;
                let mut items = Vec::new();
                for _ in 0..count {
                    items.push(self.read_value(depth + 1)?);
                }
                Ok(Value::Seq(items))
            }
            TAG_MAP => {
                let count = self.read_u32()?;
                let mut entries = Vec::new();
                for _ in 0..count {
                    let key = self.read_str()?;
                    let entry = self.read_value(depth + 1)?;
                    entries.push((key, entry));
                }
                Ok(Value::Map(entries))
            }
            TAG_RECORD => {
                let name = self.read_str()?;
                let count = self.read_u32()?;
                let mut fields = Vec::new();
                for _ in 0..count {
                    let key = self.read_str()?;
                    let field = self.read_value(depth + 1)?;
                    fields.push((key, field));
                }
                Ok(Value::Record { name, fields })
            }
            other => Err(Error::MalformedInput(format!(
                "unknown value tag `0x{other:02x}`"
            ))),
        }
    }
}
