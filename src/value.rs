//! Dynamic value model shared by every codec.
//!
//! [`Value`] is the interchange form between typed records and the wire: the
//! schema layer lowers a record into a [`Value`] tree, each codec renders that
//! tree into its own syntax, and decoding runs the same path in reverse. Maps
//! and records keep their entries in insertion order, which is what lets the
//! JSON codecs emit members in declaration order without any post-sorting.
//!
//! [`Value`] also doubles as the result of dynamic JSON decoding, where the
//! caller has no target type and inspects the tree through the `as_*`
//! accessors instead.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::de::{Deserializer, MapAccess, SeqAccess, Visitor};
use serde::ser::{SerializeMap, SerializeSeq, Serializer};
use serde::{Deserialize, Serialize};

#[cfg(test)]
use quickcheck::{Arbitrary, Gen};

/// A self-describing value.
///
/// `Int` holds every signed integer member and `UInt` every unsigned one;
/// narrower member types range-check on the way back out. `Record` is the
/// lowered form of a typed record and carries its type name so that the
/// binary codec can re-embed it.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    Seq(Vec<Value>),
    /// Ordered key/value entries. Duplicate keys are allowed and preserved.
    Map(Vec<(String, Value)>),
    /// A lowered record: its registered type name plus ordered members.
    Record {
        name: String,
        fields: Vec<(String, Value)>,
    },
}

impl Value {
    /// Short label for the variant, used in diagnostics.
    pub fn kind_label(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Bool(_) => "boolean",
            Value::Int(_) => "integer",
            Value::UInt(_) => "unsigned integer",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Bytes(_) => "bytes",
            Value::Seq(_) => "sequence",
            Value::Map(_) => "mapping",
            Value::Record { .. } => "record",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::UInt(u) => Some(*u),
            Value::Int(i) => u64::try_from(*i).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::UInt(u) => Some(*u as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn as_seq(&self) -> Option<&[Value]> {
        match self {
            Value::Seq(items) => Some(items),
            _ => None,
        }
    }

    /// Entries of a `Map` or `Record`, in insertion order.
    pub fn entries(&self) -> Option<&[(String, Value)]> {
        match self {
            Value::Map(entries) | Value::Record { fields: entries, .. } => Some(entries),
            _ => None,
        }
    }

    /// First entry under `key` in a `Map` or `Record`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Str(s) => write!(f, "{s}"),
            Value::Bytes(b) => write!(f, "{}", BASE64.encode(b)),
            other => write!(f, "<{}>", other.kind_label()),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Str(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Str(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<Vec<Value>> for Value {
    fn from(v: Vec<Value>) -> Self {
        Value::Seq(v)
    }
}

// JSON text is produced and consumed through serde_json, so `Value` maps onto
// the serde data model by hand: entry order flows straight through, and raw
// bytes travel as base64 text since JSON has no binary kind.
impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> core::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::UInt(u) => serializer.serialize_u64(*u),
            Value::Float(v) => serializer.serialize_f64(*v),
            Value::Str(s) => serializer.serialize_str(s),
            Value::Bytes(b) => serializer.serialize_str(&BASE64.encode(b)),
            Value::Seq(items) => {
                let mut seq = serializer.serialize_seq(Some(items.len()))?;
                for item in items {
                    seq.serialize_element(item)?;
                }
                seq.end()
            }
            Value::Map(entries) | Value::Record { fields: entries, .. } => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, value)?;
                }
                map.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> core::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct ValueVisitor;

        impl<'de> Visitor<'de> for ValueVisitor {
            type Value = Value;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "any self-describing value")
            }

            fn visit_bool<E>(self, v: bool) -> core::result::Result<Value, E> {
                Ok(Value::Bool(v))
            }

            fn visit_i64<E>(self, v: i64) -> core::result::Result<Value, E> {
                Ok(Value::Int(v))
            }

            fn visit_u64<E>(self, v: u64) -> core::result::Result<Value, E> {
                match i64::try_from(v) {
                    Ok(i) => Ok(Value::Int(i)),
                    Err(_) => Ok(Value::UInt(v)),
                }
            }

            fn visit_f64<E>(self, v: f64) -> core::result::Result<Value, E> {
                Ok(Value::Float(v))
            }

            fn visit_str<E>(self, v: &str) -> core::result::Result<Value, E> {
                Ok(Value::Str(v.to_string()))
            }

            fn visit_unit<E>(self) -> core::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_none<E>(self) -> core::result::Result<Value, E> {
                Ok(Value::Null)
            }

            fn visit_some<D>(self, deserializer: D) -> core::result::Result<Value, D::Error>
            where
                D: Deserializer<'de>,
            {
                Deserialize::deserialize(deserializer)
            }

            fn visit_seq<A>(self, mut seq: A) -> core::result::Result<Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut items = Vec::new();
                while let Some(item) = seq.next_element()? {
                    items.push(item);
                }
                Ok(Value::Seq(items))
            }

            fn visit_map<A>(self, mut map: A) -> core::result::Result<Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::new();
                while let Some((key, value)) = map.next_entry::<String, Value>()? {
                    entries.push((key, value));
                }
                Ok(Value::Map(entries))
            }
        }

        deserializer.deserialize_any(ValueVisitor)
    }
}

// Bounded generator over the always-eligible kinds; registered record
// graphs are exercised by the typed codec tests instead. Floats are kept
// finite so that round-trip comparisons stay meaningful.
#[cfg(test)]
impl Arbitrary for Value {
    fn arbitrary(g: &mut Gen) -> Self {
        arbitrary_value(g, 2)
    }
}

#[cfg(test)]
fn arbitrary_value(g: &mut Gen, depth: usize) -> Value {
    let choices = if depth == 0 { 7 } else { 9 };
    match u8::arbitrary(g) % choices {
        0 => Value::Null,
        1 => Value::Bool(bool::arbitrary(g)),
        2 => Value::Int(i64::arbitrary(g)),
        3 => Value::UInt(u64::arbitrary(g)),
        4 => {
            let f = f64::arbitrary(g);
            Value::Float(if f.is_finite() { f } else { 0.0 })
        }
        5 => Value::Str(String::arbitrary(g)),
        6 => Value::Bytes(Vec::<u8>::arbitrary(g)),
        7 => Value::Seq(
            (0..usize::arbitrary(g) % 4)
                .map(|_| arbitrary_value(g, depth - 1))
                .collect(),
        ),
        _ => Value::Map(
            (0..usize::arbitrary(g) % 4)
                .map(|_| (String::arbitrary(g), arbitrary_value(g, depth - 1)))
                .collect(),
        ),
    }
}
