//! Strict JSON codec: declared names, declaration order, nulls always
//! omitted, case-sensitive decode.
//!
//! This dialect never consults member annotations; a skipped or renamed
//! member serializes exactly like any other. Null members are dropped from
//! records at every nesting level, while null sequence items are kept,
//! since dropping them would shift positions.

use crate::encoding::Encoding;
use crate::error::Result;
use crate::schema::{MatchMode, Reflected};
use crate::value::Value;

/// Serializes a record as UTF-8 JSON text. `None` serializes to `None`.
pub fn to_string<T: Reflected>(value: Option<&T>) -> Result<Option<String>> {
    to_string_with(value, Encoding::default())
}

/// Serializes a record, bouncing the text through bytes of `encoding`.
/// Observable only for lossy encodings, where out-of-range characters come
/// back substituted.
pub fn to_string_with<T: Reflected>(
    value: Option<&T>,
    encoding: Encoding,
) -> Result<Option<String>> {
    let value = match value {
        Some(value) => value,
        None => return Ok(None),
    };
    let lowered = drop_null_members(T::schema().to_value(value));
    let text = serde_json::to_string(&lowered)?;
    Ok(Some(encoding.decode(&encoding.encode(&text))))
}

/// Deserializes a record. `None`, blank input and the literal `null` decode
/// to `None`.
pub fn from_str<T: Reflected + Default>(source: Option<&str>) -> Result<Option<T>> {
    from_str_with(source, Encoding::default())
}

pub fn from_str_with<T: Reflected + Default>(
    source: Option<&str>,
    encoding: Encoding,
) -> Result<Option<T>> {
    let source = match source {
        Some(source) => source,
        None => return Ok(None),
    };
    if source.trim().is_empty() {
        return Ok(None);
    }
    let text = encoding.decode(&encoding.encode(source));
    let value = super::parse_text(&text)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(T::schema().from_value(value, MatchMode::Exact)?))
}

fn drop_null_members(value: Value) -> Value {
    match value {
        Value::Record { name, fields } => Value::Record {
            name,
            fields: prune_entries(fields),
        },
        Value::Map(entries) => Value::Map(prune_entries(entries)),
        Value::Seq(items) => Value::Seq(items.into_iter().map(drop_null_members).collect()),
        other => other,
    }
}

fn prune_entries(entries: Vec<(String, Value)>) -> Vec<(String, Value)> {
    entries
        .into_iter()
        .filter(|(_, entry)| !entry.is_null())
        .map(|(key, entry)| (key, drop_null_members(entry)))
        .collect()
}
