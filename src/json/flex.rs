//! Permissive JSON codec: annotation-aware encode, case-insensitive
//! decode, configurable null omission and dynamic decoding.
//!
//! Encode consults the member annotations at every nesting level: skipped
//! members are left out and renamed members appear under their wire name.
//! Decode matches input keys against the declared member names with ASCII
//! case folding; wire renames are not consulted there, so a renamed member
//! only decodes from its declared name.

use std::any::Any;

use crate::error::{Error, Result};
use crate::registry;
use crate::schema::{MatchMode, Reflected};
use crate::value::Value;

/// Options for [`to_string_with`]. `ignore_nulls` defaults to true.
#[derive(Debug, Clone, Copy)]
pub struct FlexOptions {
    pub ignore_nulls: bool,
}

impl Default for FlexOptions {
    fn default() -> Self {
        FlexOptions { ignore_nulls: true }
    }
}

/// Serializes a record with annotations applied and null members omitted.
/// `None` serializes to `None`.
pub fn to_string<T: Reflected>(value: Option<&T>) -> Result<Option<String>> {
    to_string_with(value, FlexOptions::default())
}

pub fn to_string_with<T: Reflected>(
    value: Option<&T>,
    options: FlexOptions,
) -> Result<Option<String>> {
    let value = match value {
        Some(value) => value,
        None => return Ok(None),
    };
    let lowered = T::schema().to_value_annotated(value, options.ignore_nulls);
    Ok(Some(serde_json::to_string(&lowered)?))
}

/// Deserializes a record, matching member names case-insensitively.
/// `None`, blank input and the literal `null` decode to `None`.
pub fn from_str<T: Reflected + Default>(source: Option<&str>) -> Result<Option<T>> {
    let source = match source {
        Some(source) => source,
        None => return Ok(None),
    };
    if source.trim().is_empty() {
        return Ok(None);
    }
    let value = super::parse_text(source)?;
    if value.is_null() {
        return Ok(None);
    }
    Ok(Some(
        T::schema().from_value(value, MatchMode::CaseInsensitive)?,
    ))
}

/// Deserializes by runtime type name through the registry. Fails with
/// [`Error::InvalidArgument`] when the name was never registered.
pub fn from_str_as(type_name: &str, source: Option<&str>) -> Result<Option<Box<dyn Any>>> {
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
    let value = super::parse_text(source)?;
    if value.is_null() {
        return Ok(None);
    }
    registry::decode_erased(type_name, value, MatchMode::CaseInsensitive).map(Some)
}

/// Parses arbitrary JSON into the dynamic [`Value`] tree, leaves typed by
/// their source tokens. `None` and blank input parse to `None`; the literal
/// `null` parses to `Some(Value::Null)`.
pub fn parse(source: Option<&str>) -> Result<Option<Value>> {
    let source = match source {
        Some(source) => source,
        None => return Ok(None),
    };
    if source.trim().is_empty() {
        return Ok(None);
    }
    Ok(Some(super::parse_text(source)?))
}
