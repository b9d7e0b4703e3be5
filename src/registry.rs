//! Global side-table of serializable record types.
//!
//! Registration is the opt-in marker for the binary format: encoding a
//! record graph fails with [`Error::NotSerializable`] as soon as it reaches
//! a record whose type name is absent here. Registration also stores an
//! erased constructor per type name, which is what lets callers decode by
//! runtime name (`from_str_as`) without naming a Rust type.
//!
//! The table is written once per type and read-locked by the codecs after
//! that. Registering the same type twice is a no-op; claiming an already
//! registered name with a different type is rejected.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use once_cell::sync::Lazy;
use tracing::debug;

use crate::error::{Error, Result};
use crate::schema::{MatchMode, Reflected};
use crate::value::Value;

struct Entry {
    type_id: TypeId,
    build: fn(Value, MatchMode) -> Result<Box<dyn Any>>,
}

static REGISTRY: Lazy<RwLock<HashMap<String, Entry>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

fn build_erased<T: Reflected + Default>(value: Value, mode: MatchMode) -> Result<Box<dyn Any>> {
    let decoded = T::schema().from_value(value, mode)?;
    Ok(Box::new(decoded))
}

/// Marks `T` as serializable under its schema type name.
pub fn register<T: Reflected + Default>() -> Result<()> {
    let schema = T::schema();
    let name = schema.type_name();
    let mut table = REGISTRY.write().unwrap_or_else(PoisonError::into_inner);
    match table.get(name) {
        Some(entry) if entry.type_id == TypeId::of::<T>() => Ok(()),
        Some(_) => Err(Error::InvalidArgument(format!(
            "type name `{name}` is already registered to a different type"
        ))),
        None => {
            table.insert(
                name.to_string(),
                Entry {
                    type_id: TypeId::of::<T>(),
                    build: build_erased::<T>,
                },
            );
            debug!(type_name = name, "registered payload type");
            Ok(())
        }
    }
}

pub fn is_registered(name: &str) -> bool {
    REGISTRY
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .contains_key(name)
}

/// Runs the registered constructor for `name` against an already parsed
/// value. Fails with [`Error::InvalidArgument`] for an unknown name.
pub(crate) fn decode_erased(name: &str, value: Value, mode: MatchMode) -> Result<Box<dyn Any>> {
    let build = {
        let table = REGISTRY.read().unwrap_or_else(PoisonError::into_inner);
        match table.get(name) {
            Some(entry) => entry.build,
            None => {
                return Err(Error::InvalidArgument(format!(
                    "unknown type name `{name}`"
                )))
            }
        }
    };
    build(value, mode)
}
