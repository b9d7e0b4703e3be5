//! Member schemas for serializable record types.
//!
//! Rust has no runtime member enumeration, so record types describe
//! themselves: a type implements [`Reflected`] by assembling a [`Schema`]
//! that lists its members in declaration order, each with typed read and
//! write accessors. Every codec drives its work through that schema,
//! lowering a record into a [`Value`] tree on encode and rebuilding it
//! member by member on decode.
//!
//! Schemas are rebuilt fresh on every call and never cached; the only
//! shared state in the crate is the [`crate::registry`] side-table that
//! marks types as eligible for the binary format and backs decoding by
//! type name.
//!
//! Member annotations are attached in the builder: [`SchemaBuilder::skip`]
//! excludes the preceding member from permissive JSON output and
//! [`SchemaBuilder::rename`] substitutes its wire name there. No other
//! codec and no decode path consults annotations.

use crate::error::{Error, Result, ValueTypeError};
use crate::value::Value;
use crate::xml;

/// How decode matches input keys against member names.
///
/// `CaseInsensitive` folds ASCII case only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchMode {
    Exact,
    CaseInsensitive,
}

/// A record type that can describe its members.
///
/// Implementations build the schema from scratch on every call, so the
/// description always reflects the current code and nothing needs to be
/// invalidated.
pub trait Reflected: Sized + 'static {
    fn schema() -> Schema<Self>;
}

/// Conversion between a member type and the dynamic [`Value`] model.
///
/// `from_value` accepts the canonical variant first and falls back to
/// parsing from `Value::Str`, which is how text-only carriers such as XML
/// deliver scalars. Numeric conversions range-check on the way in.
pub trait WireValue: Sized {
    /// Diagnostic label for the member type.
    fn kind() -> &'static str;
    fn into_value(self) -> Value;
    fn from_value(value: Value) -> core::result::Result<Self, ValueTypeError>;
}

impl WireValue for bool {
    fn kind() -> &'static str {
        "bool"
    }

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> core::result::Result<Self, ValueTypeError> {
        match value {
            Value::Bool(b) => Ok(b),
            Value::Str(s) => match s.trim() {
                "true" | "1" => Ok(true),
                "false" | "0" => Ok(false),
                _ => Err(ValueTypeError::new("bool", "unparsable string")),
            },
            other => Err(ValueTypeError::new("bool", other.kind_label())),
        }
    }
}

macro_rules! impl_wire_signed {
    ($($int:ty => $label:expr),* $(,)?) => {
        $(
        impl WireValue for $int {
            fn kind() -> &'static str {
                $label
            }

            fn into_value(self) -> Value {
                Value::Int(self as i64)
            }

            fn from_value(value: Value) -> core::result::Result<Self, ValueTypeError> {
                match value {
                    Value::Int(i) => <$int>::try_from(i)
                        .map_err(|_| ValueTypeError::new($label, "integer out of range")),
                    Value::UInt(u) => <$int>::try_from(u)
                        .map_err(|_| ValueTypeError::new($label, "integer out of range")),
                    Value::Str(s) => s
                        .trim()
                        .parse::<$int>()
                        .map_err(|_| ValueTypeError::new($label, "unparsable string")),
                    other => Err(ValueTypeError::new($label, other.kind_label())),
                }
            }
        }
        )*
    };
}

macro_rules! impl_wire_unsigned {
    ($($int:ty => $label:expr),* $(,)?) => {
        $(
        impl WireValue for $int {
            fn kind() -> &'static str {
                $label
            }

            fn into_value(self) -> Value {
                Value::UInt(self as u64)
            }

            fn from_value(value: Value) -> core::result::Result<Self, ValueTypeError> {
                match value {
                    Value::UInt(u) => <$int>::try_from(u)
                        .map_err(|_| ValueTypeError::new($label, "integer out of range")),
                    Value::Int(i) => <$int>::try_from(i)
                        .map_err(|_| ValueTypeError::new($label, "integer out of range")),
                    Value::Str(s) => s
                        .trim()
                        .parse::<$int>()
                        .map_err(|_| ValueTypeError::new($label, "unparsable string")),
                    other => Err(ValueTypeError::new($label, other.kind_label())),
                }
            }
        }
        )*
    };
}

impl_wire_signed! {
    i8 => "i8",
    i16 => "i16",
    i32 => "i32",
    i64 => "i64",
}

impl_wire_unsigned! {
    u8 => "u8",
    u16 => "u16",
    u32 => "u32",
    u64 => "u64",
}

impl WireValue for f64 {
    fn kind() -> &'static str {
        "f64"
    }

    fn into_value(self) -> Value {
        Value::Float(self)
    }

    fn from_value(value: Value) -> core::result::Result<Self, ValueTypeError> {
        match value {
            Value::Float(f) => Ok(f),
            Value::Int(i) => Ok(i as f64),
            Value::UInt(u) => Ok(u as f64),
            Value::Str(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| ValueTypeError::new("f64", "unparsable string")),
            other => Err(ValueTypeError::new("f64", other.kind_label())),
        }
    }
}

impl WireValue for f32 {
    fn kind() -> &'static str {
        "f32"
    }

    fn into_value(self) -> Value {
        Value::Float(self as f64)
    }

    fn from_value(value: Value) -> core::result::Result<Self, ValueTypeError> {
        f64::from_value(value)
            .map_err(|e| ValueTypeError::new("f32", e.found))
            .map(|f| f as f32)
    }
}

impl WireValue for String {
    fn kind() -> &'static str {
        "string"
    }

    fn into_value(self) -> Value {
        Value::Str(self)
    }

    fn from_value(value: Value) -> core::result::Result<Self, ValueTypeError> {
        match value {
            Value::Str(s) => Ok(s),
            other => Err(ValueTypeError::new("string", other.kind_label())),
        }
    }
}

impl<V: WireValue> WireValue for Option<V> {
    fn kind() -> &'static str {
        V::kind()
    }

    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: Value) -> core::result::Result<Self, ValueTypeError> {
        match value {
            Value::Null => Ok(None),
            other => V::from_value(other).map(Some),
        }
    }
}

impl<V: WireValue> WireValue for Vec<V> {
    fn kind() -> &'static str {
        "sequence"
    }

    fn into_value(self) -> Value {
        Value::Seq(self.into_iter().map(WireValue::into_value).collect())
    }

    fn from_value(value: Value) -> core::result::Result<Self, ValueTypeError> {
        // XML delivers sequences as a wrapper element whose children are
        // kind-named item elements. Only that shape of mapping is accepted;
        // a keyed object is not a sequence.
        let items = match value {
            Value::Seq(items) => items,
            Value::Map(entries)
                if !entries.is_empty()
                    && entries
                        .iter()
                        .all(|(name, _)| xml::is_item_element_name(name)) =>
            {
                entries.into_iter().map(|(_, item)| item).collect()
            }
            other => return Err(ValueTypeError::new("sequence", other.kind_label())),
        };
        items.into_iter().map(V::from_value).collect()
    }
}

type GetFn<T> = Box<dyn Fn(&T) -> Value + Send + Sync>;
type GetAnnotatedFn<T> = Box<dyn Fn(&T, bool) -> Value + Send + Sync>;
type SetFn<T> = Box<dyn Fn(&mut T, Value, MatchMode) -> Result<()> + Send + Sync>;

/// One described member: declared name, annotations and accessors.
pub struct Field<T: 'static> {
    name: &'static str,
    wire_name: Option<&'static str>,
    skip: bool,
    get: GetFn<T>,
    get_annotated: GetAnnotatedFn<T>,
    set: SetFn<T>,
}

impl<T: 'static> Field<T> {
    /// The declared member name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The name the permissive JSON encoder writes: the rename if one was
    /// attached, the declared name otherwise.
    pub fn wire_name(&self) -> &'static str {
        self.wire_name.unwrap_or(self.name)
    }

    pub fn is_skipped(&self) -> bool {
        self.skip
    }
}

/// Ordered member description of a record type.
pub struct Schema<T: 'static> {
    type_name: &'static str,
    fields: Vec<Field<T>>,
}

impl<T: 'static> Schema<T> {
    pub fn builder(type_name: &'static str) -> SchemaBuilder<T> {
        if type_name.trim().is_empty() {
            panic!("record type name must not be blank");
        }
        SchemaBuilder {
            type_name,
            fields: Vec::new(),
        }
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Member descriptors in declaration order.
    pub fn fields(&self) -> &[Field<T>] {
        &self.fields
    }

    /// Lowers a record into a [`Value::Record`] with every member under its
    /// declared name, annotations ignored. This is the capture the binary,
    /// XML and strict JSON codecs work from.
    pub fn to_value(&self, value: &T) -> Value {
        Value::Record {
            name: self.type_name.to_string(),
            fields: self
                .fields
                .iter()
                .map(|field| (field.name.to_string(), (field.get)(value)))
                .collect(),
        }
    }

    /// Lowers a record applying the annotations: skipped members are left
    /// out, renamed members appear under their wire name, and null members
    /// are dropped when `ignore_nulls` is set. Nested records are lowered
    /// the same way all the way down.
    pub fn to_value_annotated(&self, value: &T, ignore_nulls: bool) -> Value {
        let mut fields = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            if field.skip {
                continue;
            }
            let lowered = (field.get_annotated)(value, ignore_nulls);
            if ignore_nulls && lowered.is_null() {
                continue;
            }
            fields.push((field.wire_name().to_string(), lowered));
        }
        Value::Record {
            name: self.type_name.to_string(),
            fields,
        }
    }

    /// Rebuilds a record from a `Map` or `Record` value.
    ///
    /// Input entries that match no member are ignored; members with no
    /// matching entry, and members whose entry is null, keep the value from
    /// `T::default()`. A matched entry that cannot be converted to the
    /// member type fails with [`Error::MalformedInput`] naming the member.
    pub fn from_value(&self, source: Value, mode: MatchMode) -> Result<T>
    where
        T: Default,
    {
        let entries = match source {
            Value::Map(entries) => entries,
            Value::Record { fields, .. } => fields,
            other => {
                return Err(Error::MalformedInput(format!(
                    "expected record structure, found {}",
                    other.kind_label()
                )))
            }
        };
        let mut out = T::default();
        for (key, value) in entries {
            if value.is_null() {
                continue;
            }
            let field = self.fields.iter().find(|field| match mode {
                MatchMode::Exact => field.name == key,
                MatchMode::CaseInsensitive => field.name.eq_ignore_ascii_case(&key),
            });
            if let Some(field) = field {
                (field.set)(&mut out, value, mode).map_err(|e| e.for_member(field.name))?;
            }
        }
        Ok(out)
    }
}

/// Assembles a [`Schema`] member by member.
///
/// `rename` and `skip` annotate the most recently declared member. Blank
/// names panic, since a schema is assembled once per call site and a blank
/// name is a programming error, not input.
pub struct SchemaBuilder<T: 'static> {
    type_name: &'static str,
    fields: Vec<Field<T>>,
}

impl<T: 'static> SchemaBuilder<T> {
    /// Declares a scalar or collection member backed by a [`WireValue`]
    /// type.
    pub fn field<V: WireValue + 'static>(
        self,
        name: &'static str,
        get: fn(&T) -> V,
        set: fn(&mut T, V),
    ) -> Self {
        self.push_field(
            name,
            Box::new(move |value| get(value).into_value()),
            Box::new(move |value, _| get(value).into_value()),
            Box::new(move |target, value, _| {
                let parsed = V::from_value(value).map_err(Error::from)?;
                set(target, parsed);
                Ok(())
            }),
        )
    }

    /// Declares a member that is itself a described record.
    pub fn nested<U: Reflected + Default>(
        self,
        name: &'static str,
        get: fn(&T) -> U,
        set: fn(&mut T, U),
    ) -> Self {
        self.push_field(
            name,
            Box::new(move |value| U::schema().to_value(&get(value))),
            Box::new(move |value, ignore_nulls| {
                U::schema().to_value_annotated(&get(value), ignore_nulls)
            }),
            Box::new(move |target, value, mode| {
                let parsed = record_from_value::<U>(value, mode)?;
                set(target, parsed);
                Ok(())
            }),
        )
    }

    /// Declares an optional described-record member. `None` lowers to null.
    pub fn nested_opt<U: Reflected + Default>(
        self,
        name: &'static str,
        get: fn(&T) -> Option<U>,
        set: fn(&mut T, Option<U>),
    ) -> Self {
        self.push_field(
            name,
            Box::new(move |value| match get(value) {
                Some(inner) => U::schema().to_value(&inner),
                None => Value::Null,
            }),
            Box::new(move |value, ignore_nulls| match get(value) {
                Some(inner) => U::schema().to_value_annotated(&inner, ignore_nulls),
                None => Value::Null,
            }),
            Box::new(move |target, value, mode| {
                let parsed = match value {
                    Value::Null => None,
                    other => Some(record_from_value::<U>(other, mode)?),
                };
                set(target, parsed);
                Ok(())
            }),
        )
    }

    /// Declares a sequence-of-records member.
    pub fn nested_seq<U: Reflected + Default>(
        self,
        name: &'static str,
        get: fn(&T) -> Vec<U>,
        set: fn(&mut T, Vec<U>),
    ) -> Self {
        self.push_field(
            name,
            Box::new(move |value| {
                Value::Seq(
                    get(value)
                        .iter()
                        .map(|item| U::schema().to_value(item))
                        .collect(),
                )
            }),
            Box::new(move |value, ignore_nulls| {
                Value::Seq(
                    get(value)
                        .iter()
                        .map(|item| U::schema().to_value_annotated(item, ignore_nulls))
                        .collect(),
                )
            }),
            Box::new(move |target, value, mode| {
                // A wrapper mapping carries one type-named element per item.
                let item_name = U::schema().type_name();
                let items = match value {
                    Value::Seq(items) => items,
                    Value::Map(entries)
                        if !entries.is_empty()
                            && entries.iter().all(|(name, _)| name.as_str() == item_name) =>
                    {
                        entries.into_iter().map(|(_, item)| item).collect()
                    }
                    other => {
                        return Err(Error::MalformedInput(format!(
                            "expected sequence, found {}",
                            other.kind_label()
                        )))
                    }
                };
                let mut parsed = Vec::with_capacity(items.len());
                for item in items {
                    parsed.push(record_from_value::<U>(item, mode)?);
                }
                set(target, parsed);
                Ok(())
            }),
        )
    }

    /// Substitutes the wire name of the most recently declared member for
    /// permissive JSON output.
    ///
    /// # Panics
    ///
    /// Panics when called before any member declaration or with a blank
    /// name.
    pub fn rename(mut self, wire_name: &'static str) -> Self {
        let field = match self.fields.last_mut() {
            Some(field) => field,
            None => panic!("rename() must follow a member declaration"),
        };
        if wire_name.trim().is_empty() {
            panic!("wire name for member `{}` must not be blank", field.name);
        }
        field.wire_name = Some(wire_name);
        self
    }

    /// Excludes the most recently declared member from permissive JSON
    /// output.
    ///
    /// # Panics
    ///
    /// Panics when called before any member declaration.
    pub fn skip(mut self) -> Self {
        match self.fields.last_mut() {
            Some(field) => field.skip = true,
            None => panic!("skip() must follow a member declaration"),
        }
        self
    }

    pub fn build(self) -> Schema<T> {
        Schema {
            type_name: self.type_name,
            fields: self.fields,
        }
    }

    fn push_field(
        mut self,
        name: &'static str,
        get: GetFn<T>,
        get_annotated: GetAnnotatedFn<T>,
        set: SetFn<T>,
    ) -> Self {
        if name.trim().is_empty() {
            panic!("member name must not be blank");
        }
        self.fields.push(Field {
            name,
            wire_name: None,
            skip: false,
            get,
            get_annotated,
            set,
        });
        self
    }
}

/// Rebuilds a nested record, verifying the embedded type name when the
/// source is a named record (the binary path embeds names; parsed JSON and
/// XML deliver plain mappings).
fn record_from_value<U: Reflected + Default>(value: Value, mode: MatchMode) -> Result<U> {
    let schema = U::schema();
    if let Value::Record { name, .. } = &value {
        if name != schema.type_name() {
            return Err(Error::TypeMismatch {
                expected: schema.type_name().to_string(),
                found: name.clone(),
            });
        }
    }
    schema.from_value(value, mode)
}
