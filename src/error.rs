//! Error types shared by every codec in the crate.
//!
//! All fallible operations return [`crate::error::Result`], which wraps the
//! single [`Error`] enum. Each variant marks a distinct failure class so that
//! callers can branch on the cause rather than parse message strings:
//!
//! - [`Error::NotSerializable`]: a record type was passed to the binary codec
//!   without having been registered first.
//! - [`Error::TypeMismatch`]: a binary payload decoded cleanly but embeds a
//!   record of a different type than the caller requested.
//! - [`Error::MalformedInput`]: the input text or bytes could not be parsed,
//!   or a member value could not be converted to the declared member type.
//! - [`Error::InvalidArgument`]: a caller-supplied argument is unusable, for
//!   example an unknown type name or a payload kind that does not match the
//!   selected format.

use std::fmt;

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The named record type is not registered with [`crate::registry`].
    NotSerializable(String),
    /// A decoded record names a different type than the one requested.
    TypeMismatch { expected: String, found: String },
    /// The payload could not be parsed into the expected structure.
    MalformedInput(String),
    /// A caller-supplied argument is unusable for the requested operation.
    InvalidArgument(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotSerializable(name) => {
                write!(f, "type `{name}` is not registered as serializable")
            }
            Error::TypeMismatch { expected, found } => {
                write!(
                    f,
                    "embedded type `{found}` does not match requested type `{expected}`"
                )
            }
            Error::MalformedInput(detail) => write!(f, "malformed input: {detail}"),
            Error::InvalidArgument(detail) => write!(f, "invalid argument: {detail}"),
        }
    }
}

impl std::error::Error for Error {}

impl Error {
    /// Prefixes a member name onto a conversion failure so that errors raised
    /// deep inside a record point back at the offending member.
    pub(crate) fn for_member(self, member: &str) -> Self {
        match self {
            Error::MalformedInput(detail) => {
                Error::MalformedInput(format!("member `{member}`: {detail}"))
            }
            other => other,
        }
    }
}

impl From<ValueTypeError> for Error {
    fn from(e: ValueTypeError) -> Self {
        Error::MalformedInput(e.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::MalformedInput(e.to_string())
    }
}

impl From<quick_xml::Error> for Error {
    fn from(e: quick_xml::Error) -> Self {
        Error::MalformedInput(e.to_string())
    }
}

/// Failure to convert a [`crate::Value`] into a concrete member type.
///
/// Carries the kind the member declared and the kind actually found, both as
/// short labels suitable for diagnostics. Codecs fold this into
/// [`Error::MalformedInput`] through the `From` impl above.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValueTypeError {
    pub expected: &'static str,
    pub found: &'static str,
}

impl ValueTypeError {
    pub fn new(expected: &'static str, found: &'static str) -> Self {
        ValueTypeError { expected, found }
    }
}

impl fmt::Display for ValueTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected {}, found {}", self.expected, self.found)
    }
}

impl std::error::Error for ValueTypeError {}
