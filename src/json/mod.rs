//! JSON codecs.
//!
//! Two deliberately different dialects share the JSON syntax layer:
//!
//! - [`strict`] writes members in declaration order under their exact
//!   declared names, always drops null members, never applies annotations
//!   and matches case-sensitively on decode. Its entry points accept an
//!   [`crate::Encoding`] and bounce the text through bytes of it, so a
//!   lossy encoding leaves the same substitutions a byte transport would.
//! - [`flex`] applies the skip/rename annotations on encode, makes null
//!   omission configurable, matches member names case-insensitively on
//!   decode and offers dynamic decoding into a [`crate::Value`] tree.
//!
//! Both parse through `serde_json` and report any syntax error as
//! [`crate::Error::MalformedInput`].

pub mod flex;
pub mod strict;

use crate::error::Result;
use crate::value::Value;

pub(crate) fn parse_text(source: &str) -> Result<Value> {
    Ok(serde_json::from_str(source)?)
}
