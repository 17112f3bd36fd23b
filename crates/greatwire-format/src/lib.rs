//! Format strings and payload codec for libgreat commands.
//!
//! Every libgreat verb describes its arguments and results with a format
//! string: a superset of the familiar pack/unpack mini-language that adds
//! NUL-terminated strings (`S`), raw byte blobs (`X`), parenthesized groups
//! and a trailing `*` wildcard repeat. This crate parses those strings once
//! into a [`Format`] tree and converts between argument lists and payload
//! bytes:
//! - [`encode`] turns a list of [`Value`]s into a payload
//! - [`decode`] turns a payload back into values
//! - [`collapse`] shapes decoded values into a [`Reply`]
//!
//! No I/O happens here; framing and transport live in the crates above.

pub mod annotate;
pub mod arity;
pub mod cache;
pub mod codec;
pub mod collapse;
pub mod error;
pub mod format;
pub mod value;

pub use annotate::annotations;
pub use arity::{argument_count, bytes_consumed, Arity};
pub use cache::FormatCache;
pub use codec::{decode, encode};
pub use collapse::{collapse, collapses, Reply};
pub use error::{FormatError, Result};
pub use format::{ByteOrder, Field, Format, Primitive, Repeat};
pub use value::Value;
