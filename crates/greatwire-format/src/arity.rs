//! Argument and byte accounting for formats.
//!
//! Argument counts are a static property of a format. Byte counts are not:
//! strings end wherever their NUL terminator is and wildcard fields take
//! whatever is left, so [`bytes_consumed`] must be given the actual payload
//! and its result is only valid for that payload. Never compute it once and
//! reuse it for a differently-shaped response.

use std::fmt;

use crate::error::{FormatError, Result};
use crate::format::{Field, Format, Primitive, Repeat};

/// Number of logical arguments a field or format takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exact(usize),
    /// A wildcard: at least this many, plus any number more.
    AtLeast(usize),
}

impl Arity {
    /// How many of `available` arguments this arity claims.
    pub fn claim(self, available: usize) -> usize {
        match self {
            Arity::Exact(n) => n,
            Arity::AtLeast(_) => available,
        }
    }

    pub fn accepts(self, count: usize) -> bool {
        match self {
            Arity::Exact(n) => count == n,
            Arity::AtLeast(n) => count >= n,
        }
    }

    fn checked_plus(self, other: Arity) -> Option<Arity> {
        match (self, other) {
            (Arity::Exact(a), Arity::Exact(b)) => a.checked_add(b).map(Arity::Exact),
            (Arity::Exact(a), Arity::AtLeast(b))
            | (Arity::AtLeast(a), Arity::Exact(b))
            | (Arity::AtLeast(a), Arity::AtLeast(b)) => a.checked_add(b).map(Arity::AtLeast),
        }
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arity::Exact(n) => write!(f, "{n}"),
            Arity::AtLeast(n) => write!(f, "at least {n}"),
        }
    }
}

/// Logical arguments taken by one field.
///
/// Raw bytes and groups always take exactly one argument (a byte string, a
/// tuple, or a list of tuples) however many bytes they span.
pub fn field_arguments(field: &Field) -> Arity {
    match field {
        Field::Primitive {
            kind: Primitive::Pad,
            ..
        } => Arity::Exact(0),
        Field::Primitive { repeat, .. } | Field::CString { repeat } => match repeat {
            Repeat::Once => Arity::Exact(1),
            Repeat::Count(n) => Arity::Exact(*n),
            Repeat::Wildcard => Arity::AtLeast(0),
        },
        Field::RawBytes { .. } | Field::Group { .. } => Arity::Exact(1),
    }
}

/// Logical arguments taken by a sequence of fields.
///
/// Saturates at `usize::MAX`; [`Format::parse`] rejects formats whose
/// count would not fit.
pub fn fields_arguments(fields: &[Field]) -> Arity {
    checked_fields_arguments(fields).unwrap_or(Arity::AtLeast(usize::MAX))
}

pub(crate) fn checked_fields_arguments(fields: &[Field]) -> Option<Arity> {
    fields
        .iter()
        .map(field_arguments)
        .try_fold(Arity::Exact(0), Arity::checked_plus)
}

/// Logical arguments taken by a whole format.
pub fn argument_count(format: &Format) -> Arity {
    fields_arguments(format.fields())
}

/// Reported when a payload is too short for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Shortfall {
    pub needed: usize,
    pub available: usize,
}

impl Shortfall {
    fn offset(self, by: usize, available: usize) -> Self {
        Shortfall {
            needed: self.needed.saturating_add(by),
            available,
        }
    }
}

/// Bytes of `data` claimed by `field`, which starts at `data[0]`.
pub fn field_bytes(field: &Field, data: &[u8]) -> std::result::Result<usize, Shortfall> {
    let repeat = field.repeat();
    let Some(count) = repeat.count() else {
        return Ok(data.len());
    };

    let fixed = |needed: usize| {
        if needed <= data.len() {
            Ok(needed)
        } else {
            Err(Shortfall {
                needed,
                available: data.len(),
            })
        }
    };

    match field {
        Field::Primitive { kind, .. } => {
            fixed(kind.width().checked_mul(count).unwrap_or(usize::MAX))
        }
        Field::RawBytes { .. } => fixed(count),
        Field::CString { .. } => {
            let mut pos = 0;
            for _ in 0..count {
                match data[pos..].iter().position(|&b| b == 0) {
                    Some(nul) => pos += nul + 1,
                    None => {
                        return Err(Shortfall {
                            needed: data.len() + 1,
                            available: data.len(),
                        })
                    }
                }
            }
            Ok(pos)
        }
        Field::Group { fields, .. } => {
            let mut pos = 0;
            for _ in 0..count {
                let step =
                    fields_bytes(fields, &data[pos..]).map_err(|s| s.offset(pos, data.len()))?;
                if step == 0 {
                    // Every further entry is empty too.
                    break;
                }
                pos += step;
            }
            Ok(pos)
        }
    }
}

/// Bytes of `data` claimed by a sequence of fields.
pub fn fields_bytes(fields: &[Field], data: &[u8]) -> std::result::Result<usize, Shortfall> {
    let mut pos = 0;
    for field in fields {
        pos += field_bytes(field, &data[pos..]).map_err(|s| s.offset(pos, data.len()))?;
    }
    Ok(pos)
}

/// Bytes of `data` the format would consume when decoding it.
///
/// Depends on the contents of `data`, not only on its length.
pub fn bytes_consumed(format: &Format, data: &[u8]) -> Result<usize> {
    let mut pos = 0;
    for (index, field) in format.fields().iter().enumerate() {
        pos += field_bytes(field, &data[pos..]).map_err(|s| FormatError::PayloadTruncated {
            format: format.source().to_string(),
            field: index,
            needed: s.needed,
            available: s.available,
        })?;
    }
    Ok(pos)
}
