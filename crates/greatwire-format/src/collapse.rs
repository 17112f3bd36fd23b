use crate::format::{Format, Repeat};
use crate::value::Value;

/// Decoded response of a command, shaped for callers.
///
/// A format with exactly one non-repeated value field yields that value on
/// its own; anything else yields the full sequence.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Single(Value),
    Multiple(Vec<Value>),
}

impl Reply {
    /// The reply's values, in order.
    pub fn into_values(self) -> Vec<Value> {
        match self {
            Reply::Single(value) => vec![value],
            Reply::Multiple(values) => values,
        }
    }

    pub fn as_single(&self) -> Option<&Value> {
        match self {
            Reply::Single(value) => Some(value),
            Reply::Multiple(_) => None,
        }
    }

    pub fn into_single(self) -> Option<Value> {
        match self {
            Reply::Single(value) => Some(value),
            Reply::Multiple(_) => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Reply::Multiple(values) if values.is_empty())
    }
}

/// Whether replies of `format` collapse to a single value.
///
/// Padding is ignored. Raw bytes always count as one value; any other field
/// collapses when it is unrepeated or has an explicit count of one. A `1(..)`
/// group collapses to its one-entry list.
pub fn collapses(format: &Format) -> bool {
    let mut values = format.fields().iter().filter(|f| !f.is_padding());
    let (Some(field), None) = (values.next(), values.next()) else {
        return false;
    };

    field.conglomerates() || matches!(field.repeat(), Repeat::Once | Repeat::Count(1))
}

/// Shape decoded `values` into a [`Reply`] for `format`.
pub fn collapse(format: &Format, mut values: Vec<Value>) -> Reply {
    if values.len() == 1 && collapses(format) {
        if let Some(value) = values.pop() {
            return Reply::Single(value);
        }
    }
    Reply::Multiple(values)
}
