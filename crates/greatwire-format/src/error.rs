/// Errors raised while parsing format strings or converting payloads.
///
/// Every variant carries the format string it was raised for; codec errors
/// also carry the index of the top-level field being processed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FormatError {
    /// The format string is malformed.
    #[error("invalid format {format:?} at offset {position}: {message}")]
    Syntax {
        format: String,
        position: usize,
        message: String,
    },

    /// Too few or too many arguments were supplied for encoding.
    #[error("format {format:?} expects {expected} argument(s), got {actual} (field {field})")]
    ArgumentCount {
        format: String,
        field: usize,
        expected: String,
        actual: usize,
    },

    /// The payload ended before the format was satisfied.
    #[error("payload too short for format {format:?}: field {field} needs {needed} byte(s), {available} available")]
    PayloadTruncated {
        format: String,
        field: usize,
        needed: usize,
        available: usize,
    },

    /// A wildcard primitive field was given a byte count that is not a
    /// multiple of its element width.
    #[error("format {format:?}: {remaining} trailing byte(s) are not a multiple of the {width}-byte element width (field {field})")]
    UnalignedWildcard {
        format: String,
        field: usize,
        remaining: usize,
        width: usize,
    },

    /// Bytes were left over after every field was decoded.
    #[error("format {format:?} left {unused} byte(s) of the payload undecoded")]
    TrailingBytes { format: String, unused: usize },

    /// An argument had the wrong kind of value for its field.
    #[error("format {format:?}: field {field} expects {expected}, got {actual}")]
    TypeMismatch {
        format: String,
        field: usize,
        expected: &'static str,
        actual: &'static str,
    },

    /// A numeric argument does not fit the field's width or signedness.
    #[error("format {format:?}: value {value} does not fit {kind} (field {field})")]
    OutOfRange {
        format: String,
        field: usize,
        value: String,
        kind: &'static str,
    },

    /// A raw-bytes argument did not match the field's declared length.
    #[error("format {format:?}: field {field} expects {expected} byte(s), got {actual}")]
    LengthMismatch {
        format: String,
        field: usize,
        expected: usize,
        actual: usize,
    },

    /// A repeated group was given the wrong number of entries.
    #[error("format {format:?}: repeated group expects {expected} entries, got {actual} (field {field})")]
    GroupCount {
        format: String,
        field: usize,
        expected: usize,
        actual: usize,
    },

    /// A string could not be represented as a NUL-terminated UTF-8 string.
    #[error("format {format:?}: invalid string in field {field}: {reason}")]
    InvalidString {
        format: String,
        field: usize,
        reason: String,
    },
}

pub type Result<T> = std::result::Result<T, FormatError>;
