//! Format-string grammar.
//!
//! A format string is an optional byte-order prefix followed by a sequence
//! of fields. Each field is an optional repeat specifier (a decimal count or
//! `*`) followed by a primitive type letter, `S` (NUL-terminated string),
//! `X` (raw bytes) or a parenthesized group:
//!
//! ```text
//! format  := [order] field*
//! order   := '<' | '>' | '!' | '=' | '@'
//! field   := [repeat] ( letter | 'S' | 'X' | '(' field+ ')' )
//! repeat  := digit+ | '*'
//! ```
//!
//! A `*` may only appear on the last top-level field.

use std::fmt;
use std::str::FromStr;

use crate::arity;
use crate::error::{FormatError, Result};

/// Byte order applied to every primitive of a format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ByteOrder {
    #[default]
    Little,
    Big,
    Native,
}

impl ByteOrder {
    fn from_prefix(c: char) -> Option<Self> {
        match c {
            '<' => Some(Self::Little),
            '>' | '!' => Some(Self::Big),
            '=' | '@' => Some(Self::Native),
            _ => None,
        }
    }

    /// Whether primitives are laid out least-significant byte first.
    pub fn is_little_endian(self) -> bool {
        match self {
            Self::Little => true,
            Self::Big => false,
            Self::Native => cfg!(target_endian = "little"),
        }
    }
}

/// Fixed-width primitive types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Primitive {
    Pad,
    Char,
    I8,
    U8,
    Bool,
    I16,
    U16,
    I32,
    U32,
    I64,
    U64,
    F32,
    F64,
}

impl Primitive {
    /// Map a type letter to its primitive, if it is one.
    pub fn from_letter(c: char) -> Option<Self> {
        let kind = match c {
            'x' => Self::Pad,
            'c' => Self::Char,
            'b' => Self::I8,
            'B' => Self::U8,
            '?' => Self::Bool,
            'h' => Self::I16,
            'H' => Self::U16,
            'i' | 'l' => Self::I32,
            'I' | 'L' => Self::U32,
            'q' => Self::I64,
            'Q' => Self::U64,
            'f' => Self::F32,
            'd' => Self::F64,
            _ => return None,
        };
        Some(kind)
    }

    /// Encoded width in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::Pad | Self::Char | Self::I8 | Self::U8 | Self::Bool => 1,
            Self::I16 | Self::U16 => 2,
            Self::I32 | Self::U32 | Self::F32 => 4,
            Self::I64 | Self::U64 | Self::F64 => 8,
        }
    }

    pub fn is_signed(self) -> bool {
        matches!(self, Self::I8 | Self::I16 | Self::I32 | Self::I64)
    }

    pub fn is_float(self) -> bool {
        matches!(self, Self::F32 | Self::F64)
    }

    /// Human-readable type name, as used in signatures.
    pub fn name(self) -> &'static str {
        match self {
            Self::Pad => "padding",
            Self::Char => "char",
            Self::I8 => "int8",
            Self::U8 => "uint8",
            Self::Bool => "bool",
            Self::I16 => "int16",
            Self::U16 => "uint16",
            Self::I32 => "int32",
            Self::U32 => "uint32",
            Self::I64 => "int64",
            Self::U64 => "uint64",
            Self::F32 => "float",
            Self::F64 => "double",
        }
    }
}

/// Repeat specifier of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Repeat {
    /// No specifier.
    Once,
    /// An explicit decimal count (which may be zero or one).
    Count(usize),
    /// `*`: all remaining arguments or bytes.
    Wildcard,
}

impl Repeat {
    pub fn is_wildcard(self) -> bool {
        matches!(self, Self::Wildcard)
    }

    /// Literal repetition count; `None` for wildcards.
    pub fn count(self) -> Option<usize> {
        match self {
            Self::Once => Some(1),
            Self::Count(n) => Some(n),
            Self::Wildcard => None,
        }
    }
}

/// One parsed unit of a format string.
#[derive(Debug, Clone, PartialEq)]
pub enum Field {
    Primitive {
        kind: Primitive,
        repeat: Repeat,
    },
    CString { repeat: Repeat },
    /// `Once` means a single byte.
    RawBytes { length: Repeat },
    Group {
        fields: Vec<Field>,
        repeat: Repeat,
    },
}

impl Field {
    pub fn repeat(&self) -> Repeat {
        match self {
            Field::Primitive { repeat, .. }
            | Field::CString { repeat }
            | Field::Group { repeat, .. } => *repeat,
            Field::RawBytes { length } => *length,
        }
    }

    pub fn is_padding(&self) -> bool {
        matches!(
            self,
            Field::Primitive {
                kind: Primitive::Pad,
                ..
            }
        )
    }

    /// Fields that always map to one logical value regardless of length.
    pub fn conglomerates(&self) -> bool {
        matches!(self, Field::RawBytes { .. })
    }

    /// Fewest bytes this field can occupy on the wire, or `None` if that
    /// does not fit in a `usize`.
    pub fn min_size(&self) -> Option<usize> {
        let count = self.repeat().count().unwrap_or(0);
        match self {
            Field::Primitive { kind, .. } => kind.width().checked_mul(count),
            Field::CString { .. } | Field::RawBytes { .. } => Some(count),
            Field::Group { fields, .. } => fields_min_size(fields)?.checked_mul(count),
        }
    }
}

/// Fewest bytes a sequence of fields can occupy, or `None` on overflow.
pub fn fields_min_size(fields: &[Field]) -> Option<usize> {
    fields
        .iter()
        .try_fold(0usize, |total, field| total.checked_add(field.min_size()?))
}

/// An immutable, parsed format string.
#[derive(Debug, Clone, PartialEq)]
pub struct Format {
    source: String,
    byte_order: ByteOrder,
    fields: Vec<Field>,
}

impl Format {
    /// Parse a format string.
    pub fn parse(source: &str) -> Result<Self> {
        Parser::new(source).parse()
    }

    /// The empty format: no arguments, no bytes.
    pub fn empty() -> Self {
        Self {
            source: String::new(),
            byte_order: ByteOrder::default(),
            fields: Vec::new(),
        }
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether the last field is wildcard-repeated.
    pub fn has_wildcard(&self) -> bool {
        self.fields
            .last()
            .map(|field| field.repeat().is_wildcard())
            .unwrap_or(false)
    }
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl FromStr for Format {
    type Err = FormatError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

struct Parser<'a> {
    source: &'a str,
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            source,
            chars: source.char_indices().collect(),
            pos: 0,
        }
    }

    fn parse(mut self) -> Result<Format> {
        self.skip_whitespace();
        let byte_order = match self.peek().and_then(ByteOrder::from_prefix) {
            Some(order) => {
                self.pos += 1;
                order
            }
            None => ByteOrder::default(),
        };

        let mut fields = Vec::new();
        loop {
            self.skip_whitespace();
            let Some(c) = self.peek() else { break };
            if c == ')' {
                return Err(self.error("unmatched ')'"));
            }

            let start = self.offset();
            let field = self.parse_field(false)?;

            if let Some(previous) = fields.last().map(Field::repeat) {
                if previous.is_wildcard() {
                    return Err(self.error_at(start, "wildcard must be the last field"));
                }
            }
            fields.push(field);
        }

        if fields_min_size(&fields).is_none() {
            return Err(self.error_at(0, "format size overflows"));
        }
        if arity::checked_fields_arguments(&fields).is_none() {
            return Err(self.error_at(0, "argument count overflows"));
        }

        Ok(Format {
            source: self.source.to_string(),
            byte_order,
            fields,
        })
    }

    fn parse_field(&mut self, in_group: bool) -> Result<Field> {
        let start = self.offset();
        let repeat = self.parse_repeat()?;

        if repeat.is_wildcard() && in_group {
            return Err(self.error_at(start, "wildcards not allowed inside groups"));
        }

        let type_offset = self.offset();
        let Some(c) = self.bump() else {
            let message = match repeat {
                Repeat::Wildcard => "wildcard without a type",
                _ => "repeat count without a type",
            };
            return Err(self.error_at(start, message));
        };

        let field = match c {
            'S' => Field::CString { repeat },
            'X' => Field::RawBytes { length: repeat },
            '(' => {
                let fields = self.parse_group_body(type_offset)?;
                Field::Group { fields, repeat }
            }
            letter => match Primitive::from_letter(letter) {
                Some(Primitive::Pad) if repeat.is_wildcard() => {
                    return Err(self.error_at(start, "padding cannot be wildcard-repeated"));
                }
                Some(kind) => Field::Primitive { kind, repeat },
                None => {
                    let message = format!("unknown type letter {letter:?}");
                    return Err(self.error_at(type_offset, &message));
                }
            },
        };

        if field.min_size().is_none() {
            return Err(self.error_at(start, "field size overflows"));
        }
        if let Field::Group { fields, .. } = &field {
            // A repeated zero-size body would loop without consuming anything.
            if repeat != Repeat::Once && fields_min_size(fields) == Some(0) {
                return Err(self.error_at(start, "repeated group has a zero-size body"));
            }
        }

        Ok(field)
    }

    fn parse_group_body(&mut self, open_offset: usize) -> Result<Vec<Field>> {
        let mut fields = Vec::new();
        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return Err(self.error_at(open_offset, "unmatched '('")),
                Some(')') => {
                    self.pos += 1;
                    break;
                }
                Some(_) => fields.push(self.parse_field(true)?),
            }
        }

        if fields.is_empty() {
            return Err(self.error_at(open_offset, "empty group"));
        }
        Ok(fields)
    }

    fn parse_repeat(&mut self) -> Result<Repeat> {
        let start = self.offset();
        if self.peek() == Some('*') {
            self.pos += 1;
            if self.peek().is_some_and(|c| c.is_ascii_digit()) {
                return Err(self.error_at(start, "wildcard combined with a count"));
            }
            return Ok(Repeat::Wildcard);
        }

        let mut count: Option<usize> = None;
        while let Some(c) = self.peek() {
            let Some(digit) = c.to_digit(10) else { break };
            let next = count
                .unwrap_or(0)
                .checked_mul(10)
                .and_then(|n| n.checked_add(digit as usize))
                .ok_or_else(|| self.error_at(start, "repeat count overflows"))?;
            count = Some(next);
            self.pos += 1;
        }

        Ok(match count {
            Some(n) => Repeat::Count(n),
            None => Repeat::Once,
        })
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        Some(c)
    }

    fn offset(&self) -> usize {
        self.chars
            .get(self.pos)
            .map(|&(offset, _)| offset)
            .unwrap_or(self.source.len())
    }

    fn error(&self, message: &str) -> FormatError {
        self.error_at(self.offset(), message)
    }

    fn error_at(&self, position: usize, message: &str) -> FormatError {
        let snippet: String = self.source[position..].chars().take(8).collect();
        FormatError::Syntax {
            format: self.source.to_string(),
            position,
            message: if snippet.is_empty() {
                message.to_string()
            } else {
                format!("{message} (near {snippet:?})")
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn syntax_position(source: &str) -> usize {
        match Format::parse(source) {
            Err(FormatError::Syntax { position, .. }) => position,
            other => panic!("expected syntax error for {source:?}, got {other:?}"),
        }
    }

    #[test]
    fn parses_plain_primitives() {
        let format = Format::parse("<IHB").unwrap();
        assert_eq!(format.byte_order(), ByteOrder::Little);
        assert_eq!(
            format.fields(),
            &[
                Field::Primitive {
                    kind: Primitive::U32,
                    repeat: Repeat::Once
                },
                Field::Primitive {
                    kind: Primitive::U16,
                    repeat: Repeat::Once
                },
                Field::Primitive {
                    kind: Primitive::U8,
                    repeat: Repeat::Once
                },
            ]
        );
    }

    #[test]
    fn byte_order_prefixes() {
        assert_eq!(Format::parse("I").unwrap().byte_order(), ByteOrder::Little);
        assert_eq!(Format::parse(">I").unwrap().byte_order(), ByteOrder::Big);
        assert_eq!(Format::parse("!I").unwrap().byte_order(), ByteOrder::Big);
        assert_eq!(Format::parse("=I").unwrap().byte_order(), ByteOrder::Native);
    }

    #[test]
    fn repeat_counts_are_kept_distinct() {
        let format = Format::parse("2I2(BB)(BB)0B").unwrap();
        let repeats: Vec<Repeat> = format.fields().iter().map(Field::repeat).collect();
        assert_eq!(
            repeats,
            vec![
                Repeat::Count(2),
                Repeat::Count(2),
                Repeat::Once,
                Repeat::Count(0)
            ]
        );
        assert!(matches!(format.fields()[1], Field::Group { .. }));
    }

    #[test]
    fn strings_bytes_and_wildcards() {
        let format = Format::parse("<S4X*I").unwrap();
        assert_eq!(
            format.fields(),
            &[
                Field::CString {
                    repeat: Repeat::Once
                },
                Field::RawBytes {
                    length: Repeat::Count(4)
                },
                Field::Primitive {
                    kind: Primitive::U32,
                    repeat: Repeat::Wildcard
                },
            ]
        );
        assert!(format.has_wildcard());
    }

    #[test]
    fn nested_groups() {
        let format = Format::parse("*(B2(HS))").unwrap();
        let Field::Group { fields, repeat } = &format.fields()[0] else {
            panic!("expected group");
        };
        assert_eq!(*repeat, Repeat::Wildcard);
        assert!(matches!(
            fields[1],
            Field::Group {
                repeat: Repeat::Count(2),
                ..
            }
        ));
    }

    #[test]
    fn whitespace_is_ignored() {
        let format = Format::parse("< I  H ").unwrap();
        assert_eq!(format.fields().len(), 2);
    }

    #[test]
    fn empty_format_is_legal() {
        assert!(Format::parse("").unwrap().is_empty());
        assert!(Format::parse("<").unwrap().is_empty());
    }

    #[test]
    fn rejects_bare_wildcard() {
        assert_eq!(syntax_position("<I*"), 2);
    }

    #[test]
    fn rejects_unknown_letter() {
        assert_eq!(syntax_position("<Iz"), 2);
    }

    #[test]
    fn rejects_unbalanced_parens() {
        assert_eq!(syntax_position("(BH"), 0);
        assert_eq!(syntax_position("BH)"), 2);
        assert_eq!(syntax_position("()"), 0);
    }

    #[test]
    fn rejects_non_terminal_wildcard() {
        assert_eq!(syntax_position("<*IB"), 3);
        assert_eq!(syntax_position("*SI"), 2);
    }

    #[test]
    fn rejects_wildcards_inside_groups() {
        assert_eq!(syntax_position("(B*H)"), 2);
    }

    #[test]
    fn rejects_wildcard_padding_and_empty_wildcard_groups() {
        assert!(Format::parse("*x").is_err());
        assert!(Format::parse("*(0B)").is_err());
    }

    #[test]
    fn rejects_repeated_zero_size_groups() {
        assert_eq!(syntax_position("<4294967295(0B)"), 1);
        assert_eq!(syntax_position("<B2(0X0x)"), 2);
        assert!(Format::parse("<(0B)").is_ok());
    }

    #[test]
    fn rejects_sizes_that_overflow() {
        assert_eq!(syntax_position("<2305843009213693952Q"), 1);
        assert_eq!(syntax_position("*(2305843009213693952Q)"), 2);
        assert_eq!(syntax_position("<2(9223372036854775807H)"), 1);

        let huge = usize::MAX;
        assert_eq!(syntax_position(&format!("<{huge}B{huge}B")), 0);
        assert_eq!(syntax_position(&format!("<{huge}I{huge}I")), 1);
    }

    #[test]
    fn error_mentions_offending_text() {
        let err = Format::parse("<II?k").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("<II?k"));
        assert!(message.contains("'k'"));
    }

    #[test]
    fn min_size_counts_static_bytes() {
        let format = Format::parse("2I(BH)S4X").unwrap();
        let sizes: Vec<Option<usize>> = format.fields().iter().map(Field::min_size).collect();
        assert_eq!(sizes, vec![Some(8), Some(3), Some(1), Some(4)]);
        assert_eq!(fields_min_size(format.fields()), Some(16));
    }
}
