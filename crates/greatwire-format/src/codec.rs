use bytes::{Buf, BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::arity::{self, Shortfall};
use crate::error::{FormatError, Result};
use crate::format::{Field, Format, Primitive, Repeat};
use crate::value::Value;

/// Encode `args` into a command payload according to `format`.
///
/// Arguments are consumed left to right, field by field. Supplying fewer
/// arguments than the format needs, or any left over once a non-wildcard
/// format is satisfied, is an [`FormatError::ArgumentCount`] error.
pub fn encode(format: &Format, args: &[Value]) -> Result<Bytes> {
    let mut encoder = Encoder {
        format,
        little_endian: format.byte_order().is_little_endian(),
        out: BytesMut::new(),
        field: 0,
    };

    let mut rest = args;
    for (index, field) in format.fields().iter().enumerate() {
        encoder.field = index;
        let claimed = arity::field_arguments(field).claim(rest.len());
        if claimed > rest.len() {
            return Err(encoder.argument_count(format.fields(), args.len()));
        }
        let (mine, tail) = rest.split_at(claimed);
        encoder.encode_field(field, mine)?;
        rest = tail;
    }

    if !rest.is_empty() {
        encoder.field = format.fields().len();
        return Err(encoder.argument_count(format.fields(), args.len()));
    }

    trace!(format = %format, args = args.len(), bytes = encoder.out.len(), "encoded payload");
    Ok(encoder.out.freeze())
}

/// Decode `data` into values according to `format`.
///
/// Every field must be satisfied by the payload, except that a trailing
/// wildcard field accepts whatever remains, including nothing. Bytes left
/// over after the last field are an error.
pub fn decode(format: &Format, data: &[u8]) -> Result<Vec<Value>> {
    let mut decoder = Decoder {
        format,
        little_endian: format.byte_order().is_little_endian(),
        field: 0,
    };

    let mut values = Vec::new();
    let consumed = decoder.decode_fields(format.fields(), data, &mut values, true)?;
    if consumed < data.len() {
        return Err(FormatError::TrailingBytes {
            format: format.source().to_string(),
            unused: data.len() - consumed,
        });
    }

    trace!(format = %format, bytes = data.len(), values = values.len(), "decoded payload");
    Ok(values)
}

struct Encoder<'f> {
    format: &'f Format,
    little_endian: bool,
    out: BytesMut,
    field: usize,
}

impl Encoder<'_> {
    fn encode_fields(&mut self, fields: &[Field], args: &[Value]) -> Result<()> {
        let expected = arity::fields_arguments(fields);
        if !expected.accepts(args.len()) {
            return Err(self.argument_count(fields, args.len()));
        }

        let mut rest = args;
        for field in fields {
            let claimed = arity::field_arguments(field).claim(rest.len());
            let (mine, tail) = rest.split_at(claimed);
            self.encode_field(field, mine)?;
            rest = tail;
        }
        Ok(())
    }

    fn encode_field(&mut self, field: &Field, args: &[Value]) -> Result<()> {
        match field {
            Field::Primitive {
                kind: Primitive::Pad,
                repeat,
            } => {
                let count = repeat.count().unwrap_or(0);
                self.out.put_bytes(0, count);
                Ok(())
            }
            Field::Primitive { kind, .. } => args
                .iter()
                .try_for_each(|arg| self.put_primitive(*kind, arg)),
            Field::CString { .. } => args.iter().try_for_each(|arg| self.put_string(arg)),
            Field::RawBytes { length } => self.put_raw(*length, &args[0]),
            Field::Group { fields, repeat } => {
                let arg = &args[0];
                if *repeat == Repeat::Once {
                    let items = self.sequence(arg)?;
                    return self.encode_fields(fields, items);
                }

                let entries = self.sequence(arg)?;
                if let Repeat::Count(expected) = repeat {
                    if entries.len() != *expected {
                        return Err(FormatError::GroupCount {
                            format: self.source(),
                            field: self.field,
                            expected: *expected,
                            actual: entries.len(),
                        });
                    }
                }
                for entry in entries {
                    let items = self.sequence(entry)?;
                    self.encode_fields(fields, items)?;
                }
                Ok(())
            }
        }
    }

    fn put_primitive(&mut self, kind: Primitive, value: &Value) -> Result<()> {
        let width = kind.width();
        match kind {
            Primitive::Pad => self.out.put_u8(0),
            Primitive::Char => {
                let c = match value {
                    Value::Char(c) => *c,
                    Value::Str(s) if s.len() == 1 => s.as_bytes()[0],
                    Value::Bytes(b) if b.len() == 1 => b[0],
                    other => return Err(self.mismatch("a single character", other)),
                };
                self.out.put_u8(c);
            }
            Primitive::Bool => {
                let flag = match value {
                    Value::Bool(b) => *b,
                    other => match other.as_integer() {
                        Some(v) => v != 0,
                        None => return Err(self.mismatch("a bool", other)),
                    },
                };
                self.out.put_u8(flag as u8);
            }
            Primitive::F32 | Primitive::F64 => {
                let v = value
                    .as_f64()
                    .ok_or_else(|| self.mismatch("a number", value))?;
                match (kind, self.little_endian) {
                    (Primitive::F32, true) => self.out.put_f32_le(v as f32),
                    (Primitive::F32, false) => self.out.put_f32(v as f32),
                    (_, true) => self.out.put_f64_le(v),
                    (_, false) => self.out.put_f64(v),
                }
            }
            _ => {
                let v = match value {
                    Value::Int(_) | Value::UInt(_) => value.as_integer().unwrap_or_default(),
                    other => return Err(self.mismatch("an integer", other)),
                };
                let (min, max) = integer_bounds(kind);
                if v < min || v > max {
                    return Err(FormatError::OutOfRange {
                        format: self.source(),
                        field: self.field,
                        value: v.to_string(),
                        kind: kind.name(),
                    });
                }
                match (kind.is_signed(), self.little_endian) {
                    (true, true) => self.out.put_int_le(v as i64, width),
                    (true, false) => self.out.put_int(v as i64, width),
                    (false, true) => self.out.put_uint_le(v as u64, width),
                    (false, false) => self.out.put_uint(v as u64, width),
                }
            }
        }
        Ok(())
    }

    fn put_string(&mut self, value: &Value) -> Result<()> {
        let s = value
            .as_str()
            .ok_or_else(|| self.mismatch("a string", value))?;
        if s.contains('\0') {
            return Err(FormatError::InvalidString {
                format: self.source(),
                field: self.field,
                reason: "embedded NUL character".to_string(),
            });
        }
        self.out.put_slice(s.as_bytes());
        self.out.put_u8(0);
        Ok(())
    }

    fn put_raw(&mut self, length: Repeat, value: &Value) -> Result<()> {
        let raw: Vec<u8> = match value {
            Value::Bytes(b) => b.to_vec(),
            Value::List(items) | Value::Tuple(items) => items
                .iter()
                .map(|item| {
                    item.as_u64()
                        .and_then(|v| u8::try_from(v).ok())
                        .ok_or_else(|| self.mismatch("a byte", item))
                })
                .collect::<Result<_>>()?,
            other => return Err(self.mismatch("bytes", other)),
        };

        if let Some(expected) = length.count() {
            if raw.len() != expected {
                return Err(FormatError::LengthMismatch {
                    format: self.source(),
                    field: self.field,
                    expected,
                    actual: raw.len(),
                });
            }
        }
        self.out.put_slice(&raw);
        Ok(())
    }

    fn sequence<'v>(&self, value: &'v Value) -> Result<&'v [Value]> {
        value
            .as_sequence()
            .ok_or_else(|| self.mismatch("a tuple or list", value))
    }

    fn argument_count(&self, fields: &[Field], actual: usize) -> FormatError {
        FormatError::ArgumentCount {
            format: self.source(),
            field: self.field,
            expected: arity::fields_arguments(fields).to_string(),
            actual,
        }
    }

    fn mismatch(&self, expected: &'static str, actual: &Value) -> FormatError {
        FormatError::TypeMismatch {
            format: self.source(),
            field: self.field,
            expected,
            actual: actual.kind(),
        }
    }

    fn source(&self) -> String {
        self.format.source().to_string()
    }
}

fn integer_bounds(kind: Primitive) -> (i128, i128) {
    match kind {
        Primitive::I8 => (i8::MIN.into(), i8::MAX.into()),
        Primitive::U8 => (0, u8::MAX.into()),
        Primitive::I16 => (i16::MIN.into(), i16::MAX.into()),
        Primitive::U16 => (0, u16::MAX.into()),
        Primitive::I32 => (i32::MIN.into(), i32::MAX.into()),
        Primitive::U32 => (0, u32::MAX.into()),
        Primitive::I64 => (i64::MIN.into(), i64::MAX.into()),
        _ => (0, u64::MAX.into()),
    }
}

struct Decoder<'f> {
    format: &'f Format,
    little_endian: bool,
    field: usize,
}

impl Decoder<'_> {
    /// Decode `fields` from the front of `data`; returns bytes consumed.
    fn decode_fields(
        &mut self,
        fields: &[Field],
        data: &[u8],
        out: &mut Vec<Value>,
        top_level: bool,
    ) -> Result<usize> {
        let mut pos = 0;
        for (index, field) in fields.iter().enumerate() {
            if top_level {
                self.field = index;
            }
            let rest = &data[pos..];
            let len = arity::field_bytes(field, rest).map_err(|s| self.truncated(s))?;
            self.decode_field(field, &rest[..len], out)?;
            pos += len;
        }
        Ok(pos)
    }

    fn decode_field(&mut self, field: &Field, chunk: &[u8], out: &mut Vec<Value>) -> Result<()> {
        match field {
            Field::Primitive {
                kind: Primitive::Pad,
                ..
            } => Ok(()),
            Field::Primitive { kind, repeat } => {
                let width = kind.width();
                if repeat.is_wildcard() && chunk.len() % width != 0 {
                    return Err(FormatError::UnalignedWildcard {
                        format: self.format.source().to_string(),
                        field: self.field,
                        remaining: chunk.len(),
                        width,
                    });
                }
                let mut buf = chunk;
                while buf.remaining() >= width {
                    out.push(self.get_primitive(*kind, &mut buf));
                }
                Ok(())
            }
            Field::CString { .. } => {
                let mut rest = chunk;
                while !rest.is_empty() {
                    let Some(nul) = rest.iter().position(|&b| b == 0) else {
                        return Err(self.truncated(Shortfall {
                            needed: rest.len() + 1,
                            available: rest.len(),
                        }));
                    };
                    let text = std::str::from_utf8(&rest[..nul]).map_err(|err| {
                        FormatError::InvalidString {
                            format: self.format.source().to_string(),
                            field: self.field,
                            reason: err.to_string(),
                        }
                    })?;
                    out.push(Value::Str(text.to_string()));
                    rest = &rest[nul + 1..];
                }
                Ok(())
            }
            Field::RawBytes { .. } => {
                out.push(Value::Bytes(Bytes::copy_from_slice(chunk)));
                Ok(())
            }
            Field::Group { fields, repeat } => {
                if *repeat == Repeat::Once {
                    let mut items = Vec::new();
                    self.decode_fields(fields, chunk, &mut items, false)?;
                    out.push(Value::Tuple(items));
                    return Ok(());
                }

                let mut entries = Vec::new();
                let mut pos = 0;
                let mut next = |pos: &mut usize, entries: &mut Vec<Value>| -> Result<()> {
                    let mut items = Vec::new();
                    *pos += self.decode_fields(fields, &chunk[*pos..], &mut items, false)?;
                    entries.push(Value::Tuple(items));
                    Ok(())
                };
                match repeat.count() {
                    Some(count) => {
                        for _ in 0..count {
                            next(&mut pos, &mut entries)?;
                        }
                    }
                    // Group bodies are never zero-sized, so this terminates.
                    None => {
                        while pos < chunk.len() {
                            next(&mut pos, &mut entries)?;
                        }
                    }
                }
                out.push(Value::List(entries));
                Ok(())
            }
        }
    }

    fn get_primitive(&self, kind: Primitive, buf: &mut &[u8]) -> Value {
        let width = kind.width();
        let le = self.little_endian;
        match kind {
            Primitive::Char => Value::Char(buf.get_u8()),
            Primitive::Bool => Value::Bool(buf.get_u8() != 0),
            Primitive::F32 if le => Value::Float(buf.get_f32_le() as f64),
            Primitive::F32 => Value::Float(buf.get_f32() as f64),
            Primitive::F64 if le => Value::Float(buf.get_f64_le()),
            Primitive::F64 => Value::Float(buf.get_f64()),
            k if k.is_signed() && le => Value::Int(buf.get_int_le(width)),
            k if k.is_signed() => Value::Int(buf.get_int(width)),
            _ if le => Value::UInt(buf.get_uint_le(width)),
            _ => Value::UInt(buf.get_uint(width)),
        }
    }

    fn truncated(&self, shortfall: Shortfall) -> FormatError {
        FormatError::PayloadTruncated {
            format: self.format.source().to_string(),
            field: self.field,
            needed: shortfall.needed,
            available: shortfall.available,
        }
    }
}
