//! AMQP 1.0 wire decoding into values.
//!
//! The decoder accepts every valid encoding of a value, minimal or not, and
//! normalizes it into the value tree; re-encoding therefore produces the
//! canonical form. One call reads exactly one complete top-level value from
//! the prefix of the input.
//!
//! A strict prefix of a valid encoding fails with [`Error::Underflow`] and
//! consumes nothing. An inconsistency inside a size-delimited region, where
//! more input could never help, is malformed instead.

use crate::{
    error::Error,
    format_code::EncodingCodes,
    primitives::{OrderedMap, Symbol, Timestamp, Uuid},
    value::{Array, Described, Type, Value},
};

/// Decodes one complete value from the front of `bytes`, returning the value
/// and the number of bytes consumed.
pub fn decode_value(bytes: &[u8]) -> Result<(Value, usize), Error> {
    let mut reader = Reader::new(bytes);
    let value = read_value(&mut reader)?;
    Ok((value, reader.position()))
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
    /// Whether this reader covers a size-delimited region: running out of
    /// bytes is then malformed input rather than underflow.
    bounded: bool,
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            pos: 0,
            bounded: false,
        }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn short_input(&self) -> Error {
        if self.bounded {
            Error::InvalidLength
        } else {
            Error::Underflow
        }
    }

    fn read_u8(&mut self) -> Result<u8, Error> {
        let byte = *self.buf.get(self.pos).ok_or_else(|| self.short_input())?;
        self.pos += 1;
        Ok(byte)
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], Error> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(Error::InvalidLength)?;
        if end > self.buf.len() {
            return Err(self.short_input());
        }
        let bytes = &self.buf[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N], Error> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    fn read_u16(&mut self) -> Result<u16, Error> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    fn read_u32(&mut self) -> Result<u32, Error> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    fn read_u64(&mut self) -> Result<u64, Error> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    fn read_i16(&mut self) -> Result<i16, Error> {
        Ok(i16::from_be_bytes(self.read_array()?))
    }

    fn read_i32(&mut self) -> Result<i32, Error> {
        Ok(i32::from_be_bytes(self.read_array()?))
    }

    fn read_i64(&mut self) -> Result<i64, Error> {
        Ok(i64::from_be_bytes(self.read_array()?))
    }

    /// Splits off a bounded reader over the next `len` bytes.
    fn sub(&mut self, len: usize) -> Result<Reader<'a>, Error> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(Error::InvalidLength)?;
        if end > self.buf.len() {
            return Err(self.short_input());
        }
        let sub = Reader {
            buf: &self.buf[..end],
            pos: self.pos,
            bounded: true,
        };
        self.pos = end;
        Ok(sub)
    }

    /// A size-delimited region must be consumed exactly.
    fn finish(self) -> Result<(), Error> {
        if self.pos == self.buf.len() {
            Ok(())
        } else {
            Err(Error::InvalidLength)
        }
    }
}

fn read_value(reader: &mut Reader<'_>) -> Result<Value, Error> {
    let code = EncodingCodes::try_from(reader.read_u8()?)?;
    let value = match code {
        EncodingCodes::DescribedType => {
            let descriptor = read_value(reader)?;
            let value = read_value(reader)?;
            Value::Described(Box::new(Described { descriptor, value }))
        }

        EncodingCodes::Null => Value::Null,

        EncodingCodes::BooleanTrue => Value::Bool(true),
        EncodingCodes::BooleanFalse => Value::Bool(false),
        EncodingCodes::Boolean => Value::Bool(read_bool_octet(reader)?),

        EncodingCodes::UByte => Value::UByte(reader.read_u8()?),
        EncodingCodes::UShort => Value::UShort(reader.read_u16()?),
        EncodingCodes::UInt => Value::UInt(reader.read_u32()?),
        EncodingCodes::SmallUInt => Value::UInt(reader.read_u8()? as u32),
        EncodingCodes::UInt0 => Value::UInt(0),
        EncodingCodes::ULong => Value::ULong(reader.read_u64()?),
        EncodingCodes::SmallULong => Value::ULong(reader.read_u8()? as u64),
        EncodingCodes::ULong0 => Value::ULong(0),

        EncodingCodes::Byte => Value::Byte(reader.read_u8()? as i8),
        EncodingCodes::Short => Value::Short(reader.read_i16()?),
        EncodingCodes::Int => Value::Int(reader.read_i32()?),
        EncodingCodes::SmallInt => Value::Int(reader.read_u8()? as i8 as i32),
        EncodingCodes::Long => Value::Long(reader.read_i64()?),
        EncodingCodes::SmallLong => Value::Long(reader.read_u8()? as i8 as i64),

        EncodingCodes::Float => Value::Float(f32::from_be_bytes(reader.read_array()?).into()),
        EncodingCodes::Double => Value::Double(f64::from_be_bytes(reader.read_array()?).into()),

        EncodingCodes::Decimal32 => return Err(Error::Unsupported("decimal32")),
        EncodingCodes::Decimal64 => return Err(Error::Unsupported("decimal64")),
        EncodingCodes::Decimal128 => return Err(Error::Unsupported("decimal128")),

        EncodingCodes::Char => Value::Char(read_char(reader)?),
        EncodingCodes::Timestamp => Value::Timestamp(Timestamp::from(reader.read_i64()?)),
        EncodingCodes::Uuid => Value::Uuid(Uuid::from(reader.read_array::<16>()?)),

        EncodingCodes::VBin8 => {
            let len = reader.read_u8()? as usize;
            Value::Binary(reader.read_bytes(len)?.into())
        }
        EncodingCodes::VBin32 => {
            let len = reader.read_u32()? as usize;
            Value::Binary(reader.read_bytes(len)?.into())
        }
        EncodingCodes::Str8 => {
            let len = reader.read_u8()? as usize;
            Value::String(read_utf8(reader, len)?)
        }
        EncodingCodes::Str32 => {
            let len = reader.read_u32()? as usize;
            Value::String(read_utf8(reader, len)?)
        }
        EncodingCodes::Sym8 => {
            let len = reader.read_u8()? as usize;
            Value::Symbol(read_symbol(reader, len)?)
        }
        EncodingCodes::Sym32 => {
            let len = reader.read_u32()? as usize;
            Value::Symbol(read_symbol(reader, len)?)
        }

        EncodingCodes::List0 => Value::List(Vec::new()),
        EncodingCodes::List8 => read_list(reader, false)?,
        EncodingCodes::List32 => read_list(reader, true)?,
        EncodingCodes::Map8 => read_map(reader, false)?,
        EncodingCodes::Map32 => read_map(reader, true)?,
        EncodingCodes::Array8 => read_array(reader, false)?,
        EncodingCodes::Array32 => read_array(reader, true)?,
    };
    Ok(value)
}

fn read_bool_octet(reader: &mut Reader<'_>) -> Result<bool, Error> {
    match reader.read_u8()? {
        0x00 => Ok(false),
        0x01 => Ok(true),
        _ => Err(Error::InvalidValue),
    }
}

fn read_char(reader: &mut Reader<'_>) -> Result<char, Error> {
    let raw = reader.read_u32()?;
    char::from_u32(raw).ok_or(Error::InvalidChar(raw))
}

fn read_utf8(reader: &mut Reader<'_>, len: usize) -> Result<String, Error> {
    let bytes = reader.read_bytes(len)?;
    Ok(std::str::from_utf8(bytes)?.to_owned())
}

fn read_symbol(reader: &mut Reader<'_>, len: usize) -> Result<Symbol, Error> {
    let bytes = reader.read_bytes(len)?;
    if !bytes.is_ascii() {
        return Err(Error::NonAsciiSymbol);
    }
    Ok(Symbol::new(std::str::from_utf8(bytes)?))
}

fn read_list(reader: &mut Reader<'_>, wide: bool) -> Result<Value, Error> {
    let size = read_size(reader, wide)?;
    let mut sub = reader.sub(size)?;
    let count = read_count(&mut sub, wide)?;
    let mut items = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        items.push(read_value(&mut sub)?);
    }
    sub.finish()?;
    Ok(Value::List(items))
}

fn read_map(reader: &mut Reader<'_>, wide: bool) -> Result<Value, Error> {
    let size = read_size(reader, wide)?;
    let mut sub = reader.sub(size)?;
    let count = read_count(&mut sub, wide)?;
    // the wire count covers keys and values
    if count % 2 != 0 {
        return Err(Error::InvalidLength);
    }
    let mut map = OrderedMap::new();
    for _ in 0..count / 2 {
        let key = read_value(&mut sub)?;
        let value = read_value(&mut sub)?;
        map.insert(key, value);
    }
    sub.finish()?;
    Ok(Value::Map(map))
}

fn read_array(reader: &mut Reader<'_>, wide: bool) -> Result<Value, Error> {
    let size = read_size(reader, wide)?;
    let mut sub = reader.sub(size)?;
    let count = read_count(&mut sub, wide)?;
    let code = EncodingCodes::try_from(sub.read_u8()?)?;
    let element = element_type(&code)?;
    let mut elements = Vec::with_capacity(count.min(1024));
    for _ in 0..count {
        elements.push(read_array_element(&mut sub, &code)?);
    }
    sub.finish()?;
    Ok(Value::Array(Array::from_parts(element, elements)))
}

fn read_size(reader: &mut Reader<'_>, wide: bool) -> Result<usize, Error> {
    if wide {
        Ok(reader.read_u32()? as usize)
    } else {
        Ok(reader.read_u8()? as usize)
    }
}

fn read_count(reader: &mut Reader<'_>, wide: bool) -> Result<usize, Error> {
    if wide {
        Ok(reader.read_u32()? as usize)
    } else {
        Ok(reader.read_u8()? as usize)
    }
}

/// The declared element type for an array element constructor. The small and
/// zero-width forms are accepted and normalized.
fn element_type(code: &EncodingCodes) -> Result<Type, Error> {
    let element = match code {
        EncodingCodes::DescribedType => {
            return Err(Error::Unsupported("described array elements"))
        }
        EncodingCodes::Decimal32 => return Err(Error::Unsupported("decimal32")),
        EncodingCodes::Decimal64 => return Err(Error::Unsupported("decimal64")),
        EncodingCodes::Decimal128 => return Err(Error::Unsupported("decimal128")),

        EncodingCodes::Null => Type::Null,
        EncodingCodes::Boolean | EncodingCodes::BooleanTrue | EncodingCodes::BooleanFalse => {
            Type::Bool
        }
        EncodingCodes::UByte => Type::UByte,
        EncodingCodes::UShort => Type::UShort,
        EncodingCodes::UInt | EncodingCodes::SmallUInt | EncodingCodes::UInt0 => Type::UInt,
        EncodingCodes::ULong | EncodingCodes::SmallULong | EncodingCodes::ULong0 => Type::ULong,
        EncodingCodes::Byte => Type::Byte,
        EncodingCodes::Short => Type::Short,
        EncodingCodes::Int | EncodingCodes::SmallInt => Type::Int,
        EncodingCodes::Long | EncodingCodes::SmallLong => Type::Long,
        EncodingCodes::Float => Type::Float,
        EncodingCodes::Double => Type::Double,
        EncodingCodes::Char => Type::Char,
        EncodingCodes::Timestamp => Type::Timestamp,
        EncodingCodes::Uuid => Type::Uuid,
        EncodingCodes::VBin8 | EncodingCodes::VBin32 => Type::Binary,
        EncodingCodes::Str8 | EncodingCodes::Str32 => Type::String,
        EncodingCodes::Sym8 | EncodingCodes::Sym32 => Type::Symbol,
        EncodingCodes::List0 | EncodingCodes::List8 | EncodingCodes::List32 => Type::List,
        EncodingCodes::Map8 | EncodingCodes::Map32 => Type::Map,
        EncodingCodes::Array8 | EncodingCodes::Array32 => Type::Array,
    };
    Ok(element)
}

/// Reads one array element payload under the shared element constructor.
fn read_array_element(reader: &mut Reader<'_>, code: &EncodingCodes) -> Result<Value, Error> {
    let value = match code {
        EncodingCodes::Null => Value::Null,
        EncodingCodes::Boolean => Value::Bool(read_bool_octet(reader)?),
        EncodingCodes::BooleanTrue => Value::Bool(true),
        EncodingCodes::BooleanFalse => Value::Bool(false),

        EncodingCodes::UByte => Value::UByte(reader.read_u8()?),
        EncodingCodes::UShort => Value::UShort(reader.read_u16()?),
        EncodingCodes::UInt => Value::UInt(reader.read_u32()?),
        EncodingCodes::SmallUInt => Value::UInt(reader.read_u8()? as u32),
        EncodingCodes::UInt0 => Value::UInt(0),
        EncodingCodes::ULong => Value::ULong(reader.read_u64()?),
        EncodingCodes::SmallULong => Value::ULong(reader.read_u8()? as u64),
        EncodingCodes::ULong0 => Value::ULong(0),
        EncodingCodes::Byte => Value::Byte(reader.read_u8()? as i8),
        EncodingCodes::Short => Value::Short(reader.read_i16()?),
        EncodingCodes::Int => Value::Int(reader.read_i32()?),
        EncodingCodes::SmallInt => Value::Int(reader.read_u8()? as i8 as i32),
        EncodingCodes::Long => Value::Long(reader.read_i64()?),
        EncodingCodes::SmallLong => Value::Long(reader.read_u8()? as i8 as i64),
        EncodingCodes::Float => Value::Float(f32::from_be_bytes(reader.read_array()?).into()),
        EncodingCodes::Double => Value::Double(f64::from_be_bytes(reader.read_array()?).into()),
        EncodingCodes::Char => Value::Char(read_char(reader)?),
        EncodingCodes::Timestamp => Value::Timestamp(Timestamp::from(reader.read_i64()?)),
        EncodingCodes::Uuid => Value::Uuid(Uuid::from(reader.read_array::<16>()?)),

        EncodingCodes::VBin8 => {
            let len = reader.read_u8()? as usize;
            Value::Binary(reader.read_bytes(len)?.into())
        }
        EncodingCodes::VBin32 => {
            let len = reader.read_u32()? as usize;
            Value::Binary(reader.read_bytes(len)?.into())
        }
        EncodingCodes::Str8 => {
            let len = reader.read_u8()? as usize;
            Value::String(read_utf8(reader, len)?)
        }
        EncodingCodes::Str32 => {
            let len = reader.read_u32()? as usize;
            Value::String(read_utf8(reader, len)?)
        }
        EncodingCodes::Sym8 => {
            let len = reader.read_u8()? as usize;
            Value::Symbol(read_symbol(reader, len)?)
        }
        EncodingCodes::Sym32 => {
            let len = reader.read_u32()? as usize;
            Value::Symbol(read_symbol(reader, len)?)
        }

        EncodingCodes::List0 => Value::List(Vec::new()),
        EncodingCodes::List8 => read_list(reader, false)?,
        EncodingCodes::List32 => read_list(reader, true)?,
        EncodingCodes::Map8 => read_map(reader, false)?,
        EncodingCodes::Map32 => read_map(reader, true)?,
        EncodingCodes::Array8 => read_array(reader, false)?,
        EncodingCodes::Array32 => read_array(reader, true)?,

        EncodingCodes::DescribedType => {
            return Err(Error::Unsupported("described array elements"))
        }
        EncodingCodes::Decimal32 => return Err(Error::Unsupported("decimal32")),
        EncodingCodes::Decimal64 => return Err(Error::Unsupported("decimal64")),
        EncodingCodes::Decimal128 => return Err(Error::Unsupported("decimal128")),
    };
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::decode_value;
    use crate::{
        encode::to_vec,
        error::Error,
        value::{Type, Value},
    };

    #[test]
    fn consumed_matches_the_encoding_length() {
        let buf = to_vec(&Value::from("amqp")).unwrap();
        let (value, consumed) = decode_value(&buf).unwrap();
        assert_eq!(value, Value::from("amqp"));
        assert_eq!(consumed, buf.len());
    }

    #[test]
    fn trailing_bytes_are_left_alone() {
        let mut buf = to_vec(&Value::UInt(7)).unwrap();
        let size = buf.len();
        buf.extend_from_slice(&[0x41, 0x42]);
        let (_, consumed) = decode_value(&buf).unwrap();
        assert_eq!(consumed, size);
    }

    #[test]
    fn every_strict_prefix_underflows() {
        // 40 byte encoding: str8 with a 38 byte payload
        let buf = to_vec(&Value::from("It was a dark and stormy AMQP night...")).unwrap();
        assert_eq!(buf.len(), 40);
        for cut in 0..buf.len() {
            let result = decode_value(&buf[..cut]);
            assert!(
                matches!(result, Err(Error::Underflow)),
                "prefix of {} bytes should underflow",
                cut
            );
        }
        let (_, consumed) = decode_value(&buf).unwrap();
        assert_eq!(consumed, 40);
    }

    #[test]
    fn non_minimal_forms_are_normalized() {
        // uint 7 in its full-width form
        let (value, _) = decode_value(&[0x70, 0x00, 0x00, 0x00, 0x07]).unwrap();
        assert_eq!(value, Value::UInt(7));

        // boolean in its one-octet form
        let (value, _) = decode_value(&[0x56, 0x01]).unwrap();
        assert_eq!(value, Value::Bool(true));

        // a short string in str32 form
        let (value, _) = decode_value(&[0xb1, 0x00, 0x00, 0x00, 0x02, b'h', b'i']).unwrap();
        assert_eq!(value, Value::from("hi"));
    }

    #[test]
    fn bad_boolean_octet_is_malformed() {
        let result = decode_value(&[0x56, 0x02]);
        assert!(matches!(result, Err(Error::InvalidValue)));
    }

    #[test]
    fn unknown_constructor_is_malformed() {
        let result = decode_value(&[0x3f]);
        assert!(matches!(result, Err(Error::InvalidFormatCode(0x3f))));
    }

    #[test]
    fn decimal_constructors_are_unsupported() {
        let result = decode_value(&[0x74, 0x00, 0x00, 0x00, 0x00]);
        assert!(matches!(result, Err(Error::Unsupported("decimal32"))));
    }

    #[test]
    fn described_array_constructor_is_unsupported() {
        // array8, size 2, count 0, described element constructor
        let result = decode_value(&[0xe0, 0x02, 0x00, 0x00]);
        assert!(matches!(
            result,
            Err(Error::Unsupported("described array elements"))
        ));
    }

    #[test]
    fn invalid_utf8_string_is_malformed() {
        let result = decode_value(&[0xa1, 0x01, 0xff]);
        assert!(matches!(result, Err(Error::InvalidUtf8Encoding)));
    }

    #[test]
    fn non_ascii_symbol_is_malformed() {
        let result = decode_value(&[0xa3, 0x02, 0xc3, 0xa9]);
        assert!(matches!(result, Err(Error::NonAsciiSymbol)));
    }

    #[test]
    fn odd_map_count_is_malformed() {
        // map8, size 2, count 1
        let result = decode_value(&[0xc1, 0x02, 0x01, 0x40]);
        assert!(matches!(result, Err(Error::InvalidLength)));
    }

    #[test]
    fn inner_overrun_is_malformed_not_underflow() {
        // list8 claims a 2 byte body holding one element, but the element
        // is a uint that would need 4 more bytes
        let result = decode_value(&[0xc0, 0x02, 0x01, 0x70, 0x00, 0x00, 0x00, 0x07]);
        assert!(matches!(result, Err(Error::InvalidLength)));
    }

    #[test]
    fn slack_inside_a_compound_is_malformed() {
        // list8 claims a 3 byte body but its single element uses only 1
        let result = decode_value(&[0xc0, 0x03, 0x01, 0x40, 0x40]);
        assert!(matches!(result, Err(Error::InvalidLength)));
    }

    #[test]
    fn array_with_small_element_constructor_is_normalized() {
        // array8 of smalluint: size = count + code + payload
        let buf = [0xe0, 0x04, 0x02, 0x52, 0x07, 0x08];
        let (value, _) = decode_value(&buf).unwrap();
        match value {
            Value::Array(array) => {
                assert_eq!(array.element_type(), Type::UInt);
                assert_eq!(array.get(0), Some(&Value::UInt(7)));
                assert_eq!(array.get(1), Some(&Value::UInt(8)));
            }
            other => panic!("expected an array, got {:?}", other),
        }
    }

    #[test]
    fn canonical_form_survives_a_round_trip() {
        let original = Value::from(vec![Value::UInt(300), Value::from("x"), Value::Null]);
        let first = to_vec(&original).unwrap();
        let (decoded, _) = decode_value(&first).unwrap();
        let second = to_vec(&decoded).unwrap();
        assert_eq!(first, second);
    }
}
