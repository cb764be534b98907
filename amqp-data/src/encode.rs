//! Canonical AMQP 1.0 wire encoding of values.
//!
//! The encoder always emits the most compact valid encoding, so re-encoding
//! a decoded tree yields the canonical form of every value. A size pass runs
//! before any byte is written; an undersized buffer fails with
//! [`Error::Overflow`] without touching the output.

use crate::{
    error::Error,
    format_code::EncodingCodes,
    value::{Array, Type, Value},
};

/// Serializes the given value into a byte vector
pub fn to_vec(value: &Value) -> Result<Vec<u8>, Error> {
    let size = encoded_size(value)?;
    let mut buf = vec![0u8; size];
    encode_value(value, &mut buf)?;
    Ok(buf)
}

/// Encodes one value into the front of `buf`, returning the number of bytes
/// written. Fails with [`Error::Overflow`] before writing anything when the
/// buffer is too small.
pub fn encode_value(value: &Value, buf: &mut [u8]) -> Result<usize, Error> {
    let size = encoded_size(value)?;
    if size > buf.len() {
        return Err(Error::Overflow);
    }
    let mut writer = Writer::new(buf);
    write_value(&mut writer, value)?;
    debug_assert_eq!(writer.position(), size);
    Ok(writer.position())
}

/// Serialized size of one value in bytes, including its constructor.
///
/// This pass also validates the value: non-ASCII symbols, array element
/// mismatches and unencodable element constructors are reported here.
pub fn encoded_size(value: &Value) -> Result<usize, Error> {
    let size = match value {
        Value::Null => 1,
        Value::Bool(_) => 1,
        Value::UByte(_) => 2,
        Value::UShort(_) => 3,
        Value::UInt(v) => match v {
            0 => 1,
            1..=255 => 2,
            _ => 5,
        },
        Value::ULong(v) => match v {
            0 => 1,
            1..=255 => 2,
            _ => 9,
        },
        Value::Byte(_) => 2,
        Value::Short(_) => 3,
        Value::Int(v) => {
            if (-128..=127).contains(v) {
                2
            } else {
                5
            }
        }
        Value::Long(v) => {
            if (-128..=127).contains(v) {
                2
            } else {
                9
            }
        }
        Value::Float(_) => 5,
        Value::Double(_) => 9,
        Value::Char(_) => 5,
        Value::Timestamp(_) => 9,
        Value::Uuid(_) => 17,
        Value::Binary(v) => variable_size(v.len()),
        Value::String(v) => variable_size(v.len()),
        Value::Symbol(v) => {
            if !v.as_str().is_ascii() {
                return Err(Error::NonAsciiSymbol);
            }
            variable_size(v.len())
        }
        Value::List(items) => {
            if items.is_empty() {
                1
            } else {
                let mut payload = 0;
                for item in items {
                    payload += encoded_size(item)?;
                }
                compound_size(items.len(), payload)
            }
        }
        Value::Map(map) => {
            let mut payload = 0;
            for (key, value) in map {
                payload += encoded_size(key)? + encoded_size(value)?;
            }
            compound_size(2 * map.len(), payload)
        }
        Value::Array(array) => {
            element_code(array.element_type())?;
            let payload = array_payload_size(array)?;
            if array.len() <= 255 && payload + 2 <= 255 {
                4 + payload
            } else {
                10 + payload
            }
        }
        Value::Described(described) => {
            1 + encoded_size(&described.descriptor)? + encoded_size(&described.value)?
        }
    };
    Ok(size)
}

fn variable_size(len: usize) -> usize {
    if len <= 255 {
        2 + len
    } else {
        5 + len
    }
}

/// Total size of a list or map encoding. The size field covers the count
/// field and the encoded children.
fn compound_size(count: usize, payload: usize) -> usize {
    if count <= 255 && payload + 1 <= 255 {
        3 + payload
    } else {
        9 + payload
    }
}

/// Summed payload size of all array elements, validating that every element
/// carries the declared element type.
fn array_payload_size(array: &Array) -> Result<usize, Error> {
    let element = array.element_type();
    let mut payload = 0;
    for value in array {
        let found = value.amqp_type();
        if found != element {
            return Err(Error::MismatchedArrayElement {
                expecting: element,
                found,
            });
        }
        payload += array_element_size(value)?;
    }
    Ok(payload)
}

/// Payload size of one array element. Elements are encoded without their own
/// constructor, at the full width selected by the single element constructor
/// of the array.
fn array_element_size(value: &Value) -> Result<usize, Error> {
    let size = match value {
        Value::Null => 0,
        Value::Bool(_) => 1,
        Value::UByte(_) | Value::Byte(_) => 1,
        Value::UShort(_) | Value::Short(_) => 2,
        Value::UInt(_) | Value::Int(_) | Value::Float(_) | Value::Char(_) => 4,
        Value::ULong(_) | Value::Long(_) | Value::Double(_) | Value::Timestamp(_) => 8,
        Value::Uuid(_) => 16,
        Value::Binary(v) => 4 + v.len(),
        Value::String(v) => 4 + v.len(),
        Value::Symbol(v) => {
            if !v.as_str().is_ascii() {
                return Err(Error::NonAsciiSymbol);
            }
            4 + v.len()
        }
        Value::List(items) => {
            let mut payload = 0;
            for item in items {
                payload += encoded_size(item)?;
            }
            8 + payload
        }
        Value::Map(map) => {
            let mut payload = 0;
            for (key, value) in map {
                payload += encoded_size(key)? + encoded_size(value)?;
            }
            8 + payload
        }
        Value::Array(inner) => {
            element_code(inner.element_type())?;
            9 + array_payload_size(inner)?
        }
        Value::Described(_) => return Err(Error::Unsupported("described array elements")),
    };
    Ok(size)
}

/// The single wide-form constructor shared by all elements of an array
fn element_code(element: Type) -> Result<EncodingCodes, Error> {
    let code = match element {
        Type::Null => EncodingCodes::Null,
        Type::Bool => EncodingCodes::Boolean,
        Type::UByte => EncodingCodes::UByte,
        Type::UShort => EncodingCodes::UShort,
        Type::UInt => EncodingCodes::UInt,
        Type::ULong => EncodingCodes::ULong,
        Type::Byte => EncodingCodes::Byte,
        Type::Short => EncodingCodes::Short,
        Type::Int => EncodingCodes::Int,
        Type::Long => EncodingCodes::Long,
        Type::Float => EncodingCodes::Float,
        Type::Double => EncodingCodes::Double,
        Type::Char => EncodingCodes::Char,
        Type::Timestamp => EncodingCodes::Timestamp,
        Type::Uuid => EncodingCodes::Uuid,
        Type::Binary => EncodingCodes::VBin32,
        Type::String => EncodingCodes::Str32,
        Type::Symbol => EncodingCodes::Sym32,
        Type::List => EncodingCodes::List32,
        Type::Map => EncodingCodes::Map32,
        Type::Array => EncodingCodes::Array32,
        Type::Described => return Err(Error::Unsupported("described array elements")),
        Type::Invalid => return Err(Error::InvalidValue),
    };
    Ok(code)
}

struct Writer<'a> {
    buf: &'a mut [u8],
    pos: usize,
}

impl<'a> Writer<'a> {
    fn new(buf: &'a mut [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn write_u8(&mut self, value: u8) -> Result<(), Error> {
        if self.pos >= self.buf.len() {
            return Err(Error::Overflow);
        }
        self.buf[self.pos] = value;
        self.pos += 1;
        Ok(())
    }

    fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let end = self.pos + bytes.len();
        if end > self.buf.len() {
            return Err(Error::Overflow);
        }
        self.buf[self.pos..end].copy_from_slice(bytes);
        self.pos = end;
        Ok(())
    }

    fn write_code(&mut self, code: EncodingCodes) -> Result<(), Error> {
        self.write_u8(code as u8)
    }
}

fn write_value(writer: &mut Writer<'_>, value: &Value) -> Result<(), Error> {
    match value {
        Value::Null => writer.write_code(EncodingCodes::Null),
        Value::Bool(true) => writer.write_code(EncodingCodes::BooleanTrue),
        Value::Bool(false) => writer.write_code(EncodingCodes::BooleanFalse),
        Value::UByte(v) => {
            writer.write_code(EncodingCodes::UByte)?;
            writer.write_u8(*v)
        }
        Value::UShort(v) => {
            writer.write_code(EncodingCodes::UShort)?;
            writer.write_bytes(&v.to_be_bytes())
        }
        Value::UInt(v) => match v {
            0 => writer.write_code(EncodingCodes::UInt0),
            val @ 1..=255 => {
                writer.write_code(EncodingCodes::SmallUInt)?;
                writer.write_u8(*val as u8)
            }
            val => {
                writer.write_code(EncodingCodes::UInt)?;
                writer.write_bytes(&val.to_be_bytes())
            }
        },
        Value::ULong(v) => match v {
            0 => writer.write_code(EncodingCodes::ULong0),
            val @ 1..=255 => {
                writer.write_code(EncodingCodes::SmallULong)?;
                writer.write_u8(*val as u8)
            }
            val => {
                writer.write_code(EncodingCodes::ULong)?;
                writer.write_bytes(&val.to_be_bytes())
            }
        },
        Value::Byte(v) => {
            writer.write_code(EncodingCodes::Byte)?;
            writer.write_u8(*v as u8)
        }
        Value::Short(v) => {
            writer.write_code(EncodingCodes::Short)?;
            writer.write_bytes(&v.to_be_bytes())
        }
        Value::Int(v) => {
            if (-128..=127).contains(v) {
                writer.write_code(EncodingCodes::SmallInt)?;
                writer.write_u8(*v as i8 as u8)
            } else {
                writer.write_code(EncodingCodes::Int)?;
                writer.write_bytes(&v.to_be_bytes())
            }
        }
        Value::Long(v) => {
            if (-128..=127).contains(v) {
                writer.write_code(EncodingCodes::SmallLong)?;
                writer.write_u8(*v as i8 as u8)
            } else {
                writer.write_code(EncodingCodes::Long)?;
                writer.write_bytes(&v.to_be_bytes())
            }
        }
        Value::Float(v) => {
            writer.write_code(EncodingCodes::Float)?;
            writer.write_bytes(&v.0.to_be_bytes())
        }
        Value::Double(v) => {
            writer.write_code(EncodingCodes::Double)?;
            writer.write_bytes(&v.0.to_be_bytes())
        }
        Value::Char(v) => {
            writer.write_code(EncodingCodes::Char)?;
            writer.write_bytes(&(*v as u32).to_be_bytes())
        }
        Value::Timestamp(v) => {
            writer.write_code(EncodingCodes::Timestamp)?;
            writer.write_bytes(&v.milliseconds().to_be_bytes())
        }
        Value::Uuid(v) => {
            writer.write_code(EncodingCodes::Uuid)?;
            writer.write_bytes(v.as_inner())
        }
        Value::Binary(v) => {
            write_variable(writer, EncodingCodes::VBin8, EncodingCodes::VBin32, v)
        }
        Value::String(v) => write_variable(
            writer,
            EncodingCodes::Str8,
            EncodingCodes::Str32,
            v.as_bytes(),
        ),
        Value::Symbol(v) => write_variable(
            writer,
            EncodingCodes::Sym8,
            EncodingCodes::Sym32,
            v.as_str().as_bytes(),
        ),
        Value::List(items) => {
            if items.is_empty() {
                return writer.write_code(EncodingCodes::List0);
            }
            let mut payload = 0;
            for item in items {
                payload += encoded_size(item)?;
            }
            write_compound_header(
                writer,
                EncodingCodes::List8,
                EncodingCodes::List32,
                items.len(),
                payload,
            )?;
            for item in items {
                write_value(writer, item)?;
            }
            Ok(())
        }
        Value::Map(map) => {
            let mut payload = 0;
            for (key, value) in map {
                payload += encoded_size(key)? + encoded_size(value)?;
            }
            write_compound_header(
                writer,
                EncodingCodes::Map8,
                EncodingCodes::Map32,
                2 * map.len(),
                payload,
            )?;
            for (key, value) in map {
                write_value(writer, key)?;
                write_value(writer, value)?;
            }
            Ok(())
        }
        Value::Array(array) => {
            let code = element_code(array.element_type())?;
            let payload = array_payload_size(array)?;
            // the size field additionally covers the element constructor
            if array.len() <= 255 && payload + 2 <= 255 {
                writer.write_code(EncodingCodes::Array8)?;
                writer.write_u8((payload + 2) as u8)?;
                writer.write_u8(array.len() as u8)?;
            } else {
                writer.write_code(EncodingCodes::Array32)?;
                writer.write_bytes(&((payload + 5) as u32).to_be_bytes())?;
                writer.write_bytes(&(array.len() as u32).to_be_bytes())?;
            }
            writer.write_code(code)?;
            for element in array {
                write_array_element(writer, element)?;
            }
            Ok(())
        }
        Value::Described(described) => {
            writer.write_code(EncodingCodes::DescribedType)?;
            write_value(writer, &described.descriptor)?;
            write_value(writer, &described.value)
        }
    }
}

fn write_variable(
    writer: &mut Writer<'_>,
    small: EncodingCodes,
    large: EncodingCodes,
    bytes: &[u8],
) -> Result<(), Error> {
    if bytes.len() <= 255 {
        writer.write_code(small)?;
        writer.write_u8(bytes.len() as u8)?;
    } else {
        writer.write_code(large)?;
        writer.write_bytes(&(bytes.len() as u32).to_be_bytes())?;
    }
    writer.write_bytes(bytes)
}

fn write_compound_header(
    writer: &mut Writer<'_>,
    small: EncodingCodes,
    large: EncodingCodes,
    count: usize,
    payload: usize,
) -> Result<(), Error> {
    if count <= 255 && payload + 1 <= 255 {
        writer.write_code(small)?;
        writer.write_u8((payload + 1) as u8)?;
        writer.write_u8(count as u8)?;
    } else {
        writer.write_code(large)?;
        writer.write_bytes(&((payload + 4) as u32).to_be_bytes())?;
        writer.write_bytes(&(count as u32).to_be_bytes())?;
    }
    Ok(())
}

/// Writes the payload of one array element at full width, without a
/// constructor of its own.
fn write_array_element(writer: &mut Writer<'_>, value: &Value) -> Result<(), Error> {
    match value {
        Value::Null => Ok(()),
        Value::Bool(v) => writer.write_u8(u8::from(*v)),
        Value::UByte(v) => writer.write_u8(*v),
        Value::UShort(v) => writer.write_bytes(&v.to_be_bytes()),
        Value::UInt(v) => writer.write_bytes(&v.to_be_bytes()),
        Value::ULong(v) => writer.write_bytes(&v.to_be_bytes()),
        Value::Byte(v) => writer.write_u8(*v as u8),
        Value::Short(v) => writer.write_bytes(&v.to_be_bytes()),
        Value::Int(v) => writer.write_bytes(&v.to_be_bytes()),
        Value::Long(v) => writer.write_bytes(&v.to_be_bytes()),
        Value::Float(v) => writer.write_bytes(&v.0.to_be_bytes()),
        Value::Double(v) => writer.write_bytes(&v.0.to_be_bytes()),
        Value::Char(v) => writer.write_bytes(&(*v as u32).to_be_bytes()),
        Value::Timestamp(v) => writer.write_bytes(&v.milliseconds().to_be_bytes()),
        Value::Uuid(v) => writer.write_bytes(v.as_inner()),
        Value::Binary(v) => {
            writer.write_bytes(&(v.len() as u32).to_be_bytes())?;
            writer.write_bytes(v.as_slice())
        }
        Value::String(v) => {
            writer.write_bytes(&(v.len() as u32).to_be_bytes())?;
            writer.write_bytes(v.as_bytes())
        }
        Value::Symbol(v) => {
            writer.write_bytes(&(v.len() as u32).to_be_bytes())?;
            writer.write_bytes(v.as_str().as_bytes())
        }
        Value::List(items) => {
            let mut payload = 0;
            for item in items {
                payload += encoded_size(item)?;
            }
            writer.write_bytes(&((payload + 4) as u32).to_be_bytes())?;
            writer.write_bytes(&(items.len() as u32).to_be_bytes())?;
            for item in items {
                write_value(writer, item)?;
            }
            Ok(())
        }
        Value::Map(map) => {
            let mut payload = 0;
            for (key, value) in map {
                payload += encoded_size(key)? + encoded_size(value)?;
            }
            writer.write_bytes(&((payload + 4) as u32).to_be_bytes())?;
            writer.write_bytes(&((2 * map.len()) as u32).to_be_bytes())?;
            for (key, value) in map {
                write_value(writer, key)?;
                write_value(writer, value)?;
            }
            Ok(())
        }
        Value::Array(inner) => {
            let code = element_code(inner.element_type())?;
            let payload = array_payload_size(inner)?;
            writer.write_bytes(&((payload + 5) as u32).to_be_bytes())?;
            writer.write_bytes(&(inner.len() as u32).to_be_bytes())?;
            writer.write_code(code)?;
            for element in inner {
                write_array_element(writer, element)?;
            }
            Ok(())
        }
        Value::Described(_) => Err(Error::Unsupported("described array elements")),
    }
}
