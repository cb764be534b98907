//! Custom error

use crate::value::Type;

/// Errors from encoding, decoding and host type conversion
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Custom error with message
    #[error("Message {0}")]
    Message(String),

    /// The output buffer is too small. Retrying with a larger buffer is
    /// expected to succeed; nothing has been written.
    #[error("Output buffer is too small")]
    Overflow,

    /// The input does not contain one complete value. Retrying with more
    /// bytes is expected to succeed; nothing has been consumed.
    #[error("Input does not contain a complete value")]
    Underflow,

    /// Invalid format code
    #[error("Invalid format code 0x{0:02x}")]
    InvalidFormatCode(u8),

    /// Invalid value
    #[error("Invalid value")]
    InvalidValue,

    /// Found invalid UTF-8 encoding
    #[error("Invalid UTF-8 encoding")]
    InvalidUtf8Encoding,

    /// A symbol may only contain 7-bit ASCII characters
    #[error("Symbol contains non-ASCII characters")]
    NonAsciiSymbol,

    /// Length is invalid
    #[error("Invalid length")]
    InvalidLength,

    /// Not a Unicode scalar value
    #[error("Invalid character 0x{0:08x}")]
    InvalidChar(u32),

    /// The cursor is not positioned on a node that supports the operation
    #[error("Cursor is not positioned on a valid node")]
    InvalidCursor,

    /// A wire feature that is recognized but deliberately not implemented
    #[error("Unsupported: {0}")]
    Unsupported(&'static str),

    /// The host value cannot be mapped onto any AMQP type
    #[error("Cannot convert {host} to an AMQP value")]
    NoConversion {
        /// Name of the host type
        host: &'static str,
    },

    /// The AMQP value cannot be converted to the requested host type
    #[error("Cannot convert AMQP {amqp} to {host}")]
    TypeMismatch {
        /// Tag of the AMQP value that was found
        amqp: Type,
        /// Name of the requested host type
        host: &'static str,
    },

    /// Array elements must all carry the element type of the array
    #[error("Array of {expecting} cannot hold a {found} element")]
    MismatchedArrayElement {
        /// The declared element type of the array
        expecting: Type,
        /// The tag of the offending element
        found: Type,
    },
}

impl Error {
    pub(crate) fn mismatch(amqp: Type, host: &'static str) -> Self {
        Self::TypeMismatch { amqp, host }
    }
}

impl From<std::string::FromUtf8Error> for Error {
    fn from(_: std::string::FromUtf8Error) -> Self {
        Error::InvalidUtf8Encoding
    }
}

impl From<std::str::Utf8Error> for Error {
    fn from(_: std::str::Utf8Error) -> Self {
        Error::InvalidUtf8Encoding
    }
}
