//! A typed AMQP 1.0 value tree, a navigable cursor over it, and the binary
//! codec between the tree and the AMQP 1.0 wire format.
//!
//! The encoder emits minimal encodings; the decoder accepts minimal and
//! non-minimal forms, so a decode followed by an encode canonicalizes the
//! wire bytes. The decimal32/64/128 types are not supported and are reported
//! as such.

// Public mods
pub mod data;
pub mod decode;
pub mod encode;
pub mod error;
pub mod format_code;
pub mod primitives;
pub mod value;

pub use data::Data;
pub use error::Error;
pub use value::{Array, Described, Type, Value};

pub mod prelude {
    //! Re-exports of the types that almost every consumer needs
    pub use super::{
        primitives::{Binary, OrderedMap, Symbol, Timestamp, Uuid},
        Array, Data, Described, Error, Type, Value,
    };
}
