//! Conversions between host types and [`Value`].
//!
//! The marshaling direction is infallible and expressed as `From` impls; the
//! unmarshaling direction is fallible and expressed as `TryFrom` impls that
//! report a [`Error::TypeMismatch`] naming the AMQP tag and the host type.
//!
//! Integer reads widen when lossless. A char value additionally widens into
//! 32- and 64-bit integer targets, which mirrors what existing
//! implementations accept on the wire.

use ordered_float::OrderedFloat;

use crate::{
    error::Error,
    primitives::{Binary, OrderedMap, Symbol, Timestamp, Uuid},
    value::{Array, Described, Type, Value},
};

macro_rules! impl_from_for_value {
    ($variant:ident, $variant_ty:ty) => {
        impl From<$variant_ty> for Value {
            fn from(val: $variant_ty) -> Self {
                Self::$variant(val)
            }
        }
    };

    ($($variant:ident, $variant_ty:ty),*) => {
        $(impl_from_for_value!($variant, $variant_ty);)*
    }
}

impl_from_for_value! {
    Bool, bool,
    UByte, u8,
    UShort, u16,
    UInt, u32,
    ULong, u64,
    Byte, i8,
    Short, i16,
    Int, i32,
    Long, i64,
    Float, OrderedFloat<f32>,
    Double, OrderedFloat<f64>,
    Char, char,
    Timestamp, Timestamp,
    Uuid, Uuid,
    Binary, Binary,
    String, String,
    Symbol, Symbol,
    Array, Array
}

impl From<f32> for Value {
    fn from(val: f32) -> Self {
        Self::Float(OrderedFloat::from(val))
    }
}

impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Self::Double(OrderedFloat::from(val))
    }
}

impl From<&str> for Value {
    fn from(val: &str) -> Self {
        Self::String(val.to_string())
    }
}

impl From<Described> for Value {
    fn from(value: Described) -> Self {
        Self::Described(Box::new(value))
    }
}

impl<T> From<Option<T>> for Value
where
    T: Into<Value>,
{
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => value.into(),
            None => Value::Null,
        }
    }
}

impl<T> From<Vec<T>> for Value
where
    T: Into<Value>,
{
    fn from(values: Vec<T>) -> Self {
        Value::List(values.into_iter().map(Into::into).collect())
    }
}

impl<K, V> From<OrderedMap<K, V>> for Value
where
    K: Into<Value>,
    V: Into<Value>,
{
    fn from(map: OrderedMap<K, V>) -> Self {
        let map = map.into_iter().map(|(k, v)| (k.into(), v.into())).collect();
        Value::Map(map)
    }
}

macro_rules! impl_array_from_vec {
    ($element:ident, $elem_ty:ty) => {
        impl From<Vec<$elem_ty>> for Array {
            fn from(values: Vec<$elem_ty>) -> Self {
                Array::from_parts(
                    Type::$element,
                    values.into_iter().map(Into::into).collect(),
                )
            }
        }
    };

    ($($element:ident, $elem_ty:ty),*) => {
        $(impl_array_from_vec!($element, $elem_ty);)*
    }
}

impl_array_from_vec! {
    Bool, bool,
    UByte, u8,
    UShort, u16,
    UInt, u32,
    ULong, u64,
    Byte, i8,
    Short, i16,
    Int, i32,
    Long, i64,
    Float, f32,
    Double, f64,
    Char, char,
    Timestamp, Timestamp,
    Uuid, Uuid,
    Binary, Binary,
    String, String,
    Symbol, Symbol
}

impl TryFrom<Vec<Value>> for Array {
    type Error = Error;

    /// The element type is inferred from the first element; an empty vector
    /// carries no element constructor and cannot become an array.
    fn try_from(values: Vec<Value>) -> Result<Self, Self::Error> {
        let element = match values.first() {
            Some(value) => value.amqp_type(),
            None => {
                return Err(Error::NoConversion {
                    host: "empty Vec<Value>",
                })
            }
        };
        for value in &values {
            if value.amqp_type() != element {
                return Err(Error::MismatchedArrayElement {
                    expecting: element,
                    found: value.amqp_type(),
                });
            }
        }
        Ok(Array::from_parts(element, values))
    }
}

/// A described value converts as if it were its body when the target is a
/// plain host type; the descriptor is dropped.
fn strip_described(value: Value) -> Value {
    match value {
        Value::Described(described) => strip_described(described.value),
        value => value,
    }
}

impl TryFrom<Value> for Described {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Described(described) => Ok(*described),
            value => Err(Error::mismatch(value.amqp_type(), "Described")),
        }
    }
}

macro_rules! impl_try_from_value {
    ($host_ty:ty, $host_name:literal, { $($variant:pat => $out:expr),+ $(,)? }) => {
        impl TryFrom<Value> for $host_ty {
            type Error = Error;

            fn try_from(value: Value) -> Result<Self, Self::Error> {
                match strip_described(value) {
                    $($variant => Ok($out),)+
                    value => Err(Error::mismatch(value.amqp_type(), $host_name)),
                }
            }
        }
    };
}

impl_try_from_value!(bool, "bool", {
    Value::Bool(v) => v,
});

impl_try_from_value!(u8, "u8", {
    Value::UByte(v) => v,
});

impl_try_from_value!(u16, "u16", {
    Value::UByte(v) => v as u16,
    Value::UShort(v) => v,
});

impl_try_from_value!(u32, "u32", {
    Value::Char(v) => v as u32,
    Value::UByte(v) => v as u32,
    Value::UShort(v) => v as u32,
    Value::UInt(v) => v,
});

impl_try_from_value!(u64, "u64", {
    Value::Char(v) => v as u64,
    Value::UByte(v) => v as u64,
    Value::UShort(v) => v as u64,
    Value::UInt(v) => v as u64,
    Value::ULong(v) => v,
});

impl_try_from_value!(i8, "i8", {
    Value::Byte(v) => v,
});

impl_try_from_value!(i16, "i16", {
    Value::Byte(v) => v as i16,
    Value::Short(v) => v,
});

impl_try_from_value!(i32, "i32", {
    Value::Char(v) => v as i32,
    Value::Byte(v) => v as i32,
    Value::Short(v) => v as i32,
    Value::Int(v) => v,
});

impl_try_from_value!(i64, "i64", {
    Value::Char(v) => v as i64,
    Value::Byte(v) => v as i64,
    Value::Short(v) => v as i64,
    Value::Int(v) => v as i64,
    Value::Long(v) => v,
});

impl_try_from_value!(f32, "f32", {
    Value::Float(v) => v.0,
});

impl_try_from_value!(f64, "f64", {
    Value::Float(v) => v.0 as f64,
    Value::Double(v) => v.0,
});

impl_try_from_value!(char, "char", {
    Value::Char(v) => v,
});

impl_try_from_value!(Timestamp, "Timestamp", {
    Value::Timestamp(v) => v,
});

impl_try_from_value!(Uuid, "Uuid", {
    Value::Uuid(v) => v,
});

impl TryFrom<Value> for Binary {
    type Error = Error;

    /// A string, symbol, or binary value all unmarshal into the byte target
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match strip_described(value) {
            Value::Binary(v) => Ok(v),
            Value::String(v) => Ok(Binary::from(v.into_bytes())),
            Value::Symbol(v) => Ok(Binary::from(v.into_inner().into_bytes())),
            value => Err(Error::mismatch(value.amqp_type(), "Binary")),
        }
    }
}

impl_try_from_value!(Symbol, "Symbol", {
    Value::Symbol(v) => v,
});

impl TryFrom<Value> for String {
    type Error = Error;

    /// A string, symbol, or binary value all unmarshal into a string target
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match strip_described(value) {
            Value::String(v) => Ok(v),
            Value::Symbol(v) => Ok(v.into_inner()),
            Value::Binary(v) => Ok(String::from_utf8(v.into_inner())?),
            value => Err(Error::mismatch(value.amqp_type(), "String")),
        }
    }
}

impl<T> TryFrom<Value> for Option<T>
where
    T: TryFrom<Value, Error = Error>,
{
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Null => Ok(None),
            value => T::try_from(value).map(Some),
        }
    }
}

impl<T> TryFrom<Value> for Vec<T>
where
    T: TryFrom<Value, Error = Error>,
{
    type Error = Error;

    /// A list or an array both unmarshal into a vector target
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match strip_described(value) {
            Value::List(items) => items.into_iter().map(T::try_from).collect(),
            Value::Array(array) => array.into_inner().into_iter().map(T::try_from).collect(),
            value => Err(Error::mismatch(value.amqp_type(), "Vec<_>")),
        }
    }
}

impl<K, V> TryFrom<Value> for OrderedMap<K, V>
where
    K: TryFrom<Value, Error = Error> + std::hash::Hash + Eq,
    V: TryFrom<Value, Error = Error>,
{
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match strip_described(value) {
            Value::Map(map) => map
                .into_iter()
                .map(|(k, v)| Ok((K::try_from(k)?, V::try_from(v)?)))
                .collect(),
            value => Err(Error::mismatch(value.amqp_type(), "OrderedMap<_, _>")),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        error::Error,
        primitives::{Binary, OrderedMap, Symbol, Timestamp},
        value::{Array, Described, Type, Value},
    };

    #[test]
    fn widening_reads_are_lossless() {
        assert_eq!(i32::try_from(Value::Short(-1)).unwrap(), -1i32);
        assert_eq!(i64::try_from(Value::Byte(-5)).unwrap(), -5i64);
        assert_eq!(u64::try_from(Value::UInt(7)).unwrap(), 7u64);
        assert_eq!(f64::try_from(Value::Float(1.5.into())).unwrap(), 1.5f64);
    }

    #[test]
    fn narrowing_reads_are_rejected() {
        let result = i16::try_from(Value::Int(1));
        assert!(matches!(
            result,
            Err(Error::TypeMismatch {
                amqp: Type::Int,
                host: "i16"
            })
        ));
    }

    #[test]
    fn char_widens_into_32_and_64_bit_targets_only() {
        assert_eq!(i32::try_from(Value::Char('a')).unwrap(), 97);
        assert_eq!(u64::try_from(Value::Char('a')).unwrap(), 97);
        assert!(i16::try_from(Value::Char('a')).is_err());
        assert!(u16::try_from(Value::Char('a')).is_err());
    }

    #[test]
    fn text_targets_accept_string_symbol_and_binary() {
        assert_eq!(
            String::try_from(Value::Symbol(Symbol::from("sym"))).unwrap(),
            "sym"
        );
        assert_eq!(
            Binary::try_from(Value::String("abc".into())).unwrap(),
            Binary::from("abc")
        );
        assert_eq!(
            String::try_from(Value::Binary(Binary::from("bytes"))).unwrap(),
            "bytes"
        );
    }

    #[test]
    fn described_values_convert_as_their_body() {
        let value = Value::from(Described::new(0x73u64, vec![Value::Int(1)]));
        let list: Vec<i32> = Vec::try_from(value.clone()).unwrap();
        assert_eq!(list, [1]);

        let preserved = Described::try_from(value).unwrap();
        assert_eq!(preserved.descriptor, Value::ULong(0x73));
    }

    #[test]
    fn null_becomes_absent() {
        let absent: Option<Timestamp> = Option::try_from(Value::Null).unwrap();
        assert!(absent.is_none());
    }

    #[test]
    fn vec_target_accepts_list_and_array() {
        let from_list: Vec<i32> = Vec::try_from(Value::from(vec![1i32, 2, 3])).unwrap();
        let from_array: Vec<i32> =
            Vec::try_from(Value::Array(Array::from(vec![1i32, 2, 3]))).unwrap();
        assert_eq!(from_list, from_array);
    }

    #[test]
    fn map_preserves_insertion_order() {
        let mut map = OrderedMap::new();
        map.insert("b", 2i32);
        map.insert("a", 1i32);
        let value = Value::from(map);
        let back: OrderedMap<String, i32> = OrderedMap::try_from(value).unwrap();
        let keys: Vec<_> = back.iter().map(|(k, _)| k.clone()).collect();
        assert_eq!(keys, ["b", "a"]);
    }

    #[test]
    fn empty_untyped_vec_cannot_become_an_array() {
        let result = Array::try_from(Vec::<Value>::new());
        assert!(matches!(result, Err(Error::NoConversion { .. })));
    }
}
