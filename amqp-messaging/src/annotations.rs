//! Implements 3.2.10 Annotations

use amqp_data::{
    primitives::{OrderedMap, Symbol},
    Error, Value,
};

/// 3.2.10 Annotations
///
/// <type name="annotations" class="restricted" source="map"/>
///
/// The annotations type is a map where the keys are restricted to be of type
/// symbol or of type ulong. All ulong keys, and all symbolic keys except
/// those beginning with "x-" are reserved.
pub type Annotations = OrderedMap<OwnedKey, Value>;

/// Key type for [`Annotations`]
///
/// Assignments from a plain text type are interpreted as symbols.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OwnedKey {
    /// Symbol
    Symbol(Symbol),

    /// ULong
    ULong(u64),
}

impl Default for OwnedKey {
    fn default() -> Self {
        Self::Symbol(Symbol::default())
    }
}

impl From<Symbol> for OwnedKey {
    fn from(value: Symbol) -> Self {
        Self::Symbol(value)
    }
}

impl From<u64> for OwnedKey {
    fn from(value: u64) -> Self {
        Self::ULong(value)
    }
}

impl From<String> for OwnedKey {
    fn from(value: String) -> Self {
        Self::Symbol(Symbol(value))
    }
}

impl From<&str> for OwnedKey {
    fn from(value: &str) -> Self {
        Self::Symbol(Symbol::from(value))
    }
}

impl From<OwnedKey> for Value {
    fn from(value: OwnedKey) -> Self {
        match value {
            OwnedKey::Symbol(symbol) => Value::Symbol(symbol),
            OwnedKey::ULong(value) => Value::ULong(value),
        }
    }
}

impl TryFrom<Value> for OwnedKey {
    type Error = Error;

    /// A wire key of string type is tolerated and interpreted as a symbol,
    /// which matches what other implementations send.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Symbol(symbol) => Ok(OwnedKey::Symbol(symbol)),
            Value::ULong(value) => Ok(OwnedKey::ULong(value)),
            Value::String(string) => Ok(OwnedKey::Symbol(Symbol(string))),
            value => Err(Error::TypeMismatch {
                amqp: value.amqp_type(),
                host: "annotation key",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use amqp_data::{primitives::Symbol, Value};

    use super::{Annotations, OwnedKey};

    fn create_annotations() -> Annotations {
        let mut annotations = Annotations::new();
        annotations.insert("string_key".into(), Value::from("string_val"));
        annotations.insert(Symbol::from("symbol_key").into(), Value::from("symbol_val"));
        annotations.insert(1000u64.into(), Value::ULong(1000));
        annotations
    }

    #[test]
    fn test_annotations_insert_with_different_key_types() {
        let annotations = create_annotations();
        assert_eq!(annotations.len(), 3);
    }

    #[test]
    fn text_keys_default_to_symbols() {
        assert_eq!(
            OwnedKey::from("key"),
            OwnedKey::Symbol(Symbol::from("key"))
        );
        assert_eq!(
            OwnedKey::from(String::from("key")),
            OwnedKey::Symbol(Symbol::from("key"))
        );
    }

    #[test]
    fn test_annotations_with_different_order() {
        let mut annotations_1 = Annotations::new();
        annotations_1.insert("a".into(), Value::Int(1));
        annotations_1.insert("b".into(), Value::Int(2));

        let mut annotations_2 = Annotations::new();
        annotations_2.insert("b".into(), Value::Int(2));
        annotations_2.insert("a".into(), Value::Int(1));

        assert_ne!(annotations_1, annotations_2);
    }

    #[test]
    fn wire_string_keys_are_tolerated_as_symbols() {
        let key = OwnedKey::try_from(Value::from("from-the-wire")).unwrap();
        assert_eq!(key, OwnedKey::Symbol(Symbol::from("from-the-wire")));
    }

    #[test]
    fn other_key_types_are_rejected() {
        assert!(OwnedKey::try_from(Value::Int(1)).is_err());
    }
}
