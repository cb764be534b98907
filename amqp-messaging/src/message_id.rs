//! Message ID

use amqp_data::{
    primitives::{Binary, Uuid},
    Error, Type, Value,
};

/// Message ID
///
/// AMQP 1.0 permits exactly these four scalar types as a message-id:
///
/// 3.2.11 message-id-ulong, 3.2.12 message-id-uuid,
/// 3.2.13 message-id-binary, 3.2.14 message-id-string
#[derive(Debug, Clone, PartialEq, PartialOrd, Eq, Ord, Hash)]
pub enum MessageId {
    /// <type name="message-id-ulong" class="restricted" source="ulong" provides="message-id"/>
    ULong(u64),

    /// <type name="message-id-uuid" class="restricted" source="uuid" provides="message-id"/>
    Uuid(Uuid),

    /// <type name="message-id-binary" class="restricted" source="binary" provides="message-id"/>
    Binary(Binary),

    /// <type name="message-id-string" class="restricted" source="string" provides="message-id"/>
    String(String),
}

impl From<u64> for MessageId {
    fn from(value: u64) -> Self {
        Self::ULong(value)
    }
}

impl From<Uuid> for MessageId {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<Binary> for MessageId {
    fn from(value: Binary) -> Self {
        Self::Binary(value)
    }
}

impl From<String> for MessageId {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for MessageId {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<MessageId> for Value {
    fn from(value: MessageId) -> Self {
        match value {
            MessageId::ULong(value) => Value::ULong(value),
            MessageId::Uuid(value) => Value::Uuid(value),
            MessageId::Binary(value) => Value::Binary(value),
            MessageId::String(value) => Value::String(value),
        }
    }
}

impl TryFrom<Value> for MessageId {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::ULong(value) => Ok(MessageId::ULong(value)),
            Value::Uuid(value) => Ok(MessageId::Uuid(value)),
            Value::Binary(value) => Ok(MessageId::Binary(value)),
            Value::String(value) => Ok(MessageId::String(value)),
            value => Err(Error::TypeMismatch {
                amqp: value.amqp_type(),
                host: "MessageId",
            }),
        }
    }
}

impl MessageId {
    /// The AMQP type tag the id will carry on the wire
    pub fn amqp_type(&self) -> Type {
        match self {
            MessageId::ULong(_) => Type::ULong,
            MessageId::Uuid(_) => Type::Uuid,
            MessageId::Binary(_) => Type::Binary,
            MessageId::String(_) => Type::String,
        }
    }
}

#[cfg(test)]
mod tests {
    use amqp_data::{
        primitives::{Binary, Uuid},
        Value,
    };

    use super::MessageId;

    fn assert_value_round_trip(id: MessageId) {
        let value = Value::from(id.clone());
        let back = MessageId::try_from(value).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_message_id_ulong() {
        assert_value_round_trip(MessageId::ULong(123456789));
    }

    #[test]
    fn test_message_id_uuid() {
        assert_value_round_trip(MessageId::Uuid(Uuid::from([0u8; 16])));
    }

    #[test]
    fn test_message_id_binary() {
        assert_value_round_trip(MessageId::Binary(Binary::from("amqp")));
    }

    #[test]
    fn test_message_id_string() {
        assert_value_round_trip(MessageId::String(String::from("amqp")));
    }

    #[test]
    fn text_defaults_to_the_string_variant() {
        assert_eq!(MessageId::from("id"), MessageId::String("id".to_owned()));
    }

    #[test]
    fn other_scalars_are_rejected() {
        let result = MessageId::try_from(Value::Int(1));
        assert!(result.is_err());
    }
}
