//! Message sections: descriptor codes and the lazily cached map sections.

use amqp_data::{
    primitives::{OrderedMap, Symbol},
    Data, Error, Value,
};

use crate::annotations::OwnedKey;

/// Milliseconds as used by the header ttl field
pub type Milliseconds = u32;

/// Relative message priority
///
/// <field name="priority" type="ubyte" default="4"/>
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Priority(pub u8);

impl Default for Priority {
    fn default() -> Self {
        Self(4)
    }
}

impl From<u8> for Priority {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl From<Priority> for u8 {
    fn from(value: Priority) -> Self {
        value.0
    }
}

/// The well-known described sections of a message, in their serialization
/// order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionCode {
    /// 3.2.1 Header, descriptor 0x70
    Header,
    /// 3.2.2 Delivery Annotations, descriptor 0x71
    DeliveryAnnotations,
    /// 3.2.3 Message Annotations, descriptor 0x72
    MessageAnnotations,
    /// 3.2.4 Properties, descriptor 0x73
    Properties,
    /// 3.2.5 Application Properties, descriptor 0x74
    ApplicationProperties,
    /// 3.2.6 Data, descriptor 0x75
    Data,
    /// 3.2.7 AMQP Sequence, descriptor 0x76
    AmqpSequence,
    /// 3.2.8 AMQP Value, descriptor 0x77
    AmqpValue,
    /// 3.2.9 Footer, descriptor 0x78
    Footer,
}

impl SectionCode {
    /// The numeric descriptor of the section
    pub const fn descriptor_code(self) -> u64 {
        match self {
            SectionCode::Header => 0x70,
            SectionCode::DeliveryAnnotations => 0x71,
            SectionCode::MessageAnnotations => 0x72,
            SectionCode::Properties => 0x73,
            SectionCode::ApplicationProperties => 0x74,
            SectionCode::Data => 0x75,
            SectionCode::AmqpSequence => 0x76,
            SectionCode::AmqpValue => 0x77,
            SectionCode::Footer => 0x78,
        }
    }

    /// The symbolic descriptor of the section
    pub const fn descriptor_name(self) -> &'static str {
        match self {
            SectionCode::Header => "amqp:header:list",
            SectionCode::DeliveryAnnotations => "amqp:delivery-annotations:map",
            SectionCode::MessageAnnotations => "amqp:message-annotations:map",
            SectionCode::Properties => "amqp:properties:list",
            SectionCode::ApplicationProperties => "amqp:application-properties:map",
            SectionCode::Data => "amqp:data:binary",
            SectionCode::AmqpSequence => "amqp:amqp-sequence:list",
            SectionCode::AmqpValue => "amqp:amqp-value:*",
            SectionCode::Footer => "amqp:footer:map",
        }
    }

    /// Short name used in error context
    pub const fn name(self) -> &'static str {
        match self {
            SectionCode::Header => "header",
            SectionCode::DeliveryAnnotations => "delivery-annotations",
            SectionCode::MessageAnnotations => "message-annotations",
            SectionCode::Properties => "properties",
            SectionCode::ApplicationProperties => "application-properties",
            SectionCode::Data => "data",
            SectionCode::AmqpSequence => "amqp-sequence",
            SectionCode::AmqpValue => "amqp-value",
            SectionCode::Footer => "footer",
        }
    }

    /// Matches a section descriptor value, numeric or symbolic
    pub fn from_descriptor(descriptor: &Value) -> Option<Self> {
        const ALL: [SectionCode; 9] = [
            SectionCode::Header,
            SectionCode::DeliveryAnnotations,
            SectionCode::MessageAnnotations,
            SectionCode::Properties,
            SectionCode::ApplicationProperties,
            SectionCode::Data,
            SectionCode::AmqpSequence,
            SectionCode::AmqpValue,
            SectionCode::Footer,
        ];
        match descriptor {
            Value::ULong(code) => ALL.iter().copied().find(|s| s.descriptor_code() == *code),
            Value::Symbol(name) => ALL
                .iter()
                .copied()
                .find(|s| s.descriptor_name() == name.as_str()),
            _ => None,
        }
    }
}

/// Conversion between the host key type of a map section and wire values.
pub(crate) trait SectionKey: Sized + std::hash::Hash + Eq {
    fn into_value(self) -> Value;
    fn try_from_value(value: Value) -> Result<Self, Error>;
}

impl SectionKey for OwnedKey {
    fn into_value(self) -> Value {
        Value::from(self)
    }

    fn try_from_value(value: Value) -> Result<Self, Error> {
        OwnedKey::try_from(value)
    }
}

/// Application property keys are restricted to strings.
impl SectionKey for String {
    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn try_from_value(value: Value) -> Result<Self, Error> {
        match value {
            Value::String(string) => Ok(string),
            Value::Symbol(Symbol(string)) => Ok(string),
            value => Err(Error::TypeMismatch {
                amqp: value.amqp_type(),
                host: "string key",
            }),
        }
    }
}

/// One lazily cached map section of a message.
///
/// The section content lives either in the host map or in the wire tree but
/// never in both: at any observable moment the non-empty one is the
/// authority. Reading through [`local_mut`] moves the authority to the host
/// map; [`flush_to_wire`] moves it back before an encode. Decoding a message
/// assigns the wire tree and clears the host map.
///
/// [`local_mut`]: SectionMap::local_mut
/// [`flush_to_wire`]: SectionMap::flush_to_wire
#[derive(Debug, Clone, Default)]
pub(crate) struct SectionMap<K> {
    local: OrderedMap<K, Value>,
    wire: Data,
}

impl<K: SectionKey> SectionMap<K> {
    /// Whether both representations are empty
    pub(crate) fn is_empty(&self) -> bool {
        self.local.is_empty() && self.wire.is_empty()
    }

    pub(crate) fn clear(&mut self) {
        self.local.clear();
        self.wire.clear();
    }

    /// Host access: decode the wire tree into the host map on first touch,
    /// then hand out the host map.
    pub(crate) fn local_mut(&mut self) -> Result<&mut OrderedMap<K, Value>, Error> {
        if self.local.is_empty() && !self.wire.is_empty() {
            let map = match self.wire.values() {
                [Value::Map(map)] => map,
                _ => return Err(Error::InvalidValue),
            };
            // convert fully before committing, so a bad key leaves the
            // section untouched
            let mut local = OrderedMap::new();
            for (key, value) in map {
                local.insert(K::try_from_value(key.clone())?, value.clone());
            }
            self.local = local;
            // the host map is now the authority
            self.wire.clear();
        }
        Ok(&mut self.local)
    }

    /// Encode the host map into the wire tree if the host map is the
    /// authority. Run before serializing the message.
    pub(crate) fn flush_to_wire(&mut self) {
        if self.wire.is_empty() && !self.local.is_empty() {
            let map: OrderedMap<Value, Value> = std::mem::take(&mut self.local)
                .into_iter()
                .map(|(key, value)| (key.into_value(), value))
                .collect();
            // the wire tree is now the authority
            self.wire = Data::from(Value::Map(map));
        }
    }

    /// The map value to serialize, present only when the wire tree is the
    /// authority and non-empty.
    pub(crate) fn wire_value(&self) -> Option<&Value> {
        self.wire.values().first()
    }

    /// Install the decoded wire map; the host map loses its authority.
    pub(crate) fn set_wire(&mut self, value: Value) -> Result<(), Error> {
        match value {
            value @ Value::Map(_) => {
                self.local.clear();
                self.wire = Data::from(value);
                Ok(())
            }
            value => Err(Error::TypeMismatch {
                amqp: value.amqp_type(),
                host: "section map",
            }),
        }
    }

    /// True when the wire tree holds the section (used by tests to observe
    /// the state machine).
    #[cfg(test)]
    pub(crate) fn wire_is_authority(&self) -> bool {
        !self.wire.is_empty() && self.local.is_empty()
    }
}
