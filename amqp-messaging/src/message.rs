//! The AMQP 1.0 message container.
//!
//! A message is serialized as a sequence of described section values in a
//! fixed order: header, delivery-annotations, message-annotations,
//! properties, application-properties, body, footer. Empty sections are
//! omitted.
//!
//! The three map sections and the footer are cached lazily: a decoded
//! message keeps them in wire form until an accessor touches them, and host
//! side edits are encoded back into wire form only when the message is
//! serialized. The `section` module holds the caching discipline.

use tracing::trace;

use amqp_data::{
    decode,
    primitives::{Binary, OrderedMap, Symbol, Timestamp},
    Data, Described, Value,
};

use crate::{
    annotations::{Annotations, OwnedKey},
    error::Error,
    message_id::MessageId,
    section::{Milliseconds, Priority, SectionCode, SectionMap},
};

/// Map section holding structured application data, keyed by strings
pub type ApplicationProperties = OrderedMap<String, Value>;

/// Buffers for encoding start at this size and double on overflow
const MIN_ENCODE: usize = 512;

/// An AMQP 1.0 message
///
/// The fixed header and properties fields are plain host values with
/// getters and setters. The map sections are reached through
/// [`properties`], [`annotations`], [`instructions`] and [`footer`], which
/// materialize them on first access. The body is a value tree built through
/// [`body_mut`] or the `set_body_*` helpers.
///
/// [`properties`]: Message::properties
/// [`annotations`]: Message::annotations
/// [`instructions`]: Message::instructions
/// [`footer`]: Message::footer
/// [`body_mut`]: Message::body_mut
#[derive(Debug, Clone, Default)]
pub struct Message {
    // 3.2.1 header
    durable: bool,
    priority: Priority,
    ttl: Option<Milliseconds>,
    first_acquirer: bool,
    delivery_count: u32,

    // 3.2.4 properties
    id: Option<MessageId>,
    user_id: Option<Binary>,
    address: Option<String>,
    subject: Option<String>,
    reply_to: Option<String>,
    correlation_id: Option<MessageId>,
    content_type: Option<Symbol>,
    content_encoding: Option<Symbol>,
    expiry_time: Option<Timestamp>,
    creation_time: Option<Timestamp>,
    group_id: Option<String>,
    group_sequence: Option<i32>,
    reply_to_group_id: Option<String>,

    /// Selects how an untyped body serializes: a raw binary body becomes a
    /// data section when inferred, an amqp-value section otherwise.
    inferred: bool,

    instructions: SectionMap<OwnedKey>,
    annotations: SectionMap<OwnedKey>,
    properties: SectionMap<String>,
    footer: SectionMap<OwnedKey>,
    body: Data,
}

impl Message {
    /// Creates an empty message
    pub fn new() -> Self {
        Self::default()
    }

    /// Wipes all state, leaving the message as newly constructed
    pub fn clear(&mut self) {
        *self = Self::default();
    }

    // -- fixed header fields -------------------------------------------------

    /// Whether the message is durable
    pub fn durable(&self) -> bool {
        self.durable
    }

    /// Set the durable flag
    pub fn set_durable(&mut self, durable: bool) {
        self.durable = durable;
    }

    /// Relative message priority, 4 unless set
    pub fn priority(&self) -> u8 {
        self.priority.0
    }

    /// Set the message priority
    pub fn set_priority(&mut self, priority: u8) {
        self.priority = Priority(priority);
    }

    /// Time to live in milliseconds
    pub fn ttl(&self) -> Option<Milliseconds> {
        self.ttl
    }

    /// Set the time to live
    pub fn set_ttl(&mut self, ttl: impl Into<Option<Milliseconds>>) {
        self.ttl = ttl.into();
    }

    /// Whether the receiver may be the first acquirer
    pub fn first_acquirer(&self) -> bool {
        self.first_acquirer
    }

    /// Set the first-acquirer flag
    pub fn set_first_acquirer(&mut self, first_acquirer: bool) {
        self.first_acquirer = first_acquirer;
    }

    /// Number of prior unsuccessful delivery attempts
    pub fn delivery_count(&self) -> u32 {
        self.delivery_count
    }

    /// Set the delivery count
    pub fn set_delivery_count(&mut self, delivery_count: u32) {
        self.delivery_count = delivery_count;
    }

    // -- properties fields ---------------------------------------------------

    /// Application message identifier
    pub fn id(&self) -> Option<&MessageId> {
        self.id.as_ref()
    }

    /// Set the message id
    pub fn set_id(&mut self, id: impl Into<MessageId>) {
        self.id = Some(id.into());
    }

    /// Identity of the user responsible for producing the message
    pub fn user_id(&self) -> Option<&[u8]> {
        self.user_id.as_deref().map(Vec::as_slice)
    }

    /// Set the user id. An empty id clears the field.
    pub fn set_user_id(&mut self, user_id: impl Into<Binary>) {
        let user_id = user_id.into();
        self.user_id = if user_id.is_empty() {
            None
        } else {
            Some(user_id)
        };
    }

    /// The address of the node to send the message to
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Set the address
    pub fn set_address(&mut self, address: impl Into<String>) {
        self.address = Some(address.into());
    }

    /// Summary of the message content and purpose
    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    /// Set the subject
    pub fn set_subject(&mut self, subject: impl Into<String>) {
        self.subject = Some(subject.into());
    }

    /// The node to send replies to
    pub fn reply_to(&self) -> Option<&str> {
        self.reply_to.as_deref()
    }

    /// Set the reply-to address
    pub fn set_reply_to(&mut self, reply_to: impl Into<String>) {
        self.reply_to = Some(reply_to.into());
    }

    /// Application correlation identifier
    pub fn correlation_id(&self) -> Option<&MessageId> {
        self.correlation_id.as_ref()
    }

    /// Set the correlation id
    pub fn set_correlation_id(&mut self, id: impl Into<MessageId>) {
        self.correlation_id = Some(id.into());
    }

    /// RFC-2046 MIME type of the body
    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_ref().map(Symbol::as_str)
    }

    /// Set the content type
    pub fn set_content_type(&mut self, content_type: impl Into<Symbol>) {
        self.content_type = Some(content_type.into());
    }

    /// Content encoding used on the body
    pub fn content_encoding(&self) -> Option<&str> {
        self.content_encoding.as_ref().map(Symbol::as_str)
    }

    /// Set the content encoding
    pub fn set_content_encoding(&mut self, content_encoding: impl Into<Symbol>) {
        self.content_encoding = Some(content_encoding.into());
    }

    /// Absolute time when the message is considered expired
    pub fn expiry_time(&self) -> Option<Timestamp> {
        self.expiry_time
    }

    /// Set the expiry time
    pub fn set_expiry_time(&mut self, expiry_time: impl Into<Timestamp>) {
        self.expiry_time = Some(expiry_time.into());
    }

    /// Absolute creation time of the message
    pub fn creation_time(&self) -> Option<Timestamp> {
        self.creation_time
    }

    /// Set the creation time
    pub fn set_creation_time(&mut self, creation_time: impl Into<Timestamp>) {
        self.creation_time = Some(creation_time.into());
    }

    /// The group the message belongs to
    pub fn group_id(&self) -> Option<&str> {
        self.group_id.as_deref()
    }

    /// Set the group id
    pub fn set_group_id(&mut self, group_id: impl Into<String>) {
        self.group_id = Some(group_id.into());
    }

    /// Relative position of the message within its group
    pub fn group_sequence(&self) -> Option<i32> {
        self.group_sequence
    }

    /// Set the group sequence
    pub fn set_group_sequence(&mut self, group_sequence: i32) {
        self.group_sequence = Some(group_sequence);
    }

    /// The group to send replies to
    pub fn reply_to_group_id(&self) -> Option<&str> {
        self.reply_to_group_id.as_deref()
    }

    /// Set the reply-to group id
    pub fn set_reply_to_group_id(&mut self, reply_to_group_id: impl Into<String>) {
        self.reply_to_group_id = Some(reply_to_group_id.into());
    }

    /// Whether the body was inferred from raw content rather than built as
    /// a typed value
    pub fn inferred(&self) -> bool {
        self.inferred
    }

    /// Set the inferred flag
    pub fn set_inferred(&mut self, inferred: bool) {
        self.inferred = inferred;
    }

    // -- map sections --------------------------------------------------------

    /// Application properties, materialized from wire form on first access
    pub fn properties(&mut self) -> Result<&mut ApplicationProperties, Error> {
        self.properties
            .local_mut()
            .map_err(|e| Error::section(SectionCode::ApplicationProperties.name(), e))
    }

    /// Message annotations, materialized from wire form on first access
    pub fn annotations(&mut self) -> Result<&mut Annotations, Error> {
        self.annotations
            .local_mut()
            .map_err(|e| Error::section(SectionCode::MessageAnnotations.name(), e))
    }

    /// Delivery annotations ("instructions"), materialized from wire form on
    /// first access
    pub fn instructions(&mut self) -> Result<&mut Annotations, Error> {
        self.instructions
            .local_mut()
            .map_err(|e| Error::section(SectionCode::DeliveryAnnotations.name(), e))
    }

    /// Footer, materialized from wire form on first access
    pub fn footer(&mut self) -> Result<&mut Annotations, Error> {
        self.footer
            .local_mut()
            .map_err(|e| Error::section(SectionCode::Footer.name(), e))
    }

    // -- body ----------------------------------------------------------------

    /// The body value tree
    pub fn body(&self) -> &Data {
        &self.body
    }

    /// Mutable access to the body value tree
    pub fn body_mut(&mut self) -> &mut Data {
        &mut self.body
    }

    /// Replaces the body with a single typed value and clears the inferred
    /// flag, so the body serializes as an amqp-value section
    pub fn set_body_value(&mut self, value: impl Into<Value>) {
        self.body.clear();
        self.body = Data::from(value.into());
        self.inferred = false;
    }

    /// Replaces the body with raw bytes and sets the inferred flag, so the
    /// body serializes as a data section
    pub fn set_body_bytes(&mut self, bytes: impl Into<Binary>) {
        self.body = Data::from(Value::Binary(bytes.into()));
        self.inferred = true;
    }

    /// Replaces the body with a string value
    pub fn set_body_string(&mut self, body: impl Into<String>) {
        self.set_body_value(Value::String(body.into()));
    }

    // -- encode / decode -----------------------------------------------------

    /// Encodes the message into `buf`, growing it by doubling from a 512
    /// byte start until the message fits. Returns the number of bytes
    /// written; `buf` is truncated to that length.
    ///
    /// Host-side map sections are encoded into wire form first; after this
    /// call the wire trees are the authority for all four cached sections.
    pub fn encode(&mut self, buf: &mut Vec<u8>) -> Result<usize, Error> {
        let mut tree = self.to_tree()?;
        let mut size = buf.capacity().max(MIN_ENCODE);
        loop {
            buf.resize(size, 0);
            match tree.encode(buf.as_mut_slice()) {
                Ok(written) => {
                    buf.truncate(written);
                    trace!(len = written, "message encoded");
                    return Ok(written);
                }
                Err(amqp_data::Error::Overflow) => size *= 2,
                Err(err) => {
                    buf.clear();
                    return Err(Error::Codec(err));
                }
            }
        }
    }

    /// Encodes the message into a fresh byte vector
    pub fn encode_to_vec(&mut self) -> Result<Vec<u8>, Error> {
        let mut buf = Vec::new();
        self.encode(&mut buf)?;
        Ok(buf)
    }

    /// Decodes a message from `bytes`, replacing all state. The host maps
    /// lose their authority: the decoded sections stay in wire form until
    /// accessed. Malformed input leaves the message cleared.
    pub fn decode(&mut self, bytes: &[u8]) -> Result<(), Error> {
        self.clear();
        trace!(len = bytes.len(), "decoding message");
        match self.decode_sections(bytes) {
            Ok(()) => Ok(()),
            Err(err) => {
                self.clear();
                Err(err)
            }
        }
    }

    /// Copies the message through an encode and decode pair, which is the
    /// defined copy semantics for messages
    pub fn try_clone(&mut self) -> Result<Message, Error> {
        let buf = self.encode_to_vec()?;
        let mut message = Message::new();
        message.decode(&buf)?;
        Ok(message)
    }

    // -- serialization internals ---------------------------------------------

    /// Flushes host maps to wire form and lays the populated sections out in
    /// serialization order.
    fn to_tree(&mut self) -> Result<Data, Error> {
        self.instructions.flush_to_wire();
        self.annotations.flush_to_wire();
        self.properties.flush_to_wire();
        self.footer.flush_to_wire();

        let mut sections = Vec::new();
        if let Some(fields) = self.header_fields() {
            sections.push(described(SectionCode::Header, Value::List(fields)));
        }
        if let Some(map) = self.instructions.wire_value() {
            sections.push(described(SectionCode::DeliveryAnnotations, map.clone()));
        }
        if let Some(map) = self.annotations.wire_value() {
            sections.push(described(SectionCode::MessageAnnotations, map.clone()));
        }
        if let Some(fields) = self.properties_fields() {
            sections.push(described(SectionCode::Properties, Value::List(fields)));
        }
        if let Some(map) = self.properties.wire_value() {
            sections.push(described(SectionCode::ApplicationProperties, map.clone()));
        }
        for value in self.body.values() {
            sections.push(body_section(value, self.inferred));
        }
        if let Some(map) = self.footer.wire_value() {
            sections.push(described(SectionCode::Footer, map.clone()));
        }
        Ok(sections.into_iter().collect())
    }

    /// Header fields in wire order, with defaults as null and trailing
    /// nulls trimmed. `None` when every field is at its default.
    fn header_fields(&self) -> Option<Vec<Value>> {
        let mut fields = vec![
            if self.durable {
                Value::Bool(true)
            } else {
                Value::Null
            },
            if self.priority != Priority::default() {
                Value::UByte(self.priority.0)
            } else {
                Value::Null
            },
            Value::from(self.ttl),
            if self.first_acquirer {
                Value::Bool(true)
            } else {
                Value::Null
            },
            if self.delivery_count != 0 {
                Value::UInt(self.delivery_count)
            } else {
                Value::Null
            },
        ];
        trim_trailing_nulls(&mut fields);
        (!fields.is_empty()).then_some(fields)
    }

    /// Properties fields in wire order, trailing nulls trimmed
    fn properties_fields(&self) -> Option<Vec<Value>> {
        let mut fields = vec![
            Value::from(self.id.clone()),
            Value::from(self.user_id.clone()),
            Value::from(self.address.clone()),
            Value::from(self.subject.clone()),
            Value::from(self.reply_to.clone()),
            Value::from(self.correlation_id.clone()),
            Value::from(self.content_type.clone()),
            Value::from(self.content_encoding.clone()),
            Value::from(self.expiry_time),
            Value::from(self.creation_time),
            Value::from(self.group_id.clone()),
            // the wire type of group-sequence is a uint
            Value::from(self.group_sequence.map(|v| v as u32)),
            Value::from(self.reply_to_group_id.clone()),
        ];
        trim_trailing_nulls(&mut fields);
        (!fields.is_empty()).then_some(fields)
    }

    fn decode_sections(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let mut offset = 0;
        while offset < bytes.len() {
            let (value, consumed) = decode::decode_value(&bytes[offset..])?;
            offset += consumed;
            self.apply_section(value)?;
        }
        Ok(())
    }

    fn apply_section(&mut self, value: Value) -> Result<(), Error> {
        let described = match value {
            Value::Described(described) => *described,
            _ => return Err(Error::NotASection),
        };
        let code = SectionCode::from_descriptor(&described.descriptor)
            .ok_or(Error::UnknownSection)?;
        let section = code.name();
        let body = described.value;
        match code {
            SectionCode::Header => self
                .apply_header(body)
                .map_err(|e| Error::section(section, e))?,
            SectionCode::DeliveryAnnotations => self
                .instructions
                .set_wire(body)
                .map_err(|e| Error::section(section, e))?,
            SectionCode::MessageAnnotations => self
                .annotations
                .set_wire(body)
                .map_err(|e| Error::section(section, e))?,
            SectionCode::Properties => self
                .apply_properties(body)
                .map_err(|e| Error::section(section, e))?,
            SectionCode::ApplicationProperties => self
                .properties
                .set_wire(body)
                .map_err(|e| Error::section(section, e))?,
            SectionCode::Footer => self
                .footer
                .set_wire(body)
                .map_err(|e| Error::section(section, e))?,
            SectionCode::Data => match body {
                value @ Value::Binary(_) => {
                    self.push_body_value(value);
                    self.inferred = true;
                }
                value => {
                    return Err(Error::section(
                        section,
                        amqp_data::Error::TypeMismatch {
                            amqp: value.amqp_type(),
                            host: "data section binary",
                        },
                    ))
                }
            },
            SectionCode::AmqpSequence => match body {
                value @ Value::List(_) => {
                    self.push_body_value(value);
                    self.inferred = true;
                }
                value => {
                    return Err(Error::section(
                        section,
                        amqp_data::Error::TypeMismatch {
                            amqp: value.amqp_type(),
                            host: "amqp-sequence list",
                        },
                    ))
                }
            },
            SectionCode::AmqpValue => {
                self.push_body_value(body);
                self.inferred = false;
            }
        }
        Ok(())
    }

    /// Appends a decoded body section value; repeated data or sequence
    /// sections accumulate in the body tree.
    fn push_body_value(&mut self, value: Value) {
        while self.body.next() {}
        let _ = self.body.put_value(value);
        self.body.rewind();
    }

    fn apply_header(&mut self, body: Value) -> Result<(), amqp_data::Error> {
        let fields = expect_list(body)?;
        for (index, field) in fields.into_iter().enumerate() {
            match index {
                0 => self.durable = Option::<bool>::try_from(field)?.unwrap_or(false),
                1 => {
                    self.priority = Option::<u8>::try_from(field)?
                        .map(Priority)
                        .unwrap_or_default()
                }
                2 => self.ttl = Option::<u32>::try_from(field)?,
                3 => self.first_acquirer = Option::<bool>::try_from(field)?.unwrap_or(false),
                4 => self.delivery_count = Option::<u32>::try_from(field)?.unwrap_or(0),
                _ => break,
            }
        }
        Ok(())
    }

    fn apply_properties(&mut self, body: Value) -> Result<(), amqp_data::Error> {
        let fields = expect_list(body)?;
        for (index, field) in fields.into_iter().enumerate() {
            match index {
                0 => self.id = option_message_id(field)?,
                1 => self.user_id = Option::<Binary>::try_from(field)?,
                2 => self.address = Option::<String>::try_from(field)?,
                3 => self.subject = Option::<String>::try_from(field)?,
                4 => self.reply_to = Option::<String>::try_from(field)?,
                5 => self.correlation_id = option_message_id(field)?,
                6 => self.content_type = option_symbol(field)?,
                7 => self.content_encoding = option_symbol(field)?,
                8 => self.expiry_time = Option::<Timestamp>::try_from(field)?,
                9 => self.creation_time = Option::<Timestamp>::try_from(field)?,
                10 => self.group_id = Option::<String>::try_from(field)?,
                11 => self.group_sequence = Option::<u32>::try_from(field)?.map(|v| v as i32),
                12 => self.reply_to_group_id = Option::<String>::try_from(field)?,
                _ => break,
            }
        }
        Ok(())
    }
}

fn described(code: SectionCode, value: Value) -> Value {
    Value::from(Described::new(code.descriptor_code(), value))
}

/// Selects the body section kind from the inferred flag: an inferred raw
/// binary becomes a data section and an inferred list an amqp-sequence;
/// everything else is carried as an amqp-value.
fn body_section(value: &Value, inferred: bool) -> Value {
    let code = if inferred {
        match value {
            Value::Binary(_) => SectionCode::Data,
            Value::List(_) => SectionCode::AmqpSequence,
            _ => SectionCode::AmqpValue,
        }
    } else {
        SectionCode::AmqpValue
    };
    described(code, value.clone())
}

fn trim_trailing_nulls(fields: &mut Vec<Value>) {
    while matches!(fields.last(), Some(Value::Null)) {
        fields.pop();
    }
}

fn expect_list(value: Value) -> Result<Vec<Value>, amqp_data::Error> {
    match value {
        Value::List(fields) => Ok(fields),
        value => Err(amqp_data::Error::TypeMismatch {
            amqp: value.amqp_type(),
            host: "section field list",
        }),
    }
}

fn option_message_id(value: Value) -> Result<Option<MessageId>, amqp_data::Error> {
    match value {
        Value::Null => Ok(None),
        value => MessageId::try_from(value).map(Some),
    }
}

/// content-type and content-encoding are symbols on the wire, but a string
/// from a lenient peer is tolerated
fn option_symbol(value: Value) -> Result<Option<Symbol>, amqp_data::Error> {
    match value {
        Value::Null => Ok(None),
        Value::Symbol(symbol) => Ok(Some(symbol)),
        Value::String(string) => Ok(Some(Symbol(string))),
        value => Err(amqp_data::Error::TypeMismatch {
            amqp: value.amqp_type(),
            host: "symbol",
        }),
    }
}
