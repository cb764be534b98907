//! The AMQP 1.0 message container built on top of the [`amqp_data`] value
//! codec.
//!
//! A [`Message`] carries the fixed header and properties fields as plain
//! host values, keeps its map sections lazily cached between wire form and
//! host form, and holds the body as a value tree.

pub mod annotations;
pub mod error;
pub mod message;
pub mod message_id;
pub mod section;

pub use annotations::{Annotations, OwnedKey};
pub use error::Error;
pub use message::{ApplicationProperties, Message};
pub use message_id::MessageId;
pub use section::{Milliseconds, Priority, SectionCode};
