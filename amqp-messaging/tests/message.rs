//! End-to-end message round trips and the lazy section-cache contract.

use amqp_data::{
    primitives::{Binary, Symbol, Timestamp, Uuid},
    Data, Value,
};
use amqp_messaging::{Message, MessageId, OwnedKey};

#[test]
fn full_message_round_trips() {
    let mut message = Message::new();
    message.set_durable(true);
    message.set_priority(9);
    message.set_ttl(30_000);
    message.set_delivery_count(2);
    message.set_id(MessageId::Uuid(Uuid::from([7u8; 16])));
    message.set_user_id(b"user-1".to_vec());
    message.set_address("queue-a");
    message.set_subject("hello");
    message.set_reply_to("queue-b");
    message.set_correlation_id(42u64);
    message.set_content_type("application/json");
    message.set_content_encoding("gzip");
    message.set_expiry_time(1_700_000_100_000i64);
    message.set_creation_time(1_700_000_000_000i64);
    message.set_group_id("group-1");
    message.set_group_sequence(5);
    message.set_reply_to_group_id("group-2");
    message
        .instructions()
        .unwrap()
        .insert("x-opt-route".into(), Value::from("east"));
    message
        .annotations()
        .unwrap()
        .insert("x-opt-flag".into(), Value::Bool(true));
    message
        .properties()
        .unwrap()
        .insert("sn".to_owned(), Value::Int(1));
    message
        .footer()
        .unwrap()
        .insert("x-checksum".into(), Value::UInt(0xab));
    message.set_body_value(Value::from("the payload"));

    let buf = message.encode_to_vec().unwrap();

    let mut decoded = Message::new();
    decoded.decode(&buf).unwrap();

    assert!(decoded.durable());
    assert_eq!(decoded.priority(), 9);
    assert_eq!(decoded.ttl(), Some(30_000));
    assert!(!decoded.first_acquirer());
    assert_eq!(decoded.delivery_count(), 2);
    assert_eq!(decoded.id(), Some(&MessageId::Uuid(Uuid::from([7u8; 16]))));
    assert_eq!(decoded.user_id(), Some(&b"user-1"[..]));
    assert_eq!(decoded.address(), Some("queue-a"));
    assert_eq!(decoded.subject(), Some("hello"));
    assert_eq!(decoded.reply_to(), Some("queue-b"));
    assert_eq!(decoded.correlation_id(), Some(&MessageId::ULong(42)));
    assert_eq!(decoded.content_type(), Some("application/json"));
    assert_eq!(decoded.content_encoding(), Some("gzip"));
    assert_eq!(decoded.expiry_time(), Some(Timestamp::from(1_700_000_100_000)));
    assert_eq!(
        decoded.creation_time(),
        Some(Timestamp::from(1_700_000_000_000))
    );
    assert_eq!(decoded.group_id(), Some("group-1"));
    assert_eq!(decoded.group_sequence(), Some(5));
    assert_eq!(decoded.reply_to_group_id(), Some("group-2"));
    assert_eq!(
        decoded.instructions().unwrap().get(&OwnedKey::from("x-opt-route")),
        Some(&Value::from("east"))
    );
    assert_eq!(
        decoded.annotations().unwrap().get(&OwnedKey::from("x-opt-flag")),
        Some(&Value::Bool(true))
    );
    assert_eq!(
        decoded.properties().unwrap().get("sn"),
        Some(&Value::Int(1))
    );
    assert_eq!(
        decoded.footer().unwrap().get(&OwnedKey::from("x-checksum")),
        Some(&Value::UInt(0xab))
    );
    assert_eq!(decoded.body().values(), [Value::from("the payload")]);
    assert!(!decoded.inferred());
}

#[test]
fn annotations_survive_encode_decode_without_double_residency() {
    // start with an empty message, set one annotation through the host map
    let mut message = Message::new();
    message
        .annotations()
        .unwrap()
        .insert("x".into(), Value::Int(1));

    // encoding moves the authority to the wire tree
    let buf = message.encode_to_vec().unwrap();

    // a fresh message decoded from those bytes keeps the section in wire
    // form until it is read, then serves it from the host map
    let mut decoded = Message::new();
    decoded.decode(&buf).unwrap();
    let value = decoded
        .annotations()
        .unwrap()
        .get(&OwnedKey::from("x"))
        .cloned();
    assert_eq!(value, Some(Value::Int(1)));
}

#[test]
fn sections_in_wire_form_can_be_edited_and_reencoded() {
    let mut message = Message::new();
    message
        .annotations()
        .unwrap()
        .insert("a".into(), Value::Int(1));
    let buf = message.encode_to_vec().unwrap();

    let mut decoded = Message::new();
    decoded.decode(&buf).unwrap();
    decoded
        .annotations()
        .unwrap()
        .insert("b".into(), Value::Int(2));
    let buf = decoded.encode_to_vec().unwrap();

    let mut second = Message::new();
    second.decode(&buf).unwrap();
    let annotations = second.annotations().unwrap();
    assert_eq!(annotations.len(), 2);
    let keys: Vec<_> = annotations.iter().map(|(k, _)| k.clone()).collect();
    assert_eq!(keys, [OwnedKey::from("a"), OwnedKey::from("b")]);
}

#[test]
fn grow_on_overflow_handles_a_large_body() {
    let mut message = Message::new();
    message.set_body_bytes(vec![0x5au8; 10_000]);

    let mut buf = Vec::new();
    let written = message.encode(&mut buf).unwrap();
    assert_eq!(buf.len(), written);
    assert!(written > 10_000);

    // replay the grow loop over the same wire content and pin the exact
    // buffer sizes the encode walks through from its 512 byte start
    let mut tree = Data::new();
    let mut offset = 0;
    while offset < buf.len() {
        offset += tree.decode(&buf[offset..]).unwrap();
    }

    let mut sizes = Vec::new();
    let mut size = 512;
    let reencoded = loop {
        sizes.push(size);
        let mut attempt = vec![0u8; size];
        match tree.encode(&mut attempt) {
            Ok(n) => {
                attempt.truncate(n);
                break attempt;
            }
            Err(amqp_data::Error::Overflow) => size *= 2,
            Err(err) => panic!("unexpected error {:?}", err),
        }
    };
    assert_eq!(sizes, [512, 1024, 2048, 4096, 8192, 16384]);
    assert_eq!(reencoded, buf);

    let mut decoded = Message::new();
    decoded.decode(&buf).unwrap();
    assert!(decoded.inferred());
    assert_eq!(
        decoded.body().values(),
        [Value::Binary(Binary::from(vec![0x5au8; 10_000]))]
    );
}

#[test]
fn try_clone_copies_through_the_wire() {
    let mut message = Message::new();
    message.set_subject("copy me");
    message
        .properties()
        .unwrap()
        .insert("k".to_owned(), Value::from("v"));

    let mut clone = message.try_clone().unwrap();
    assert_eq!(clone.subject(), Some("copy me"));
    assert_eq!(
        clone.properties().unwrap().get("k"),
        Some(&Value::from("v"))
    );
}

#[test]
fn decode_replaces_previous_state() {
    let mut message = Message::new();
    message.set_subject("old");
    message
        .annotations()
        .unwrap()
        .insert("old-key".into(), Value::Int(1));
    let old = message.encode_to_vec().unwrap();

    let mut other = Message::new();
    other.set_address("somewhere");
    let new = other.encode_to_vec().unwrap();

    message.decode(&new).unwrap();
    assert_eq!(message.address(), Some("somewhere"));
    assert!(message.subject().is_none());
    assert!(message.annotations().unwrap().is_empty());

    // decoding the old bytes again restores the old state
    message.decode(&old).unwrap();
    assert_eq!(message.subject(), Some("old"));
    assert_eq!(message.annotations().unwrap().len(), 1);
}

#[test]
fn annotation_keys_can_be_symbols_or_ulongs() {
    let mut message = Message::new();
    message
        .annotations()
        .unwrap()
        .insert(Symbol::from("x-sym").into(), Value::Int(1));
    message
        .annotations()
        .unwrap()
        .insert(0x10u64.into(), Value::Int(2));

    let buf = message.encode_to_vec().unwrap();
    let mut decoded = Message::new();
    decoded.decode(&buf).unwrap();
    let annotations = decoded.annotations().unwrap();
    assert_eq!(annotations.get(&OwnedKey::from("x-sym")), Some(&Value::Int(1)));
    assert_eq!(
        annotations.get(&OwnedKey::ULong(0x10)),
        Some(&Value::Int(2))
    );
}

#[test]
fn message_id_variants_round_trip() {
    for id in [
        MessageId::ULong(7),
        MessageId::Uuid(Uuid::from([1u8; 16])),
        MessageId::Binary(Binary::from("raw")),
        MessageId::String("text-id".to_owned()),
    ] {
        let mut message = Message::new();
        message.set_id(id.clone());
        let buf = message.encode_to_vec().unwrap();
        let mut decoded = Message::new();
        decoded.decode(&buf).unwrap();
        assert_eq!(decoded.id(), Some(&id));
    }
}

#[test]
fn empty_bytes_decode_to_an_empty_message() {
    let mut message = Message::new();
    message.decode(&[]).unwrap();
    assert!(message.body().is_empty());
    assert!(message.id().is_none());
}
