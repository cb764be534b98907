#![allow(clippy::all)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::Rng;

use amqp_data::{
    decode::decode_value,
    encode::to_vec,
    primitives::{OrderedMap, Timestamp},
    value::{Array, Value},
};

fn criterion_benchmark(c: &mut Criterion) {
    let value = Value::Null;
    c.bench_function("encode null", |b| {
        b.iter(|| to_vec(black_box(&value)).unwrap())
    });

    let value = Value::Bool(rand::random());
    c.bench_function("encode bool", |b| {
        b.iter(|| to_vec(black_box(&value)).unwrap())
    });

    let value = Value::UInt(rand::random());
    c.bench_function("encode u32", |b| {
        b.iter(|| to_vec(black_box(&value)).unwrap())
    });

    let value = Value::Long(rand::random());
    c.bench_function("encode i64", |b| {
        b.iter(|| to_vec(black_box(&value)).unwrap())
    });

    let value = Value::Timestamp(Timestamp::from(rand::random::<i64>()));
    c.bench_function("encode timestamp", |b| {
        b.iter(|| to_vec(black_box(&value)).unwrap())
    });

    let mut rng = rand::thread_rng();
    let payload: Vec<u8> = (0..1024).map(|_| rng.gen()).collect();
    let value = Value::Binary(payload.into());
    c.bench_function("encode binary 1k", |b| {
        b.iter(|| to_vec(black_box(&value)).unwrap())
    });

    let value = Value::Array(Array::from(
        (0..256).map(|_| rng.gen::<i32>()).collect::<Vec<_>>(),
    ));
    c.bench_function("encode array of 256 i32", |b| {
        b.iter(|| to_vec(black_box(&value)).unwrap())
    });

    let mut map = OrderedMap::new();
    for i in 0..64u32 {
        map.insert(Value::String(format!("key-{}", i)), Value::UInt(i));
    }
    let value = Value::Map(map);
    let encoded = to_vec(&value).unwrap();
    c.bench_function("encode map of 64 entries", |b| {
        b.iter(|| to_vec(black_box(&value)).unwrap())
    });
    c.bench_function("decode map of 64 entries", |b| {
        b.iter(|| decode_value(black_box(&encoded)).unwrap())
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
