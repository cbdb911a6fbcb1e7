use bytes::BytesMut;
use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use hexabus::core::crc::crc16;
use hexabus::{DataType, Packet, Value};

fn sample_packets() -> Vec<(&'static str, Packet)> {
    vec![
        ("query", Packet::Query { eid: 2 }),
        (
            "info_bool",
            Packet::Info {
                eid: 1,
                value: Value::Bool(true),
            },
        ),
        (
            "info_float",
            Packet::Info {
                eid: 3,
                value: Value::Float(21.5),
            },
        ),
        (
            "write_string",
            Packet::Write {
                eid: 4,
                value: Value::String("Living room lamp".into()),
            },
        ),
        (
            "epinfo",
            Packet::EndpointInfo {
                eid: 5,
                data_type: DataType::Uint32,
                description: "Power meter".into(),
            },
        ),
    ]
}

#[allow(clippy::unwrap_used)]
fn bench_packet_encode_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet_encode_decode");

    for (name, packet) in sample_packets() {
        let encoded = packet.encode().unwrap();
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_function(format!("encode_{name}"), |b| {
            b.iter_batched(
                || BytesMut::with_capacity(encoded.len()),
                |mut buf| {
                    packet.encode_into(&mut buf).unwrap();
                    buf
                },
                BatchSize::SmallInput,
            )
        });
        group.bench_function(format!("decode_{name}"), |b| {
            b.iter(|| {
                let decoded = Packet::decode(black_box(&encoded));
                assert!(decoded.is_ok());
            })
        });
    }

    group.finish();
}

fn bench_crc16(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc16");
    let longest = vec![0x5Au8; 136];
    group.throughput(Throughput::Bytes(longest.len() as u64));
    group.bench_function("largest_packet_body", |b| {
        b.iter(|| crc16(black_box(&longest)))
    });
    group.finish();
}

criterion_group!(benches, bench_packet_encode_decode, bench_crc16);
criterion_main!(benches);
