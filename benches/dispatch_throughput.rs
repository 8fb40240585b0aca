//! Benchmarks for the per-frame dispatch path
//!
//! Measures one full dispatch cycle for each route a frame can take:
//! - Valid COMMAND delivered to a recording sink
//! - Invalid COMMAND rejected after decoding
//! - Unknown type ids and length mismatches dropped before decoding
//!
//! Also measures the COMMAND decoder alone, without registry lookup or sink.

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use farmlink::decoders::{CommandDecoder, PacketDecoder};
use farmlink::test_utils::{RecordingErrorSink, RecordingCommandSink};
use farmlink::types::{Frame, FrameSchema, PACKET_SIZE, PacketType};
use farmlink::{Dispatcher, FrameBuilder, encode_command, standard_dispatcher};
use std::hint::black_box;

fn dispatcher() -> Dispatcher {
    standard_dispatcher(
        Box::new(RecordingCommandSink::default()),
        Box::new(RecordingErrorSink::default()),
    )
    .expect("standard layout is valid")
}

fn bench_dispatch_routes(c: &mut Criterion) {
    let command = encode_command("G1 X120.5 Y40 F3000").expect("command fits").as_bytes().to_vec();
    let rejected = FrameBuilder::new(PacketType::Command.id()).valid(false).payload(b"G28").into_bytes();
    let unknown = FrameBuilder::new(42).into_bytes();
    let short = vec![1u8; 100];

    let mut group = c.benchmark_group("dispatch");
    group.throughput(Throughput::Bytes(PACKET_SIZE as u64));

    for (name, frame) in
        [("command", command), ("rejected", rejected), ("unknown_type", unknown), ("length_mismatch", short)]
    {
        // Recording sinks grow with every delivery, so each batch gets a fresh dispatcher.
        group.bench_function(name, |b| {
            b.iter_batched_ref(
                dispatcher,
                |dispatcher| black_box(dispatcher.dispatch(black_box(frame.clone()))),
                criterion::BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

fn bench_command_decoder(c: &mut Criterion) {
    let decoder = CommandDecoder::from_schema(&FrameSchema::standard()).expect("standard layout is valid");
    let frame: Frame = encode_command("  G28  ").expect("command fits");

    c.bench_function("decode_command", |b| b.iter(|| black_box(decoder.decode(black_box(&frame)))));
}

criterion_group!(benches, bench_dispatch_routes, bench_command_decoder);
criterion_main!(benches);
