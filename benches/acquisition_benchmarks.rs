use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::rngs::StdRng;
use rand::SeedableRng;
use strobe_core::acquisition::SampleChannel;
use strobe_core::config::{LinkConfig, SyntheticConfig};
use strobe_core::hal::scripted::build_packet;
use strobe_core::hal::simulator::SyntheticGenerator;
use strobe_core::protocol::{PacketDecoder, PacketLayout};

const CHANNEL_COUNTS: &[usize] = &[1, 8, 32, 64];

fn decoder_for(channel_count: usize) -> PacketDecoder {
    let config = LinkConfig {
        channel_count,
        ..LinkConfig::default()
    };
    PacketDecoder::new(&config)
}

fn benchmark_packet_decoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("packet_decoding");

    for &channel_count in CHANNEL_COUNTS {
        let decoder = decoder_for(channel_count);
        let readings: Vec<(u16, u16)> = (0..channel_count as u16).map(|i| (i * 3, 4095 - i)).collect();
        let bytes = build_packet(decoder.layout(), &readings);

        group.throughput(Throughput::Bytes(bytes.len() as u64));

        group.bench_with_input(BenchmarkId::new("frame_and_decode", channel_count), &bytes, |b, bytes| {
            b.iter(|| {
                let raw = decoder.frame(black_box(bytes.clone())).unwrap();
                black_box(decoder.decode(&raw))
            });
        });

        // Marker set on every block
        let mut invalid = bytes.clone();
        let layout: PacketLayout = *decoder.layout();
        for channel in 0..channel_count {
            invalid[channel * layout.bytes_per_channel + layout.invalid_marker_offset] = layout.invalid_marker_value;
        }
        let raw_invalid = decoder.frame(invalid).unwrap();
        group.bench_with_input(BenchmarkId::new("decode_invalid", channel_count), &raw_invalid, |b, raw| {
            b.iter(|| black_box(decoder.decode(black_box(raw))));
        });
    }

    group.finish();
}

fn benchmark_synthetic_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("synthetic_generation");
    let config = SyntheticConfig::default();

    for &channel_count in CHANNEL_COUNTS {
        group.throughput(Throughput::Elements(channel_count as u64));
        group.bench_with_input(BenchmarkId::new("next_sample", channel_count), &channel_count, |b, &channels| {
            let mut generator = SyntheticGenerator::new(StdRng::seed_from_u64(42), channels, &config);
            b.iter(|| black_box(generator.next_sample()));
        });
    }

    group.finish();
}

fn benchmark_sample_handoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("sample_handoff");
    group.throughput(Throughput::Elements(1000));

    group.bench_function("publish_drain_1000", |b| {
        let (sender, receiver) = SampleChannel::unbounded();
        let mut generator = SyntheticGenerator::new(StdRng::seed_from_u64(7), 8, &SyntheticConfig::default());
        let sample = generator.next_sample();

        b.iter(|| {
            for _ in 0..1000 {
                sender.publish(sample.clone()).unwrap();
            }
            black_box(receiver.drain())
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_packet_decoding,
    benchmark_synthetic_generation,
    benchmark_sample_handoff
);
criterion_main!(benches);
