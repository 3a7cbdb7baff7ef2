//! Benchmarks for the audio-thread hand-off.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use phobz_scope::audio::sine_block;
use phobz_scope::render;
use phobz_scope::{EncodingDescriptor, WaveformStage};

fn bench_publish(c: &mut Criterion) {
    let mut group = c.benchmark_group("Stage");

    let (dispatcher, _queue) = render::channel(8);
    let stage = WaveformStage::new(Box::new(dispatcher));
    let encoding = EncodingDescriptor::stereo(48000);
    stage.set_encoding(encoding);
    let block = sine_block(440.0, encoding, 512, 0.8);

    // Slot stays full and the dispatcher scheduled: the steady-state audio path.
    group.bench_function("publish_512_stereo", |b| {
        b.iter(|| stage.publish(black_box(block.clone())));
    });

    group.bench_function("publish_take_512_stereo", |b| {
        b.iter(|| {
            stage.publish(block.clone());
            black_box(stage.take_latest())
        });
    });

    let samples = block.samples().to_vec();
    group.bench_function("try_publish_samples_512_stereo", |b| {
        b.iter(|| black_box(stage.try_publish_samples(samples.clone())));
    });

    group.finish();
}

criterion_group!(benches, bench_publish);
criterion_main!(benches);
