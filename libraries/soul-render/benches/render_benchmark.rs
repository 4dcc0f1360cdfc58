//! Performance benchmarks for the render path
//!
//! Run with: cargo bench -p soul-render --bench render_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use soul_core::{AudioBufferList, StreamFormat};
use soul_render::converter::Converter;
use soul_render::device::VirtualDevice;
use soul_render::graph::{GraphConfig, RenderGraph};
use soul_render::resampling::SrcComplexity;
use soul_render::sources::ToneSource;
use soul_render::units::{Delay, Gain, Limiter};
use std::sync::Arc;

const SLICE: usize = 512;

fn bench_converter(c: &mut Criterion) {
    let mut group = c.benchmark_group("converter");
    group.throughput(Throughput::Elements(SLICE as u64));

    for complexity in [
        SrcComplexity::Linear,
        SrcComplexity::Normal,
        SrcComplexity::Mastering,
        SrcComplexity::Maximum,
    ] {
        group.bench_with_input(
            BenchmarkId::new("44.1k->48k", format!("{:?}", complexity)),
            &complexity,
            |b, &complexity| {
                let source = ToneSource::new(44_100.0, 2, 1_000.0, 3_600.0);
                let format = StreamFormat::float32(48_000.0, 2);
                let mut converter =
                    Converter::new(Box::new(source), format, None).with_complexity(complexity);
                converter.open().unwrap();
                let mut buffer = AudioBufferList::new(format, SLICE);

                b.iter(|| black_box(converter.convert_audio(&mut buffer, SLICE)));
            },
        );
    }

    group.bench_function("passthrough", |b| {
        let source = ToneSource::new(48_000.0, 2, 1_000.0, 3_600.0);
        let format = StreamFormat::float32(48_000.0, 2);
        let mut converter = Converter::new(Box::new(source), format, None);
        converter.open().unwrap();
        let mut buffer = AudioBufferList::new(format, SLICE);

        b.iter(|| black_box(converter.convert_audio(&mut buffer, SLICE)));
    });

    group.finish();
}

fn bench_render_cycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("render_cycle");
    group.throughput(Throughput::Elements(SLICE as u64));

    for effects in [0usize, 1, 3] {
        group.bench_with_input(BenchmarkId::new("effects", effects), &effects, |b, &effects| {
            let mut graph = RenderGraph::new(GraphConfig::default());
            graph
                .open(Arc::new(VirtualDevice::new("bench", 48_000.0, 2)))
                .unwrap();
            graph
                .set_source(Box::new(ToneSource::new(44_100.0, 2, 440.0, 3_600.0)))
                .unwrap();
            for descriptor in [Gain::DESCRIPTOR, Delay::DESCRIPTOR, Limiter::DESCRIPTOR]
                .iter()
                .take(effects)
            {
                graph.add_effect(descriptor).unwrap();
            }
            graph.start().unwrap();

            let handle = graph.render_handle();
            let mut output = vec![0.0f32; SLICE * 2];
            b.iter(|| black_box(handle.render(black_box(&mut output), SLICE)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_converter, bench_render_cycle);
criterion_main!(benches);
