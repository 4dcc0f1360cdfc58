//! Property-based tests for the render pipeline
//!
//! These tests use proptest to verify invariants across many random inputs.

use proptest::prelude::*;
use soul_core::{AudioBufferList, StreamFormat};
use soul_render::converter::Converter;
use soul_render::device::VirtualDevice;
use soul_render::graph::{GraphConfig, RenderGraph};
use soul_render::resampling::SrcComplexity;
use soul_render::sources::MemorySource;
use soul_render::units::{AudioUnit, Limiter};
use std::sync::Arc;

// Helper: expected converted length
fn expected_frames(frames: usize, src_rate: f64, dst_rate: f64) -> usize {
    ((frames as f64) * dst_rate / src_rate - 1e-9).ceil() as usize
}

fn rate() -> impl Strategy<Value = f64> {
    prop_oneof![
        Just(8_000.0),
        Just(22_050.0),
        Just(44_100.0),
        Just(48_000.0),
        Just(96_000.0),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Property: a source of n frames converts to exactly ceil(n × ratio) frames
    #[test]
    fn converted_length_is_exact(
        frames in 0usize..3000,
        src_rate in rate(),
        dst_rate in rate(),
        slice in 1usize..700,
    ) {
        let source = MemorySource::silence(StreamFormat::pcm_i16(src_rate, 2), frames);
        let mut converter = Converter::new(
            Box::new(source),
            StreamFormat::float32(dst_rate, 2),
            None,
        )
        .with_complexity(SrcComplexity::Linear);
        converter.open().unwrap();

        let mut buffer = AudioBufferList::new(*converter.format(), slice);
        let mut total = 0;
        loop {
            let n = converter.convert_audio(&mut buffer, slice);
            prop_assert!(n <= slice);
            if n == 0 {
                break;
            }
            total += n;
        }

        prop_assert_eq!(total, expected_frames(frames, src_rate, dst_rate));
        prop_assert!(converter.last_error().is_none());
    }

    /// Property: passthrough is bit-exact regardless of slice size
    #[test]
    fn passthrough_preserves_bits(
        samples in prop::collection::vec(-1.0f32..1.0, 2..2000),
        slice in 1usize..500,
        max_read in 1usize..300,
    ) {
        let format = StreamFormat::float32(48_000.0, 2);
        let samples = &samples[..samples.len() / 2 * 2];
        let source = MemorySource::from_f32(format, samples).with_max_read(max_read);
        let mut converter = Converter::new(Box::new(source), format, None);
        converter.open().unwrap();

        let mut buffer = AudioBufferList::new(format, slice);
        let mut out = Vec::with_capacity(samples.len());
        loop {
            let n = converter.convert_audio(&mut buffer, slice);
            if n == 0 {
                break;
            }
            out.extend(buffer.to_f32_vec());
        }
        prop_assert_eq!(out, samples.to_vec());
    }

    /// Property: the graph renders exactly the requested frames, always finite
    #[test]
    fn graph_output_is_finite_and_sized(
        samples in prop::collection::vec(-1.0f32..1.0, 2..4000),
        frames in 1usize..1500,
        volume in -1.0f32..2.0,
    ) {
        let mut graph = RenderGraph::new(GraphConfig::default());
        graph.open(Arc::new(VirtualDevice::new("prop", 48_000.0, 2))).unwrap();
        let samples = &samples[..samples.len() / 2 * 2];
        graph
            .set_source(Box::new(MemorySource::from_f32(
                StreamFormat::float32(44_100.0, 2),
                samples,
            )))
            .unwrap();
        graph.set_volume(volume);
        graph.start().unwrap();

        let handle = graph.render_handle();
        let mut output = vec![0.0f32; frames * 2];
        for _ in 0..3 {
            handle.render(&mut output, frames);
            prop_assert!(output.iter().all(|s| s.is_finite()));
        }
        prop_assert_eq!(graph.render_stats().frames_rendered, 3 * frames as u64);
        prop_assert!((0.0..=1.0).contains(&graph.volume()));
    }

    /// Property: the limiter never exceeds its ceiling on any channel count
    #[test]
    fn limiter_holds_ceiling(
        samples in prop::collection::vec(-4.0f32..4.0, 64..2048),
        channels in 1usize..8,
    ) {
        let mut limiter = Limiter::new();
        limiter
            .initialize(&StreamFormat::float32(48_000.0, channels as u16), 2048)
            .unwrap();
        let frames = samples.len() / channels;
        let mut buffer = samples[..frames * channels].to_vec();
        limiter.process(&mut buffer, channels);

        let ceiling = 10.0f32.powf(-0.3 / 20.0);
        prop_assert!(buffer.iter().all(|s| s.abs() <= ceiling + 1e-4));
    }
}
