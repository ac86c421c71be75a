//! Property-based tests for the resampler.
//!
//! Uses proptest to check that loop unrolling, input chunking and ring
//! resizing never change the produced audio.

use proptest::prelude::*;
use transcode_resample_dyn::{InputRing, Quality, Resampler, ResamplerConfig, SliceProvider};

const RATES: [u32; 7] = [8000, 11025, 22050, 32000, 44100, 48000, 96000];

fn quality() -> impl Strategy<Value = Quality> {
    prop_oneof![Just(Quality::Low), Just(Quality::Medium), Just(Quality::High)]
}

#[allow(clippy::too_many_arguments)]
fn run(
    input_rate: u32,
    output_rate: u32,
    channels: usize,
    quality: Quality,
    max_stride: usize,
    input: &[i16],
    max_block: usize,
    frames: usize,
) -> (usize, Vec<i32>) {
    let config = ResamplerConfig::new(output_rate)
        .with_channels(channels)
        .with_quality(quality)
        .with_max_stride(max_stride)
        .with_input_rate(input_rate);
    let mut resampler = Resampler::new(config).unwrap();
    let mut provider = SliceProvider::new(input.to_vec(), channels).with_max_block(max_block);
    let mut out = vec![0i32; 2 * frames];
    let produced = resampler.resample(&mut out, frames, &mut provider);
    (produced, out)
}

// =============================================================================
// Kernel Equivalence
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Every unroll stride produces the same samples as the scalar loop.
    #[test]
    fn strides_are_bit_identical(
        input_rate in prop::sample::select(RATES.to_vec()),
        output_rate in prop::sample::select(RATES.to_vec()),
        channels in 1usize..=2,
        quality in quality(),
        samples in prop::collection::vec(any::<i16>(), 600..1200),
    ) {
        let frames = 200;
        let (n1, reference) = run(input_rate, output_rate, channels, quality, 1, &samples, usize::MAX, frames);
        for stride in [2, 4, 8, 16] {
            let (n, out) = run(input_rate, output_rate, channels, quality, stride, &samples, usize::MAX, frames);
            prop_assert_eq!(n, n1);
            prop_assert!(out == reference, "stride {} diverged", stride);
        }
    }

    /// Splitting the input into blocks of any size gives the same output.
    #[test]
    fn chunking_is_transparent(
        input_rate in prop::sample::select(RATES.to_vec()),
        channels in 1usize..=2,
        max_block in 1usize..300,
        samples in prop::collection::vec(any::<i16>(), 2000..2400),
    ) {
        let frames = 150;
        let (n, reference) = run(input_rate, 44100, channels, Quality::Medium, 16, &samples, usize::MAX, frames);
        let (m, out) = run(input_rate, 44100, channels, Quality::Medium, 16, &samples, max_block, frames);
        prop_assert_eq!(n, m);
        prop_assert!(out == reference);
    }
}

// =============================================================================
// Ring Buffer
// =============================================================================

proptest! {
    /// Resizing to the current geometry leaves history and impulse untouched.
    #[test]
    fn ring_resize_is_idempotent(
        channels in 1usize..=2,
        half in prop::sample::select(vec![8usize, 16, 24, 32, 40, 48]),
        samples in prop::collection::vec(any::<i16>(), 2..2000),
    ) {
        let mut ring = InputRing::new();
        ring.resize(channels, half);
        for index in 0..samples.len() / channels {
            ring.read_advance(&samples, index);
        }
        let history = ring.history().to_vec();
        let impulse = ring.impulse();

        ring.resize(channels, half);
        prop_assert_eq!(ring.history(), &history[..]);
        prop_assert_eq!(ring.impulse(), impulse);
    }

    /// Growing the filter keeps the frames around the impulse in place.
    #[test]
    fn ring_resize_keeps_recent_frames(
        half in prop::sample::select(vec![8usize, 16, 24]),
        extra in prop::sample::select(vec![8usize, 16, 24]),
        samples in prop::collection::vec(any::<i16>(), 1..500),
    ) {
        let mut ring = InputRing::new();
        ring.resize(1, half);
        for index in 0..samples.len() {
            ring.read_advance(&samples, index);
        }
        let old = ring.clone();

        ring.resize(1, half + extra);
        let new_half = half + extra;
        for m in 0..=half {
            prop_assert_eq!(
                ring.history()[ring.impulse() - m],
                old.history()[old.impulse() - m]
            );
        }
        for m in 1..=half {
            prop_assert_eq!(
                ring.history()[ring.impulse() + m],
                old.history()[old.impulse() + m]
            );
        }
        prop_assert!(ring.history()[ring.impulse() + half + 1..=ring.impulse() + new_half]
            .iter()
            .all(|&s| s == 0));
    }
}
