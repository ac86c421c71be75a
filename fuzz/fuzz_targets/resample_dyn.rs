#![no_main]

//! Fuzz target for the dynamic resampler.
//!
//! Drives arbitrary rate changes, gains, output requests and input block
//! sizes through one resampler and checks the stream invariants hold.

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use transcode_resample_dyn::{Quality, Resampler, ResamplerConfig, SliceProvider};

#[derive(Arbitrary, Debug)]
struct ResampleInput {
    output_rate: u16,
    stereo: bool,
    quality: FuzzQuality,
    max_stride: u8,
    samples: Vec<i16>,
    max_block: u8,
    steps: Vec<Step>,
}

#[derive(Arbitrary, Debug, Clone, Copy)]
enum FuzzQuality {
    Low,
    Medium,
    High,
}

impl FuzzQuality {
    fn value(self) -> Quality {
        match self {
            FuzzQuality::Low => Quality::Low,
            FuzzQuality::Medium => Quality::Medium,
            FuzzQuality::High => Quality::High,
        }
    }
}

#[derive(Arbitrary, Debug)]
enum Step {
    SetRate(u32),
    SetVolume(f32, f32),
    SetQuality(FuzzQuality),
    Resample(u16),
    Reset,
    Init,
}

fuzz_target!(|input: ResampleInput| {
    let output_rate = u32::from(input.output_rate).max(1000);
    let channels = if input.stereo { 2 } else { 1 };
    let config = ResamplerConfig::new(output_rate)
        .with_channels(channels)
        .with_quality(input.quality.value())
        .with_max_stride(1 << (input.max_stride % 5));
    let Ok(mut resampler) = Resampler::new(config) else {
        return;
    };

    let mut provider =
        SliceProvider::new(input.samples, channels).with_max_block(usize::from(input.max_block));
    let mut out = vec![0i32; 2 * usize::from(u16::MAX)];

    for step in input.steps.into_iter().take(64) {
        match step {
            Step::SetRate(rate) => {
                // Keep designs cheap: at most 8x the output rate.
                let rate = rate % (output_rate * 8 + 1);
                if resampler.set_sample_rate(rate).is_ok() {
                    let constants = resampler.constants().expect("filter after rate set");
                    assert!(resampler.phase_fraction() < constants.phase_wrap_limit());
                }
            }
            Step::SetVolume(left, right) => {
                let _ = resampler.set_volume(left, right);
            }
            Step::SetQuality(quality) => {
                let _ = resampler.set_quality(quality.value());
            }
            Step::Resample(frames) => {
                let frames = usize::from(frames);
                let before = provider.frames_consumed();
                let produced = resampler.resample(&mut out, frames, &mut provider);
                assert!(produced <= frames);
                if produced < frames && resampler.input_rate() != 0 {
                    assert_eq!(provider.remaining_frames(), 0);
                }
                assert!(provider.frames_consumed() >= before);
            }
            Step::Reset => resampler.reset(),
            Step::Init => resampler.init(),
        }
    }
});
