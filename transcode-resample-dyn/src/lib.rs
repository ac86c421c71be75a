//! # Transcode Resample Dyn
//!
//! Dynamic-rate polyphase FIR resampling of 16-bit PCM.
//!
//! The input rate may change at any time while audio is flowing; small
//! changes keep the current filter and the stream phase, larger ones design
//! a new Kaiser-windowed sinc bank. Output is always stereo `i32` in Q4.27,
//! accumulated into the caller's buffer with per-channel gain.
//!
//! ## Features
//!
//! - Three quality tiers with 16-bit or 32-bit fixed-point taps
//! - Phase-locked kernels for rational ratios, interpolated kernels otherwise
//! - Mono or stereo interleaved input
//! - Pull-based input through [`BufferProvider`]
//!
//! ## Example
//!
//! ```
//! use transcode_resample_dyn::{Quality, Resampler, ResamplerConfig, SliceProvider};
//!
//! let config = ResamplerConfig::new(48000)
//!     .with_channels(1)
//!     .with_quality(Quality::Low)
//!     .with_input_rate(8000);
//! let mut resampler = Resampler::new(config)?;
//!
//! let input: Vec<i16> = (0..1000).map(|i| ((i % 16) * 1000) as i16).collect();
//! let mut provider = SliceProvider::new(input, 1);
//! let mut output = vec![0i32; 2 * 6000];
//! let frames = resampler.resample(&mut output, 6000, &mut provider);
//! assert_eq!(frames, 6000);
//! # Ok::<(), transcode_resample_dyn::ResampleError>(())
//! ```

#![allow(clippy::needless_range_loop)]
#![allow(clippy::too_many_arguments)]

pub mod constants;
pub mod design;
pub mod engine;
pub mod error;
pub mod provider;
pub mod quality;
pub mod ring;
mod resampler;

pub use constants::{CoefficientBank, FilterConstants};
pub use design::{Coefficient, FilterResponse};
pub use engine::{ChannelMode, Kernel, Stride, OUTPUT_CHANNELS, UNITY_GAIN};
pub use error::{ResampleError, Result};
pub use provider::{BufferProvider, SliceProvider};
pub use quality::{CoefWidth, Quality, QualityParams};
pub use ring::InputRing;
pub use resampler::{Resampler, ResamplerConfig, ResamplerState, MAX_GAIN, MAX_RATIO};

/// Calculate the greatest common divisor.
pub(crate) fn gcd(mut a: u32, mut b: u32) -> u32 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}
