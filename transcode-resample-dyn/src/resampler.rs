//! Dynamic-rate resampler.
//!
//! Wraps the filter store, history ring and convolution kernels behind a
//! pull interface: the caller asks for output frames and the resampler
//! pulls as much input from a [`BufferProvider`] as those frames need.

use crate::constants::{self, CoefficientBank, FilterConstants};
use crate::engine::{fir, ChannelMode, Kernel, Stride, Tap, OUTPUT_CHANNELS, UNITY_GAIN};
use crate::error::{ResampleError, Result};
use crate::provider::BufferProvider;
use crate::quality::Quality;
use crate::ring::InputRing;
use tracing::{debug, trace, warn};

/// Largest U4.12 gain, just under 16.0.
pub const MAX_GAIN: i32 = 0xFFFF;

/// Input rate may be at most this many times the output rate, and at least
/// its reciprocal.
pub const MAX_RATIO: u32 = 256;

/// Configuration for the resampler.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResamplerConfig {
    /// Input sample width in bits. Only 16 is supported.
    pub bit_depth: u32,
    /// Number of interleaved input channels (1 or 2).
    pub channels: usize,
    /// Output sample rate in Hz.
    pub output_rate: u32,
    /// Input sample rate to start with, if known at construction.
    pub input_rate: Option<u32>,
    /// Filter quality tier.
    pub quality: Quality,
    /// Widest loop unroll the kernels may use.
    pub max_stride: usize,
}

impl Default for ResamplerConfig {
    fn default() -> Self {
        Self::new(48000)
    }
}

impl ResamplerConfig {
    /// Create a new configuration for stereo 16-bit input.
    pub fn new(output_rate: u32) -> Self {
        Self {
            bit_depth: 16,
            channels: 2,
            output_rate,
            input_rate: None,
            quality: Quality::default(),
            max_stride: 16,
        }
    }

    /// Set the number of channels.
    pub fn with_channels(mut self, channels: usize) -> Self {
        self.channels = channels;
        self
    }

    /// Set the quality tier.
    pub fn with_quality(mut self, quality: Quality) -> Self {
        self.quality = quality;
        self
    }

    /// Set the input sample width.
    pub fn with_bit_depth(mut self, bits: u32) -> Self {
        self.bit_depth = bits;
        self
    }

    /// Limit loop unrolling.
    pub fn with_max_stride(mut self, stride: usize) -> Self {
        self.max_stride = stride;
        self
    }

    /// Set the initial input rate.
    pub fn with_input_rate(mut self, rate: u32) -> Self {
        self.input_rate = Some(rate);
        self
    }

    /// Create a config for fast, low-quality resampling.
    pub fn fast(output_rate: u32) -> Self {
        Self::new(output_rate).with_quality(Quality::Low)
    }

    /// Create a config for high-quality resampling.
    pub fn high_quality(output_rate: u32) -> Self {
        Self::new(output_rate).with_quality(Quality::High)
    }
}

/// Lifecycle of a [`Resampler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResamplerState {
    /// No input rate has been set; [`Resampler::resample`] produces nothing.
    Uninitialized,
    /// Filter, ring and kernel match the current input rate.
    Ready,
    /// A rate change is being applied.
    RateChanging,
}

/// Dynamic-rate polyphase resampler producing stereo Q4.27 output.
pub struct Resampler {
    config: ResamplerConfig,
    channels: ChannelMode,
    max_stride: Stride,
    input_rate: u32,
    /// Rate the current bank was designed for, 0 when none.
    designed_rate: u32,
    constants: Option<FilterConstants>,
    ring: InputRing,
    phase_fraction: u32,
    phase_increment: u32,
    volume: [i32; 2],
    kernel: Option<Kernel>,
    state: ResamplerState,
}

impl Resampler {
    /// Create a new resampler from configuration.
    pub fn new(config: ResamplerConfig) -> Result<Self> {
        if config.bit_depth != 16 {
            return Err(ResampleError::UnsupportedBitDepth {
                bits: config.bit_depth,
            });
        }
        let channels = ChannelMode::from_count(config.channels)?;
        if config.output_rate == 0 {
            return Err(ResampleError::InvalidSampleRate {
                rate: config.output_rate,
            });
        }
        let max_stride = Stride::from_value(config.max_stride)?;

        let mut resampler = Self {
            channels,
            max_stride,
            input_rate: 0,
            designed_rate: 0,
            constants: None,
            ring: InputRing::new(),
            phase_fraction: 0,
            phase_increment: 0,
            volume: [UNITY_GAIN; 2],
            kernel: None,
            state: ResamplerState::Uninitialized,
            config,
        };
        if let Some(rate) = resampler.config.input_rate {
            resampler.set_sample_rate(rate)?;
        }
        Ok(resampler)
    }

    /// Forget the designed filter and the input history.
    ///
    /// The next [`set_sample_rate`](Self::set_sample_rate) designs from scratch.
    pub fn init(&mut self) {
        self.input_rate = 0;
        self.designed_rate = 0;
        self.constants = None;
        self.kernel = None;
        self.ring = InputRing::new();
        self.phase_fraction = 0;
        self.phase_increment = 0;
        self.state = ResamplerState::Uninitialized;
    }

    /// Change the input sample rate.
    ///
    /// Small changes keep the current filter and carry the stream phase over,
    /// so rates can be swept while audio is flowing.
    pub fn set_sample_rate(&mut self, rate: u32) -> Result<()> {
        let output_rate = self.config.output_rate;
        if rate == 0 {
            return Err(ResampleError::InvalidSampleRate { rate });
        }
        if u64::from(rate) > u64::from(output_rate) * u64::from(MAX_RATIO)
            || u64::from(rate) * u64::from(MAX_RATIO) < u64::from(output_rate)
        {
            return Err(ResampleError::RatioTooExtreme {
                ratio: f64::from(rate) / f64::from(output_rate),
            });
        }
        if rate == self.input_rate {
            return Ok(());
        }
        self.configure(rate)
    }

    /// Switch quality tier, redesigning the filter if a rate is set.
    pub fn set_quality(&mut self, quality: Quality) -> Result<()> {
        if quality == self.config.quality {
            return Ok(());
        }
        self.config.quality = quality;
        self.designed_rate = 0;
        match self.input_rate {
            0 => Ok(()),
            rate => self.configure(rate),
        }
    }

    fn configure(&mut self, rate: u32) -> Result<()> {
        let output_rate = self.config.output_rate;
        let prev_rate = self.input_rate;
        let old_wrap = self
            .constants
            .as_ref()
            .map_or(0, FilterConstants::phase_wrap_limit);
        if self.state == ResamplerState::Ready {
            self.state = ResamplerState::RateChanging;
        }

        if constants::is_close(rate, prev_rate, self.designed_rate, output_rate) {
            trace!(
                from = prev_rate,
                to = rate,
                designed = self.designed_rate,
                "keeping filter across rate change"
            );
        } else {
            let filter = FilterConstants::build(self.config.quality, rate, output_rate);
            debug!(
                input_rate = rate,
                output_rate,
                quality = %self.config.quality,
                phases = filter.phase_count(),
                half_num_coefs = filter.half_num_coefs(),
                coef_shift = filter.coef_shift(),
                "designed polyphase filter"
            );
            self.constants = Some(filter);
            self.designed_rate = rate;
        }
        self.input_rate = rate;

        let Some(filter) = self.constants.as_ref() else {
            return Err(ResampleError::internal("no filter after design"));
        };
        let wrap = filter.phase_wrap_limit();
        let shift = filter.coef_shift();
        let half_num_coefs = filter.half_num_coefs();

        self.ring.resize(self.channels.count(), half_num_coefs);

        self.phase_fraction = if old_wrap == 0 {
            0
        } else {
            (u64::from(self.phase_fraction) * u64::from(wrap) / u64::from(old_wrap) % u64::from(wrap))
                as u32
        };
        self.phase_increment = ((u64::from(wrap) * u64::from(rate) + u64::from(output_rate) / 2)
            / u64::from(output_rate)) as u32;

        let kernel = Kernel::select(
            self.channels,
            self.phase_increment,
            shift,
            half_num_coefs,
            filter.bank().width(),
            self.max_stride,
        );
        if kernel.phase_locked {
            self.phase_fraction &= !((1u32 << shift) - 1);
        }
        if self.kernel != Some(kernel) {
            debug!(?kernel, phase_increment = self.phase_increment, "selected convolution kernel");
        }
        self.kernel = Some(kernel);
        self.state = ResamplerState::Ready;
        Ok(())
    }

    /// Set per-channel gains (1.0 is unity). Gains saturate just below 16.0.
    pub fn set_volume(&mut self, left: f32, right: f32) -> Result<()> {
        if !(left >= 0.0 && right >= 0.0) {
            return Err(ResampleError::InvalidVolume { left, right });
        }
        self.volume = [gain_to_fixed(left), gain_to_fixed(right)];
        Ok(())
    }

    /// Current gains as applied, after fixed-point rounding.
    pub fn volume(&self) -> (f32, f32) {
        let unity = UNITY_GAIN as f32;
        (self.volume[0] as f32 / unity, self.volume[1] as f32 / unity)
    }

    /// Produce up to `frame_count` stereo frames, adding them into `out`.
    ///
    /// `out` holds interleaved Q4.27 samples and is accumulated into, so it
    /// must be cleared by the caller for plain output. Input is pulled from
    /// `provider`; if it runs dry the frames produced so far are returned.
    pub fn resample<P: BufferProvider + ?Sized>(
        &mut self,
        out: &mut [i32],
        frame_count: usize,
        provider: &mut P,
    ) -> usize {
        let frame_count = frame_count.min(out.len() / OUTPUT_CHANNELS);
        let (Some(kernel), Some(filter)) = (self.kernel, self.constants.as_ref()) else {
            warn!("resample called before an input rate was set");
            return 0;
        };
        if frame_count == 0 {
            return 0;
        }
        debug_assert_eq!(kernel.width, filter.bank().width());

        let stream = Stream {
            ring: &mut self.ring,
            phase_fraction: &mut self.phase_fraction,
            phase_increment: self.phase_increment,
            wrap: filter.phase_wrap_limit(),
            shift: filter.coef_shift(),
            half_num_coefs: filter.half_num_coefs(),
            volume: self.volume,
        };
        match filter.bank() {
            CoefficientBank::S16(coefs) => {
                dispatch(kernel, stream, coefs.as_slice(), out, frame_count, provider)
            }
            CoefficientBank::S32(coefs) => {
                dispatch(kernel, stream, coefs.as_slice(), out, frame_count, provider)
            }
        }
    }

    /// Zero the phase and the input history, keeping the filter.
    pub fn reset(&mut self) {
        self.phase_fraction = 0;
        self.ring.clear();
    }

    /// Get the input sample rate (0 before one is set).
    pub fn input_rate(&self) -> u32 {
        self.input_rate
    }

    /// Get the output sample rate.
    pub fn output_rate(&self) -> u32 {
        self.config.output_rate
    }

    /// Get the resampling ratio (output_rate / input_rate).
    pub fn ratio(&self) -> f64 {
        match self.input_rate {
            0 => 0.0,
            rate => f64::from(self.config.output_rate) / f64::from(rate),
        }
    }

    /// Get the number of input channels.
    pub fn channels(&self) -> usize {
        self.channels.count()
    }

    /// Get the quality tier.
    pub fn quality(&self) -> Quality {
        self.config.quality
    }

    /// Get the configuration.
    pub fn config(&self) -> &ResamplerConfig {
        &self.config
    }

    /// Get the lifecycle state.
    pub fn state(&self) -> ResamplerState {
        self.state
    }

    /// Get the active kernel, if a rate is set.
    pub fn kernel(&self) -> Option<Kernel> {
        self.kernel
    }

    /// Get the active filter, if a rate is set.
    pub fn constants(&self) -> Option<&FilterConstants> {
        self.constants.as_ref()
    }

    /// Input rate the active filter was designed for.
    pub fn designed_rate(&self) -> Option<u32> {
        (self.designed_rate != 0).then_some(self.designed_rate)
    }

    /// Get the phase step per output frame.
    pub fn phase_increment(&self) -> u32 {
        self.phase_increment
    }

    /// Get the phase accumulator.
    pub fn phase_fraction(&self) -> u32 {
        self.phase_fraction
    }

    /// Delay through the filter, in input frames.
    pub fn latency(&self) -> usize {
        self.constants
            .as_ref()
            .map_or(0, |c| c.half_num_coefs() + 1)
    }
}

impl std::fmt::Debug for Resampler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Resampler")
            .field("input_rate", &self.input_rate)
            .field("output_rate", &self.config.output_rate)
            .field("channels", &self.channels)
            .field("quality", &self.config.quality)
            .field("state", &self.state)
            .field("kernel", &self.kernel)
            .field("latency", &self.latency())
            .finish()
    }
}

fn gain_to_fixed(gain: f32) -> i32 {
    (gain * UNITY_GAIN as f32).round().min(MAX_GAIN as f32) as i32
}

/// Mutable stream state handed to a kernel for one `resample` call.
struct Stream<'a> {
    ring: &'a mut InputRing,
    phase_fraction: &'a mut u32,
    phase_increment: u32,
    wrap: u32,
    shift: u32,
    half_num_coefs: usize,
    volume: [i32; 2],
}

fn dispatch<T: Tap, P: BufferProvider + ?Sized>(
    kernel: Kernel,
    stream: Stream<'_>,
    coefs: &[T],
    out: &mut [i32],
    frame_count: usize,
    provider: &mut P,
) -> usize {
    macro_rules! by_stride {
        ($ch:literal, $locked:literal) => {
            match kernel.stride {
                Stride::X1 => run::<$ch, $locked, 1, T, P>(stream, coefs, out, frame_count, provider),
                Stride::X2 => run::<$ch, $locked, 2, T, P>(stream, coefs, out, frame_count, provider),
                Stride::X4 => run::<$ch, $locked, 4, T, P>(stream, coefs, out, frame_count, provider),
                Stride::X8 => run::<$ch, $locked, 8, T, P>(stream, coefs, out, frame_count, provider),
                Stride::X16 => run::<$ch, $locked, 16, T, P>(stream, coefs, out, frame_count, provider),
            }
        };
    }

    match (kernel.channels, kernel.phase_locked) {
        (ChannelMode::Mono, true) => by_stride!(1, true),
        (ChannelMode::Mono, false) => by_stride!(1, false),
        (ChannelMode::Stereo, true) => by_stride!(2, true),
        (ChannelMode::Stereo, false) => by_stride!(2, false),
    }
}

/// The resampling loop for one kernel configuration.
///
/// Each output frame advances the phase by the increment; every time the
/// phase passes `wrap` one input frame is pulled into the ring. Input owed
/// after the last output frame is pulled too, so the phase ends below
/// `wrap` whenever the provider keeps up.
fn run<const CH: usize, const LOCKED: bool, const STRIDE: usize, T: Tap, P: BufferProvider + ?Sized>(
    stream: Stream<'_>,
    coefs: &[T],
    out: &mut [i32],
    frame_count: usize,
    provider: &mut P,
) -> usize {
    let Stream {
        ring,
        phase_fraction,
        phase_increment,
        wrap,
        shift,
        half_num_coefs,
        volume,
    } = stream;

    let out_samples = frame_count * OUTPUT_CHANNELS;
    let mut out_index = 0;
    let mut phase = *phase_fraction;
    let mut frames_owed = ((u64::from(phase_increment) * frame_count as u64 + u64::from(phase))
        / u64::from(wrap)) as usize;

    macro_rules! emit {
        () => {
            while phase < wrap && out_index < out_samples {
                fir::<CH, LOCKED, STRIDE, T>(
                    &mut out[out_index..out_index + OUTPUT_CHANNELS],
                    phase,
                    wrap,
                    shift,
                    half_num_coefs,
                    coefs,
                    ring.history(),
                    ring.impulse(),
                    &volume,
                );
                out_index += OUTPUT_CHANNELS;
                phase += phase_increment;
            }
        };
    }

    emit!();
    while phase >= wrap {
        let Some(block) = provider.next_buffer(frames_owed.max(1)) else {
            break;
        };
        let frames = block.len() / CH;
        let mut consumed = 0;
        while consumed < frames && phase >= wrap {
            ring.read_advance(block, consumed);
            consumed += 1;
            phase -= wrap;
            emit!();
        }
        provider.release_buffer(consumed);
        if consumed == 0 {
            break;
        }
        frames_owed = frames_owed.saturating_sub(consumed);
    }

    *phase_fraction = phase;
    out_index / OUTPUT_CHANNELS
}
