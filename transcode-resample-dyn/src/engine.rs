//! Fixed-point polyphase convolution.
//!
//! One output frame is the dot product of the history around the impulse
//! with one phase of the bank. The positive side runs backwards from the
//! impulse, the negative side forwards from the frame after it, each with
//! its own phase row of the symmetric prototype:
//!
//! ```text
//!   history:  ... s[-2] s[-1] s[0] | s[1] s[2] ...
//!                             ^ impulse
//!   positive: row P,  tap j -> s[-j]
//!   negative: row N,  tap j -> s[j + 1]
//! ```
//!
//! When the phase increment is a whole number of phases the sub-phase bits
//! are always zero and the rows are used as is ("locked"). Otherwise each
//! tap is linearly interpolated between two adjacent rows.
//!
//! Channel count, locking, unroll stride and tap width are const or type
//! parameters so every combination is a separate monomorphized loop.

use crate::design::Coefficient;
use crate::error::{ResampleError, Result};
use crate::quality::CoefWidth;

/// Output channels; mono input is written to both.
pub const OUTPUT_CHANNELS: usize = 2;

/// Volume is U4.12: this is unity gain.
pub const UNITY_GAIN: i32 = 1 << 12;

/// Q30 accumulator times U4.12 gain, shifted down to Q4.27.
const VOLUME_SHIFT: u32 = 15;

/// A coefficient type the convolution engine can run on.
pub trait Tap: Coefficient {
    /// Right shift that brings an accumulator of `tap * sample` products to Q30.
    const ACC_SHIFT: u32;
    /// Bits in the interpolation fraction.
    const FRAC_BITS: u32;

    /// `self * sample`, widened.
    fn mul(self, sample: i16) -> i64;

    /// `a + (b - a) * frac`, with `frac` in Q[`Self::FRAC_BITS`].
    fn lerp(a: Self, b: Self, frac: u32) -> Self;
}

impl Tap for i16 {
    const ACC_SHIFT: u32 = 0;
    const FRAC_BITS: u32 = 15;

    #[inline(always)]
    fn mul(self, sample: i16) -> i64 {
        i64::from(i32::from(self) * i32::from(sample))
    }

    #[inline(always)]
    fn lerp(a: Self, b: Self, frac: u32) -> Self {
        let delta = i32::from(b) - i32::from(a);
        (i32::from(a) + ((delta * frac as i32) >> Self::FRAC_BITS)) as i16
    }
}

impl Tap for i32 {
    const ACC_SHIFT: u32 = 16;
    const FRAC_BITS: u32 = 31;

    #[inline(always)]
    fn mul(self, sample: i16) -> i64 {
        i64::from(self) * i64::from(sample)
    }

    #[inline(always)]
    fn lerp(a: Self, b: Self, frac: u32) -> Self {
        let delta = i64::from(b) - i64::from(a);
        (i64::from(a) + ((delta * i64::from(frac)) >> Self::FRAC_BITS)) as i32
    }
}

/// Input channel layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChannelMode {
    Mono,
    Stereo,
}

impl ChannelMode {
    /// Map an interleaved channel count to a mode.
    pub fn from_count(count: usize) -> Result<Self> {
        match count {
            1 => Ok(Self::Mono),
            2 => Ok(Self::Stereo),
            _ => Err(ResampleError::InvalidChannelCount { count }),
        }
    }

    /// Get the number of interleaved input channels.
    pub fn count(self) -> usize {
        match self {
            Self::Mono => 1,
            Self::Stereo => 2,
        }
    }
}

/// Taps processed per inner loop iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stride {
    X1,
    X2,
    X4,
    X8,
    X16,
}

impl Stride {
    /// Widest first.
    const DESCENDING: [Stride; 5] = [Stride::X16, Stride::X8, Stride::X4, Stride::X2, Stride::X1];

    /// Get the stride as a tap count.
    pub fn value(self) -> usize {
        match self {
            Self::X1 => 1,
            Self::X2 => 2,
            Self::X4 => 4,
            Self::X8 => 8,
            Self::X16 => 16,
        }
    }

    /// Parse a tap count into a stride.
    pub fn from_value(stride: usize) -> Result<Self> {
        Self::DESCENDING
            .into_iter()
            .find(|s| s.value() == stride)
            .ok_or(ResampleError::InvalidStride { stride })
    }

    /// Widest stride no larger than `max` that divides `half_num_coefs`.
    pub fn for_half_length(half_num_coefs: usize, max: Stride) -> Self {
        Self::DESCENDING
            .into_iter()
            .find(|s| *s <= max && half_num_coefs % s.value() == 0)
            .unwrap_or(Self::X1)
    }
}

/// Selects the monomorphized loop used for a resampler configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Kernel {
    pub channels: ChannelMode,
    pub phase_locked: bool,
    pub stride: Stride,
    pub width: CoefWidth,
}

impl Kernel {
    /// Pick the kernel for a channel mode, phase increment and filter geometry.
    pub fn select(
        channels: ChannelMode,
        phase_increment: u32,
        coef_shift: u32,
        half_num_coefs: usize,
        width: CoefWidth,
        max_stride: Stride,
    ) -> Self {
        let sub_phase_mask = (1u32 << coef_shift) - 1;
        Self {
            channels,
            phase_locked: phase_increment & sub_phase_mask == 0,
            stride: Stride::for_half_length(half_num_coefs, max_stride),
            width,
        }
    }
}

/// Compute one output frame and accumulate it into `out[0..2]`.
///
/// `coefs` is the flat bank of `(L + 1) * half_num_coefs` taps, `phase` is
/// below `wrap`, and `history` holds `half_num_coefs` frames on both sides of
/// `impulse` (plus the impulse frame itself).
#[inline(always)]
pub fn fir<const CH: usize, const LOCKED: bool, const STRIDE: usize, T: Tap>(
    out: &mut [i32],
    phase: u32,
    wrap: u32,
    shift: u32,
    half_num_coefs: usize,
    coefs: &[T],
    history: &[i16],
    impulse: usize,
    volume: &[i32; 2],
) {
    debug_assert!(phase < wrap);
    debug_assert_eq!(half_num_coefs % STRIDE, 0);

    let h = half_num_coefs;
    let window = h * CH;
    let pos = &history[impulse + CH - window..impulse + CH];
    let neg = &history[impulse + CH..impulse + CH + window];
    let row = |index: usize| &coefs[index * h..index * h + h];

    let mut acc = [0i64; CH];
    if LOCKED {
        let index_p = (phase >> shift) as usize;
        let index_n = ((wrap - phase) >> shift) as usize;
        dot::<CH, STRIDE, T>(&mut acc, row(index_p), row(index_n), pos, neg);
    } else {
        let index_p = (phase >> shift) as usize;
        let index_n = ((wrap - phase - 1) >> shift) as usize;
        let frac = (phase << (32 - shift)) >> (32 - T::FRAC_BITS);
        dot_interpolated::<CH, STRIDE, T>(
            &mut acc,
            [row(index_p), row(index_p + 1)],
            [row(index_n), row(index_n + 1)],
            frac,
            pos,
            neg,
        );
    }

    let left = acc[0] >> T::ACC_SHIFT;
    let right = acc[CH - 1] >> T::ACC_SHIFT;
    out[0] = out[0].saturating_add(apply_gain(left, volume[0]));
    out[1] = out[1].saturating_add(apply_gain(right, volume[1]));
}

/// Q30 sample times U4.12 gain, saturated to Q4.27.
#[inline(always)]
fn apply_gain(sample_q30: i64, gain: i32) -> i32 {
    let scaled = (sample_q30 * i64::from(gain)) >> VOLUME_SHIFT;
    scaled.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32
}

#[inline(always)]
fn dot<const CH: usize, const STRIDE: usize, T: Tap>(
    acc: &mut [i64; CH],
    coefs_p: &[T],
    coefs_n: &[T],
    pos: &[i16],
    neg: &[i16],
) {
    let taps = coefs_p
        .chunks_exact(STRIDE)
        .zip(coefs_n.chunks_exact(STRIDE));
    let frames = pos
        .rchunks_exact(STRIDE * CH)
        .zip(neg.chunks_exact(STRIDE * CH));
    for ((cp, cn), (sp, sn)) in taps.zip(frames) {
        for k in 0..STRIDE {
            let p = (STRIDE - 1 - k) * CH;
            let n = k * CH;
            for c in 0..CH {
                acc[c] += cp[k].mul(sp[p + c]) + cn[k].mul(sn[n + c]);
            }
        }
    }
}

#[inline(always)]
fn dot_interpolated<const CH: usize, const STRIDE: usize, T: Tap>(
    acc: &mut [i64; CH],
    [coefs_p, coefs_p1]: [&[T]; 2],
    [coefs_n, coefs_n1]: [&[T]; 2],
    frac: u32,
    pos: &[i16],
    neg: &[i16],
) {
    let taps_p = coefs_p
        .chunks_exact(STRIDE)
        .zip(coefs_p1.chunks_exact(STRIDE));
    let taps_n = coefs_n
        .chunks_exact(STRIDE)
        .zip(coefs_n1.chunks_exact(STRIDE));
    let frames = pos
        .rchunks_exact(STRIDE * CH)
        .zip(neg.chunks_exact(STRIDE * CH));
    for (((cp, cp1), (cn, cn1)), (sp, sn)) in taps_p.zip(taps_n).zip(frames) {
        for k in 0..STRIDE {
            let tap_p = T::lerp(cp[k], cp1[k], frac);
            let tap_n = T::lerp(cn1[k], cn[k], frac);
            let p = (STRIDE - 1 - k) * CH;
            let n = k * CH;
            for c in 0..CH {
                acc[c] += tap_p.mul(sp[p + c]) + tap_n.mul(sn[n + c]);
            }
        }
    }
}
