//! Polyphase coefficient store.

use crate::design::{self, PASSBAND_ATTENUATION};
use crate::error::{ResampleError, Result};
use crate::gcd;
use crate::quality::{CoefWidth, Quality};

/// Fewest phases a bank is built with.
pub const MIN_PHASES: usize = 63;
/// Most phases a bank is built with.
pub const MAX_PHASES: usize = 127;

/// Bits available to the phase accumulator below the integer frame position.
const PHASE_BITS: u32 = 30;

/// A rate within `prev / 16` of the previous rate may keep the filter.
pub const RELATIVE_TOLERANCE_SHIFT: u32 = 4;
/// A rate within `designed / 8` of the design rate may keep the filter.
pub const ABSOLUTE_TOLERANCE_SHIFT: u32 = 3;

/// Quantized polyphase bank, one variant per tap width.
#[derive(Debug, Clone, PartialEq)]
pub enum CoefficientBank {
    S16(Vec<i16>),
    S32(Vec<i32>),
}

impl CoefficientBank {
    /// Design a bank of the given width.
    pub fn design(
        width: CoefWidth,
        phase_count: usize,
        half_num_coefs: usize,
        stopband_db: f64,
        cutoff: f64,
    ) -> Self {
        match width {
            CoefWidth::S16 => Self::S16(design::design_filter(
                phase_count,
                half_num_coefs,
                stopband_db,
                cutoff,
                PASSBAND_ATTENUATION,
            )),
            CoefWidth::S32 => Self::S32(design::design_filter(
                phase_count,
                half_num_coefs,
                stopband_db,
                cutoff,
                PASSBAND_ATTENUATION,
            )),
        }
    }

    /// Get the tap width.
    pub fn width(&self) -> CoefWidth {
        match self {
            Self::S16(_) => CoefWidth::S16,
            Self::S32(_) => CoefWidth::S32,
        }
    }

    /// Get the number of taps, all phases included.
    pub fn len(&self) -> usize {
        match self {
            Self::S16(c) => c.len(),
            Self::S32(c) => c.len(),
        }
    }

    /// Check whether no bank has been designed yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Tap values as real numbers, for analysis.
    pub fn to_f64(&self) -> Vec<f64> {
        match self {
            Self::S16(c) => c.iter().map(|&v| design::Coefficient::to_f64(v)).collect(),
            Self::S32(c) => c.iter().map(|&v| design::Coefficient::to_f64(v)).collect(),
        }
    }
}

/// Geometry and taps of the active polyphase filter.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterConstants {
    phase_count: usize,
    half_num_coefs: usize,
    coef_shift: u32,
    bank: CoefficientBank,
}

impl FilterConstants {
    /// Geometry for `phase_count` phases of `half_num_coefs` taps, with an
    /// empty bank.
    pub fn new(phase_count: usize, half_num_coefs: usize, input_rate: u32, output_rate: u32) -> Self {
        let mut constants = Self {
            phase_count: 0,
            half_num_coefs: 0,
            coef_shift: 0,
            bank: CoefficientBank::S16(Vec::new()),
        };
        constants.set(phase_count, half_num_coefs, input_rate, output_rate);
        constants
    }

    /// Design the complete filter for a quality tier and rate pair.
    pub fn build(quality: Quality, input_rate: u32, output_rate: u32) -> Self {
        let params = quality.params(input_rate, output_rate);
        let phases = phase_count(input_rate, output_rate);
        let fcr = design::cutoff(
            input_rate,
            output_rate,
            params.half_num_coefs,
            params.stopband_db,
            params.tbw_cheat,
        );
        let mut constants = Self::new(phases, params.half_num_coefs, input_rate, output_rate);
        constants.bank = CoefficientBank::design(
            params.width,
            phases,
            params.half_num_coefs,
            params.stopband_db,
            fcr,
        );
        constants
    }

    /// Set the geometry and derive the coefficient shift.
    ///
    /// The shift leaves room for `L * in / out` (or `L - 1` below a 2:1
    /// ratio) in the phase accumulator's 30 usable bits.
    pub fn set(&mut self, phase_count: usize, half_num_coefs: usize, input_rate: u32, output_rate: u32) {
        let lscale = if input_rate / output_rate.max(1) < 2 {
            phase_count.saturating_sub(1) as u64
        } else {
            phase_count as u64 * u64::from(input_rate) / u64::from(output_rate)
        };
        let bits = u64::BITS - lscale.leading_zeros();
        self.phase_count = phase_count;
        self.half_num_coefs = half_num_coefs;
        self.coef_shift = PHASE_BITS.saturating_sub(bits);
    }

    /// Install a bank designed for the current geometry.
    pub fn set_coefficients(&mut self, bank: CoefficientBank) -> Result<()> {
        let expected = (self.phase_count + 1) * self.half_num_coefs;
        if bank.len() != expected {
            return Err(ResampleError::internal(format!(
                "coefficient bank has {} taps, expected {expected}",
                bank.len()
            )));
        }
        self.bank = bank;
        Ok(())
    }

    /// Get the number of polyphase phases.
    pub fn phase_count(&self) -> usize {
        self.phase_count
    }

    /// Get the taps per side of the impulse.
    pub fn half_num_coefs(&self) -> usize {
        self.half_num_coefs
    }

    /// Get the sub-phase bits below the phase index.
    pub fn coef_shift(&self) -> u32 {
        self.coef_shift
    }

    /// Get the coefficient bank.
    pub fn bank(&self) -> &CoefficientBank {
        &self.bank
    }

    /// Phase accumulator value that corresponds to one input frame.
    pub fn phase_wrap_limit(&self) -> u32 {
        (self.phase_count as u32) << self.coef_shift
    }
}

/// Number of polyphase rows for a rate pair.
///
/// Starts from the reduced output rate `out / gcd(out, in)` so exact ratios
/// land on a phase, doubles until at least [`MIN_PHASES`] and caps at
/// [`MAX_PHASES`].
pub fn phase_count(input_rate: u32, output_rate: u32) -> usize {
    let divisor = gcd(output_rate, input_rate).max(1);
    let mut phases = (output_rate / divisor).max(1) as usize;
    while phases < MIN_PHASES {
        phases *= 2;
    }
    phases.min(MAX_PHASES)
}

/// Whether the filter designed at `designed_rate` can stay in use when the
/// input moves from `prev_rate` to `new_rate`.
///
/// `designed_rate` of zero means no filter exists.
pub fn is_close(new_rate: u32, prev_rate: u32, designed_rate: u32, output_rate: u32) -> bool {
    if designed_rate == 0 {
        return false;
    }
    // The cutoff does not depend on the ratio while upsampling.
    if designed_rate < output_rate && new_rate < output_rate {
        return true;
    }
    let prev_tolerance = prev_rate >> RELATIVE_TOLERANCE_SHIFT;
    let designed_tolerance = designed_rate >> ABSOLUTE_TOLERANCE_SHIFT;
    new_rate.abs_diff(prev_rate) < prev_tolerance
        && new_rate.abs_diff(designed_rate) < designed_tolerance
}
