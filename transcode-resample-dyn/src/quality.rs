//! Quality tiers and the filter parameters they select.
//!
//! A tier fixes the coefficient width and the stopband target. The filter
//! half-length grows with the downsampling factor so the passband keeps its
//! width when the cutoff moves down.

use crate::error::ResampleError;
use std::fmt;
use std::str::FromStr;

/// Resampling quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Quality {
    /// 16-bit taps, 8-24 taps per side, about 80 dB stopband.
    Low,
    /// 16-bit taps, 16-32 taps per side, about 84 dB stopband.
    #[default]
    Medium,
    /// 32-bit taps, 32-48 taps per side, about 98 dB stopband.
    High,
}

/// Storage width of the polyphase coefficient bank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CoefWidth {
    /// Q15 taps in `i16`.
    S16,
    /// Q31 taps in `i32`.
    S32,
}

/// Filter design parameters for one tier at one rate ratio.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QualityParams {
    /// Coefficient storage width.
    pub width: CoefWidth,
    /// Stopband attenuation target in dB.
    pub stopband_db: f64,
    /// Taps on each side of the symmetric kernel, per phase.
    pub half_num_coefs: usize,
    /// How far past Nyquist the transition band may reach (1.0 = not at all).
    pub tbw_cheat: f64,
}

impl Quality {
    /// All tiers, lowest first.
    pub const ALL: [Quality; 3] = [Quality::Low, Quality::Medium, Quality::High];

    /// Coefficient width used by this tier.
    pub fn coef_width(self) -> CoefWidth {
        match self {
            Self::Low | Self::Medium => CoefWidth::S16,
            Self::High => CoefWidth::S32,
        }
    }

    /// Select filter parameters for converting `input_rate` to `output_rate`.
    pub fn params(self, input_rate: u32, output_rate: u32) -> QualityParams {
        let input = u64::from(input_rate);
        let output = u64::from(output_rate);
        let oversampling = if input >= output * 4 {
            2
        } else if input >= output * 2 {
            1
        } else {
            0
        };
        let upsampling = input <= output;

        match self {
            Self::Low => QualityParams {
                width: CoefWidth::S16,
                stopband_db: 80.0,
                half_num_coefs: [8, 16, 24][oversampling],
                tbw_cheat: if upsampling { 1.05 } else { 1.03 },
            },
            Self::Medium => QualityParams {
                width: CoefWidth::S16,
                stopband_db: 84.0,
                half_num_coefs: [16, 24, 32][oversampling],
                tbw_cheat: if upsampling { 1.03 } else { 1.01 },
            },
            Self::High => QualityParams {
                width: CoefWidth::S32,
                stopband_db: 98.0,
                half_num_coefs: [32, 40, 48][oversampling],
                tbw_cheat: 1.0,
            },
        }
    }
}

impl fmt::Display for Quality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

impl FromStr for Quality {
    type Err = ResampleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" | "med" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => Err(ResampleError::UnknownQuality { name: s.to_string() }),
        }
    }
}
