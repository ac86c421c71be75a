//! Kaiser-windowed sinc filter design.
//!
//! The prototype is an odd-symmetric lowpass of length `2 * L * h + 1`
//! sampled at `L` times the input rate. Only the non-negative half is kept,
//! rearranged into a polyphase bank of `L + 1` rows of `h` taps: row `i`,
//! tap `j` holds the kernel at position `x = i + j * L`. The extra row lets
//! the convolution engine interpolate between the last phase and the
//! wrap-around phase without a bounds check.
//!
//! References: Vaidyanathan, *Multirate Systems and Filter Banks*, 3.2.5/3.2.7;
//! Oppenheim and Schafer, *Discrete-Time Signal Processing*, 7.75.

use std::f64::consts::PI;

/// Scale applied to the whole kernel so passband ripple cannot overflow the
/// fixed-point range.
pub const PASSBAND_ATTENUATION: f64 = 0.9998;

/// Arguments below this use the power series for I0, above it the
/// asymptotic expansion.
const I0_SERIES_LIMIT: f64 = 15.0;
const I0_SERIES_TERMS: u32 = 25;
const I0_ASYMPTOTIC_TERMS: u32 = 10;

/// Kaiser window shape parameter for a stopband attenuation in dB.
///
/// ```text
///        | 0.1102 (A - 8.7)                          A > 50
/// beta = | 0.5842 (A - 21)^0.4 + 0.07886 (A - 21)    21 < A <= 50
///        | 0                                         A <= 21
/// ```
pub fn kaiser_beta(stopband_db: f64) -> f64 {
    if stopband_db > 50.0 {
        0.1102 * (stopband_db - 8.7)
    } else if stopband_db > 21.0 {
        let offset = stopband_db - 21.0;
        0.5842 * offset.powf(0.4) + 0.07886 * offset
    } else {
        0.0
    }
}

/// Modified Bessel function of the first kind, order zero.
///
/// Relative error is below 1e-7 over the whole real line.
pub fn bessel_i0(x: f64) -> f64 {
    let x = x.abs();
    if x < I0_SERIES_LIMIT {
        // sum (x^2/4)^k / (k!)^2
        let y = x * x * 0.25;
        let mut term = 1.0;
        let mut sum = 1.0;
        for k in 1..I0_SERIES_TERMS {
            let k = f64::from(k);
            term *= y / (k * k);
            sum += term;
        }
        sum
    } else {
        // e^x / sqrt(2 pi x) * sum ((2k-1)!!)^2 / (k! (8x)^k)
        let inv = 1.0 / (8.0 * x);
        let mut term = 1.0;
        let mut sum = 1.0;
        for k in 1..I0_ASYMPTOTIC_TERMS {
            let odd = f64::from(2 * k - 1);
            term *= odd * odd * inv / f64::from(k);
            sum += term;
        }
        x.exp() / (2.0 * PI * x).sqrt() * sum
    }
}

/// Transition bandwidth, normalized to the input rate, that a Kaiser filter
/// with `half_num_coefs` taps per side can reach at `stopband_db`.
pub fn transition_bandwidth(half_num_coefs: usize, stopband_db: f64) -> f64 {
    (stopband_db - 7.95) / (2.0 * 14.36 * half_num_coefs as f64)
}

/// Cutoff frequency, normalized to the input rate.
///
/// `tbw_cheat` moves the nominal band edge past Nyquist to trade a little
/// aliasing for passband width. The result never drops below half the
/// transition band so the kernel stays a lowpass.
pub fn cutoff(
    input_rate: u32,
    output_rate: u32,
    half_num_coefs: usize,
    stopband_db: f64,
    tbw_cheat: f64,
) -> f64 {
    let tbw = transition_bandwidth(half_num_coefs, stopband_db);
    let edge = if input_rate < output_rate {
        0.5 * tbw_cheat
    } else {
        0.5 * tbw_cheat * f64::from(output_rate) / f64::from(input_rate)
    };
    (edge - tbw * 0.5).max(tbw * 0.5)
}

/// A filter tap storage type.
pub trait Coefficient: Copy + Default + PartialEq + Send + Sync + 'static {
    /// Quantize a real tap. `error` carries the rounding residual along a
    /// phase row for types that noise-shape, and is ignored otherwise.
    fn quantize(value: f64, error: &mut f64) -> Self;

    /// Real value of the tap, 1.0 being unity gain.
    fn to_f64(self) -> f64;
}

impl Coefficient for i16 {
    fn quantize(value: f64, error: &mut f64) -> Self {
        let y = value * 32768.0 + *error;
        let rounded = y.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX));
        *error = y - rounded;
        rounded as i16
    }

    fn to_f64(self) -> f64 {
        f64::from(self) / 32768.0
    }
}

impl Coefficient for i32 {
    fn quantize(value: f64, _error: &mut f64) -> Self {
        (value * 2_147_483_648.0)
            .round()
            .clamp(f64::from(i32::MIN), f64::from(i32::MAX)) as i32
    }

    fn to_f64(self) -> f64 {
        f64::from(self) / 2_147_483_648.0
    }
}

impl Coefficient for f64 {
    fn quantize(value: f64, _error: &mut f64) -> Self {
        value
    }

    fn to_f64(self) -> f64 {
        self
    }
}

/// Design a polyphase Kaiser-windowed sinc bank of `(phase_count + 1) * half_num_coefs` taps.
///
/// `cutoff` is normalized to the input rate (0.5 = input Nyquist).
pub fn design_filter<T: Coefficient>(
    phase_count: usize,
    half_num_coefs: usize,
    stopband_db: f64,
    cutoff: f64,
    passband_atten: f64,
) -> Vec<T> {
    let l = phase_count;
    let n = (l * half_num_coefs) as f64;
    let beta = kaiser_beta(stopband_db);
    let i0_beta = bessel_i0(beta);
    let xstep = 2.0 * PI * cutoff / l as f64;
    let yscale = passband_atten * l as f64 / (i0_beta * PI);

    let mut bank = Vec::with_capacity((l + 1) * half_num_coefs);
    for i in 0..=l {
        let mut error = 0.0;
        for j in 0..half_num_coefs {
            let ix = i + j * l;
            let y = if ix == 0 {
                i0_beta * xstep
            } else {
                let x = ix as f64;
                let r = x / n;
                bessel_i0(beta * (1.0 - r * r).max(0.0).sqrt()) * (x * xstep).sin() / x
            };
            bank.push(T::quantize(y * yscale, &mut error));
        }
    }
    bank
}

/// Magnitude of the full prototype at `freq` (normalized to the input rate),
/// scaled to unity DC gain.
pub fn response_at<T: Coefficient>(
    bank: &[T],
    phase_count: usize,
    half_num_coefs: usize,
    freq: f64,
) -> f64 {
    let n = phase_count * half_num_coefs;
    let w = 2.0 * PI * freq / phase_count as f64;
    let mut sum = bank[0].to_f64();
    for x in 1..n {
        let tap = bank[(x % phase_count) * half_num_coefs + x / phase_count].to_f64();
        sum += 2.0 * tap * (w * x as f64).cos();
    }
    (sum / phase_count as f64).abs()
}

/// Extremes of `|H(f)|` over a frequency range, in dB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterResponse {
    /// Smallest magnitude seen.
    pub min_db: f64,
    /// Largest magnitude seen.
    pub max_db: f64,
}

impl FilterResponse {
    /// Sample the response at `steps + 1` evenly spaced points of `[f_start, f_end]`.
    pub fn measure<T: Coefficient>(
        bank: &[T],
        phase_count: usize,
        half_num_coefs: usize,
        f_start: f64,
        f_end: f64,
        steps: usize,
    ) -> Self {
        let steps = steps.max(1);
        let fstep = (f_end - f_start) / steps as f64;
        let mut min_db = f64::INFINITY;
        let mut max_db = f64::NEG_INFINITY;
        for k in 0..=steps {
            let magnitude = response_at(bank, phase_count, half_num_coefs, f_start + fstep * k as f64);
            let db = 20.0 * magnitude.max(1e-20).log10();
            min_db = min_db.min(db);
            max_db = max_db.max(db);
        }
        Self { min_db, max_db }
    }

    /// Peak-to-peak ripple in dB.
    pub fn ripple_db(&self) -> f64 {
        self.max_db - self.min_db
    }
}
