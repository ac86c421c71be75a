//! Error types for dynamic resampling.
//!
//! Only configuration can fail. Running out of input while resampling is a
//! short frame count, not an error.

use thiserror::Error;

/// Result type for resampler configuration.
pub type Result<T> = std::result::Result<T, ResampleError>;

/// Errors raised when a resampler is created or reconfigured.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ResampleError {
    /// Invalid sample rate specified.
    #[error("Invalid sample rate: {rate} Hz (must be > 0)")]
    InvalidSampleRate { rate: u32 },

    /// Unsupported channel count.
    #[error("Invalid channel count: {count} (must be 1 or 2)")]
    InvalidChannelCount { count: usize },

    /// Unsupported input sample width.
    #[error("Unsupported bit depth: {bits} (only 16-bit PCM is supported)")]
    UnsupportedBitDepth { bits: u32 },

    /// Input/output ratio outside the range the phase accumulator can represent.
    #[error("Resampling ratio {ratio} exceeds maximum supported ratio")]
    RatioTooExtreme { ratio: f64 },

    /// Gain is negative or not a number.
    #[error("Invalid volume: left {left}, right {right}")]
    InvalidVolume { left: f32, right: f32 },

    /// Loop unroll factor is not one of 1, 2, 4, 8 or 16.
    #[error("Invalid stride: {stride} (must be a power of two up to 16)")]
    InvalidStride { stride: usize },

    /// Quality tier name could not be parsed.
    #[error("Unknown quality tier: {name}")]
    UnknownQuality { name: String },

    /// Internal processing error.
    #[error("Internal resampling error: {message}")]
    Internal { message: String },
}

impl ResampleError {
    /// Create an internal error with a message.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Check if this error rejects a sample rate or rate ratio.
    #[must_use]
    pub fn is_rate_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSampleRate { .. } | Self::RatioTooExtreme { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = ResampleError::InvalidChannelCount { count: 6 };
        assert_eq!(err.to_string(), "Invalid channel count: 6 (must be 1 or 2)");

        let err = ResampleError::internal("ring underflow");
        assert_eq!(err.to_string(), "Internal resampling error: ring underflow");
    }

    #[test]
    fn test_is_rate_error() {
        assert!(ResampleError::InvalidSampleRate { rate: 0 }.is_rate_error());
        assert!(ResampleError::RatioTooExtreme { ratio: 1000.0 }.is_rate_error());
        assert!(!ResampleError::UnsupportedBitDepth { bits: 24 }.is_rate_error());
    }
}
