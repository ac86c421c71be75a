//! Input history ring for the convolution engine.
//!
//! The ring is a linear buffer that is compacted instead of wrapped: the
//! impulse pointer walks forward one frame per consumed input frame and,
//! once it reaches the end, the live window is moved back to the start.
//! Every dot product therefore reads two contiguous slices.

/// Ring capacity as a multiple of the live window (`2 * h * channels`).
pub const STATE_SIZE_MULTIPLIER: usize = 4;

/// Interleaved 16-bit input history.
///
/// Invariant: `h` frames at and behind `impulse`, and `h` frames ahead of it,
/// are in bounds. The frame at `impulse + h * channels` is the newest input.
#[derive(Debug, Clone, Default)]
pub struct InputRing {
    state: Vec<i16>,
    impulse: usize,
    ring_full: usize,
    channels: usize,
    half_num_coefs: usize,
}

impl InputRing {
    /// Create an empty, unallocated ring.
    pub fn new() -> Self {
        Self::default()
    }

    /// Size the ring for a filter with `half_num_coefs` taps per side.
    ///
    /// Calling this again with the same geometry leaves the history and
    /// impulse untouched. Otherwise the frames around the impulse are carried
    /// into the new storage so the stream continues across a redesign.
    pub fn resize(&mut self, channels: usize, half_num_coefs: usize) {
        if self.is_allocated() && self.channels == channels && self.half_num_coefs == half_num_coefs {
            return;
        }

        let span = half_num_coefs * channels;
        let count = STATE_SIZE_MULTIPLIER * span * 2;
        let mut state = vec![0i16; count];

        if self.is_allocated() && self.channels == channels {
            // Old samples from impulse - span up to and including the newest frame.
            let newest = self.impulse + self.half_num_coefs * channels + channels;
            let src_end = (self.impulse + span + channels).min(newest).min(self.state.len());
            let (src_start, dst_start) = if self.impulse >= span {
                (self.impulse - span, 0)
            } else {
                (0, span - self.impulse)
            };
            if src_end > src_start {
                let len = (src_end - src_start).min(count - dst_start);
                state[dst_start..dst_start + len]
                    .copy_from_slice(&self.state[src_start..src_start + len]);
            }
        }

        self.state = state;
        self.impulse = span;
        self.ring_full = count - span;
        self.channels = channels;
        self.half_num_coefs = half_num_coefs;
    }

    /// Stage frame `index` of `input` as the newest sample without moving the impulse.
    #[inline]
    pub fn read_again(&mut self, input: &[i16], index: usize) {
        let ch = self.channels;
        let head = self.impulse + self.half_num_coefs * ch;
        let src = index * ch;
        debug_assert!(src + ch <= input.len(), "input frame {index} out of range");
        self.state[head..head + ch].copy_from_slice(&input[src..src + ch]);
    }

    /// Advance the impulse by one frame and stage frame `index` of `input`.
    #[inline]
    pub fn read_advance(&mut self, input: &[i16], index: usize) {
        self.impulse += self.channels;
        if self.impulse >= self.ring_full {
            let span = self.half_num_coefs * self.channels;
            let shift_down = self.ring_full - span;
            self.state.copy_within(shift_down..shift_down + 2 * span, 0);
            self.impulse -= shift_down;
        }
        self.read_again(input, index);
    }

    /// Zero the history and re-anchor the impulse.
    pub fn clear(&mut self) {
        self.state.fill(0);
        self.impulse = self.half_num_coefs * self.channels;
    }

    /// Raw history storage.
    pub fn history(&self) -> &[i16] {
        &self.state
    }

    /// Sample index of the current impulse frame.
    pub fn impulse(&self) -> usize {
        self.impulse
    }

    /// Get the number of interleaved channels.
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Get the filter half-length the ring is sized for.
    pub fn half_num_coefs(&self) -> usize {
        self.half_num_coefs
    }

    /// Get the buffer length in samples.
    pub fn capacity(&self) -> usize {
        self.state.len()
    }

    /// Check whether `resize` has allocated storage.
    pub fn is_allocated(&self) -> bool {
        !self.state.is_empty()
    }
}
