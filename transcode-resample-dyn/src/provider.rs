//! Pull-based input for the resampler.

/// Supplies interleaved 16-bit input on demand.
///
/// The resampler asks for a block with [`next_buffer`](Self::next_buffer),
/// reads some prefix of it, then reports how many frames it consumed with
/// [`release_buffer`](Self::release_buffer). Unconsumed frames must be
/// served again by the next request.
pub trait BufferProvider {
    /// Borrow the next block of input.
    ///
    /// `frames_hint` is how many frames the current call still needs; the
    /// block may be shorter or longer. `None` or an empty slice means the
    /// input is exhausted for now.
    fn next_buffer(&mut self, frames_hint: usize) -> Option<&[i16]>;

    /// Mark the first `frames` frames of the last block as consumed.
    fn release_buffer(&mut self, frames: usize);
}

impl<P: BufferProvider + ?Sized> BufferProvider for &mut P {
    fn next_buffer(&mut self, frames_hint: usize) -> Option<&[i16]> {
        (**self).next_buffer(frames_hint)
    }

    fn release_buffer(&mut self, frames: usize) {
        (**self).release_buffer(frames)
    }
}

/// Serves an owned interleaved buffer in bounded blocks.
#[derive(Debug, Clone)]
pub struct SliceProvider {
    samples: Vec<i16>,
    channels: usize,
    position: usize,
    max_block: usize,
    fetches: usize,
    releases: usize,
}

impl SliceProvider {
    /// Create a provider over interleaved `samples`.
    pub fn new(samples: Vec<i16>, channels: usize) -> Self {
        Self {
            samples,
            channels: channels.max(1),
            position: 0,
            max_block: usize::MAX,
            fetches: 0,
            releases: 0,
        }
    }

    /// Never hand out more than `frames` frames per block.
    pub fn with_max_block(mut self, frames: usize) -> Self {
        self.max_block = frames.max(1);
        self
    }

    /// Append more input behind whatever has not been consumed yet.
    pub fn push(&mut self, samples: &[i16]) {
        self.samples.extend_from_slice(samples);
    }

    /// Get the number of frames ever pushed.
    pub fn total_frames(&self) -> usize {
        self.samples.len() / self.channels
    }

    /// Get the number of frames released so far.
    pub fn frames_consumed(&self) -> usize {
        self.position
    }

    /// Get the number of frames not yet released.
    pub fn remaining_frames(&self) -> usize {
        self.total_frames() - self.position
    }

    /// Get the number of blocks handed out.
    pub fn fetch_count(&self) -> usize {
        self.fetches
    }

    /// Get the number of release calls.
    pub fn release_count(&self) -> usize {
        self.releases
    }
}

impl BufferProvider for SliceProvider {
    fn next_buffer(&mut self, frames_hint: usize) -> Option<&[i16]> {
        let remaining = self.remaining_frames();
        if remaining == 0 {
            return None;
        }
        let frames = frames_hint.max(1).min(self.max_block).min(remaining);
        self.fetches += 1;
        let start = self.position * self.channels;
        Some(&self.samples[start..start + frames * self.channels])
    }

    fn release_buffer(&mut self, frames: usize) {
        self.position = (self.position + frames).min(self.total_frames());
        self.releases += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_blocks_respect_hint_and_limit() {
        let mut provider = SliceProvider::new((0..20).collect(), 2).with_max_block(4);
        assert_eq!(provider.total_frames(), 10);

        assert_eq!(provider.next_buffer(2), Some(&[0, 1, 2, 3][..]));
        provider.release_buffer(1);
        assert_eq!(provider.next_buffer(100).map(<[i16]>::len), Some(8));
        provider.release_buffer(4);
        assert_eq!(provider.frames_consumed(), 5);
        assert_eq!(provider.next_buffer(0), Some(&[10, 11][..]));
    }

    #[test]
    fn test_exhaustion() {
        let mut provider = SliceProvider::new(vec![1, 2, 3], 1);
        assert!(provider.next_buffer(10).is_some());
        provider.release_buffer(3);
        assert_eq!(provider.next_buffer(10), None);
        assert_eq!(provider.fetch_count(), 1);
        assert_eq!(provider.release_count(), 1);

        provider.push(&[4]);
        assert_eq!(provider.next_buffer(10), Some(&[4][..]));
    }

    #[test]
    fn test_forwarding_through_mut_ref() {
        fn pull<P: BufferProvider>(mut p: P) -> usize {
            let n = p.next_buffer(3).map_or(0, <[i16]>::len);
            p.release_buffer(n);
            n
        }
        let mut provider = SliceProvider::new(vec![0; 5], 1);
        assert_eq!(pull(&mut provider), 3);
        assert_eq!(provider.remaining_frames(), 2);
    }
}
