//! Non-interleaved render buffer view.
//!
//! `AudioBuffer` borrows the host's channel slices for the duration of one
//! render call. It never owns or allocates sample memory.

/// Mutable view over one render call's channels.
///
/// Channels are non-interleaved: `channels[c][i]` is frame `i` of channel `c`.
/// All channels hold the same number of frames.
pub struct AudioBuffer<'a, 'b> {
    channels: &'a mut [&'b mut [f32]],
}

impl<'a, 'b> AudioBuffer<'a, 'b> {
    /// Wrap the host's channel slices.
    ///
    /// Frames are taken from the shortest channel, so a ragged slice set never
    /// causes an out-of-bounds access.
    #[inline]
    pub fn new(channels: &'a mut [&'b mut [f32]]) -> Self {
        Self { channels }
    }

    /// Number of frames in this call.
    #[inline]
    pub fn frames(&self) -> usize {
        self.channels.iter().map(|c| c.len()).min().unwrap_or(0)
    }

    /// Number of channels.
    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Read-only access to one channel, `None` if out of range.
    #[inline]
    pub fn channel(&self, index: usize) -> Option<&[f32]> {
        let frames = self.frames();
        self.channels.get(index).map(|c| &c[..frames])
    }

    /// Mutable access to one channel, `None` if out of range.
    #[inline]
    pub fn channel_mut(&mut self, index: usize) -> Option<&mut [f32]> {
        let frames = self.frames();
        self.channels.get_mut(index).map(|c| &mut c[..frames])
    }

    /// Overwrite every sample with `value`.
    pub fn fill(&mut self, value: f32) {
        let frames = self.frames();
        for channel in self.channels.iter_mut() {
            channel[..frames].fill(value);
        }
    }

    /// Copy channel 0 into every other channel.
    pub fn copy_first_to_rest(&mut self) {
        let frames = self.frames();
        if let Some((first, rest)) = self.channels.split_first_mut() {
            for channel in rest {
                channel[..frames].copy_from_slice(&first[..frames]);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frames_uses_shortest_channel() {
        let mut left = [0.0f32; 8];
        let mut right = [0.0f32; 6];
        let mut channels: [&mut [f32]; 2] = [&mut left, &mut right];
        let buffer = AudioBuffer::new(&mut channels);
        assert_eq!(buffer.frames(), 6);
        assert_eq!(buffer.channel_count(), 2);
        assert_eq!(buffer.channel(0).map(<[f32]>::len), Some(6));
        assert!(buffer.channel(2).is_none());
    }

    #[test]
    fn test_fill_and_copy() {
        let mut left = [1.0f32; 4];
        let mut right = [2.0f32; 4];
        let mut channels: [&mut [f32]; 2] = [&mut left, &mut right];
        let mut buffer = AudioBuffer::new(&mut channels);

        buffer.copy_first_to_rest();
        assert_eq!(buffer.channel(1), Some(&[1.0f32; 4][..]));

        buffer.fill(0.0);
        for index in 0..buffer.channel_count() {
            assert!(buffer.channel(index).unwrap().iter().all(|&s| s == 0.0));
        }
    }

    #[test]
    fn test_empty_buffer() {
        let mut channels: [&mut [f32]; 0] = [];
        let mut buffer = AudioBuffer::new(&mut channels);
        assert_eq!(buffer.frames(), 0);
        buffer.fill(1.0);
        buffer.copy_first_to_rest();
    }
}
