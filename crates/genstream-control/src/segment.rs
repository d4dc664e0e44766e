//! Audio segments and the producer/consumer queue between the service's
//! delivery callback and the buffer scheduler.

use std::collections::VecDeque;
use std::sync::Mutex;

/// One decoded chunk of audio delivered by the generator.
///
/// Samples are stored **interleaved**:
/// `frame0[ch0], frame0[ch1], ..., frame1[ch0], frame1[ch1], ...`
///
/// Segments are consumed exactly once: the scheduler decides a start time and
/// hands ownership to the output sink for the playback duration.
#[derive(Clone, Debug, PartialEq)]
pub struct AudioSegment {
    pub samples: Vec<f32>,
    pub channels: usize,
    pub sample_rate: u32,
    /// Opaque producer tag (for example the source tempo), passed through
    /// untouched.
    pub tag: Option<String>,
}

impl AudioSegment {
    pub fn new(samples: Vec<f32>, channels: usize, sample_rate: u32) -> Self {
        Self {
            samples,
            channels,
            sample_rate,
            tag: None,
        }
    }

    /// Number of frames (samples per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    /// Playback duration in seconds at the segment's own sample rate.
    pub fn duration_seconds(&self) -> f64 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f64 / self.sample_rate as f64
        }
    }
}

/// FIFO of segments awaiting scheduling.
///
/// Appended to by the service's delivery callback and drained by the
/// scheduler tick. Both sides may run on different threads, so every
/// operation takes the internal mutex; each append and each drain step is
/// atomic with respect to the queue's length and order, and order is never
/// rearranged.
#[derive(Debug, Default)]
pub struct SegmentQueue {
    inner: Mutex<VecDeque<AudioSegment>>,
}

impl SegmentQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one segment at the tail.
    pub fn push(&self, segment: AudioSegment) {
        self.inner.lock().unwrap().push_back(segment);
    }

    /// Remove and return the oldest segment, if any.
    pub fn pop(&self) -> Option<AudioSegment> {
        self.inner.lock().unwrap().pop_front()
    }

    /// Drop everything queued. Used on stop/reconnect.
    pub fn clear(&self) {
        self.inner.lock().unwrap().clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().unwrap().is_empty()
    }

    /// Total buffered audio in seconds, for logs and status lines.
    pub fn buffered_seconds(&self) -> f64 {
        self.inner
            .lock()
            .unwrap()
            .iter()
            .map(AudioSegment::duration_seconds)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(frames: usize, rate: u32) -> AudioSegment {
        AudioSegment::new(vec![0.0; frames * 2], 2, rate)
    }

    #[test]
    fn duration_accounts_for_channels() {
        let s = seg(48_000, 48_000);
        assert_eq!(s.frames(), 48_000);
        assert_eq!(s.duration_seconds(), 1.0);
    }

    #[test]
    fn duration_is_zero_for_degenerate_segments() {
        let s = AudioSegment::new(vec![0.0; 10], 0, 48_000);
        assert_eq!(s.duration_seconds(), 0.0);
        let s = AudioSegment::new(vec![0.0; 10], 2, 0);
        assert_eq!(s.duration_seconds(), 0.0);
    }

    #[test]
    fn queue_preserves_fifo_order() {
        let q = SegmentQueue::new();
        for rate in [8_000, 16_000, 24_000] {
            q.push(seg(100, rate));
        }
        assert_eq!(q.len(), 3);
        assert_eq!(q.pop().unwrap().sample_rate, 8_000);
        assert_eq!(q.pop().unwrap().sample_rate, 16_000);
        assert_eq!(q.pop().unwrap().sample_rate, 24_000);
        assert!(q.pop().is_none());
    }

    #[test]
    fn clear_empties_the_queue() {
        let q = SegmentQueue::new();
        q.push(seg(10, 48_000));
        q.push(seg(10, 48_000));
        q.clear();
        assert!(q.is_empty());
        assert_eq!(q.buffered_seconds(), 0.0);
    }

    #[test]
    fn buffered_seconds_sums_durations() {
        let q = SegmentQueue::new();
        q.push(seg(24_000, 48_000));
        q.push(seg(48_000, 48_000));
        assert_eq!(q.buffered_seconds(), 1.5);
    }
}
