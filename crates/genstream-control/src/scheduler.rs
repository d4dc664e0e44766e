//! Gapless segment scheduling against the output clock.
//!
//! Segments arrive in irregular bursts from the generator; the scheduler
//! assigns each a start time so playback is back-to-back with no overlap,
//! keeping a lookahead margin between "now" and the first audible sample to
//! absorb arrival jitter. A stalled producer is recovered from by resyncing
//! the timeline once instead of scheduling a burst of late segments.

use std::sync::Arc;

use crate::config::SchedulerConfig;
use crate::segment::{AudioSegment, SegmentQueue};

/// Output chain the scheduler hands segments to.
///
/// Implementations must start each segment at exactly the given time on
/// their clock and be able to cancel entries that have not started yet.
pub trait SegmentSink {
    /// Schedule `segment` to begin at `start_time` seconds of the sink clock.
    fn schedule(&mut self, segment: AudioSegment, start_time: f64);
    /// Drop every scheduled-but-unplayed segment.
    fn cancel_pending(&mut self);
}

/// Counters exposed for logs and status lines.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SchedulerStats {
    /// Segments handed to the sink since construction.
    pub scheduled_segments: u64,
    /// Times the timeline was resynced after a producer stall.
    pub underrun_resyncs: u64,
}

/// Decides start times for queued segments.
///
/// Owns the segment queue and the scheduling clock state; nothing else
/// touches either.
pub struct BufferScheduler {
    cfg: SchedulerConfig,
    queue: Arc<SegmentQueue>,
    /// Start time for the next segment, or `None` before the first segment
    /// of a playback run (and after every reset).
    next_start: Option<f64>,
    stats: SchedulerStats,
}

impl BufferScheduler {
    pub fn new(cfg: SchedulerConfig, queue: Arc<SegmentQueue>) -> Self {
        Self {
            cfg,
            queue,
            next_start: None,
            stats: SchedulerStats::default(),
        }
    }

    /// The queue fed by the service's segment delivery.
    pub fn queue(&self) -> &Arc<SegmentQueue> {
        &self.queue
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Start time the next segment would get, if one is pending.
    pub fn next_start(&self) -> Option<f64> {
        self.next_start
    }

    /// Run one scheduling pass at clock time `now`.
    ///
    /// Schedules queued segments whose start falls within
    /// `now + lookahead + horizon_slack`, advancing the timeline by each
    /// segment's duration so consecutive segments abut exactly. Returns the
    /// number of segments scheduled.
    pub fn tick(&mut self, now: f64, sink: &mut dyn SegmentSink) -> usize {
        if self.next_start.is_none() && !self.queue.is_empty() {
            self.next_start = Some(now + self.cfg.lookahead_seconds);
        }

        let horizon = now + self.cfg.lookahead_seconds + self.cfg.horizon_slack_seconds;
        let mut scheduled = 0;

        while !self.queue.is_empty() {
            let Some(mut start) = self.next_start else {
                break;
            };
            if start > horizon {
                break;
            }

            // The scheduled start already slipped into the past: resync the
            // timeline once rather than playing a burst of late segments.
            if start < now - self.cfg.underrun_tolerance_seconds {
                start = now + self.cfg.lookahead_seconds;
                self.stats.underrun_resyncs += 1;
                tracing::debug!(
                    late_by = now - self.next_start.unwrap_or(now),
                    resync_to = start,
                    "underrun, resyncing timeline"
                );
            }

            let Some(segment) = self.queue.pop() else {
                break;
            };
            let duration = segment.duration_seconds();
            sink.schedule(segment, start);
            self.next_start = Some(start + duration);
            self.stats.scheduled_segments += 1;
            scheduled += 1;
        }

        scheduled
    }

    /// Drop all queued and pending segments and uninitialize the clock.
    ///
    /// Driven by stop/reconnect; the next playback run re-establishes the
    /// lookahead from scratch.
    pub fn reset(&mut self, sink: &mut dyn SegmentSink) {
        self.queue.clear();
        sink.cancel_pending();
        self.next_start = None;
    }

    /// Uninitialize only the clock, keeping queued segments.
    ///
    /// Used when playback restarts from a full stop so the first segment
    /// gets a fresh lookahead margin.
    pub fn reset_clock(&mut self) {
        self.next_start = None;
    }
}
