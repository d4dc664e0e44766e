use std::time::Duration;

use genstream_types::WeightedPrompt;

/// Scheduler tuning parameters.
///
/// The tolerance and horizon values mirror the constants the scheduler was
/// originally tuned with; they are fields rather than constants because the
/// defaults have no documented derivation and may want re-tuning per host.
#[derive(Clone, Debug)]
pub struct SchedulerConfig {
    /// Buffering margin between "now" and the first scheduled segment.
    ///
    /// Absorbs arrival jitter before audible playback begins.
    pub lookahead_seconds: f64,
    /// Extra scheduling window past the lookahead.
    ///
    /// Segments are only handed to the sink once their start falls within
    /// `lookahead + horizon_slack` of the clock, so stop/pause can take
    /// effect promptly instead of racing a deeply pre-scheduled queue.
    pub horizon_slack_seconds: f64,
    /// How far in the past a scheduled start may slip before the scheduler
    /// resyncs instead of scheduling a burst of late segments.
    pub underrun_tolerance_seconds: f64,
    /// Interval between scheduler ticks.
    pub tick_interval: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            lookahead_seconds: 2.0,
            horizon_slack_seconds: 1.0,
            underrun_tolerance_seconds: 0.1,
            tick_interval: Duration::from_millis(50),
        }
    }
}

/// Static (host-configured) control values, used when no CV override is
/// present on a given tick.
///
/// Any `None` field is simply omitted from pushes; the service keeps its
/// last-known value.
#[derive(Clone, Debug, Default)]
pub struct StaticControls {
    /// Fallback prompt used when no external prompt list is supplied.
    pub prompt_text: String,
    /// Weight for the fallback prompt.
    pub prompt_weight: f64,
    /// Scale wire name; validated at resolution time.
    pub scale: Option<String>,
    pub brightness: Option<f64>,
    pub density: Option<f64>,
    /// Seed; a value of exactly 0 means "automatic seed" and is omitted.
    pub seed: Option<f64>,
    pub temperature: Option<f64>,
    pub guidance: Option<f64>,
    pub top_k: Option<f64>,
    pub bpm: Option<f64>,
}

impl StaticControls {
    /// The fallback prompt as a single-element list, or `None` when the
    /// trimmed text is empty.
    pub fn fallback_prompt(&self) -> Option<WeightedPrompt> {
        let trimmed = self.prompt_text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(WeightedPrompt::new(trimmed, self.prompt_weight))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scheduler_defaults_match_tuned_values() {
        let cfg = SchedulerConfig::default();
        assert_eq!(cfg.lookahead_seconds, 2.0);
        assert_eq!(cfg.horizon_slack_seconds, 1.0);
        assert_eq!(cfg.underrun_tolerance_seconds, 0.1);
        assert_eq!(cfg.tick_interval, Duration::from_millis(50));
    }

    #[test]
    fn fallback_prompt_trims_and_drops_empty() {
        let mut statics = StaticControls::default();
        assert!(statics.fallback_prompt().is_none());
        statics.prompt_text = "  ambient  ".to_string();
        statics.prompt_weight = 0.7;
        let p = statics.fallback_prompt().expect("prompt");
        assert_eq!(p.text, "ambient");
        assert_eq!(p.weight, 0.7);
    }
}
