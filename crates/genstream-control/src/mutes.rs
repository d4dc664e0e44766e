//! Track-mute flag resolution and change detection.

use genstream_types::MuteConfig;

/// Resolves the three mix flags each tick and reports change.
///
/// The flags are independent booleans at this layer; any interaction between
/// "only bass and drums" and the per-track mutes is the service's policy.
#[derive(Debug, Default)]
pub struct TrackMuteController {
    last: Option<MuteConfig>,
}

impl TrackMuteController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the config to push when any flag differs from the previous
    /// tick (or on the first tick), `None` otherwise.
    pub fn resolve(&mut self, current: MuteConfig) -> Option<MuteConfig> {
        if self.last == Some(current) {
            return None;
        }
        self.last = Some(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_tick_pushes() {
        let mut mutes = TrackMuteController::new();
        assert_eq!(mutes.resolve(MuteConfig::default()), Some(MuteConfig::default()));
    }

    #[test]
    fn unchanged_flags_do_not_push() {
        let mut mutes = TrackMuteController::new();
        let cfg = MuteConfig {
            mute_bass: true,
            ..Default::default()
        };
        assert!(mutes.resolve(cfg).is_some());
        assert!(mutes.resolve(cfg).is_none());
    }

    #[test]
    fn any_single_flag_change_pushes() {
        let mut mutes = TrackMuteController::new();
        let mut cfg = MuteConfig::default();
        assert!(mutes.resolve(cfg).is_some());
        cfg.mute_drums = true;
        assert!(mutes.resolve(cfg).is_some());
        cfg.only_bass_and_drums = true;
        let pushed = mutes.resolve(cfg).expect("push");
        // Flags stay independent; the push carries all three as-is.
        assert!(pushed.mute_drums);
        assert!(pushed.only_bass_and_drums);
        assert!(!pushed.mute_bass);
    }
}
