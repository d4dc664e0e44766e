//! Playback lifecycle state machine.
//!
//! Translates gate/trigger control inputs plus the mirrored remote state into
//! typed lifecycle commands. The mirror is updated only from service state
//! events; a command never advances local state optimistically.

use genstream_types::PlaybackState;

/// Discrete control inputs for one tick.
///
/// `play_gate` is a level; the triggers are levels too and edge detection
/// happens locally against the previous tick's values.
#[derive(Clone, Copy, Debug, Default)]
pub struct GateFrame {
    pub play_gate: bool,
    pub stop_trigger: bool,
    pub reconnect_trigger: bool,
}

/// Lifecycle command decided by the state machine for one tick.
///
/// The session applies it: service call plus, where flagged, a scheduler
/// reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LifecycleCommand {
    /// Stop playback and drop all scheduling state.
    Stop,
    /// Drop scheduling state and re-establish the session.
    Reconnect,
    /// Start or resume playback. `reset_clock` forces a fresh lookahead
    /// buffer (set when resuming from a full stop).
    Play { reset_clock: bool },
    /// Suspend playback because the gate went low.
    Pause,
}

/// Gate-driven playback state machine.
#[derive(Debug)]
pub struct PlaybackController {
    playing: bool,
    was_paused_by_low_gate: bool,
    prev_stop: bool,
    prev_reconnect: bool,
    mirrored: PlaybackState,
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self {
            playing: false,
            was_paused_by_low_gate: false,
            prev_stop: false,
            prev_reconnect: false,
            mirrored: PlaybackState::Stopped,
        }
    }
}

impl PlaybackController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update the local mirror from a service state event.
    pub fn set_remote_state(&mut self, state: PlaybackState) {
        if self.mirrored != state {
            tracing::debug!(?state, "remote playback state");
        }
        self.mirrored = state;
    }

    /// Currently mirrored remote state.
    pub fn remote_state(&self) -> PlaybackState {
        self.mirrored
    }

    /// Whether the controller believes playback is running.
    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn was_paused_by_low_gate(&self) -> bool {
        self.was_paused_by_low_gate
    }

    /// Evaluate one tick.
    ///
    /// Rules are checked in strict priority order and the first match wins:
    /// stop edge, reconnect edge, gate-high play, gate-low pause. Returns
    /// `None` when no rule fires (an explicit no-op, not an error).
    pub fn tick(&mut self, frame: &GateFrame) -> Option<LifecycleCommand> {
        let stop_edge = frame.stop_trigger && !self.prev_stop;
        let reconnect_edge = frame.reconnect_trigger && !self.prev_reconnect;
        self.prev_stop = frame.stop_trigger;
        self.prev_reconnect = frame.reconnect_trigger;

        if stop_edge {
            self.playing = false;
            self.was_paused_by_low_gate = false;
            return Some(LifecycleCommand::Stop);
        }

        if reconnect_edge {
            return Some(LifecycleCommand::Reconnect);
        }

        if frame.play_gate
            && (!self.playing
                || matches!(
                    self.mirrored,
                    PlaybackState::Paused | PlaybackState::Stopped
                ))
        {
            let reset_clock = self.mirrored == PlaybackState::Stopped;
            self.playing = true;
            self.was_paused_by_low_gate = false;
            return Some(LifecycleCommand::Play { reset_clock });
        }

        if !frame.play_gate
            && self.playing
            && matches!(
                self.mirrored,
                PlaybackState::Playing | PlaybackState::Loading
            )
        {
            self.playing = false;
            self.was_paused_by_low_gate = true;
            return Some(LifecycleCommand::Pause);
        }

        None
    }
}
