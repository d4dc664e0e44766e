//! Control surface of the remote generation service.
//!
//! The service is injected into the session at construction so tests can
//! substitute a double. Asynchronous notifications arrive as typed
//! [`ServiceEvent`]s over a channel instead of string-keyed callbacks.

use anyhow::Result;
use crossbeam_channel::{Receiver, Sender};
use genstream_types::{MusicGenerationConfig, MuteConfig, PlaybackState, WeightedPrompt};

use crate::segment::AudioSegment;

/// Commands the control core issues to the remote generator.
///
/// Calls are non-blocking requests; the service reports the resulting state
/// through [`ServiceEvent::State`], never through the return value. An `Err`
/// means the request could not even be submitted.
pub trait MusicService {
    fn connect(&mut self) -> Result<()>;
    fn play(&mut self, prompts: Option<&[WeightedPrompt]>) -> Result<()>;
    fn pause(&mut self) -> Result<()>;
    fn stop(&mut self) -> Result<()>;
    fn reconnect(&mut self) -> Result<()>;
    fn set_music_generation_config(&mut self, delta: &MusicGenerationConfig) -> Result<()>;
    fn set_weighted_prompts(&mut self, prompts: &[WeightedPrompt]) -> Result<()>;
    fn set_mute_config(&mut self, mutes: &MuteConfig) -> Result<()>;
    fn playback_state(&self) -> PlaybackState;
}

/// Asynchronous notifications from the service to the control core.
#[derive(Debug)]
pub enum ServiceEvent {
    /// Remote playback state changed.
    State(PlaybackState),
    /// One decoded audio segment was delivered.
    Segment(AudioSegment),
    /// A prompt was rejected by the service's content filter.
    FilteredPrompt { text: String, reason: String },
    /// Session established and ready for lifecycle commands.
    SetupComplete,
    /// Recoverable or mid-session error.
    Error(String),
    /// The connection closed.
    Closed(String),
}

/// Create the event channel a service uses to notify the session.
///
/// Unbounded, matching the worker channels elsewhere in the workspace: the
/// consumer drains at control-tick rate and segment delivery must never block
/// the producer.
pub fn event_channel() -> (Sender<ServiceEvent>, Receiver<ServiceEvent>) {
    crossbeam_channel::unbounded()
}
