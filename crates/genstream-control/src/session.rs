//! Session wiring: resolvers, state machine, and scheduler around one
//! injected service.

use anyhow::Result;
use crossbeam_channel::Receiver;
use genstream_types::{MuteConfig, PlaybackState, WeightedPrompt};

use crate::config::{SchedulerConfig, StaticControls};
use crate::controller::{GateFrame, LifecycleCommand, PlaybackController};
use crate::mutes::TrackMuteController;
use crate::params::{CvFrame, ParameterResolver};
use crate::prompts::PromptSynchronizer;
use crate::scheduler::{BufferScheduler, SchedulerStats, SegmentSink};
use crate::segment::SegmentQueue;
use crate::service::{MusicService, ServiceEvent};

/// Everything the host hands the session on one control tick.
#[derive(Clone, Debug, Default)]
pub struct ControlFrame {
    pub cv: CvFrame,
    pub gates: GateFrame,
    pub mutes: MuteConfig,
    /// External prompt list; `None` or empty falls back to the static prompt.
    pub external_prompts: Option<Vec<WeightedPrompt>>,
}

/// One generator session: change detection, lifecycle, and scheduling.
///
/// The service collaborator is injected at construction; its asynchronous
/// notifications arrive on `events` and are drained at the start of every
/// control tick, so resolution always sees the freshest mirrored state.
pub struct Session<S: MusicService> {
    service: S,
    events: Receiver<ServiceEvent>,
    statics: StaticControls,
    params: ParameterResolver,
    prompts: PromptSynchronizer,
    mutes: TrackMuteController,
    controller: PlaybackController,
    scheduler: BufferScheduler,
    /// Most recently resolved prompt list, passed along with play requests.
    current_prompts: Vec<WeightedPrompt>,
    /// Set once when setup fails; every later tick is a no-op.
    fatal: Option<String>,
}

impl<S: MusicService> Session<S> {
    pub fn new(
        service: S,
        events: Receiver<ServiceEvent>,
        statics: StaticControls,
        scheduler_cfg: SchedulerConfig,
    ) -> Self {
        let queue = std::sync::Arc::new(SegmentQueue::new());
        Self {
            service,
            events,
            statics,
            params: ParameterResolver::new(),
            prompts: PromptSynchronizer::new(),
            mutes: TrackMuteController::new(),
            controller: PlaybackController::new(),
            scheduler: BufferScheduler::new(scheduler_cfg, queue),
            current_prompts: Vec::new(),
            fatal: None,
        }
    }

    /// Establish the service session.
    ///
    /// A failure here is fatal for this session: it is reported once and all
    /// further ticks become no-ops. The host may build a new session to
    /// retry.
    pub fn connect(&mut self) -> Result<()> {
        match self.service.connect() {
            Ok(()) => Ok(()),
            Err(e) => {
                let msg = format!("{e:#}");
                tracing::error!(error = %msg, "session setup failed, block disabled");
                self.fatal = Some(msg);
                Err(e)
            }
        }
    }

    /// Run one control tick: drain service events, resolve parameters,
    /// prompts and mutes (pushing deltas on change), then evaluate the
    /// playback state machine and apply its command.
    pub fn control_tick(&mut self, frame: &ControlFrame, sink: &mut dyn SegmentSink) {
        if self.fatal.is_some() {
            return;
        }

        self.drain_events();

        if let Some(delta) = self.params.resolve(&frame.cv, &self.statics) {
            if let Err(e) = self.service.set_music_generation_config(&delta) {
                tracing::warn!("config push failed: {e:#}");
            }
        }

        if let Some(list) = self
            .prompts
            .resolve(frame.external_prompts.as_deref(), &self.statics)
        {
            self.current_prompts = list.clone();
            if let Err(e) = self.service.set_weighted_prompts(&list) {
                tracing::warn!("prompt push failed: {e:#}");
            }
        }

        if let Some(mute_cfg) = self.mutes.resolve(frame.mutes) {
            if let Err(e) = self.service.set_mute_config(&mute_cfg) {
                tracing::warn!("mute push failed: {e:#}");
            }
        }

        if let Some(command) = self.controller.tick(&frame.gates) {
            self.apply(command, sink);
        }
    }

    /// Run one scheduler pass at output-clock time `now`.
    ///
    /// No-op while playback is not locally running; the periodic timer is
    /// effectively halted until the next play.
    pub fn scheduler_tick(&mut self, now: f64, sink: &mut dyn SegmentSink) -> usize {
        if self.fatal.is_some() || !self.controller.is_playing() {
            return 0;
        }
        self.scheduler.tick(now, sink)
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events.try_recv() {
            match event {
                ServiceEvent::State(state) => self.controller.set_remote_state(state),
                ServiceEvent::Segment(segment) => self.scheduler.queue().push(segment),
                ServiceEvent::FilteredPrompt { text, reason } => {
                    tracing::warn!(prompt = %text, reason = %reason, "prompt filtered by service");
                }
                ServiceEvent::SetupComplete => {
                    tracing::info!("service setup complete");
                }
                ServiceEvent::Error(msg) => {
                    tracing::warn!(error = %msg, "service error");
                    // Mirror is unreliable until the next state event.
                    self.controller.set_remote_state(PlaybackState::Error);
                }
                ServiceEvent::Closed(msg) => {
                    tracing::info!(reason = %msg, "service connection closed");
                    self.controller.set_remote_state(PlaybackState::Error);
                }
            }
        }
    }

    fn apply(&mut self, command: LifecycleCommand, sink: &mut dyn SegmentSink) {
        match command {
            LifecycleCommand::Stop => {
                self.scheduler.reset(sink);
                if let Err(e) = self.service.stop() {
                    tracing::warn!("stop failed: {e:#}");
                }
            }
            LifecycleCommand::Reconnect => {
                self.scheduler.reset(sink);
                if let Err(e) = self.service.reconnect() {
                    tracing::warn!("reconnect failed: {e:#}");
                }
            }
            LifecycleCommand::Play { reset_clock } => {
                if reset_clock {
                    self.scheduler.reset_clock();
                }
                let prompts = if self.current_prompts.is_empty() {
                    None
                } else {
                    Some(self.current_prompts.as_slice())
                };
                if let Err(e) = self.service.play(prompts) {
                    tracing::warn!("play failed: {e:#}");
                }
            }
            LifecycleCommand::Pause => {
                if let Err(e) = self.service.pause() {
                    tracing::warn!("pause failed: {e:#}");
                }
            }
        }
    }

    pub fn is_playing(&self) -> bool {
        self.controller.is_playing()
    }

    pub fn remote_state(&self) -> PlaybackState {
        self.controller.remote_state()
    }

    pub fn scheduler_stats(&self) -> SchedulerStats {
        self.scheduler.stats()
    }

    /// Seconds of audio waiting in the queue, for status lines.
    pub fn buffered_seconds(&self) -> f64 {
        self.scheduler.queue().buffered_seconds()
    }

    /// Fatal setup error, if any.
    pub fn fatal_error(&self) -> Option<&str> {
        self.fatal.as_deref()
    }
}
