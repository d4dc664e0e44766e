//! In-process simulated generator service.
//!
//! Stands in for the remote generation service so the control loop can run
//! end-to-end without network access: a worker thread produces sine-wave
//! segments at an irregular cadence while honoring the full control surface
//! (lifecycle, config deltas, prompts, mutes).

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use anyhow::{Result, anyhow};
use crossbeam_channel::{Receiver, Sender};

use genstream_control::segment::AudioSegment;
use genstream_control::service::{MusicService, ServiceEvent};
use genstream_types::{MusicGenerationConfig, MuteConfig, PlaybackState, Scale, WeightedPrompt};

/// Nominal length of one generated segment.
const SEGMENT_SECONDS: f64 = 2.0;

#[derive(Debug)]
enum SimCommand {
    Play,
    Pause,
    Stop,
    Reconnect,
    Config(MusicGenerationConfig),
    Prompts(Vec<WeightedPrompt>),
    Mutes(MuteConfig),
}

/// Simulated [`MusicService`] backed by a worker thread.
pub struct SimulatedService {
    events: Sender<ServiceEvent>,
    cmd_tx: Option<Sender<SimCommand>>,
    state: Arc<Mutex<PlaybackState>>,
    sample_rate: u32,
    channels: usize,
}

impl SimulatedService {
    pub fn new(events: Sender<ServiceEvent>, sample_rate: u32, channels: usize) -> Self {
        Self {
            events,
            cmd_tx: None,
            state: Arc::new(Mutex::new(PlaybackState::Stopped)),
            sample_rate,
            channels,
        }
    }

    fn send(&self, cmd: SimCommand) -> Result<()> {
        self.cmd_tx
            .as_ref()
            .ok_or_else(|| anyhow!("service not connected"))?
            .send(cmd)
            .map_err(|_| anyhow!("service worker gone"))
    }
}

impl MusicService for SimulatedService {
    fn connect(&mut self) -> Result<()> {
        if self.cmd_tx.is_some() {
            return Ok(());
        }
        let (cmd_tx, cmd_rx) = crossbeam_channel::unbounded();
        let events = self.events.clone();
        let state = self.state.clone();
        let sample_rate = self.sample_rate;
        let channels = self.channels;
        std::thread::spawn(move || {
            worker_main(cmd_rx, events, state, sample_rate, channels);
        });
        self.cmd_tx = Some(cmd_tx);
        Ok(())
    }

    fn play(&mut self, _prompts: Option<&[WeightedPrompt]>) -> Result<()> {
        self.send(SimCommand::Play)
    }

    fn pause(&mut self) -> Result<()> {
        self.send(SimCommand::Pause)
    }

    fn stop(&mut self) -> Result<()> {
        self.send(SimCommand::Stop)
    }

    fn reconnect(&mut self) -> Result<()> {
        self.send(SimCommand::Reconnect)
    }

    fn set_music_generation_config(&mut self, delta: &MusicGenerationConfig) -> Result<()> {
        self.send(SimCommand::Config(delta.clone()))
    }

    fn set_weighted_prompts(&mut self, prompts: &[WeightedPrompt]) -> Result<()> {
        self.send(SimCommand::Prompts(prompts.to_vec()))
    }

    fn set_mute_config(&mut self, mutes: &MuteConfig) -> Result<()> {
        self.send(SimCommand::Mutes(*mutes))
    }

    fn playback_state(&self) -> PlaybackState {
        *self.state.lock().unwrap()
    }
}

struct Worker {
    events: Sender<ServiceEvent>,
    state: Arc<Mutex<PlaybackState>>,
    sample_rate: u32,
    channels: usize,
    cfg: MusicGenerationConfig,
    mutes: MuteConfig,
    playing: bool,
    phase: f64,
    /// LCG state for arrival jitter.
    rng: u64,
    last_emit: Option<Instant>,
    next_gap: Duration,
}

fn worker_main(
    cmd_rx: Receiver<SimCommand>,
    events: Sender<ServiceEvent>,
    state: Arc<Mutex<PlaybackState>>,
    sample_rate: u32,
    channels: usize,
) {
    let mut worker = Worker {
        events,
        state,
        sample_rate,
        channels,
        cfg: MusicGenerationConfig::default(),
        mutes: MuteConfig::default(),
        playing: false,
        phase: 0.0,
        rng: 0x9e37_79b9_7f4a_7c15,
        last_emit: None,
        next_gap: Duration::ZERO,
    };
    let _ = worker.events.send(ServiceEvent::SetupComplete);
    worker.set_state(PlaybackState::Stopped);

    loop {
        match cmd_rx.recv_timeout(Duration::from_millis(25)) {
            Ok(cmd) => {
                if !worker.handle(cmd) {
                    return;
                }
            }
            Err(crossbeam_channel::RecvTimeoutError::Timeout) => {}
            Err(crossbeam_channel::RecvTimeoutError::Disconnected) => return,
        }
        worker.maybe_emit_segment();
    }
}

impl Worker {
    fn set_state(&mut self, state: PlaybackState) {
        *self.state.lock().unwrap() = state;
        let _ = self.events.send(ServiceEvent::State(state));
    }

    /// Returns `false` when the worker should exit.
    fn handle(&mut self, cmd: SimCommand) -> bool {
        match cmd {
            SimCommand::Play => {
                self.playing = true;
                // Emit the first segment immediately; cadence applies after.
                self.last_emit = None;
                self.set_state(PlaybackState::Loading);
            }
            SimCommand::Pause => {
                self.playing = false;
                self.set_state(PlaybackState::Paused);
            }
            SimCommand::Stop => {
                self.playing = false;
                self.set_state(PlaybackState::Stopped);
            }
            SimCommand::Reconnect => {
                self.playing = false;
                self.phase = 0.0;
                let _ = self
                    .events
                    .send(ServiceEvent::Closed("reconnect requested".to_string()));
                let _ = self.events.send(ServiceEvent::SetupComplete);
                self.set_state(PlaybackState::Stopped);
            }
            SimCommand::Config(delta) => {
                tracing::debug!(?delta, "sim: config delta");
                self.cfg.apply(&delta);
            }
            SimCommand::Prompts(prompts) => {
                for p in &prompts {
                    // Exercise the content-filter surface.
                    if p.text.contains("explicit") {
                        let _ = self.events.send(ServiceEvent::FilteredPrompt {
                            text: p.text.clone(),
                            reason: "blocked by content filter".to_string(),
                        });
                    }
                }
                tracing::debug!(count = prompts.len(), "sim: prompts set");
            }
            SimCommand::Mutes(mutes) => {
                tracing::debug!(?mutes, "sim: mutes set");
                self.mutes = mutes;
            }
        }
        true
    }

    fn maybe_emit_segment(&mut self) {
        if !self.playing {
            return;
        }
        if let Some(last) = self.last_emit {
            if last.elapsed() < self.next_gap {
                return;
            }
        }

        let segment = self.generate_segment();
        let _ = self.events.send(ServiceEvent::Segment(segment));
        self.last_emit = Some(Instant::now());
        // Irregular cadence around the segment length, bursty on purpose:
        // the scheduler's lookahead has to absorb this.
        let jitter = 0.5 + self.rand01();
        self.next_gap = Duration::from_secs_f64(SEGMENT_SECONDS * jitter.min(1.4) * 0.7);

        let current = *self.state.lock().unwrap();
        if current == PlaybackState::Loading {
            self.set_state(PlaybackState::Buffering);
            self.set_state(PlaybackState::Playing);
        }
    }

    fn generate_segment(&mut self) -> AudioSegment {
        let frames = (SEGMENT_SECONDS * self.sample_rate as f64) as usize;
        let freq = self.tone_frequency();
        let mut amp = (self.cfg.brightness.unwrap_or(0.5).clamp(0.0, 1.0) * 0.4) as f32;
        // Crude stand-in for dropped mix layers.
        if self.mutes.mute_bass {
            amp *= 0.7;
        }
        if self.mutes.mute_drums {
            amp *= 0.7;
        }
        let step = std::f64::consts::TAU * freq / self.sample_rate as f64;

        let mut samples = Vec::with_capacity(frames * self.channels);
        for _ in 0..frames {
            let value = (self.phase.sin() as f32) * amp;
            self.phase += step;
            for _ in 0..self.channels {
                samples.push(value);
            }
        }
        self.phase %= std::f64::consts::TAU;

        let mut segment = AudioSegment::new(samples, self.channels, self.sample_rate);
        segment.tag = self.cfg.bpm.map(|bpm| format!("bpm={bpm}"));
        segment
    }

    /// Root frequency derived from the configured scale, A3 by default.
    fn tone_frequency(&self) -> f64 {
        let semitone = match self.cfg.scale {
            Some(Scale::CMajorAMinor) => 3,
            Some(Scale::DFlatMajorBFlatMinor) => 4,
            Some(Scale::DMajorBMinor) => 5,
            Some(Scale::EFlatMajorCMinor) => 6,
            Some(Scale::EMajorDFlatMinor) => 7,
            Some(Scale::FMajorDMinor) => 8,
            Some(Scale::GFlatMajorEFlatMinor) => 9,
            Some(Scale::GMajorEMinor) => 10,
            Some(Scale::AFlatMajorFMinor) => 11,
            Some(Scale::AMajorGFlatMinor) => 0,
            Some(Scale::BFlatMajorGMinor) => 1,
            Some(Scale::BMajorAFlatMinor) => 2,
            None => 0,
        };
        220.0 * f64::powf(2.0, semitone as f64 / 12.0)
    }

    fn rand01(&mut self) -> f64 {
        self.rng = self
            .rng
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        (self.rng >> 11) as f64 / (1u64 << 53) as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use genstream_control::service::event_channel;

    fn recv_state(rx: &Receiver<ServiceEvent>, timeout: Duration) -> Option<PlaybackState> {
        let deadline = Instant::now() + timeout;
        while let Ok(event) = rx.recv_deadline(deadline) {
            if let ServiceEvent::State(s) = event {
                return Some(s);
            }
        }
        None
    }

    #[test]
    fn connect_reports_setup_and_stopped() {
        let (tx, rx) = event_channel();
        let mut service = SimulatedService::new(tx, 8_000, 1);
        service.connect().unwrap();
        let first = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert!(matches!(first, ServiceEvent::SetupComplete));
        assert_eq!(
            recv_state(&rx, Duration::from_secs(2)),
            Some(PlaybackState::Stopped)
        );
    }

    #[test]
    fn play_delivers_segments_and_reaches_playing() {
        let (tx, rx) = event_channel();
        let mut service = SimulatedService::new(tx, 8_000, 1);
        service.connect().unwrap();
        service.play(None).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        let mut saw_segment = false;
        let mut saw_playing = false;
        while Instant::now() < deadline && !(saw_segment && saw_playing) {
            match rx.recv_deadline(deadline) {
                Ok(ServiceEvent::Segment(s)) => {
                    assert!(s.duration_seconds() > 0.0);
                    saw_segment = true;
                }
                Ok(ServiceEvent::State(PlaybackState::Playing)) => saw_playing = true,
                Ok(_) => {}
                Err(_) => break,
            }
        }
        assert!(saw_segment, "no segment delivered");
        assert!(saw_playing, "never reached Playing");
        assert_eq!(service.playback_state(), PlaybackState::Playing);
    }

    #[test]
    fn commands_before_connect_fail() {
        let (tx, _rx) = event_channel();
        let mut service = SimulatedService::new(tx, 8_000, 1);
        assert!(service.play(None).is_err());
        assert!(service.stop().is_err());
    }
}
