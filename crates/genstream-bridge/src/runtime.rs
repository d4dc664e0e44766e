//! Composition of session, sink, and simulated service into the run loop.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use anyhow::Result;
use cpal::traits::StreamTrait;

use genstream_control::config::{SchedulerConfig, StaticControls};
use genstream_control::controller::GateFrame;
use genstream_control::params::{CvFrame, ParameterResolver};
use genstream_control::service::event_channel;
use genstream_control::session::{ControlFrame, Session};
use genstream_types::MuteConfig;

use crate::cli::Args;
use crate::sim::SimulatedService;
use crate::sink::CpalSink;

const STATUS_INTERVAL: Duration = Duration::from_secs(2);

pub fn statics_from_args(args: &Args) -> StaticControls {
    StaticControls {
        prompt_text: args.prompt.clone(),
        prompt_weight: args.prompt_weight,
        scale: args.scale.clone(),
        brightness: args.brightness,
        density: args.density,
        seed: args.seed,
        temperature: args.temperature,
        guidance: args.guidance,
        top_k: args.top_k,
        bpm: args.bpm,
    }
}

pub fn scheduler_config_from_args(args: &Args) -> SchedulerConfig {
    SchedulerConfig {
        lookahead_seconds: args.lookahead_seconds,
        horizon_slack_seconds: args.horizon_slack_seconds,
        underrun_tolerance_seconds: args.underrun_tolerance_seconds,
        tick_interval: Duration::from_millis(args.scheduler_tick_ms.max(1)),
    }
}

/// Print the statically resolved generation config as JSON.
pub fn dump_config(args: &Args) -> Result<()> {
    let statics = statics_from_args(args);
    let mut resolver = ParameterResolver::new();
    let resolved = resolver
        .resolve(&CvFrame::default(), &statics)
        .unwrap_or_default();
    println!("{}", serde_json::to_string_pretty(&resolved)?);
    Ok(())
}

/// Run the control loop against the simulated generator until Ctrl-C or the
/// requested duration elapses.
pub fn run(args: &Args, duration_seconds: Option<u64>) -> Result<()> {
    let host = cpal::default_host();
    let (mut sink, stream) = CpalSink::open(&host, args.device.as_deref())?;
    stream.play()?;

    let (event_tx, event_rx) = event_channel();
    let service = SimulatedService::new(event_tx, sink.sample_rate(), sink.channels());
    let mut session = Session::new(
        service,
        event_rx,
        statics_from_args(args),
        scheduler_config_from_args(args),
    );
    session.connect()?;

    let stop_requested = Arc::new(AtomicBool::new(false));
    {
        let flag = stop_requested.clone();
        let _ = ctrlc::set_handler(move || {
            flag.store(true, Ordering::Relaxed);
        });
    }

    let control_tick = Duration::from_millis(args.control_tick_ms.max(1));
    let scheduler_tick = Duration::from_millis(args.scheduler_tick_ms.max(1));
    let started = Instant::now();
    let mut last_scheduler_tick = Instant::now();
    let mut last_status = Instant::now();

    let mutes = MuteConfig {
        mute_bass: args.mute_bass,
        mute_drums: args.mute_drums,
        only_bass_and_drums: args.only_bass_and_drums,
    };
    let frame = ControlFrame {
        gates: GateFrame {
            play_gate: true,
            ..Default::default()
        },
        mutes,
        ..Default::default()
    };

    tracing::info!("control loop running (Ctrl-C to stop)");
    loop {
        let done = stop_requested.load(Ordering::Relaxed)
            || duration_seconds
                .map(|limit| started.elapsed() >= Duration::from_secs(limit))
                .unwrap_or(false);
        if done {
            break;
        }

        session.control_tick(&frame, &mut sink);

        if last_scheduler_tick.elapsed() >= scheduler_tick {
            session.scheduler_tick(sink.now_seconds(), &mut sink);
            last_scheduler_tick = Instant::now();
        }

        if last_status.elapsed() >= STATUS_INTERVAL {
            let stats = session.scheduler_stats();
            tracing::info!(
                state = ?session.remote_state(),
                buffered_seconds = format!("{:.2}", session.buffered_seconds()),
                scheduled = stats.scheduled_segments,
                underrun_resyncs = stats.underrun_resyncs,
                "status"
            );
            last_status = Instant::now();
        }

        std::thread::sleep(control_tick);
    }

    // One final tick with the stop trigger raised so the service and the
    // scheduling state wind down cleanly.
    let stop_frame = ControlFrame {
        gates: GateFrame {
            stop_trigger: true,
            ..Default::default()
        },
        mutes,
        ..Default::default()
    };
    session.control_tick(&stop_frame, &mut sink);
    tracing::info!("stopped");
    Ok(())
}
