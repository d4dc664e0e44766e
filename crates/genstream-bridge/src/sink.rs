//! CPAL-backed segment sink.
//!
//! The sink owns a sample-frame clock derived from the frames it has handed
//! to the device, and mixes scheduled segments into the output at their exact
//! start frames. The callback never blocks beyond the shared-state mutex and
//! fills gaps with silence.

use std::sync::{Arc, Mutex};

use anyhow::{Context, Result, anyhow};
use cpal::traits::{DeviceTrait, HostTrait};

use genstream_control::scheduler::SegmentSink;
use genstream_control::segment::AudioSegment;

/// One segment pinned to an absolute start frame on the output timeline.
struct ScheduledSegment {
    start_frame: u64,
    samples: Vec<f32>,
    channels: usize,
}

impl ScheduledSegment {
    fn frames(&self) -> u64 {
        if self.channels == 0 {
            0
        } else {
            (self.samples.len() / self.channels) as u64
        }
    }

    /// Sample for output channel `ch` at absolute frame `frame`, or 0.0 when
    /// outside this segment. Mono sources are duplicated across channels;
    /// other layouts clamp to the available channels.
    fn sample_at(&self, frame: u64, ch: usize) -> f32 {
        if frame < self.start_frame {
            return 0.0;
        }
        let offset = frame - self.start_frame;
        if offset >= self.frames() {
            return 0.0;
        }
        let src_ch = ch.min(self.channels.saturating_sub(1));
        self.samples[offset as usize * self.channels + src_ch]
    }
}

struct MixerState {
    /// Frames delivered to the device so far; the output clock.
    frame_head: u64,
    entries: Vec<ScheduledSegment>,
}

/// Scheduling handle for the CPAL output stream.
///
/// Cloneable into the audio callback via the shared mixer state; the
/// returned `cpal::Stream` must be kept alive by the caller for as long as
/// output is wanted.
pub struct CpalSink {
    shared: Arc<Mutex<MixerState>>,
    sample_rate: u32,
    channels: usize,
}

impl CpalSink {
    /// Open the output device and start the stream.
    pub fn open(host: &cpal::Host, device_needle: Option<&str>) -> Result<(Self, cpal::Stream)> {
        let device = pick_device(host, device_needle)?;
        let config = device
            .default_output_config()
            .context("No default output config")?;
        tracing::info!(
            device = %device.description()?,
            rate_hz = config.sample_rate(),
            channels = config.channels(),
            "output device"
        );

        let shared = Arc::new(Mutex::new(MixerState {
            frame_head: 0,
            entries: Vec::new(),
        }));
        let sink = Self {
            shared: shared.clone(),
            sample_rate: config.sample_rate(),
            channels: config.channels() as usize,
        };

        let stream_config: cpal::StreamConfig = config.clone().into();
        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, shared),
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, shared),
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, shared),
            other => Err(anyhow!("Unsupported sample format: {other:?}")),
        }?;

        Ok((sink, stream))
    }

    /// Current output-clock time in seconds (frames delivered / sample rate).
    pub fn now_seconds(&self) -> f64 {
        let head = self.shared.lock().unwrap().frame_head;
        head as f64 / self.sample_rate as f64
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }
}

impl SegmentSink for CpalSink {
    fn schedule(&mut self, segment: AudioSegment, start_time: f64) {
        if segment.sample_rate != self.sample_rate {
            tracing::warn!(
                segment_rate = segment.sample_rate,
                device_rate = self.sample_rate,
                "segment sample rate differs from device rate; playing unresampled"
            );
        }
        let start_frame = (start_time.max(0.0) * self.sample_rate as f64).round() as u64;
        let mut state = self.shared.lock().unwrap();
        state.entries.push(ScheduledSegment {
            start_frame,
            samples: segment.samples,
            channels: segment.channels.max(1),
        });
    }

    fn cancel_pending(&mut self) {
        let mut state = self.shared.lock().unwrap();
        let head = state.frame_head;
        // Drop everything that has not started sounding yet; whatever is
        // mid-playback is truncated at the next callback boundary anyway
        // because a stop also silences the generator side.
        state.entries.retain(|e| e.start_frame < head);
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    shared: Arc<Mutex<MixerState>>,
) -> Result<cpal::Stream>
where
    T: cpal::Sample + cpal::SizedSample + cpal::FromSample<f32>,
{
    let channels_out = config.channels as usize;
    let err_fn = |err| eprintln!("Stream error: {err}");

    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            let mut state = shared.lock().unwrap();
            let frames = data.len() / channels_out;
            let head = state.frame_head;

            for frame in 0..frames {
                let global = head + frame as u64;
                for ch in 0..channels_out {
                    let mixed: f32 = state
                        .entries
                        .iter()
                        .map(|e| e.sample_at(global, ch))
                        .sum();
                    data[frame * channels_out + ch] =
                        <T as cpal::Sample>::from_sample::<f32>(mixed.clamp(-1.0, 1.0));
                }
            }

            state.frame_head = head + frames as u64;
            let new_head = state.frame_head;
            state
                .entries
                .retain(|e| e.start_frame + e.frames() > new_head);
        },
        err_fn,
        None,
    )?;

    Ok(stream)
}

/// Pick the first output device matching `needle` (case-insensitive), or the
/// host default.
pub fn pick_device(host: &cpal::Host, needle: Option<&str>) -> Result<cpal::Device> {
    let mut devices: Vec<cpal::Device> = host
        .output_devices()
        .context("No output devices")?
        .collect();

    if let Some(needle) = needle {
        let wanted = needle.to_lowercase();
        if let Some(d) = devices.drain(..).find(|d| {
            d.description()
                .ok()
                .map(|n| n.name().to_lowercase().contains(&wanted))
                .unwrap_or(false)
        }) {
            return Ok(d);
        }
        return Err(anyhow!("No output device matched: {needle}"));
    }

    host.default_output_device()
        .ok_or_else(|| anyhow!("No default output device"))
}

/// Print all output devices to stdout.
pub fn list_devices(host: &cpal::Host) -> Result<()> {
    for device in host.output_devices().context("No output devices")? {
        match device.description() {
            Ok(desc) => println!("{desc}"),
            Err(e) => tracing::warn!("device name unavailable: {e}"),
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(start_frame: u64, samples: Vec<f32>, channels: usize) -> ScheduledSegment {
        ScheduledSegment {
            start_frame,
            samples,
            channels,
        }
    }

    #[test]
    fn sample_at_is_silent_outside_the_segment() {
        let e = entry(10, vec![0.5, 0.5], 1);
        assert_eq!(e.sample_at(9, 0), 0.0);
        assert_eq!(e.sample_at(10, 0), 0.5);
        assert_eq!(e.sample_at(11, 0), 0.5);
        assert_eq!(e.sample_at(12, 0), 0.0);
    }

    #[test]
    fn mono_segments_duplicate_across_channels() {
        let e = entry(0, vec![0.25, 0.75], 1);
        assert_eq!(e.sample_at(1, 0), 0.75);
        assert_eq!(e.sample_at(1, 1), 0.75);
    }

    #[test]
    fn stereo_segments_index_their_channels() {
        let e = entry(0, vec![0.1, 0.2, 0.3, 0.4], 2);
        assert_eq!(e.sample_at(0, 0), 0.1);
        assert_eq!(e.sample_at(0, 1), 0.2);
        assert_eq!(e.sample_at(1, 0), 0.3);
        // Extra output channels clamp to the last source channel.
        assert_eq!(e.sample_at(1, 2), 0.4);
    }

    #[test]
    fn frames_accounts_for_interleaving() {
        let e = entry(0, vec![0.0; 6], 2);
        assert_eq!(e.frames(), 3);
        let degenerate = entry(0, vec![0.0; 6], 0);
        assert_eq!(degenerate.frames(), 0);
    }
}
