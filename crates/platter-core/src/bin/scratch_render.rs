//! Offline scratch renderer
//!
//! Plays a WAV file through a deck, grabs the platter for a back-and-forth
//! scratch, flicks it into a fling and lets the deck crossfade back into
//! playback. The result is written as a 32-bit float WAV.
//!
//! ```text
//! scratch-render <input.wav> <output.wav> [--start <seconds>] [--config <deck.yaml>]
//! ```
//!
//! Set `RUST_LOG=debug` to see every transport decision.

use std::f64::consts::TAU;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use hound::{SampleFormat, WavReader, WavSpec, WavWriter};

use platter_core::config::{default_config_path, load_config, try_load_config, DeckConfig};
use platter_core::transport::{deck_pair, DeckTransport};
use platter_core::AudioBuffer;

/// Frames per rendered block
const BLOCK_FRAMES: usize = 256;

/// Timeline in device seconds. The flick coasts for up to ~4s before the
/// deck crossfades back into playback.
const GRAB_AT: f64 = 1.0;
const FLICK_AT: f64 = 2.0;
const END_AT: f64 = 7.5;

/// Back-and-forth scratch: amplitude in degrees and strokes per second
const STROKE_DEGREES: f64 = 40.0;
const STROKE_RATE: f64 = 2.0;

/// Final flick before letting go: degrees over seconds
const FLICK_DEGREES: f64 = 20.0;
const FLICK_TIME: f64 = 0.01;

/// The scripted performance, stepped once per block
#[derive(Debug, Default)]
struct Script {
    playing: bool,
    grabbed: bool,
    released: bool,
    angle: f64,
}

impl Script {
    fn step(&mut self, deck: &mut DeckTransport, t: f64) {
        if !self.playing && !self.grabbed {
            // Dropped until the seek's lock window has passed
            self.playing = deck.play();
        }

        if !self.grabbed && t >= GRAB_AT {
            self.grabbed = deck.platter_press(0.0, t);
        } else if self.grabbed && !self.released {
            if t < FLICK_AT {
                self.angle = STROKE_DEGREES * (TAU * STROKE_RATE * (t - GRAB_AT)).sin();
                deck.platter_move(self.angle, t);
            } else {
                deck.platter_move(self.angle, t);
                deck.platter_release(self.angle + FLICK_DEGREES, t + FLICK_TIME);
                self.released = true;
            }
        }
    }
}

struct Args {
    input: PathBuf,
    output: PathBuf,
    start: f64,
    config: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut positional = Vec::new();
    let mut start = 0.0;
    let mut config = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--start" => {
                let value = args.next().context("--start needs a value")?;
                start = value
                    .parse()
                    .with_context(|| format!("Invalid start time: {}", value))?;
            }
            "--config" => {
                config = Some(PathBuf::from(args.next().context("--config needs a path")?));
            }
            _ => positional.push(PathBuf::from(arg)),
        }
    }

    let mut positional = positional.into_iter();
    match (positional.next(), positional.next()) {
        (Some(input), Some(output)) => Ok(Args {
            input,
            output,
            start,
            config,
        }),
        _ => bail!("usage: scratch-render <input.wav> <output.wav> [--start <seconds>] [--config <deck.yaml>]"),
    }
}

fn read_wav(path: &Path) -> Result<AudioBuffer> {
    let mut reader = WavReader::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let spec = reader.spec();

    let samples: Vec<f32> = match spec.sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .context("Failed to read float samples")?,
        SampleFormat::Int => {
            let scale = 1.0 / (1i64 << (spec.bits_per_sample.max(1) - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 * scale))
                .collect::<Result<_, _>>()
                .context("Failed to read integer samples")?
        }
    };

    let buffer = AudioBuffer::from_interleaved(&samples, spec.channels as usize, spec.sample_rate)?;
    log::info!(
        "Read {:?}: {:.2}s, {} channel(s) @ {}Hz",
        path,
        buffer.duration(),
        buffer.channel_count(),
        buffer.sample_rate()
    );
    Ok(buffer)
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let args = parse_args()?;
    let config: DeckConfig = match &args.config {
        Some(path) => try_load_config(path)?,
        None => load_config(&default_config_path()),
    };

    let buffer = read_wav(&args.input)?;
    let sample_rate = buffer.sample_rate();
    let channels = buffer.channel_count().min(2) as u16;

    let (mut deck, mut renderer) = deck_pair(config, sample_rate);
    let events = deck.events();
    let atomics = deck.atomics().clone();

    deck.load(buffer);
    deck.seek(args.start);

    let spec = WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 32,
        sample_format: SampleFormat::Float,
    };
    let mut writer = WavWriter::create(&args.output, spec)
        .with_context(|| format!("Failed to create {:?}", args.output))?;

    let mut outputs = vec![vec![0.0f32; BLOCK_FRAMES]; channels as usize];
    let mut script = Script::default();

    loop {
        let t = atomics.device_time();
        if t >= END_AT {
            break;
        }
        script.step(&mut deck, t);

        let mut block: Vec<&mut [f32]> = outputs.iter_mut().map(|ch| ch.as_mut_slice()).collect();
        renderer.process(&mut block);
        deck.poll();
        for event in events.try_iter() {
            log::info!("[{:.3}s] {:?}", atomics.device_time(), event);
        }

        for i in 0..BLOCK_FRAMES {
            for channel in &outputs {
                writer.write_sample(channel[i])?;
            }
        }
    }

    writer.finalize().context("Failed to finalize output WAV")?;
    log::info!("Wrote {:?}", args.output);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use platter_core::transport::DeckEvent;

    #[test]
    fn test_script_plays_scratches_and_resumes() {
        let (mut deck, mut renderer) = deck_pair(DeckConfig::default(), 48000);
        let data = (0..10 * 48000).map(|i| (i as f32 * 0.02).sin() * 0.5).collect();
        deck.load(AudioBuffer::mono(data, 48000).unwrap());
        assert!(deck.seek(2.0));

        let events = deck.events();
        let atomics = deck.atomics().clone();
        let mut script = Script::default();
        let mut out = vec![0.0f32; BLOCK_FRAMES];
        let mut seen = Vec::new();
        while atomics.device_time() < END_AT {
            script.step(&mut deck, atomics.device_time());
            renderer.process(&mut [out.as_mut_slice()]);
            deck.poll();
            seen.extend(events.try_iter());
        }

        assert!(script.playing);
        let play_at = seen.iter().position(|e| *e == DeckEvent::Play).unwrap();
        let fling_at = seen
            .iter()
            .position(|e| matches!(e, DeckEvent::FlingStart { .. }))
            .unwrap();
        let resume_at = seen
            .iter()
            .position(|e| matches!(e, DeckEvent::Resume { .. }))
            .unwrap();
        assert!(play_at < fling_at && fling_at < resume_at);
        assert!(deck.is_playing());
        assert!(atomics.is_playback_active());
    }
}
