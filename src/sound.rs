//! Keystroke clicks
//!
//! Output runs on a dedicated audio thread that owns the cpal stream. Callers
//! only send commands over a channel, so a missing or broken audio device
//! never blocks or fails the terminal.

use std::f32::consts::TAU;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;

use cpal::traits::{DeviceTrait as _, HostTrait as _, StreamTrait as _};
use tracing::{debug, warn};

/// Short audio cue fired on keystrokes and animated reveal steps
pub trait KeystrokeCue: Send + Sync {
    fn play(&self);
}

const CLICK_HZ: f32 = 1800.0;
const CLICK_MS: f32 = 12.0;
const CLICK_AMP: f32 = 0.15;

enum Cmd {
    Click,
}

/// Plays a short decaying tone per keystroke on the default output device
pub struct KeyClick {
    tx: mpsc::Sender<Cmd>,
}

impl KeyClick {
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<Cmd>();
        thread::spawn(move || audio_thread(rx));
        Self { tx }
    }
}

impl KeystrokeCue for KeyClick {
    fn play(&self) {
        let _ = self.tx.send(Cmd::Click);
    }
}

/// Samples of the current click still to be played
struct ClickState {
    remaining: AtomicU32,
    length: AtomicU32,
}

fn audio_thread(rx: mpsc::Receiver<Cmd>) {
    let state = Arc::new(ClickState {
        remaining: AtomicU32::new(0),
        length: AtomicU32::new(0),
    });

    // Opened lazily on the first click; one failure disables sound for the session
    let mut stream: Option<cpal::Stream> = None;
    let mut init_failed = false;

    while let Ok(cmd) = rx.recv() {
        if stream.is_none() && !init_failed {
            match open_stream(state.clone()).and_then(|s| {
                s.play().map_err(|e| format!("play: {e}"))?;
                Ok(s)
            }) {
                Ok(s) => {
                    debug!("audio stream opened");
                    stream = Some(s);
                }
                Err(e) => {
                    init_failed = true;
                    warn!("keystroke sound unavailable: {}", e);
                }
            }
        }

        match cmd {
            Cmd::Click => {
                let length = state.length.load(Ordering::Relaxed);
                state.remaining.store(length, Ordering::Relaxed);
            }
        }
    }
}

fn open_stream(state: Arc<ClickState>) -> Result<cpal::Stream, String> {
    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| "no default output device".to_string())?;

    let supported = device
        .default_output_config()
        .map_err(|e| format!("default_output_config: {e}"))?;
    let config = supported.config();

    let channels = config.channels as usize;
    let sample_rate = config.sample_rate.0 as f32;
    state
        .length
        .store(click_length(sample_rate), Ordering::Relaxed);

    let err_fn = |e: cpal::StreamError| warn!("audio stream error: {}", e);

    let stream = match supported.sample_format() {
        cpal::SampleFormat::F32 => device.build_output_stream(
            &config,
            move |data: &mut [f32], _| fill_click(data, channels, sample_rate, &state),
            err_fn,
            None,
        ),
        cpal::SampleFormat::I16 => device.build_output_stream(
            &config,
            move |data: &mut [i16], _| fill_click(data, channels, sample_rate, &state),
            err_fn,
            None,
        ),
        cpal::SampleFormat::U16 => device.build_output_stream(
            &config,
            move |data: &mut [u16], _| fill_click(data, channels, sample_rate, &state),
            err_fn,
            None,
        ),
        other => return Err(format!("unsupported sample format: {other:?}")),
    };

    stream.map_err(|e| format!("build_output_stream: {e}"))
}

fn click_length(sample_rate: f32) -> u32 {
    (sample_rate * CLICK_MS / 1000.0) as u32
}

/// Amplitude of sample `index` of a click `length` samples long
fn click_sample(index: u32, length: u32, sample_rate: f32) -> f32 {
    if length == 0 || index >= length {
        return 0.0;
    }
    let envelope = 1.0 - index as f32 / length as f32;
    (TAU * CLICK_HZ * index as f32 / sample_rate).sin() * CLICK_AMP * envelope
}

fn fill_click<T: cpal::Sample + cpal::FromSample<f32>>(
    output: &mut [T],
    channels: usize,
    sample_rate: f32,
    state: &ClickState,
) {
    let length = state.length.load(Ordering::Relaxed);
    let mut remaining = state.remaining.load(Ordering::Relaxed);

    for frame in output.chunks_mut(channels) {
        let value = if remaining > 0 {
            let index = length - remaining;
            remaining -= 1;
            click_sample(index, length, sample_rate)
        } else {
            0.0
        };

        let value: T = <T as cpal::FromSample<f32>>::from_sample_(value);
        for sample in frame.iter_mut() {
            *sample = value;
        }
    }

    state.remaining.store(remaining, Ordering::Relaxed);
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_click_decays_to_silence() {
        let length = click_length(48_000.0);
        assert_eq!(length, 576);

        let peak = (0..length / 4)
            .map(|i| click_sample(i, length, 48_000.0).abs())
            .fold(0.0f32, f32::max);
        assert!(peak > 0.0 && peak <= CLICK_AMP);
        assert_eq!(click_sample(length, length, 48_000.0), 0.0);
        assert_eq!(click_sample(0, 0, 48_000.0), 0.0);
    }

    #[test]
    fn test_fill_plays_click_once() {
        let state = ClickState {
            remaining: AtomicU32::new(4),
            length: AtomicU32::new(4),
        };
        let mut buffer = [1.0f32; 12];
        fill_click(&mut buffer, 2, 48_000.0, &state);

        assert_eq!(state.remaining.load(Ordering::Relaxed), 0);
        // stereo frames carry the same value on both channels
        assert!(buffer.chunks(2).all(|frame| frame[0] == frame[1]));
        assert!(buffer[8..].iter().all(|s| *s == 0.0));
    }
}
