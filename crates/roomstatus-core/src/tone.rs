//! Alert tone synthesis.
//!
//! The alert is a fixed 13-step melody. Each step drives two square-wave
//! oscillators (a missing second frequency is silent); their sum is scaled
//! by the gain. Playback lasts one step longer than the melody so the last
//! note is not clipped.
//!
//! Samples are rendered here and handed to an [`AudioOutput`] opened by an
//! [`AudioBackend`]. The output can only be opened through
//! [`TonePlayer::initialize`], which the host calls from a direct user
//! action.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use tracing::{debug, error};

use crate::error::{Capability, Error, Result};
use crate::settings::DEFAULT_GAIN;

/// Frequencies in Hz for each step of the alert melody.
pub const MELODY: [&[f32]; 13] = [
    &[739.0],
    &[583.0],
    &[440.0, 369.0],
    &[587.0],
    &[659.0, 523.0],
    &[880.0],
    &[880.0],
    &[440.0],
    &[659.0, 440.0],
    &[739.0],
    &[659.0, 440.0],
    &[440.0],
    &[587.0, 369.0],
];

/// Length of one melody step.
pub const STEP: Duration = Duration::from_millis(350);

/// Sample rate of rendered audio.
pub const SAMPLE_RATE: u32 = 44_100;

/// An opened audio device.
pub trait AudioOutput: Send {
    /// Queue mono samples in `[-2.0 * gain, 2.0 * gain]` for playback. Must not block
    /// for the length of the clip.
    fn play(&mut self, samples: Vec<f32>, sample_rate: u32) -> Result<()>;
}

/// Opens audio outputs.
pub trait AudioBackend: Send + Sync {
    fn open(&self) -> Result<Box<dyn AudioOutput>>;
}

/// Total playback time of the melody.
pub fn duration() -> Duration {
    STEP * (MELODY.len() as u32 + 1)
}

/// Number of samples in one step at `sample_rate`.
pub fn samples_per_step(sample_rate: u32) -> usize {
    (STEP.as_secs_f64() * f64::from(sample_rate)).round() as usize
}

fn square(frequency: f32, n: usize, sample_rate: u32) -> f32 {
    let phase = (f64::from(frequency) * n as f64 / f64::from(sample_rate)).fract();
    if phase < 0.5 { 1.0 } else { -1.0 }
}

/// Render the melody at the given gain.
///
/// The result holds `MELODY.len() + 1` steps; the final step is silence.
pub fn render(gain: f32, sample_rate: u32) -> Vec<f32> {
    let per_step = samples_per_step(sample_rate);
    let mut samples = Vec::with_capacity(per_step * (MELODY.len() + 1));

    for step in MELODY {
        let first = step.first().copied();
        let second = step.get(1).copied();
        for n in 0..per_step {
            let a = first.map_or(0.0, |f| square(f, n, sample_rate));
            let b = second.map_or(0.0, |f| square(f, n, sample_rate));
            samples.push((a + b) * gain);
        }
    }
    samples.resize(per_step * (MELODY.len() + 1), 0.0);
    samples
}

/// Plays the alert melody on an output opened at user request.
pub struct TonePlayer {
    backend: Box<dyn AudioBackend>,
    output: Mutex<Option<Box<dyn AudioOutput>>>,
    /// Gain stored as `f32` bits.
    gain: AtomicU32,
    sample_rate: u32,
}

impl std::fmt::Debug for TonePlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TonePlayer")
            .field("initialized", &self.is_initialized())
            .field("gain", &self.gain())
            .finish_non_exhaustive()
    }
}

impl TonePlayer {
    pub fn new(backend: Box<dyn AudioBackend>) -> Self {
        Self {
            backend,
            output: Mutex::new(None),
            gain: AtomicU32::new(DEFAULT_GAIN.to_bits()),
            sample_rate: SAMPLE_RATE,
        }
    }

    /// Open the audio output. Idempotent.
    pub fn initialize(&self) -> Result<()> {
        let mut output = self
            .output
            .lock()
            .map_err(|_| Error::CapabilityUnavailable(Capability::Audio))?;
        if output.is_none() {
            *output = Some(self.backend.open()?);
            debug!("Audio output opened");
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.output.lock().map(|o| o.is_some()).unwrap_or(false)
    }

    pub fn gain(&self) -> f32 {
        f32::from_bits(self.gain.load(Ordering::Relaxed))
    }

    pub fn set_gain(&self, gain: f32) {
        self.gain.store(gain.to_bits(), Ordering::Relaxed);
    }

    /// Play the melody once.
    ///
    /// Before [`TonePlayer::initialize`] this logs an error and does nothing.
    pub fn play(&self) {
        let Ok(mut output) = self.output.lock() else {
            error!("Audio output unavailable");
            return;
        };
        let Some(output) = output.as_mut() else {
            error!("Audio output is not initialized; call initialize() from a user action first");
            return;
        };

        let samples = render(self.gain(), self.sample_rate);
        if let Err(e) = output.play(samples, self.sample_rate) {
            error!(error = %e, "Failed to play alert tone");
        }
    }
}
