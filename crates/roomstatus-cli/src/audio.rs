//! Audio outputs for the alert melody.
//!
//! The default output rings the terminal bell once per melody. With the
//! `audio` feature the rendered melody is played through the default output
//! device with rodio.

use std::io::{self, Write};

use roomstatus_core::{AudioBackend, AudioOutput, Result};
use tracing::debug;

/// Rings the terminal bell instead of playing samples.
#[derive(Debug, Default, Clone, Copy)]
pub struct BellBackend;

impl AudioBackend for BellBackend {
    fn open(&self) -> Result<Box<dyn AudioOutput>> {
        Ok(Box::new(BellOutput))
    }
}

struct BellOutput;

impl AudioOutput for BellOutput {
    fn play(&mut self, samples: Vec<f32>, sample_rate: u32) -> Result<()> {
        debug!(samples = samples.len(), sample_rate, "Ringing terminal bell");
        let mut stderr = io::stderr();
        stderr.write_all(b"\x07")?;
        stderr.flush()?;
        Ok(())
    }
}

#[cfg(feature = "audio")]
pub use device::RodioBackend;

#[cfg(feature = "audio")]
mod device {
    use std::sync::mpsc;
    use std::thread;

    use roomstatus_core::{AudioBackend, AudioOutput, Capability, Error, Result};
    use rodio::buffer::SamplesBuffer;
    use rodio::{OutputStream, Sink};
    use tracing::{debug, warn};

    type Buffer = (Vec<f32>, u32);

    /// Plays through the default output device.
    ///
    /// The output stream lives on its own thread; buffers are handed over a
    /// channel.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct RodioBackend;

    impl AudioBackend for RodioBackend {
        fn open(&self) -> Result<Box<dyn AudioOutput>> {
            let (tx, rx) = mpsc::channel::<Buffer>();
            let (ready_tx, ready_rx) = mpsc::sync_channel(1);

            thread::Builder::new()
                .name("roomstatus-audio".to_string())
                .spawn(move || {
                    let (_stream, handle) = match OutputStream::try_default() {
                        Ok(pair) => {
                            let _ = ready_tx.send(true);
                            pair
                        }
                        Err(e) => {
                            warn!(error = %e, "No audio output device");
                            let _ = ready_tx.send(false);
                            return;
                        }
                    };
                    for (samples, sample_rate) in rx {
                        match Sink::try_new(&handle) {
                            Ok(sink) => {
                                sink.append(SamplesBuffer::new(1, sample_rate, samples));
                                sink.detach();
                            }
                            Err(e) => warn!(error = %e, "Failed to start playback"),
                        }
                    }
                    debug!("Audio thread finished");
                })?;

            match ready_rx.recv() {
                Ok(true) => Ok(Box::new(RodioOutput { tx })),
                _ => Err(Error::CapabilityUnavailable(Capability::Audio)),
            }
        }
    }

    struct RodioOutput {
        tx: mpsc::Sender<Buffer>,
    }

    impl AudioOutput for RodioOutput {
        fn play(&mut self, samples: Vec<f32>, sample_rate: u32) -> Result<()> {
            self.tx
                .send((samples, sample_rate))
                .map_err(|_| Error::Closed("audio output"))
        }
    }
}

/// The best available backend for this build.
pub fn default_backend() -> Box<dyn AudioBackend> {
    #[cfg(feature = "audio")]
    {
        Box::new(RodioBackend)
    }
    #[cfg(not(feature = "audio"))]
    {
        Box::new(BellBackend)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bell_opens_and_plays() {
        let mut output = BellBackend.open().unwrap();
        output.play(vec![0.0; 8], 44_100).unwrap();
    }
}
