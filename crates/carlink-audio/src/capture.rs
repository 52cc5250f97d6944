use std::time::{Duration, Instant};

use crate::error::Result;

/// A live source of interleaved i16 samples that blocks until a chunk is
/// available. Its blocking read paces the mixer.
pub trait CaptureSource: Send {
    /// Replace the contents of `out` with the next `frames` frames.
    ///
    /// Returning fewer samples is allowed; the mixer pads the chunk.
    fn read_chunk(&mut self, frames: usize, out: &mut Vec<i16>) -> Result<()>;
}

/// Produces silence at the real-time rate of the configured stream.
///
/// Stands in for a microphone when none is available, keeping the outgoing
/// stream at the cadence the server expects.
#[derive(Debug)]
pub struct SilentCapture {
    channels: u16,
    sample_rate: u32,
    next_due: Option<Instant>,
}

impl SilentCapture {
    pub fn new(channels: u16, sample_rate: u32) -> Self {
        Self {
            channels,
            sample_rate: sample_rate.max(1),
            next_due: None,
        }
    }

    fn chunk_duration(&self, frames: usize) -> Duration {
        Duration::from_secs_f64(frames as f64 / f64::from(self.sample_rate))
    }
}

impl CaptureSource for SilentCapture {
    fn read_chunk(&mut self, frames: usize, out: &mut Vec<i16>) -> Result<()> {
        let period = self.chunk_duration(frames);
        let now = Instant::now();
        let due = match self.next_due {
            // Fell more than a chunk behind: restart the schedule instead of bursting.
            Some(due) if now.saturating_duration_since(due) > period => now,
            Some(due) => due,
            None => now,
        };
        if due > now {
            std::thread::sleep(due - now);
        }
        self.next_due = Some(due + period);

        out.clear();
        out.resize(frames * usize::from(self.channels), 0);
        Ok(())
    }
}

#[cfg(feature = "device-cpal")]
pub use self::device::CpalCapture;

#[cfg(feature = "device-cpal")]
mod device {
    use std::collections::VecDeque;
    use std::sync::mpsc::{self, Receiver, RecvTimeoutError, SyncSender};
    use std::time::Duration;

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{SampleFormat, SizedSample};
    use tracing::{error, info, warn};

    use super::CaptureSource;
    use crate::error::{AudioError, Result};
    use crate::pipeline::AudioConfig;

    const QUEUE_DEPTH: usize = 64;
    const STALL_TIMEOUT: Duration = Duration::from_secs(2);

    enum CaptureEvent {
        Samples(Vec<i16>),
        Failed(String),
    }

    /// Microphone capture through the default cpal input device.
    ///
    /// cpal streams are not `Send`, so the stream lives on its own thread and
    /// hands sample blocks over a bounded queue. Dropping the capture ends
    /// that thread and closes the device.
    pub struct CpalCapture {
        events: Receiver<CaptureEvent>,
        pending: VecDeque<i16>,
        channels: u16,
        _shutdown: SyncSender<()>,
    }

    impl CpalCapture {
        pub fn open_default(config: &AudioConfig) -> Result<Self> {
            let (event_tx, events) = mpsc::sync_channel(QUEUE_DEPTH);
            let (ready_tx, ready_rx) = mpsc::sync_channel::<std::result::Result<String, String>>(1);
            let (shutdown_tx, shutdown_rx) = mpsc::sync_channel::<()>(1);
            let channels = config.channels;
            let sample_rate = config.sample_rate;

            std::thread::Builder::new()
                .name("carlink-capture".to_string())
                .spawn(move || {
                    let stream = match build_stream(channels, sample_rate, event_tx) {
                        Ok((stream, name)) => {
                            if let Err(err) = stream.play() {
                                let _ = ready_tx.send(Err(format!("failed to start stream: {err}")));
                                return;
                            }
                            let _ = ready_tx.send(Ok(name));
                            stream
                        }
                        Err(err) => {
                            let _ = ready_tx.send(Err(err));
                            return;
                        }
                    };
                    // Returns once the owning CpalCapture is dropped.
                    let _ = shutdown_rx.recv();
                    drop(stream);
                })?;

            let name = ready_rx
                .recv()
                .map_err(|_| AudioError::Capture("capture thread exited".to_string()))?
                .map_err(AudioError::Capture)?;
            info!(device = %name, channels, sample_rate, "microphone capture started");

            Ok(Self {
                events,
                pending: VecDeque::new(),
                channels,
                _shutdown: shutdown_tx,
            })
        }
    }

    impl CaptureSource for CpalCapture {
        fn read_chunk(&mut self, frames: usize, out: &mut Vec<i16>) -> Result<()> {
            let needed = frames * usize::from(self.channels);
            while self.pending.len() < needed {
                match self.events.recv_timeout(STALL_TIMEOUT) {
                    Ok(CaptureEvent::Samples(block)) => self.pending.extend(block),
                    Ok(CaptureEvent::Failed(reason)) => return Err(AudioError::Capture(reason)),
                    Err(RecvTimeoutError::Timeout) => {
                        return Err(AudioError::Capture(format!(
                            "no samples from capture device for {STALL_TIMEOUT:?}"
                        )))
                    }
                    Err(RecvTimeoutError::Disconnected) => {
                        return Err(AudioError::Capture("capture stream closed".to_string()))
                    }
                }
            }
            out.clear();
            out.extend(self.pending.drain(..needed));
            Ok(())
        }
    }

    fn build_stream(
        channels: u16,
        sample_rate: u32,
        events: SyncSender<CaptureEvent>,
    ) -> std::result::Result<(cpal::Stream, String), String> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| "no default input device".to_string())?;
        let name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let format = device
            .default_input_config()
            .map_err(|err| format!("failed to query input config: {err}"))?
            .sample_format();
        let stream_config = cpal::StreamConfig {
            channels,
            sample_rate: cpal::SampleRate(sample_rate),
            buffer_size: cpal::BufferSize::Default,
        };

        let stream = match format {
            SampleFormat::I16 => build_typed::<i16>(&device, &stream_config, events, |s| s),
            SampleFormat::F32 => build_typed::<f32>(&device, &stream_config, events, |s| {
                (s * f32::from(i16::MAX)) as i16
            }),
            SampleFormat::U16 => build_typed::<u16>(&device, &stream_config, events, |s| {
                (i32::from(s) - 32768) as i16
            }),
            other => return Err(format!("unsupported capture sample format {other:?}")),
        }?;
        Ok((stream, name))
    }

    fn build_typed<T: SizedSample>(
        device: &cpal::Device,
        config: &cpal::StreamConfig,
        events: SyncSender<CaptureEvent>,
        convert: fn(T) -> i16,
    ) -> std::result::Result<cpal::Stream, String> {
        let error_events = events.clone();
        device
            .build_input_stream(
                config,
                move |data: &[T], _: &cpal::InputCallbackInfo| {
                    let block = data.iter().map(|&s| convert(s)).collect();
                    if events.try_send(CaptureEvent::Samples(block)).is_err() {
                        warn!("capture queue full; dropping samples");
                    }
                },
                move |err| {
                    error!(error = %err, "capture stream error");
                    let _ = error_events.try_send(CaptureEvent::Failed(err.to_string()));
                },
                None,
            )
            .map_err(|err| format!("failed to build input stream: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn silent_capture_fills_chunk_with_zeros() {
        let mut capture = SilentCapture::new(2, 48_000);
        let mut out = vec![7; 3];
        capture.read_chunk(16, &mut out).unwrap();
        assert_eq!(out, vec![0; 32]);
    }

    #[test]
    fn silent_capture_paces_reads() {
        // 400 frames at 8 kHz = 50 ms per chunk.
        let mut capture = SilentCapture::new(1, 8000);
        let mut out = Vec::new();
        let start = Instant::now();
        for _ in 0..3 {
            capture.read_chunk(400, &mut out).unwrap();
        }
        // First read is immediate, the next two wait one period each.
        assert!(start.elapsed() >= Duration::from_millis(95));
    }
}
