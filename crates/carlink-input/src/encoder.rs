use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use carlink_audio::{Gains, SharedGainState};
use carlink_transport::{send_all, ChannelStream, StopSignal, TransportError};
use tracing::{debug, info, trace};

use crate::command::ControlCommand;
use crate::error::Result;
use crate::event::{ControllerSample, EventCode};
use crate::quantize::{quantize, AxisDedup, QuantizerConfig};
use crate::source::ControllerSource;

/// Input encoder settings.
#[derive(Debug, Clone)]
pub struct EncoderConfig {
    pub quantizer: QuantizerConfig,
    /// Longest a single controller poll may block. Default: 100ms.
    pub poll_timeout: Duration,
    /// Socket write timeout for the gamepad channel. Default: 200ms.
    pub write_timeout: Option<Duration>,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            quantizer: QuantizerConfig::default(),
            poll_timeout: Duration::from_millis(100),
            write_timeout: Some(Duration::from_millis(200)),
        }
    }
}

/// Event counters for one encoder run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderReport {
    pub events_seen: u64,
    pub events_ignored: u64,
    pub duplicates_dropped: u64,
    pub commands_sent: u64,
    pub gain_toggles: u64,
}

/// Turns raw controller samples into gamepad channel commands.
pub struct InputEncoder {
    config: EncoderConfig,
    gains: Arc<SharedGainState>,
    dedup: AxisDedup,
    report: EncoderReport,
}

impl InputEncoder {
    pub fn new(config: EncoderConfig, gains: Arc<SharedGainState>) -> Self {
        Self {
            config,
            gains,
            dedup: AxisDedup::default(),
            report: EncoderReport::default(),
        }
    }

    pub fn report(&self) -> EncoderReport {
        self.report
    }

    /// Apply the configured write timeout to a connected gamepad channel.
    pub fn prepare_channel(&self, channel: &ChannelStream) -> Result<()> {
        channel.set_write_timeout(self.config.write_timeout)?;
        Ok(())
    }

    /// Process one sample; returns the command to send, if any.
    ///
    /// The gain button updates the shared gains before its command is
    /// returned, so the toggle is in effect by the time the server sees it.
    pub fn handle_sample(&mut self, sample: ControllerSample) -> Option<ControlCommand> {
        self.report.events_seen += 1;
        if !sample.code.is_allowed() {
            self.report.events_ignored += 1;
            return None;
        }

        if sample.code.is_axis() {
            let bucket = quantize(sample.value, self.config.quantizer);
            if !self.dedup.accept(sample.code, bucket) {
                self.report.duplicates_dropped += 1;
                return None;
            }
            return Some(ControlCommand::new(sample.code, bucket));
        }

        if sample.code == EventCode::BtnTr {
            self.toggle_gains(sample.value);
        }
        Some(ControlCommand::new(sample.code, sample.value))
    }

    fn toggle_gains(&mut self, value: i32) {
        let gains = match value {
            0 => Gains::TRACK_ONLY,
            1 => Gains::MIC_ONLY,
            // key auto-repeat
            _ => return,
        };
        self.gains.set(gains);
        self.report.gain_toggles += 1;
        debug!(mic = gains.mic, track = gains.track, "gains toggled");
    }

    /// Poll `source` and write commands to `out` until `stop` is raised or a
    /// fatal error occurs.
    pub fn run<S, W>(&mut self, source: &mut S, out: &mut W, stop: &StopSignal) -> Result<EncoderReport>
    where
        S: ControllerSource + ?Sized,
        W: Write,
    {
        let mut batch = Vec::new();
        let mut wire = Vec::with_capacity(32);
        info!(
            partitions = self.config.quantizer.partitions,
            axis_max = self.config.quantizer.axis_max,
            "input encoder started"
        );

        'outer: while !stop.is_stopped() {
            batch.clear();
            source.poll_events(self.config.poll_timeout, &mut batch)?;

            for sample in batch.drain(..) {
                let Some(command) = self.handle_sample(sample) else {
                    continue;
                };
                trace!(%command, "sending");
                wire.clear();
                command.encode(&mut wire);
                match send_all(out, &wire, stop) {
                    Ok(()) => self.report.commands_sent += 1,
                    Err(TransportError::Shutdown) => break 'outer,
                    Err(err) => return Err(err.into()),
                }
            }
        }

        info!(
            commands = self.report.commands_sent,
            duplicates = self.report.duplicates_dropped,
            "input encoder stopped"
        );
        Ok(self.report)
    }
}
