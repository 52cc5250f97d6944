use std::fmt;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use carlink_audio::{
    AudioConfig, AudioError, AudioMixerPipeline, CaptureSource, Gains, MixerHandle, PcmSource,
    SharedGainState,
};
use carlink_input::{ControllerSource, EncoderConfig, InputEncoder, InputError};
use carlink_transport::{connect, ChannelStream, ConnectOptions, StopSignal, TransportError};
use carlink_video::{FrameDemultiplexer, PayloadDecoder, VideoConfig, VideoError};
use tracing::{debug, error, info, warn};

use crate::sink::FrameSink;

pub const DEFAULT_VIDEO_PORT: u16 = 8000;
pub const DEFAULT_AUDIO_PORT: u16 = 8001;
pub const DEFAULT_GAMEPAD_PORT: u16 = 8002;
pub const DEFAULT_VIEW_FPS: u32 = 30;

/// Where to connect and how each pipeline behaves.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub video_port: u16,
    pub audio_port: u16,
    pub gamepad_port: u16,
    pub connect: ConnectOptions,
    pub video: VideoConfig,
    /// View ticks per second; one demultiplexer poll per tick.
    pub view_fps: u32,
    pub audio: AudioConfig,
    pub encoder: EncoderConfig,
    pub initial_gains: Gains,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            video_port: DEFAULT_VIDEO_PORT,
            audio_port: DEFAULT_AUDIO_PORT,
            gamepad_port: DEFAULT_GAMEPAD_PORT,
            connect: ConnectOptions::default(),
            video: VideoConfig::default(),
            view_fps: DEFAULT_VIEW_FPS,
            audio: AudioConfig::default(),
            encoder: EncoderConfig::default(),
            initial_gains: Gains::default(),
        }
    }
}

/// Device backends handed to the pipelines.
///
/// A pipeline runs only when its device is present: `frame_sink` enables
/// video, `capture` enables audio and `controller` enables the gamepad.
#[derive(Default)]
pub struct Devices {
    pub frame_sink: Option<Box<dyn FrameSink>>,
    pub capture: Option<Box<dyn CaptureSource>>,
    /// Background track playing when audio starts. Silence when absent.
    pub track: Option<Box<dyn PcmSource>>,
    pub controller: Option<Box<dyn ControllerSource>>,
}

/// Errors from [`Client::start`]. Runtime failures end up in reports instead.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error(transparent)]
    Video(#[from] VideoError),

    #[error(transparent)]
    Audio(#[from] AudioError),

    #[error("failed to spawn {pipeline} thread: {source}")]
    Spawn {
        pipeline: Pipeline,
        source: std::io::Error,
    },

    #[error("no pipeline enabled")]
    NothingEnabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Pipeline {
    Video,
    Audio,
    Input,
}

impl Pipeline {
    pub fn name(self) -> &'static str {
        match self {
            Pipeline::Video => "video",
            Pipeline::Audio => "audio",
            Pipeline::Input => "input",
        }
    }

    fn thread_name(self) -> String {
        format!("carlink-{}", self.name())
    }
}

impl fmt::Display for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Broad cause of a pipeline failure, ordered by severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum FailureKind {
    /// Capture device, track or controller failure.
    Device,
    /// The channel could not be established.
    Connect,
    /// The channel broke after it was established.
    Transport,
    /// The server violated the framing protocol.
    Protocol,
    Internal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Stopped,
    Failed { kind: FailureKind, message: String },
}

/// How one pipeline ended, with its counters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineReport {
    pub pipeline: Pipeline,
    pub outcome: Outcome,
    pub counters: Vec<(&'static str, u64)>,
}

impl PipelineReport {
    fn stopped(pipeline: Pipeline, counters: Vec<(&'static str, u64)>) -> Self {
        info!(%pipeline, "pipeline stopped");
        Self {
            pipeline,
            outcome: Outcome::Stopped,
            counters,
        }
    }

    fn failed(pipeline: Pipeline, failure: Failure, counters: Vec<(&'static str, u64)>) -> Self {
        error!(%pipeline, kind = ?failure.kind, error = %failure.message, "pipeline failed");
        Self {
            pipeline,
            outcome: Outcome::Failed {
                kind: failure.kind,
                message: failure.message,
            },
            counters,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.outcome, Outcome::Failed { .. })
    }

    pub fn counter(&self, name: &str) -> Option<u64> {
        self.counters
            .iter()
            .find(|(counter, _)| *counter == name)
            .map(|(_, value)| *value)
    }
}

struct Failure {
    kind: FailureKind,
    message: String,
}

impl Failure {
    fn new(kind: FailureKind, err: impl fmt::Display) -> Self {
        Self {
            kind,
            message: err.to_string(),
        }
    }
}

fn transport_kind(err: &TransportError) -> FailureKind {
    match err {
        TransportError::Resolve { .. } | TransportError::Connect { .. } => FailureKind::Connect,
        _ => FailureKind::Transport,
    }
}

impl From<TransportError> for Failure {
    fn from(err: TransportError) -> Self {
        Failure::new(transport_kind(&err), err)
    }
}

impl From<VideoError> for Failure {
    fn from(err: VideoError) -> Self {
        let kind = match &err {
            VideoError::Transport(inner) => transport_kind(inner),
            VideoError::Io(_) | VideoError::ConnectionClosed { .. } => FailureKind::Transport,
            VideoError::FrameTooLarge { .. } | VideoError::BufferOverflow { .. } => {
                FailureKind::Protocol
            }
            VideoError::InvalidPrefixWidth(_) => FailureKind::Internal,
        };
        Failure::new(kind, err)
    }
}

impl From<AudioError> for Failure {
    fn from(err: AudioError) -> Self {
        let kind = match &err {
            AudioError::Transport(inner) => transport_kind(inner),
            AudioError::InvalidConfig(_) => FailureKind::Internal,
            _ => FailureKind::Device,
        };
        Failure::new(kind, err)
    }
}

impl From<InputError> for Failure {
    fn from(err: InputError) -> Self {
        let kind = match &err {
            InputError::Transport(inner) => transport_kind(inner),
            _ => FailureKind::Device,
        };
        Failure::new(kind, err)
    }
}

/// A running set of pipelines.
pub struct Client {
    stop: StopSignal,
    gains: Arc<SharedGainState>,
    mixer: Option<MixerHandle>,
    workers: Vec<(Pipeline, JoinHandle<PipelineReport>)>,
}

impl Client {
    /// Spawn one thread per enabled pipeline.
    ///
    /// Configuration is validated here. Each thread connects its own channel,
    /// so an unreachable port shows up as a failed report for that pipeline
    /// while the others keep running.
    pub fn start(config: ClientConfig, devices: Devices) -> Result<Self, ClientError> {
        let Devices {
            frame_sink,
            capture,
            track,
            controller,
        } = devices;
        if frame_sink.is_none() && capture.is_none() && controller.is_none() {
            return Err(ClientError::NothingEnabled);
        }

        if frame_sink.is_some() {
            config.video.validate()?;
        }
        let gains = Arc::new(SharedGainState::new(config.initial_gains));
        let mixer = match capture {
            Some(capture) => {
                let pipeline = AudioMixerPipeline::new(config.audio.clone(), Arc::clone(&gains))?;
                if let Some(track) = track {
                    pipeline.handle().replace_track(track);
                }
                Some((pipeline, capture))
            }
            None => None,
        };

        let stop = StopSignal::new();
        let config = Arc::new(config);
        let mut client = Client {
            stop: stop.clone(),
            gains: Arc::clone(&gains),
            mixer: mixer.as_ref().map(|(pipeline, _)| pipeline.handle()),
            workers: Vec::new(),
        };

        if let Some(sink) = frame_sink {
            let config = Arc::clone(&config);
            let stop = stop.clone();
            client.spawn(Pipeline::Video, move || video_worker(&config, sink, &stop))?;
        }

        if let Some((pipeline, capture)) = mixer {
            let config = Arc::clone(&config);
            let stop = stop.clone();
            client.spawn(Pipeline::Audio, move || {
                audio_worker(&config, &pipeline, capture, &stop)
            })?;
        }

        if let Some(controller) = controller {
            let encoder = InputEncoder::new(config.encoder.clone(), Arc::clone(&gains));
            let config = Arc::clone(&config);
            let stop = stop.clone();
            client.spawn(Pipeline::Input, move || {
                input_worker(&config, encoder, controller, &stop)
            })?;
        }

        info!(host = %config.host, pipelines = client.workers.len(), "client started");
        Ok(client)
    }

    fn spawn<F>(&mut self, pipeline: Pipeline, body: F) -> Result<(), ClientError>
    where
        F: FnOnce() -> PipelineReport + Send + 'static,
    {
        let handle = thread::Builder::new()
            .name(pipeline.thread_name())
            .spawn(body)
            .map_err(|source| ClientError::Spawn { pipeline, source })?;
        self.workers.push((pipeline, handle));
        Ok(())
    }

    /// Control surface of the audio mixer, when audio is enabled.
    pub fn mixer(&self) -> Option<&MixerHandle> {
        self.mixer.as_ref()
    }

    pub fn gains(&self) -> Gains {
        self.gains.snapshot()
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Ask every pipeline to end and shut their channels down.
    pub fn stop(&self) {
        self.stop.stop();
    }

    /// True once every pipeline thread has ended.
    pub fn is_finished(&self) -> bool {
        self.workers.iter().all(|(_, handle)| handle.is_finished())
    }

    /// Join every pipeline and collect one report each, in start order.
    ///
    /// Does not raise the stop signal; call [`Client::stop`] first to end a
    /// healthy client.
    pub fn wait(mut self) -> Vec<PipelineReport> {
        std::mem::take(&mut self.workers)
            .into_iter()
            .map(|(pipeline, handle)| {
                handle.join().unwrap_or_else(|_| PipelineReport {
                    pipeline,
                    outcome: Outcome::Failed {
                        kind: FailureKind::Internal,
                        message: format!("{pipeline} thread panicked"),
                    },
                    counters: Vec::new(),
                })
            })
            .collect()
    }
}

impl Drop for Client {
    // Pipelines never outlive their client; dropping it closes every channel.
    fn drop(&mut self) {
        self.stop.stop();
    }
}

/// Connect a pipeline's channel and tie it to `stop`.
fn open_channel(
    config: &ClientConfig,
    port: u16,
    channel: &'static str,
    stop: &StopSignal,
) -> Result<ChannelStream, TransportError> {
    let stream = connect(&config.host, port, channel, &config.connect)?;
    stop.attach(&stream)?;
    Ok(stream)
}

/// Build the report for a pipeline whose loop has returned.
///
/// A stop shuts the channels down, so an error surfacing after the stop was
/// raised is part of the shutdown rather than a failure.
fn finish(
    pipeline: Pipeline,
    result: Result<(), Failure>,
    stop: &StopSignal,
    counters: Vec<(&'static str, u64)>,
) -> PipelineReport {
    match result {
        Ok(()) => PipelineReport::stopped(pipeline, counters),
        Err(failure) if stop.is_stopped() => {
            debug!(%pipeline, error = %failure.message, "channel closed by stop");
            PipelineReport::stopped(pipeline, counters)
        }
        Err(failure) => PipelineReport::failed(pipeline, failure, counters),
    }
}

fn video_worker(config: &ClientConfig, mut sink: Box<dyn FrameSink>, stop: &StopSignal) -> PipelineReport {
    let channel = match open_channel(config, config.video_port, "video", stop) {
        Ok(channel) => channel,
        Err(err) => return finish(Pipeline::Video, Err(err.into()), stop, Vec::new()),
    };
    let mut demux = match FrameDemultiplexer::from_channel(channel, PayloadDecoder, config.video.clone()) {
        Ok(demux) => demux,
        Err(err) => return PipelineReport::failed(Pipeline::Video, err.into(), Vec::new()),
    };

    let mut presented = 0u64;
    let result = view_loop(config.view_fps, stop, || {
        if let Some(frame) = demux.poll()? {
            presented += 1;
            if let Err(err) = sink.present(&frame) {
                warn!(error = %err, "frame sink failed");
            }
        }
        Ok(())
    });

    let stats = demux.stats();
    let counters = vec![
        ("bytes_received", stats.bytes_received),
        ("frames_decoded", stats.frames_decoded),
        ("frames_dropped", stats.frames_dropped),
        ("decode_failures", stats.decode_failures),
        ("frames_presented", presented),
    ];
    finish(Pipeline::Video, result.map_err(Failure::from), stop, counters)
}

/// Call `tick` at `fps` until stopped. Late ticks are not made up.
fn view_loop<F>(fps: u32, stop: &StopSignal, mut tick: F) -> Result<(), VideoError>
where
    F: FnMut() -> Result<(), VideoError>,
{
    let period = Duration::from_secs_f64(1.0 / f64::from(fps.max(1)));
    let mut next = Instant::now();
    while !stop.is_stopped() {
        tick()?;
        next += period;
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        } else {
            next = now;
        }
    }
    Ok(())
}

fn audio_worker(
    config: &ClientConfig,
    pipeline: &AudioMixerPipeline,
    mut capture: Box<dyn CaptureSource>,
    stop: &StopSignal,
) -> PipelineReport {
    let result = open_channel(config, config.audio_port, "audio", stop)
        .map_err(Failure::from)
        .and_then(|mut channel| {
            pipeline.prepare_channel(&channel)?;
            Ok(pipeline.run(capture.as_mut(), &mut channel, stop)?)
        });
    match result {
        Ok(report) => finish(Pipeline::Audio, Ok(()), stop, vec![("chunks_sent", report.chunks_sent)]),
        Err(failure) => finish(Pipeline::Audio, Err(failure), stop, Vec::new()),
    }
}

fn input_worker(
    config: &ClientConfig,
    mut encoder: InputEncoder,
    mut controller: Box<dyn ControllerSource>,
    stop: &StopSignal,
) -> PipelineReport {
    let result = open_channel(config, config.gamepad_port, "gamepad", stop)
        .map_err(Failure::from)
        .and_then(|mut channel| {
            encoder.prepare_channel(&channel)?;
            Ok(encoder.run(controller.as_mut(), &mut channel, stop)?)
        });
    let report = encoder.report();
    let counters = vec![
        ("events_seen", report.events_seen),
        ("events_ignored", report.events_ignored),
        ("duplicates_dropped", report.duplicates_dropped),
        ("commands_sent", report.commands_sent),
        ("gain_toggles", report.gain_toggles),
    ];
    finish(Pipeline::Input, result.map(|_| ()), stop, counters)
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::sync::{mpsc, Mutex};

    use bytes::BytesMut;
    use carlink_audio::{MemoryTrack, SilentCapture};
    use carlink_input::ReplaySource;
    use carlink_video::encode_frame;

    use super::*;

    struct CollectingSink(Arc<Mutex<Vec<Vec<u8>>>>);

    impl FrameSink for CollectingSink {
        fn present(&mut self, frame: &[u8]) -> std::io::Result<()> {
            self.0.lock().unwrap().push(frame.to_vec());
            Ok(())
        }
    }

    fn listener() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    fn test_config(video: u16, audio: u16, gamepad: u16) -> ClientConfig {
        let mut config = ClientConfig::new("127.0.0.1");
        config.video_port = video;
        config.audio_port = audio;
        config.gamepad_port = gamepad;
        config.connect.connect_timeout = Duration::from_secs(2);
        config.view_fps = 100;
        config.audio.chunk_size = 64;
        config.audio.sample_rate = 8000;
        config.encoder.poll_timeout = Duration::from_millis(10);
        config
    }

    /// Accept one connection and read until EOF.
    fn drain(listener: TcpListener) -> thread::JoinHandle<Vec<u8>> {
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            stream.read_to_end(&mut received).ok();
            received
        })
    }

    fn wait_until(timeout: Duration, mut done: impl FnMut() -> bool) {
        let start = Instant::now();
        while !done() {
            assert!(start.elapsed() < timeout, "condition not met in time");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn nothing_enabled_is_rejected() {
        let err = Client::start(ClientConfig::new("127.0.0.1"), Devices::default()).err();
        assert!(matches!(err, Some(ClientError::NothingEnabled)));
    }

    #[test]
    fn invalid_video_config_fails_start() {
        let mut config = ClientConfig::new("127.0.0.1");
        config.video.prefix_width = 9;
        let devices = Devices {
            frame_sink: Some(Box::new(crate::sink::DiscardSink)),
            ..Devices::default()
        };
        let err = Client::start(config, devices).err();
        assert!(matches!(
            err,
            Some(ClientError::Video(VideoError::InvalidPrefixWidth(9)))
        ));
    }

    #[test]
    fn all_pipelines_stream_until_stopped() {
        let (video_listener, video_port) = listener();
        let (audio_listener, audio_port) = listener();
        let (gamepad_listener, gamepad_port) = listener();

        let video_server = thread::spawn(move || {
            let (mut stream, _) = video_listener.accept().unwrap();
            let mut wire = BytesMut::new();
            encode_frame(b"stale", 4, &mut wire).unwrap();
            encode_frame(b"newest", 4, &mut wire).unwrap();
            stream.write_all(&wire).unwrap();
            let mut rest = Vec::new();
            stream.read_to_end(&mut rest).ok();
        });
        let audio_server = drain(audio_listener);
        let gamepad_server = drain(gamepad_listener);

        let frames = Arc::new(Mutex::new(Vec::new()));
        let devices = Devices {
            frame_sink: Some(Box::new(CollectingSink(Arc::clone(&frames)))),
            capture: Some(Box::new(SilentCapture::new(1, 8000))),
            track: Some(Box::new(MemoryTrack::new("tone", vec![1000; 64]))),
            controller: Some(Box::new(
                ReplaySource::from_script("ABS_Y 32767\nABS_Y 40000\nBTN_TR 1\n").unwrap(),
            )),
        };
        let client = Client::start(test_config(video_port, audio_port, gamepad_port), devices).unwrap();
        assert!(client.mixer().is_some());

        wait_until(Duration::from_secs(5), || {
            !frames.lock().unwrap().is_empty() && client.gains() == Gains::MIC_ONLY
        });
        thread::sleep(Duration::from_millis(100));
        client.stop();
        let reports = client.wait();

        assert_eq!(reports.len(), 3);
        assert!(reports.iter().all(|r| r.outcome == Outcome::Stopped), "{reports:?}");
        assert_eq!(frames.lock().unwrap().as_slice(), &[b"newest".to_vec()]);
        assert_eq!(reports[0].counter("frames_dropped"), Some(1));
        assert_eq!(reports[2].counter("commands_sent"), Some(2));

        video_server.join().unwrap();
        let audio = audio_server.join().unwrap();
        assert!(!audio.is_empty());
        assert_eq!(audio.len() % 128, 0);
        assert_eq!(gamepad_server.join().unwrap(), b"ABS_Y 4,BTN_TR 1,");
    }

    #[test]
    fn unreachable_channel_fails_only_its_pipeline() {
        let (closed, closed_port) = listener();
        drop(closed);
        let (gamepad_listener, gamepad_port) = listener();
        let gamepad_server = drain(gamepad_listener);

        let devices = Devices {
            frame_sink: Some(Box::new(crate::sink::DiscardSink)),
            controller: Some(Box::new(ReplaySource::new(Vec::new()))),
            ..Devices::default()
        };
        let client = Client::start(test_config(closed_port, 0, gamepad_port), devices).unwrap();
        assert!(client.mixer().is_none());

        // Wait for the video thread to give up before stopping the rest.
        wait_until(Duration::from_secs(5), || client.workers[0].1.is_finished());
        assert!(!client.is_finished());
        client.stop();
        let reports = client.wait();

        assert!(matches!(
            reports[0].outcome,
            Outcome::Failed {
                kind: FailureKind::Connect,
                ..
            }
        ));
        assert_eq!(reports[1].outcome, Outcome::Stopped);
        gamepad_server.join().unwrap();
    }

    #[test]
    fn oversized_frame_is_a_protocol_failure() {
        let (video_listener, video_port) = listener();
        let server = thread::spawn(move || {
            let (mut stream, _) = video_listener.accept().unwrap();
            stream.write_all(&[0xff, 0xff, 0xff, 0xff]).unwrap();
            let mut rest = Vec::new();
            stream.read_to_end(&mut rest).ok();
        });

        let devices = Devices {
            frame_sink: Some(Box::new(crate::sink::DiscardSink)),
            ..Devices::default()
        };
        let mut config = test_config(video_port, 0, 0);
        config.video.max_frame_size = 1024;
        let client = Client::start(config, devices).unwrap();
        wait_until(Duration::from_secs(5), || client.is_finished());
        let reports = client.wait();

        assert!(matches!(
            reports[0].outcome,
            Outcome::Failed {
                kind: FailureKind::Protocol,
                ..
            }
        ));
        server.join().unwrap();
    }

    /// Accept one connection, never send, and signal once the client closes it.
    fn silent_server(listener: TcpListener) -> mpsc::Receiver<()> {
        let (closed_tx, closed) = mpsc::channel();
        thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut rest = Vec::new();
            stream.read_to_end(&mut rest).ok();
            let _ = closed_tx.send(());
        });
        closed
    }

    fn video_only() -> Devices {
        Devices {
            frame_sink: Some(Box::new(crate::sink::DiscardSink)),
            ..Devices::default()
        }
    }

    /// Join on a helper thread so a hung pipeline fails the test instead of blocking it.
    fn wait_within(client: Client, timeout: Duration) -> Vec<PipelineReport> {
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || {
            let _ = tx.send(client.wait());
        });
        rx.recv_timeout(timeout)
            .expect("pipelines should end promptly after stop")
    }

    /// Capture that never waits, so the mixer outruns any peer.
    struct UnpacedCapture;

    impl CaptureSource for UnpacedCapture {
        fn read_chunk(&mut self, frames: usize, out: &mut Vec<i16>) -> carlink_audio::Result<()> {
            out.clear();
            out.resize(frames, 100);
            Ok(())
        }
    }

    #[test]
    fn stop_interrupts_read_without_timeout() {
        let (video_listener, video_port) = listener();
        let closed = silent_server(video_listener);

        let mut config = test_config(video_port, 0, 0);
        config.connect.read_timeout = None;
        config.video.read_timeout = None;
        let client = Client::start(config, video_only()).unwrap();

        // Let the video thread settle into its blocking read.
        thread::sleep(Duration::from_millis(100));
        client.stop();
        let reports = wait_within(client, Duration::from_secs(3));

        assert_eq!(reports[0].outcome, Outcome::Stopped, "{reports:?}");
        closed.recv_timeout(Duration::from_secs(3)).unwrap();
    }

    #[test]
    fn stop_interrupts_write_to_stalled_peer() {
        let (audio_listener, audio_port) = listener();
        let (accepted_tx, accepted) = mpsc::channel();
        let (release_tx, release) = mpsc::channel::<()>();
        let server = thread::spawn(move || {
            let (stream, _) = audio_listener.accept().unwrap();
            accepted_tx.send(()).unwrap();
            // Hold the connection open without reading.
            release.recv().ok();
            drop(stream);
        });

        let mut config = test_config(0, audio_port, 0);
        config.connect.write_timeout = None;
        config.audio.write_timeout = None;
        config.audio.chunk_size = 4096;
        let devices = Devices {
            capture: Some(Box::new(UnpacedCapture)),
            ..Devices::default()
        };
        let client = Client::start(config, devices).unwrap();
        accepted.recv_timeout(Duration::from_secs(5)).unwrap();

        // Long enough to fill the socket buffers and block in write.
        thread::sleep(Duration::from_millis(300));
        client.stop();
        let reports = wait_within(client, Duration::from_secs(3));

        assert_eq!(reports[0].outcome, Outcome::Stopped, "{reports:?}");
        release_tx.send(()).unwrap();
        server.join().unwrap();
    }

    #[test]
    fn dropping_client_closes_channels() {
        let (video_listener, video_port) = listener();
        let closed = silent_server(video_listener);

        let client = Client::start(test_config(video_port, 0, 0), video_only()).unwrap();
        thread::sleep(Duration::from_millis(100));
        drop(client);

        closed
            .recv_timeout(Duration::from_secs(3))
            .expect("dropping the client should close the video channel");
    }

    #[test]
    fn failure_kinds_are_ordered_by_severity() {
        assert!(FailureKind::Device < FailureKind::Connect);
        assert!(FailureKind::Transport < FailureKind::Protocol);
        assert!(FailureKind::Protocol < FailureKind::Internal);
    }
}
