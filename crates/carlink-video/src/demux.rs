use std::io::{ErrorKind, Read};

use bytes::{Buf, BytesMut};
use carlink_transport::stream::is_timeout;
use carlink_transport::ChannelStream;
use tracing::{debug, trace, warn};

use crate::codec::{scan_frames, VideoConfig};
use crate::decoder::ImageDecoder;
use crate::error::{Result, VideoError};

const INITIAL_BUFFER_CAPACITY: usize = 64 * 1024;

/// Counters describing what the demultiplexer has seen so far.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DemuxStats {
    /// Bytes appended to the receive buffer.
    pub bytes_received: u64,
    /// Frames handed to the decoder and decoded successfully.
    pub frames_decoded: u64,
    /// Complete frames discarded because a newer one arrived in the same pass.
    pub frames_dropped: u64,
    /// Frames the decoder rejected.
    pub decode_failures: u64,
}

/// Reassembles length-prefixed frames from a byte stream, newest frame wins.
///
/// Each [`poll`](Self::poll) performs at most one bounded read, then scans the
/// receive buffer. When several complete frames are present only the last one
/// is decoded; the older ones are discarded together with the consumed bytes.
/// Bytes of an incomplete trailing frame stay buffered for the next poll.
pub struct FrameDemultiplexer<T, D> {
    inner: T,
    decoder: D,
    buf: BytesMut,
    scratch: Vec<u8>,
    config: VideoConfig,
    stats: DemuxStats,
}

impl<T: Read, D: ImageDecoder> FrameDemultiplexer<T, D> {
    /// Create a demultiplexer over any `Read` stream.
    pub fn new(inner: T, decoder: D, config: VideoConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner,
            decoder,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
            scratch: vec![0u8; config.read_size.max(1)],
            config,
            stats: DemuxStats::default(),
        })
    }

    /// Read what is available and return the newest complete frame, decoded.
    ///
    /// A read that times out or would block contributes no bytes and is not an
    /// error. EOF and every other I/O error are terminal.
    pub fn poll(&mut self) -> Result<Option<D::Image>> {
        let read = loop {
            match self.inner.read(&mut self.scratch) {
                Ok(n) => break Some(n),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if is_timeout(err.kind()) => break None,
                Err(err) => return Err(VideoError::Io(err)),
            }
        };

        match read {
            Some(0) => Err(VideoError::ConnectionClosed {
                buffered: self.buf.len(),
            }),
            Some(n) => {
                trace!(bytes = n, "video bytes received");
                self.append(n);
                self.extract()
            }
            None => self.extract(),
        }
    }

    fn append(&mut self, n: usize) {
        self.buf.extend_from_slice(&self.scratch[..n]);
        self.stats.bytes_received += n as u64;
    }
}

impl<T, D: ImageDecoder> FrameDemultiplexer<T, D> {
    /// Append bytes obtained elsewhere and run one extraction pass.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Option<D::Image>> {
        self.buf.extend_from_slice(bytes);
        self.stats.bytes_received += bytes.len() as u64;
        self.extract()
    }

    fn extract(&mut self) -> Result<Option<D::Image>> {
        let outcome = match scan_frames(
            &self.buf,
            self.config.prefix_width,
            self.config.max_frame_size,
        ) {
            Ok(outcome) => outcome,
            Err(err) => {
                self.buf.clear();
                return Err(err);
            }
        };

        let Some(last) = outcome.last else {
            return self.check_bound().map(|()| None);
        };

        let stale = (outcome.complete - 1) as u64;
        if stale > 0 {
            debug!(stale, "dropping overtaken video frames");
        }
        self.stats.frames_dropped += stale;

        let decoded = self.decoder.decode(&self.buf[last.payload_range()]);
        self.buf.advance(last.end());
        self.check_bound()?;

        match decoded {
            Ok(image) => {
                self.stats.frames_decoded += 1;
                Ok(Some(image))
            }
            Err(err) => {
                self.stats.decode_failures += 1;
                warn!(error = %err, size = last.len, "dropping undecodable video frame");
                Ok(None)
            }
        }
    }

    fn check_bound(&mut self) -> Result<()> {
        if self.buf.len() > self.config.max_buffer_size {
            let size = self.buf.len();
            self.buf.clear();
            return Err(VideoError::BufferOverflow {
                size,
                max: self.config.max_buffer_size,
            });
        }
        Ok(())
    }

    /// Bytes currently held for an incomplete frame.
    pub fn buffered_len(&self) -> usize {
        self.buf.len()
    }

    pub fn stats(&self) -> DemuxStats {
        self.stats
    }
}

impl<D: ImageDecoder> FrameDemultiplexer<ChannelStream, D> {
    /// Create a demultiplexer for a connected video channel and apply the
    /// configured read timeout to it.
    pub fn from_channel(inner: ChannelStream, decoder: D, config: VideoConfig) -> Result<Self> {
        inner.set_read_timeout(config.read_timeout)?;
        Self::new(inner, decoder, config)
    }
}
