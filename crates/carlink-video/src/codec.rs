use std::ops::Range;
use std::time::Duration;

use bytes::{Buf, BufMut, BytesMut};

use crate::error::{Result, VideoError};

/// Default length prefix width in bytes.
pub const DEFAULT_PREFIX_WIDTH: usize = 4;

/// Default maximum declared frame length: 16 MiB.
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

const DEFAULT_FRAME_WIDTH: u32 = 640;
const DEFAULT_FRAME_HEIGHT: u32 = 480;

/// Configuration for the video channel.
#[derive(Debug, Clone)]
pub struct VideoConfig {
    /// Width `H` of the big-endian length prefix, 1..=8 bytes. Default: 4.
    pub prefix_width: usize,
    /// Nominal frame width in pixels (buffer sizing only).
    pub frame_width: u32,
    /// Nominal frame height in pixels (buffer sizing only).
    pub frame_height: u32,
    /// Upper bound of bytes taken from the socket per poll.
    pub read_size: usize,
    /// Largest declared frame length accepted. Default: 16 MiB.
    pub max_frame_size: usize,
    /// Bound on bytes held for an incomplete frame. Default: 32 MiB.
    pub max_buffer_size: usize,
    /// How long one poll may wait for bytes.
    pub read_timeout: Option<Duration>,
}

impl VideoConfig {
    /// Configuration sized for `width` x `height` frames.
    ///
    /// One poll reads at most one uncompressed RGB frame worth of bytes.
    pub fn for_frame_size(width: u32, height: u32) -> Self {
        Self {
            frame_width: width,
            frame_height: height,
            read_size: raw_frame_bytes(width, height),
            ..Self::default()
        }
    }

    /// Check the prefix width.
    pub fn validate(&self) -> Result<()> {
        if !(1..=8).contains(&self.prefix_width) {
            return Err(VideoError::InvalidPrefixWidth(self.prefix_width));
        }
        Ok(())
    }
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            prefix_width: DEFAULT_PREFIX_WIDTH,
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
            read_size: raw_frame_bytes(DEFAULT_FRAME_WIDTH, DEFAULT_FRAME_HEIGHT),
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            max_buffer_size: 2 * DEFAULT_MAX_FRAME_SIZE,
            read_timeout: Some(Duration::from_millis(10)),
        }
    }
}

fn raw_frame_bytes(width: u32, height: u32) -> usize {
    (width as usize)
        .saturating_mul(height as usize)
        .saturating_mul(3)
        .max(1)
}

/// Location of one complete frame inside the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSpan {
    /// Offset of the length prefix.
    pub offset: usize,
    /// Prefix width in bytes.
    pub header: usize,
    /// Declared payload length.
    pub len: usize,
}

impl FrameSpan {
    pub fn payload_range(&self) -> Range<usize> {
        let start = self.offset + self.header;
        start..start + self.len
    }

    /// Offset one past the last payload byte.
    pub fn end(&self) -> usize {
        self.offset + self.header + self.len
    }
}

/// Result of scanning a receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanOutcome {
    /// Number of complete frames found from the buffer start.
    pub complete: usize,
    /// The last complete frame, if any.
    pub last: Option<FrameSpan>,
}

/// Walk `src` from the start and locate every complete frame.
///
/// Scanning stops at the first frame whose prefix or payload is not fully
/// present. A declared length above `max_frame_size` is rejected even when the
/// frame is still incomplete, so a corrupt prefix fails fast instead of
/// waiting for bytes that will never arrive.
pub fn scan_frames(src: &[u8], prefix_width: usize, max_frame_size: usize) -> Result<ScanOutcome> {
    if !(1..=8).contains(&prefix_width) {
        return Err(VideoError::InvalidPrefixWidth(prefix_width));
    }

    let mut outcome = ScanOutcome::default();
    let mut pos = 0usize;

    while src.len() - pos >= prefix_width {
        let declared = (&src[pos..pos + prefix_width]).get_uint(prefix_width);
        if declared > max_frame_size as u64 {
            return Err(VideoError::FrameTooLarge {
                size: declared,
                max: max_frame_size,
            });
        }

        let len = declared as usize;
        if src.len() - pos - prefix_width < len {
            break;
        }

        let span = FrameSpan {
            offset: pos,
            header: prefix_width,
            len,
        };
        outcome.complete += 1;
        outcome.last = Some(span);
        pos = span.end();
    }

    Ok(outcome)
}

/// Encode one frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────────────────┬───────────────────┐
/// │ Length (H bytes, BE) │ Payload           │
/// │                      │ (Length bytes)    │
/// └──────────────────────┴───────────────────┘
/// ```
pub fn encode_frame(payload: &[u8], prefix_width: usize, dst: &mut BytesMut) -> Result<()> {
    if !(1..=8).contains(&prefix_width) {
        return Err(VideoError::InvalidPrefixWidth(prefix_width));
    }

    let max_len = if prefix_width == 8 {
        u64::MAX
    } else {
        (1u64 << (8 * prefix_width)) - 1
    };
    if payload.len() as u64 > max_len {
        return Err(VideoError::FrameTooLarge {
            size: payload.len() as u64,
            max: usize::try_from(max_len).unwrap_or(usize::MAX),
        });
    }

    dst.reserve(prefix_width + payload.len());
    dst.put_uint(payload.len() as u64, prefix_width);
    dst.put_slice(payload);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire(payloads: &[&[u8]], width: usize) -> BytesMut {
        let mut buf = BytesMut::new();
        for payload in payloads {
            encode_frame(payload, width, &mut buf).unwrap();
        }
        buf
    }

    #[test]
    fn encode_writes_big_endian_prefix() {
        let buf = wire(&[b"abc"], 4);
        assert_eq!(buf.as_ref(), &[0, 0, 0, 3, b'a', b'b', b'c']);

        let buf = wire(&[&[7u8; 258]], 2);
        assert_eq!(&buf[..2], &[0x01, 0x02]);
        assert_eq!(buf.len(), 2 + 258);
    }

    #[test]
    fn encode_rejects_payload_wider_than_prefix() {
        let mut buf = BytesMut::new();
        let err = encode_frame(&[0u8; 256], 1, &mut buf).unwrap_err();
        assert!(matches!(err, VideoError::FrameTooLarge { size: 256, max: 255 }));
        assert!(buf.is_empty());
    }

    #[test]
    fn invalid_prefix_width_is_rejected() {
        let mut buf = BytesMut::new();
        assert!(matches!(
            encode_frame(b"x", 0, &mut buf),
            Err(VideoError::InvalidPrefixWidth(0))
        ));
        assert!(matches!(
            scan_frames(b"xxxxxxxxxx", 9, DEFAULT_MAX_FRAME_SIZE),
            Err(VideoError::InvalidPrefixWidth(9))
        ));
    }

    #[test]
    fn scan_finds_all_complete_frames() {
        let buf = wire(&[b"one", b"three", b"fifteen"], 4);
        let outcome = scan_frames(&buf, 4, DEFAULT_MAX_FRAME_SIZE).unwrap();

        assert_eq!(outcome.complete, 3);
        let last = outcome.last.unwrap();
        assert_eq!(&buf[last.payload_range()], b"fifteen");
        assert_eq!(last.end(), buf.len());
    }

    #[test]
    fn scan_stops_at_incomplete_payload() {
        let mut buf = wire(&[b"first", b"second"], 4);
        buf.truncate(buf.len() - 2);

        let outcome = scan_frames(&buf, 4, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert_eq!(outcome.complete, 1);
        let last = outcome.last.unwrap();
        assert_eq!(&buf[last.payload_range()], b"first");
        assert_eq!(last.end(), 4 + 5);
    }

    #[test]
    fn scan_stops_at_incomplete_prefix() {
        let mut buf = wire(&[b"ok"], 4);
        buf.extend_from_slice(&[0, 0]);

        let outcome = scan_frames(&buf, 4, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert_eq!(outcome.complete, 1);
        assert_eq!(outcome.last.unwrap().end(), 6);
    }

    #[test]
    fn scan_empty_buffer_finds_nothing() {
        let outcome = scan_frames(&[], 4, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert_eq!(outcome, ScanOutcome::default());
    }

    #[test]
    fn scan_accepts_zero_length_frames() {
        let buf = wire(&[b"", b""], 4);
        let outcome = scan_frames(&buf, 4, DEFAULT_MAX_FRAME_SIZE).unwrap();
        assert_eq!(outcome.complete, 2);
        assert_eq!(outcome.last.unwrap().len, 0);
    }

    #[test]
    fn scan_rejects_oversized_declaration_before_payload_arrives() {
        let mut buf = BytesMut::new();
        buf.put_u32(1024);
        let err = scan_frames(&buf, 4, 512).unwrap_err();
        assert!(matches!(err, VideoError::FrameTooLarge { size: 1024, max: 512 }));
    }

    #[test]
    fn config_validation() {
        assert!(VideoConfig::default().validate().is_ok());

        let bad_width = VideoConfig {
            prefix_width: 0,
            ..VideoConfig::default()
        };
        assert!(matches!(
            bad_width.validate(),
            Err(VideoError::InvalidPrefixWidth(0))
        ));
    }

    #[test]
    fn read_size_follows_frame_dimensions() {
        let cfg = VideoConfig::for_frame_size(320, 240);
        assert_eq!(cfg.read_size, 320 * 240 * 3);
        assert_eq!(cfg.prefix_width, DEFAULT_PREFIX_WIDTH);
    }
}
