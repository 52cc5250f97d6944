use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use tracing::debug;

use crate::error::{Result, TransportError};
use crate::signal::StopSignal;

/// A connected carlink channel: a TCP stream tagged with the channel it serves.
///
/// The socket is shut down in both directions when the stream is dropped, so
/// every exit path of a pipeline releases its connection.
pub struct ChannelStream {
    inner: TcpStream,
    channel: &'static str,
    peer: Option<SocketAddr>,
}

impl Read for ChannelStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        self.inner.read(buf)
    }
}

impl Write for ChannelStream {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.inner.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.inner.flush()
    }
}

impl ChannelStream {
    /// Wrap an already connected TCP stream.
    pub fn from_tcp(inner: TcpStream, channel: &'static str) -> Self {
        let peer = inner.peer_addr().ok();
        Self {
            inner,
            channel,
            peer,
        }
    }

    /// Set read timeout on the underlying socket.
    pub fn set_read_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_read_timeout(timeout).map_err(Into::into)
    }

    /// Set write timeout on the underlying socket.
    pub fn set_write_timeout(&self, timeout: Option<Duration>) -> Result<()> {
        self.inner.set_write_timeout(timeout).map_err(Into::into)
    }

    /// Disable Nagle's algorithm (small control tokens go out immediately).
    pub fn set_nodelay(&self, nodelay: bool) -> Result<()> {
        self.inner.set_nodelay(nodelay).map_err(Into::into)
    }

    /// Channel name used in diagnostics ("video", "audio", "gamepad").
    pub fn channel(&self) -> &'static str {
        self.channel
    }

    /// Remote address, when the OS reported one at connect time.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.peer
    }

    pub(crate) fn socket(&self) -> &TcpStream {
        &self.inner
    }
}

impl Drop for ChannelStream {
    fn drop(&mut self) {
        debug!(channel = self.channel, peer = ?self.peer, "closing channel connection");
        let _ = self.inner.shutdown(Shutdown::Both);
    }
}

impl std::fmt::Debug for ChannelStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelStream")
            .field("channel", &self.channel)
            .field("peer", &self.peer)
            .finish()
    }
}

/// Write all of `buf`, then flush.
///
/// Timed-out or would-block writes are retried from the same offset until
/// `stop` is raised, in which case `TransportError::Shutdown` is returned.
/// A zero-length write means the peer went away.
pub fn send_all<W: Write>(writer: &mut W, buf: &[u8], stop: &StopSignal) -> Result<()> {
    let mut offset = 0usize;
    while offset < buf.len() {
        match writer.write(&buf[offset..]) {
            Ok(0) => return Err(TransportError::ConnectionClosed),
            Ok(n) => offset += n,
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_timeout(err.kind()) => {
                if stop.is_stopped() {
                    return Err(TransportError::Shutdown);
                }
            }
            Err(err) => return Err(TransportError::Io(err)),
        }
    }

    loop {
        match writer.flush() {
            Ok(()) => return Ok(()),
            Err(err) if err.kind() == ErrorKind::Interrupted => continue,
            Err(err) if is_timeout(err.kind()) => {
                if stop.is_stopped() {
                    return Err(TransportError::Shutdown);
                }
            }
            Err(err) => return Err(TransportError::Io(err)),
        }
    }
}

/// True for the error kinds a socket timeout surfaces as (platform dependent).
pub fn is_timeout(kind: ErrorKind) -> bool {
    matches!(kind, ErrorKind::WouldBlock | ErrorKind::TimedOut)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::net::TcpListener;

    use super::*;

    struct StallingWriter {
        stalls: usize,
        written: Vec<u8>,
        max_per_write: usize,
    }

    impl Write for StallingWriter {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if self.stalls > 0 {
                self.stalls -= 1;
                return Err(std::io::Error::from(ErrorKind::WouldBlock));
            }
            let n = buf.len().min(self.max_per_write);
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ClosedWriter;

    impl Write for ClosedWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn send_all_writes_everything() {
        let mut out = Cursor::new(Vec::new());
        send_all(&mut out, b"ABS_Y 2,", &StopSignal::new()).unwrap();
        assert_eq!(out.into_inner(), b"ABS_Y 2,");
    }

    #[test]
    fn send_all_retries_stalls_and_short_writes() {
        let mut writer = StallingWriter {
            stalls: 3,
            written: Vec::new(),
            max_per_write: 2,
        };
        send_all(&mut writer, b"BTN_SOUTH 1,", &StopSignal::new()).unwrap();
        assert_eq!(writer.written, b"BTN_SOUTH 1,");
    }

    #[test]
    fn send_all_gives_up_on_stall_after_stop() {
        let stop = StopSignal::new();
        stop.stop();
        let mut writer = StallingWriter {
            stalls: 1,
            written: Vec::new(),
            max_per_write: 64,
        };
        let err = send_all(&mut writer, b"data", &stop).unwrap_err();
        assert!(matches!(err, TransportError::Shutdown));
    }

    #[test]
    fn send_all_reports_closed_peer() {
        let err = send_all(&mut ClosedWriter, b"data", &StopSignal::new()).unwrap_err();
        assert!(matches!(err, TransportError::ConnectionClosed));
    }

    #[test]
    fn drop_shuts_down_socket() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).unwrap();
        let (mut server_side, _) = listener.accept().unwrap();

        let stream = ChannelStream::from_tcp(client, "video");
        assert_eq!(stream.channel(), "video");
        assert_eq!(stream.peer_addr(), Some(addr));
        drop(stream);

        let mut buf = [0u8; 8];
        let n = server_side.read(&mut buf).unwrap();
        assert_eq!(n, 0, "peer should observe EOF after drop");
    }
}
