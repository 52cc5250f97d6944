use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use tracing::{debug, info};

use crate::error::{Result, TransportError};
use crate::stream::ChannelStream;

/// Socket options applied when a channel connects.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Upper bound for each connect attempt. Default: 5s.
    pub connect_timeout: Duration,
    /// Read timeout on the connected socket. `None` blocks forever.
    pub read_timeout: Option<Duration>,
    /// Write timeout on the connected socket. `None` blocks forever.
    pub write_timeout: Option<Duration>,
    /// Disable Nagle's algorithm.
    pub nodelay: bool,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(5),
            read_timeout: Some(Duration::from_millis(200)),
            write_timeout: Some(Duration::from_millis(200)),
            nodelay: false,
        }
    }
}

/// Connect a channel to `host:port`.
///
/// Every resolved address is tried in order; the last failure is reported.
pub fn connect(
    host: &str,
    port: u16,
    channel: &'static str,
    options: &ConnectOptions,
) -> Result<ChannelStream> {
    let addr_label = format!("{host}:{port}");
    let addrs: Vec<_> = (host, port)
        .to_socket_addrs()
        .map_err(|source| TransportError::Resolve {
            addr: addr_label.clone(),
            source,
        })?
        .collect();

    let mut last_err = std::io::Error::new(
        std::io::ErrorKind::AddrNotAvailable,
        "no socket addresses resolved",
    );

    for addr in addrs {
        debug!(channel, %addr, "connecting");
        match TcpStream::connect_timeout(&addr, options.connect_timeout) {
            Ok(tcp) => {
                let stream = ChannelStream::from_tcp(tcp, channel);
                stream.set_read_timeout(options.read_timeout)?;
                stream.set_write_timeout(options.write_timeout)?;
                stream.set_nodelay(options.nodelay)?;
                info!(channel, %addr, "channel connected");
                return Ok(stream);
            }
            Err(err) => {
                debug!(channel, %addr, error = %err, "connect attempt failed");
                last_err = err;
            }
        }
    }

    Err(TransportError::Connect {
        addr: addr_label,
        source: last_err,
    })
}

#[cfg(test)]
mod tests {
    use std::io::{ErrorKind, Read, Write};
    use std::net::TcpListener;

    use super::*;

    #[test]
    fn connect_applies_timeouts() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let options = ConnectOptions {
            read_timeout: Some(Duration::from_millis(20)),
            nodelay: true,
            ..ConnectOptions::default()
        };
        let mut stream = connect("127.0.0.1", port, "gamepad", &options).unwrap();
        let (mut server_side, _) = listener.accept().unwrap();

        let mut buf = [0u8; 4];
        let err = stream.read(&mut buf).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut));

        stream.write_all(b"ok").unwrap();
        let mut got = [0u8; 2];
        server_side.read_exact(&mut got).unwrap();
        assert_eq!(&got, b"ok");
    }

    #[test]
    fn connect_refused_is_reported() {
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let err = connect("127.0.0.1", port, "audio", &ConnectOptions::default()).unwrap_err();
        match err {
            TransportError::Connect { addr, .. } => assert_eq!(addr, format!("127.0.0.1:{port}")),
            other => panic!("expected connect error, got {other:?}"),
        }
    }
}
