use std::net::{Shutdown, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::debug;

use crate::error::Result;
use crate::stream::ChannelStream;

#[derive(Debug, Default)]
struct Shared {
    stopped: AtomicBool,
    sockets: Mutex<Vec<(&'static str, TcpStream)>>,
}

/// Cooperative stop flag shared between a pipeline and whoever owns it.
///
/// Pipelines check [`StopSignal::is_stopped`] at the top of every cycle and
/// after every timed-out socket operation. Channels registered with
/// [`StopSignal::attach`] are shut down when the stop is raised, so a read or
/// write blocked without a timeout returns as well.
#[derive(Debug, Clone, Default)]
pub struct StopSignal {
    shared: Arc<Shared>,
}

impl StopSignal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop and shut down every attached channel. Idempotent.
    pub fn stop(&self) {
        self.shared.stopped.store(true, Ordering::SeqCst);
        for (channel, socket) in self.sockets().drain(..) {
            debug!(channel, "shutting down channel on stop");
            let _ = socket.shutdown(Shutdown::Both);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.stopped.load(Ordering::SeqCst)
    }

    /// Shut `channel` down when this signal is raised.
    ///
    /// A channel attached after the stop is shut down immediately.
    pub fn attach(&self, channel: &ChannelStream) -> Result<()> {
        let socket = channel.socket().try_clone()?;
        let mut sockets = self.sockets();
        if self.is_stopped() {
            let _ = socket.shutdown(Shutdown::Both);
        } else {
            sockets.push((channel.channel(), socket));
        }
        Ok(())
    }

    fn sockets(&self) -> MutexGuard<'_, Vec<(&'static str, TcpStream)>> {
        self.shared
            .sockets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Read;
    use std::net::TcpListener;
    use std::sync::mpsc;
    use std::time::Duration;

    use super::*;

    fn pair() -> (ChannelStream, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let client = TcpStream::connect(listener.local_addr().unwrap()).unwrap();
        let (server, _) = listener.accept().unwrap();
        (ChannelStream::from_tcp(client, "video"), server)
    }

    #[test]
    fn clones_share_state() {
        let signal = StopSignal::new();
        let observer = signal.clone();
        assert!(!observer.is_stopped());

        signal.stop();
        assert!(observer.is_stopped());

        signal.stop();
        assert!(observer.is_stopped());
    }

    #[test]
    fn visible_across_threads() {
        let signal = StopSignal::new();
        let remote = signal.clone();
        std::thread::spawn(move || remote.stop()).join().unwrap();
        assert!(signal.is_stopped());
    }

    #[test]
    fn stop_unblocks_read_without_timeout() {
        let (mut channel, _server) = pair();
        channel.set_read_timeout(None).unwrap();
        let signal = StopSignal::new();
        signal.attach(&channel).unwrap();

        let (tx, rx) = mpsc::channel();
        std::thread::spawn(move || {
            let mut buf = [0u8; 16];
            let _ = tx.send(channel.read(&mut buf).map_err(|err| err.kind()));
        });

        std::thread::sleep(Duration::from_millis(50));
        signal.stop();
        let read = rx
            .recv_timeout(Duration::from_secs(3))
            .expect("blocked read should return after stop");
        assert!(matches!(read, Ok(0) | Err(_)));
    }

    #[test]
    fn attach_after_stop_shuts_down_immediately() {
        let (channel, mut server) = pair();
        let signal = StopSignal::new();
        signal.stop();
        signal.attach(&channel).unwrap();

        server.set_read_timeout(Some(Duration::from_secs(3))).unwrap();
        let mut buf = [0u8; 8];
        assert_eq!(server.read(&mut buf).unwrap(), 0);
    }
}
