//! Linux evdev controller backend.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read};
use std::os::unix::io::AsRawFd;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{InputError, Result};
use crate::event::{ControllerSample, EventCode, EV_SYN};
use crate::source::ControllerSource;

/// Size of one `struct input_event` on this target.
pub const EVENT_SIZE: usize = std::mem::size_of::<libc::input_event>();

// type: u16, code: u16, value: i32 close every record regardless of the
// timestamp layout.
const FIELDS_OFFSET: usize = EVENT_SIZE - 8;

const BY_ID_DIR: &str = "/dev/input/by-id";
const JOYSTICK_SUFFIX: &str = "-event-joystick";
const READ_BATCH: usize = 64;

/// Reads controller events from a `/dev/input/event*` node.
#[derive(Debug)]
pub struct EvdevSource {
    file: File,
    path: PathBuf,
    pending: Vec<u8>,
}

impl EvdevSource {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new().read(true).open(&path).map_err(|err| {
            if err.kind() == io::ErrorKind::NotFound {
                InputError::DeviceNotFound(path.display().to_string())
            } else {
                InputError::Io(err)
            }
        })?;
        tracing::info!(device = %path.display(), "controller opened");
        Ok(Self {
            file,
            path,
            pending: Vec::with_capacity(EVENT_SIZE * READ_BATCH),
        })
    }

    /// Open the first joystick under `/dev/input/by-id`.
    pub fn open_default() -> Result<Self> {
        Self::open(discover_in(Path::new(BY_ID_DIR))?)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn wait_readable(&self, timeout: Duration) -> Result<bool> {
        let mut pfd = libc::pollfd {
            fd: self.file.as_raw_fd(),
            events: libc::POLLIN,
            revents: 0,
        };
        let millis = timeout.as_millis().min(libc::c_int::MAX as u128) as libc::c_int;
        // SAFETY: `pfd` is a valid pollfd for the duration of the call and the
        // count matches.
        let rc = unsafe { libc::poll(&mut pfd, 1, millis) };
        if rc < 0 {
            let err = io::Error::last_os_error();
            if err.kind() == io::ErrorKind::Interrupted {
                return Ok(false);
            }
            return Err(InputError::Io(err));
        }
        if rc == 0 {
            return Ok(false);
        }
        if pfd.revents & (libc::POLLERR | libc::POLLHUP | libc::POLLNVAL) != 0
            && pfd.revents & libc::POLLIN == 0
        {
            return Err(InputError::Disconnected(self.path.display().to_string()));
        }
        Ok(true)
    }
}

impl ControllerSource for EvdevSource {
    fn poll_events(&mut self, timeout: Duration, out: &mut Vec<ControllerSample>) -> Result<()> {
        if !self.wait_readable(timeout)? {
            return Ok(());
        }

        let mut buf = [0u8; EVENT_SIZE * READ_BATCH];
        let n = match self.file.read(&mut buf) {
            Ok(0) => return Err(InputError::Disconnected(self.path.display().to_string())),
            Ok(n) => n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(err) if err.raw_os_error() == Some(libc::ENODEV) => {
                return Err(InputError::Disconnected(self.path.display().to_string()))
            }
            Err(err) => return Err(InputError::Io(err)),
        };
        self.pending.extend_from_slice(&buf[..n]);

        let complete = self.pending.len() / EVENT_SIZE * EVENT_SIZE;
        for record in self.pending[..complete].chunks_exact(EVENT_SIZE) {
            let (kind, code, value) = parse_record(record);
            if kind == EV_SYN {
                continue;
            }
            out.push(ControllerSample::new(EventCode::from_evdev(kind, code), value));
        }
        self.pending.drain(..complete);
        Ok(())
    }
}

/// Split one `input_event` record into `(type, code, value)`.
pub fn parse_record(record: &[u8]) -> (u16, u16, i32) {
    let f = &record[FIELDS_OFFSET..FIELDS_OFFSET + 8];
    (
        u16::from_ne_bytes([f[0], f[1]]),
        u16::from_ne_bytes([f[2], f[3]]),
        i32::from_ne_bytes([f[4], f[5], f[6], f[7]]),
    )
}

/// First `*-event-joystick` entry in `dir`, in sorted order.
pub fn discover_in(dir: &Path) -> Result<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(InputError::DeviceNotFound(format!(
                "{} does not exist",
                dir.display()
            )))
        }
        Err(err) => return Err(InputError::Io(err)),
    };

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|name| name.to_str())
                .is_some_and(|name| name.ends_with(JOYSTICK_SUFFIX))
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next().ok_or_else(|| {
        InputError::DeviceNotFound(format!("no joystick under {}", dir.display()))
    })
}
