use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Receives the newest video frame payload on every view tick that has one.
pub trait FrameSink: Send {
    fn present(&mut self, frame: &[u8]) -> io::Result<()>;
}

/// Drops every frame.
#[derive(Debug, Default, Clone, Copy)]
pub struct DiscardSink;

impl FrameSink for DiscardSink {
    fn present(&mut self, _frame: &[u8]) -> io::Result<()> {
        Ok(())
    }
}

/// Keeps the latest frame payload in a file.
///
/// Each frame goes to a sibling temp file first and is renamed over the
/// target, so readers never see a half-written image.
#[derive(Debug, Clone)]
pub struct SnapshotSink {
    path: PathBuf,
    staging: PathBuf,
}

impl SnapshotSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut staging = path.clone().into_os_string();
        staging.push(".partial");
        Self {
            path,
            staging: PathBuf::from(staging),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSink for SnapshotSink {
    fn present(&mut self, frame: &[u8]) -> io::Result<()> {
        let mut file = fs::File::create(&self.staging)?;
        file.write_all(frame)?;
        file.sync_data()?;
        drop(file);
        fs::rename(&self.staging, &self.path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_replaces_previous_frame() {
        let dir = std::env::temp_dir().join(format!(
            "carlink-snapshot-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        fs::create_dir_all(&dir).unwrap();
        let mut sink = SnapshotSink::new(dir.join("view.jpg"));

        sink.present(b"first frame").unwrap();
        sink.present(b"second").unwrap();

        assert_eq!(fs::read(sink.path()).unwrap(), b"second");
        assert!(!dir.join("view.jpg.partial").exists());
        fs::remove_dir_all(&dir).ok();
    }
}
