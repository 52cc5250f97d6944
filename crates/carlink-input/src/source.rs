use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{InputError, Result};
use crate::event::{ControllerSample, EventCode};

/// A producer of controller events.
///
/// `poll_events` must return within roughly `timeout` so the caller can
/// observe its stop signal; an idle poll appends nothing and returns `Ok`.
/// An error means the controller is gone.
pub trait ControllerSource: Send {
    fn poll_events(&mut self, timeout: Duration, out: &mut Vec<ControllerSample>) -> Result<()>;
}

/// Replays a fixed list of samples, one per poll, then idles.
///
/// Scripts are plain text, one `CODE VALUE` pair per line, `#` comments
/// allowed:
///
/// ```text
/// # push the left stick forward
/// ABS_Y -32767
/// BTN_SOUTH 1
/// ```
#[derive(Debug, Clone)]
pub struct ReplaySource {
    pending: VecDeque<ControllerSample>,
}

impl ReplaySource {
    pub fn new(samples: impl IntoIterator<Item = ControllerSample>) -> Self {
        Self {
            pending: samples.into_iter().collect(),
        }
    }

    pub fn from_script(script: &str) -> Result<Self> {
        let mut samples = Vec::new();
        for (index, raw) in script.lines().enumerate() {
            let line = raw.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }
            samples.push(parse_line(line).map_err(|reason| InputError::InvalidScript {
                line: index + 1,
                reason,
            })?);
        }
        Ok(Self::new(samples))
    }

    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

fn parse_line(line: &str) -> std::result::Result<ControllerSample, String> {
    let mut parts = line.split_whitespace();
    let (Some(name), Some(value), None) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected `CODE VALUE`, got {line:?}"));
    };
    let code = EventCode::from_name(name).ok_or_else(|| format!("unknown event code {name:?}"))?;
    let value = value
        .parse::<i32>()
        .map_err(|err| format!("invalid value {value:?}: {err}"))?;
    Ok(ControllerSample::new(code, value))
}

impl ControllerSource for ReplaySource {
    fn poll_events(&mut self, timeout: Duration, out: &mut Vec<ControllerSample>) -> Result<()> {
        match self.pending.pop_front() {
            Some(sample) => out.push(sample),
            None => std::thread::sleep(timeout),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_script_with_comments() {
        let script = "# warmup\nABS_Y 100\n\n  BTN_SOUTH 1  # press\nABS_RX -32767\n";
        let mut source = ReplaySource::from_script(script).unwrap();
        assert_eq!(source.remaining(), 3);

        let mut out = Vec::new();
        for _ in 0..4 {
            source.poll_events(Duration::from_millis(1), &mut out).unwrap();
        }
        assert_eq!(
            out,
            vec![
                ControllerSample::new(EventCode::AbsY, 100),
                ControllerSample::new(EventCode::BtnSouth, 1),
                ControllerSample::new(EventCode::AbsRx, -32767),
            ]
        );
    }

    #[test]
    fn rejects_bad_lines_with_line_number() {
        let err = ReplaySource::from_script("ABS_Y 1\nABS_Q 2\n").unwrap_err();
        match err {
            InputError::InvalidScript { line, reason } => {
                assert_eq!(line, 2);
                assert!(reason.contains("ABS_Q"));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(matches!(
            ReplaySource::from_script("BTN_TR one").unwrap_err(),
            InputError::InvalidScript { line: 1, .. }
        ));
        assert!(matches!(
            ReplaySource::from_script("BTN_TR 1 2").unwrap_err(),
            InputError::InvalidScript { line: 1, .. }
        ));
    }
}
